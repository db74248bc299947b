//! The root state machine and its execution engine.
//!
//! [`StateMachine`] is the only entry point that changes state. It owns the
//! arena of states and groups, the fault slot, the re-entrant transition
//! queue and the optional [`Synchronizer`]. All handles handed out to the
//! host ([`State`], [`StateGroup`], events) point back to it weakly.

mod child;
mod describe;
mod engine;
mod error;
mod fault;
mod observer;
mod sync;

pub(crate) use child::ChildStateMachine;
pub use describe::{GroupDescription, MachineDescription, StateDescription};
pub use error::TransitionError;
pub use fault::{FaultInfo, FaultedComponent};
pub use observer::{
    EventIgnoredEventArgs, FaultedEventArgs, TransitionEventArgs, TransitionNotFoundEventArgs,
};
pub use sync::{Invoker, LockSynchronizer, Synchronizer};

use crate::builder::{BuildError, MachineConfig, StateMachineBuilder};
use crate::core::{
    EventRef, EventWithData, GroupId, GroupRecord, State, StateBehavior, StateGroup, StateId,
    StateRecord, TransitionHistory, TransitionRecord,
};
use engine::TransitionRequest;
use observer::Observers;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};
use std::thread::ThreadId;
use uuid::Uuid;

/// Mutable machine state, guarded by one lock.
pub(crate) struct MachineInner {
    pub(crate) child: ChildStateMachine,
    fault: Option<FaultInfo>,
    queue: VecDeque<TransitionRequest>,
    /// Thread running the outermost transition, if any
    executing: Option<ThreadId>,
    /// Reset requested by a handler, applied once the running transition ends
    reset_pending: bool,
    history: TransitionHistory,
}

pub(crate) struct MachineShared {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) inner: Mutex<MachineInner>,
    pub(crate) self_ref: Weak<MachineShared>,
    observers: RwLock<Observers>,
    synchronizer: RwLock<Option<Arc<dyn Synchronizer>>>,
}

impl MachineShared {
    pub(crate) fn state_handle(&self, child: &ChildStateMachine, id: StateId) -> State {
        State::new(
            id,
            Arc::clone(&child.state(id).name),
            self.id,
            self.self_ref.clone(),
        )
    }

    pub(crate) fn group_handle(&self, child: &ChildStateMachine, id: GroupId) -> StateGroup {
        StateGroup::new(
            id,
            Arc::clone(&child.group(id).name),
            self.id,
            self.self_ref.clone(),
        )
    }

    /// Validate and append a transition, binding its event to this machine.
    pub(crate) fn register_transition(
        &self,
        state: StateId,
        record: TransitionRecord,
    ) -> Result<usize, BuildError> {
        let mut inner = self.inner.lock();
        inner.child.check_registration(state, record.event.id())?;
        record.event.bind(self)?;
        Ok(inner.child.push_transition(state, record))
    }
}

/// A root state machine.
///
/// Cloning yields another handle to the same machine. The machine lives as
/// long as at least one `StateMachine` handle does; state, group and event
/// handles do not keep it alive.
///
/// # Example
///
/// ```rust
/// use hsm_core::{Event, StateMachine};
/// use std::sync::{Arc, Mutex};
///
/// let machine = StateMachine::new("job");
/// let idle = machine.create_initial_state("Idle").unwrap();
/// let running = machine.create_state("Running");
/// let start = Event::new("Start");
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let log = Arc::clone(&seen);
/// machine.on_transition_finished(move |args| {
///     log.lock().unwrap().push(format!("{} -> {}", args.from, args.to));
/// });
///
/// idle.transition_on(&start).to(&running).unwrap();
/// start.fire().unwrap();
///
/// assert_eq!(*seen.lock().unwrap(), vec!["Idle -> Running"]);
/// ```
#[derive(Clone)]
pub struct StateMachine {
    shared: Arc<MachineShared>,
}

impl StateMachine {
    /// Create a machine with default settings and no synchronizer.
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_parts(MachineConfig::new(name), None)
    }

    /// Start a [`StateMachineBuilder`] for a machine named `name`.
    ///
    /// ```
    /// use hsm_core::StateMachine;
    ///
    /// let machine = StateMachine::builder("pump").history_capacity(8).build();
    /// assert_eq!(machine.name(), "pump");
    /// ```
    pub fn builder(name: impl Into<String>) -> StateMachineBuilder {
        StateMachineBuilder::new(name)
    }

    pub(crate) fn from_parts(
        config: MachineConfig,
        synchronizer: Option<Arc<dyn Synchronizer>>,
    ) -> Self {
        let shared = Arc::new_cyclic(|self_ref| MachineShared {
            id: Uuid::new_v4(),
            name: config.name,
            inner: Mutex::new(MachineInner {
                child: ChildStateMachine::new(),
                fault: None,
                queue: VecDeque::new(),
                executing: None,
                reset_pending: false,
                history: TransitionHistory::with_capacity(config.history_capacity),
            }),
            self_ref: self_ref.clone(),
            observers: RwLock::new(Observers::new()),
            synchronizer: RwLock::new(synchronizer),
        });
        Self { shared }
    }

    /// Name given at construction, used in errors and logs.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Create a state owned by this machine.
    pub fn create_state(&self, name: impl Into<String>) -> State {
        self.add_state(StateRecord::new(Arc::from(name.into()), None))
    }

    /// Create a state whose [`StateBehavior`] hooks take part in every
    /// transition out of and into it.
    pub fn create_state_with_behavior<B>(&self, name: impl Into<String>, behavior: B) -> State
    where
        B: StateBehavior + 'static,
    {
        let behavior: Arc<dyn StateBehavior> = Arc::new(behavior);
        self.add_state(StateRecord::new(Arc::from(name.into()), Some(behavior)))
    }

    /// Create the initial state. The machine starts in it and returns to it
    /// on [`reset`](Self::reset). Can only be called once.
    pub fn create_initial_state(&self, name: impl Into<String>) -> Result<State, BuildError> {
        self.add_initial_state(StateRecord::new(Arc::from(name.into()), None))
    }

    /// [`create_initial_state`](Self::create_initial_state) with a
    /// [`StateBehavior`] attached.
    pub fn create_initial_state_with_behavior<B>(
        &self,
        name: impl Into<String>,
        behavior: B,
    ) -> Result<State, BuildError>
    where
        B: StateBehavior + 'static,
    {
        let behavior: Arc<dyn StateBehavior> = Arc::new(behavior);
        self.add_initial_state(StateRecord::new(Arc::from(name.into()), Some(behavior)))
    }

    /// Create an empty state group. Add members with
    /// [`StateGroup::add_state`] or [`State::add_to_group`].
    pub fn create_group(&self, name: impl Into<String>) -> StateGroup {
        let mut inner = self.shared.inner.lock();
        let id = inner.child.add_group(GroupRecord::new(Arc::from(name.into())));
        self.shared.group_handle(&inner.child, id)
    }

    fn add_state(&self, record: StateRecord) -> State {
        let mut inner = self.shared.inner.lock();
        let id = inner.child.add_state(record);
        self.shared.state_handle(&inner.child, id)
    }

    fn add_initial_state(&self, record: StateRecord) -> Result<State, BuildError> {
        let mut inner = self.shared.inner.lock();
        let id = inner.child.add_initial_state(record)?;
        Ok(self.shared.state_handle(&inner.child, id))
    }

    /// The current state.
    ///
    /// Fails with [`TransitionError::MachineFaulted`] while the machine is
    /// faulted and with [`TransitionError::NoInitialState`] before an initial
    /// state has been created.
    pub fn current_state(&self) -> Result<State, TransitionError> {
        let inner = self.shared.inner.lock();
        let current = self.shared.ready(&inner)?;
        Ok(self.shared.state_handle(&inner.child, current))
    }

    pub fn initial_state(&self) -> Option<State> {
        let inner = self.shared.inner.lock();
        inner
            .child
            .initial()
            .map(|id| self.shared.state_handle(&inner.child, id))
    }

    /// Whether the machine is positioned on `state`. Unlike
    /// [`current_state`](Self::current_state) this also answers while faulted.
    pub fn is_in_state(&self, state: &State) -> bool {
        state.machine_id() == self.shared.id
            && self.shared.inner.lock().child.current() == Some(state.id())
    }

    /// All states, in creation order.
    pub fn states(&self) -> Vec<State> {
        let inner = self.shared.inner.lock();
        inner
            .child
            .state_ids()
            .map(|id| self.shared.state_handle(&inner.child, id))
            .collect()
    }

    /// All groups, in creation order.
    pub fn groups(&self) -> Vec<StateGroup> {
        let inner = self.shared.inner.lock();
        inner
            .child
            .group_ids()
            .map(|id| self.shared.group_handle(&inner.child, id))
            .collect()
    }

    /// The fault that stopped the machine, if any.
    pub fn fault(&self) -> Option<FaultInfo> {
        self.shared.inner.lock().fault.clone()
    }

    /// Whether a fault is recorded and the machine rejects work until reset.
    pub fn is_faulted(&self) -> bool {
        self.shared.inner.lock().fault.is_some()
    }

    /// Move to `to` without resolution or guards, running exit, group and
    /// entry handlers with `event` as context. A no-op when already in `to`.
    ///
    /// ```rust
    /// use hsm_core::{Event, StateMachine};
    ///
    /// let machine = StateMachine::new("recovery");
    /// machine.create_initial_state("Normal").unwrap();
    /// let safe_mode = machine.create_state("SafeMode");
    /// let panic = Event::new("Panic");
    ///
    /// machine.force_transition(&safe_mode, &panic).unwrap();
    /// assert!(machine.is_in_state(&safe_mode));
    /// ```
    pub fn force_transition(
        &self,
        to: &State,
        event: impl AsRef<EventRef>,
    ) -> Result<(), TransitionError> {
        self.shared
            .force(to, event.as_ref().clone(), Box::new(()))
    }

    /// [`force_transition`](Self::force_transition) with a payload for the
    /// entry and exit handlers.
    pub fn force_transition_with<D: Send + 'static>(
        &self,
        to: &State,
        event: &EventWithData<D>,
        data: D,
    ) -> Result<(), TransitionError> {
        self.shared
            .force(to, event.as_ref().clone(), Box::new(data))
    }

    /// Clear any fault, the pending queue and the history, and return to the
    /// initial state. No entry handler runs.
    ///
    /// Called from inside a handler or listener, the reset is deferred until
    /// the running transition has finished, so the machine ends in the
    /// initial state rather than the transition's destination. Requests
    /// queued before the reset are discarded; requests fired after it run
    /// from the initial state.
    pub fn reset(&self) {
        self.shared.reset();
    }

    /// Install (or replace) the synchronizer wrapping fire, force and reset.
    pub fn set_synchronizer(&self, synchronizer: Arc<dyn Synchronizer>) {
        *self.shared.synchronizer.write() = Some(synchronizer);
    }

    /// Called before each transition executes.
    pub fn on_transition<F>(&self, listener: F)
    where
        F: Fn(&TransitionEventArgs) + Send + Sync + 'static,
    {
        self.shared.observers.write().transition.add(Arc::new(listener));
    }

    /// Called after each transition completes.
    pub fn on_transition_finished<F>(&self, listener: F)
    where
        F: Fn(&TransitionEventArgs) + Send + Sync + 'static,
    {
        self.shared
            .observers
            .write()
            .transition_finished
            .add(Arc::new(listener));
    }

    /// Called when a fired event matches no transition from the current state.
    pub fn on_transition_not_found<F>(&self, listener: F)
    where
        F: Fn(&TransitionNotFoundEventArgs) + Send + Sync + 'static,
    {
        self.shared
            .observers
            .write()
            .transition_not_found
            .add(Arc::new(listener));
    }

    /// Called when an event hits an `ignore` registration.
    pub fn on_event_ignored<F>(&self, listener: F)
    where
        F: Fn(&EventIgnoredEventArgs) + Send + Sync + 'static,
    {
        self.shared
            .observers
            .write()
            .event_ignored
            .add(Arc::new(listener));
    }

    /// Called once each time the machine records a fault.
    pub fn on_faulted<F>(&self, listener: F)
    where
        F: Fn(&FaultedEventArgs) + Send + Sync + 'static,
    {
        self.shared.observers.write().faulted.add(Arc::new(listener));
    }

    /// Snapshot of completed transitions, oldest first.
    pub fn history(&self) -> TransitionHistory {
        self.shared.inner.lock().history.clone()
    }

    /// Snapshot of the declared structure and the current position.
    pub fn describe(&self) -> MachineDescription {
        let inner = self.shared.inner.lock();
        MachineDescription::capture(&self.shared.name, &inner.child, inner.fault.is_some())
    }
}

impl fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("name", &self.shared.name)
            .field("id", &self.shared.id)
            .finish()
    }
}
