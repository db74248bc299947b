//! States of a state machine.
//!
//! States are created only through their machine's factory operations
//! ([`StateMachine::create_state`](crate::StateMachine::create_state) and
//! friends) and can never move to another machine. A [`State`] is a cheap,
//! cloneable handle into that machine's arena.

use crate::builder::{BuildError, TransitionBuilder};
use crate::core::event::{EventFireMethod, EventRef, TypedEvent};
use crate::core::group::{GroupId, StateGroup};
use crate::core::handler::{HandlerResult, StateHandler, StateHandlerInfo};
use crate::core::transition::{Transition, TransitionDescription, TransitionKind, TransitionRecord};
use crate::machine::MachineShared;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// Index of a state in its machine's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct StateId(pub(crate) usize);

/// Transition candidate offered to [`StateBehavior::can_transition`].
pub struct TransitionCandidate<'a> {
    /// The current state
    pub from: &'a State,
    /// Destination, when known before resolution (not for dynamic or ignored transitions)
    pub to: Option<&'a State>,
    pub event: &'a EventRef,
    pub fire_method: EventFireMethod,
}

/// Per-state capability hooks.
///
/// Attach an implementation with
/// [`StateMachine::create_state_with_behavior`](crate::StateMachine::create_state_with_behavior)
/// to veto candidate transitions or to run entry/exit logic tied to the
/// state's own data. All methods have pass-through defaults.
///
/// `on_entry` / `on_exit` run before the closure handlers registered with
/// [`State::with_entry`] / [`State::with_exit`]. A failure in either faults
/// the machine exactly as a closure handler failure would.
pub trait StateBehavior: Send + Sync {
    /// Whether the candidate may be considered; rejected candidates are skipped.
    fn can_transition(&self, _candidate: &TransitionCandidate<'_>) -> bool {
        true
    }

    /// Runs on entry, before the state's entry closure.
    fn on_entry(&self, _info: &StateHandlerInfo<'_>) -> HandlerResult {
        Ok(())
    }

    /// Runs on exit, before the state's exit closure.
    fn on_exit(&self, _info: &StateHandlerInfo<'_>) -> HandlerResult {
        Ok(())
    }
}

/// Arena record for a state.
pub(crate) struct StateRecord {
    pub(crate) name: Arc<str>,
    pub(crate) transitions: Vec<TransitionRecord>,
    pub(crate) groups: Vec<GroupId>,
    pub(crate) entry: Option<StateHandler>,
    pub(crate) exit: Option<StateHandler>,
    pub(crate) behavior: Option<Arc<dyn StateBehavior>>,
}

impl StateRecord {
    pub(crate) fn new(name: Arc<str>, behavior: Option<Arc<dyn StateBehavior>>) -> Self {
        Self {
            name,
            transitions: Vec::new(),
            groups: Vec::new(),
            entry: None,
            exit: None,
            behavior,
        }
    }
}

/// Handle to a state owned by a [`StateMachine`](crate::StateMachine).
///
/// Handles hold only a weak reference to their machine, so capturing them
/// in handlers does not keep the machine alive. Configuration calls made
/// after the machine has been dropped have no effect.
#[derive(Clone)]
pub struct State {
    id: StateId,
    name: Arc<str>,
    machine_id: Uuid,
    machine: Weak<MachineShared>,
}

impl State {
    pub(crate) fn new(
        id: StateId,
        name: Arc<str>,
        machine_id: Uuid,
        machine: Weak<MachineShared>,
    ) -> Self {
        Self {
            id,
            name,
            machine_id,
            machine,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn id(&self) -> StateId {
        self.id
    }

    pub(crate) fn machine_id(&self) -> Uuid {
        self.machine_id
    }

    pub(crate) fn machine(&self) -> Option<Arc<MachineShared>> {
        self.machine.upgrade()
    }

    /// Start declaring a transition from this state on `event`.
    ///
    /// Transitions are tried in registration order. At most one
    /// unconditional transition may exist per event and it must be the last
    /// one registered.
    pub fn transition_on<E: TypedEvent>(&self, event: &E) -> TransitionBuilder<'_, E::Data> {
        TransitionBuilder::new(self, event.event_ref().clone())
    }

    /// Declare an inner self-transition on `event`: the transition handler
    /// runs, but this state's exit and entry handlers do not.
    pub fn inner_self_transition_on<E: TypedEvent>(
        &self,
        event: &E,
    ) -> Result<Transition<E::Data>, BuildError> {
        self.transition_on(event).to_inner_self()
    }

    /// Ignore `event` while in this state: firing it succeeds, raises the
    /// event-ignored notification and changes nothing.
    pub fn ignore(&self, event: impl AsRef<EventRef>) -> Result<(), BuildError> {
        let record = TransitionRecord::new(event.as_ref().clone(), TransitionKind::Ignore);
        self.register(record).map(|_| ())
    }

    /// Ignore every event in `events`.
    pub fn ignore_all<I>(&self, events: I) -> Result<(), BuildError>
    where
        I: IntoIterator,
        I::Item: AsRef<EventRef>,
    {
        events.into_iter().try_for_each(|event| self.ignore(event))
    }

    /// Set the handler run when this state is entered.
    pub fn with_entry<F>(&self, handler: F) -> &Self
    where
        F: Fn(&StateHandlerInfo<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        let handler: StateHandler = Arc::new(handler);
        if let Some(machine) = self.machine() {
            machine.inner.lock().child.state_mut(self.id).entry = Some(handler);
        }
        self
    }

    /// Set the handler run when this state is exited.
    pub fn with_exit<F>(&self, handler: F) -> &Self
    where
        F: Fn(&StateHandlerInfo<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        let handler: StateHandler = Arc::new(handler);
        if let Some(machine) = self.machine() {
            machine.inner.lock().child.state_mut(self.id).exit = Some(handler);
        }
        self
    }

    /// Add this state to `group`. Adding it twice has no effect.
    pub fn add_to_group(&self, group: &StateGroup) -> Result<(), BuildError> {
        group.add_state(self)
    }

    pub fn add_to_groups<'g, I>(&self, groups: I) -> Result<(), BuildError>
    where
        I: IntoIterator<Item = &'g StateGroup>,
    {
        groups
            .into_iter()
            .try_for_each(|group| group.add_state(self))
    }

    /// Groups this state belongs to, in the order it joined them.
    pub fn groups(&self) -> Vec<StateGroup> {
        let Some(machine) = self.machine() else {
            return Vec::new();
        };
        let inner = machine.inner.lock();
        inner
            .child
            .state(self.id)
            .groups
            .iter()
            .map(|&id| machine.group_handle(&inner.child, id))
            .collect()
    }

    /// This state's transitions, in resolution order.
    pub fn transitions(&self) -> Vec<TransitionDescription> {
        let Some(machine) = self.machine() else {
            return Vec::new();
        };
        let inner = machine.inner.lock();
        inner
            .child
            .state(self.id)
            .transitions
            .iter()
            .map(|record| record.describe(&inner.child))
            .collect()
    }

    pub(crate) fn register(&self, record: TransitionRecord) -> Result<usize, BuildError> {
        let machine = self.machine().ok_or(BuildError::MachineDropped)?;
        machine.register_transition(self.id, record)
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.machine_id == other.machine_id && self.id == other.id
    }
}

impl Eq for State {}

impl Hash for State {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.machine_id.hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("State").field(&&*self.name).finish()
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
