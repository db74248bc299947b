//! Events fired by the host to drive a state machine.
//!
//! An event is an identity token. It carries no behavior of its own; the
//! first time a transition is registered against it, it becomes bound to
//! that transition's state machine and stays bound for its lifetime.

use crate::builder::BuildError;
use crate::machine::{MachineShared, TransitionError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// Type-erased event payload travelling through the engine and its queue.
pub(crate) type Payload = Box<dyn Any + Send>;

/// How an event was fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventFireMethod {
    /// Unmatched events fail with `TransitionNotFound`
    Fire,

    /// Unmatched events report `false` instead of failing
    TryFire,
}

struct Binding {
    machine_id: Uuid,
    machine_name: String,
    machine: Weak<MachineShared>,
}

struct EventCore {
    id: Uuid,
    name: String,
    binding: Mutex<Option<Binding>>,
}

/// Payload-agnostic identity of an event.
///
/// Every [`Event`] and [`EventWithData`] exposes one through `AsRef`, which
/// is what handlers, fault info and the observability hooks receive.
#[derive(Clone)]
pub struct EventRef {
    core: Arc<EventCore>,
}

impl EventRef {
    fn new(name: String) -> Self {
        Self {
            core: Arc::new(EventCore {
                id: Uuid::new_v4(),
                name,
                binding: Mutex::new(None),
            }),
        }
    }

    /// Display name of the event.
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Unique identity of the event.
    pub fn id(&self) -> Uuid {
        self.core.id
    }

    /// Whether a transition has been registered against this event yet.
    pub fn is_bound(&self) -> bool {
        self.core.binding.lock().is_some()
    }

    /// Bind this event to `machine`, or confirm it is already bound to it.
    pub(crate) fn bind(&self, machine: &MachineShared) -> Result<(), BuildError> {
        let mut binding = self.core.binding.lock();
        match binding.as_ref() {
            Some(existing) if existing.machine_id == machine.id => Ok(()),
            Some(existing) => Err(BuildError::InvalidEventTransition {
                event: self.core.name.clone(),
                bound: existing.machine_name.clone(),
                machine: machine.name.clone(),
            }),
            None => {
                *binding = Some(Binding {
                    machine_id: machine.id,
                    machine_name: machine.name.clone(),
                    machine: machine.self_ref.clone(),
                });
                Ok(())
            }
        }
    }

    pub(crate) fn fire_payload(
        &self,
        data: Payload,
        method: EventFireMethod,
    ) -> Result<bool, TransitionError> {
        let machine = {
            let binding = self.core.binding.lock();
            let binding = binding.as_ref().ok_or_else(|| TransitionError::UnboundEvent {
                event: self.core.name.clone(),
            })?;
            binding
                .machine
                .upgrade()
                .ok_or_else(|| TransitionError::MachineDropped {
                    machine: binding.machine_name.clone(),
                })?
        };
        machine.fire(self.clone(), data, method)
    }
}

impl PartialEq for EventRef {
    fn eq(&self, other: &Self) -> bool {
        self.core.id == other.core.id
    }
}

impl Eq for EventRef {}

impl Hash for EventRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.core.id.hash(state);
    }
}

impl fmt::Debug for EventRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.core.name)
            .field("id", &self.core.id)
            .finish()
    }
}

impl fmt::Display for EventRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.core.name)
    }
}

impl AsRef<EventRef> for EventRef {
    fn as_ref(&self) -> &EventRef {
        self
    }
}

/// Associates an event type with the payload its transitions receive.
pub trait TypedEvent {
    /// Payload handed to guards and handlers of transitions on this event
    type Data: Send + 'static;

    /// The payload-agnostic identity of this event.
    fn event_ref(&self) -> &EventRef;
}

/// An event without payload.
///
/// # Example
///
/// ```rust
/// use hsm_core::{Event, StateMachine};
///
/// let machine = StateMachine::new("player");
/// let stopped = machine.create_initial_state("Stopped").unwrap();
/// let playing = machine.create_state("Playing");
///
/// let play = Event::new("Play");
/// stopped.transition_on(&play).to(&playing).unwrap();
///
/// play.fire().unwrap();
/// assert!(machine.is_in_state(&playing));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Event {
    inner: EventRef,
}

impl Event {
    /// Create a new, unbound event.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: EventRef::new(name.into()),
        }
    }

    /// Display name of the event.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Fire the event on its state machine.
    ///
    /// Fails with [`TransitionError::TransitionNotFound`] when the current
    /// state has no matching transition. When called from inside a handler
    /// the request is queued and this returns `Ok(())` immediately.
    pub fn fire(&self) -> Result<(), TransitionError> {
        self.inner
            .fire_payload(Box::new(()), EventFireMethod::Fire)
            .map(|_| ())
    }

    /// Fire the event, returning `false` instead of failing when no
    /// transition matches.
    pub fn try_fire(&self) -> Result<bool, TransitionError> {
        self.inner
            .fire_payload(Box::new(()), EventFireMethod::TryFire)
    }
}

impl AsRef<EventRef> for Event {
    fn as_ref(&self) -> &EventRef {
        &self.inner
    }
}

impl TypedEvent for Event {
    type Data = ();

    fn event_ref(&self) -> &EventRef {
        &self.inner
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

/// An event carrying a payload of type `D` to guards and handlers.
pub struct EventWithData<D> {
    inner: EventRef,
    _payload: PhantomData<fn(D)>,
}

impl<D: Send + 'static> EventWithData<D> {
    /// Create a new, unbound event.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: EventRef::new(name.into()),
            _payload: PhantomData,
        }
    }

    /// Display name of the event.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Fire the event with `data`. See [`Event::fire`].
    pub fn fire(&self, data: D) -> Result<(), TransitionError> {
        self.inner
            .fire_payload(Box::new(data), EventFireMethod::Fire)
            .map(|_| ())
    }

    /// Fire the event with `data`. See [`Event::try_fire`].
    pub fn try_fire(&self, data: D) -> Result<bool, TransitionError> {
        self.inner
            .fire_payload(Box::new(data), EventFireMethod::TryFire)
    }
}

impl<D> Clone for EventWithData<D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _payload: PhantomData,
        }
    }
}

impl<D> fmt::Debug for EventWithData<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventWithData").field(&self.inner).finish()
    }
}

impl<D> AsRef<EventRef> for EventWithData<D> {
    fn as_ref(&self) -> &EventRef {
        &self.inner
    }
}

impl<D: Send + 'static> TypedEvent for EventWithData<D> {
    type Data = D;

    fn event_ref(&self) -> &EventRef {
        &self.inner
    }
}
