//! Observability hooks raised by the engine.

use crate::core::{EventFireMethod, EventRef, State};
use crate::machine::fault::FaultInfo;
use std::sync::Arc;

/// Raised before a transition executes and after it finishes.
#[derive(Clone, Debug)]
pub struct TransitionEventArgs {
    pub machine: String,
    pub from: State,
    pub to: State,
    pub event: EventRef,
    /// `None` for forced transitions
    pub fire_method: Option<EventFireMethod>,
    pub is_inner: bool,
}

impl TransitionEventArgs {
    pub fn is_forced(&self) -> bool {
        self.fire_method.is_none()
    }
}

/// Raised when no transition matched a fired event.
#[derive(Clone, Debug)]
pub struct TransitionNotFoundEventArgs {
    pub machine: String,
    pub from: State,
    pub event: EventRef,
    pub fire_method: EventFireMethod,
}

/// Raised when a fired event matched an ignore registration.
#[derive(Clone, Debug)]
pub struct EventIgnoredEventArgs {
    pub machine: String,
    pub state: State,
    pub event: EventRef,
    pub fire_method: EventFireMethod,
}

/// Raised once when the machine faults.
#[derive(Clone, Debug)]
pub struct FaultedEventArgs {
    pub fault: FaultInfo,
}

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub(crate) struct Listeners<T> {
    listeners: Vec<Listener<T>>,
}

impl<T> Listeners<T> {
    fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub(crate) fn add(&mut self, listener: Listener<T>) {
        self.listeners.push(listener);
    }

    /// Copy of the current listeners, so they can be invoked without the lock.
    pub(crate) fn snapshot(&self) -> Vec<Listener<T>> {
        self.listeners.clone()
    }
}

pub(crate) struct Observers {
    pub(crate) transition: Listeners<TransitionEventArgs>,
    pub(crate) transition_finished: Listeners<TransitionEventArgs>,
    pub(crate) transition_not_found: Listeners<TransitionNotFoundEventArgs>,
    pub(crate) event_ignored: Listeners<EventIgnoredEventArgs>,
    pub(crate) faulted: Listeners<FaultedEventArgs>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self {
            transition: Listeners::new(),
            transition_finished: Listeners::new(),
            transition_not_found: Listeners::new(),
            event_ignored: Listeners::new(),
            faulted: Listeners::new(),
        }
    }
}

pub(crate) fn notify<T>(listeners: Vec<Listener<T>>, args: &T) {
    for listener in listeners {
        listener(args);
    }
}
