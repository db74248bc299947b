//! The synchronization seam between the engine and its host.
//!
//! The engine has no internal locking. A [`Synchronizer`] wraps each of
//! the three entry points (fire, force-transition, reset) and runs the
//! supplied unit of work exactly once, under whatever discipline the host
//! wants, before returning. Events fired from inside a handler never reach
//! the synchronizer: they go through the machine's re-entrant queue.

use crate::core::EventFireMethod;
use crate::machine::error::TransitionError;
use parking_lot::Mutex;

/// A unit of work handed to a [`Synchronizer`].
pub type Invoker<'a, T> = Box<dyn FnOnce() -> Result<T, TransitionError> + 'a>;

/// Host-supplied concurrency discipline around the machine's entry points.
pub trait Synchronizer: Send + Sync {
    /// Run an event fire. Must call `invoker` exactly once and return its result.
    fn fire_event(
        &self,
        method: EventFireMethod,
        invoker: Invoker<'_, bool>,
    ) -> Result<bool, TransitionError>;

    /// Run a forced transition. Must call `invoker` exactly once.
    fn force_transition(&self, invoker: Invoker<'_, ()>) -> Result<(), TransitionError>;

    /// Run a reset. Must call `invoker` exactly once.
    fn reset(&self, invoker: Box<dyn FnOnce() + '_>);
}

/// Serializes all entry points behind a single mutex.
///
/// # Example
///
/// ```rust
/// use hsm_core::{Event, LockSynchronizer, StateMachineBuilder};
/// use std::sync::Arc;
/// use std::thread;
///
/// let machine = StateMachineBuilder::new("counter")
///     .synchronizer(Arc::new(LockSynchronizer::new()))
///     .build();
/// let idle = machine.create_initial_state("Idle").unwrap();
/// let tick = Event::new("Tick");
/// idle.inner_self_transition_on(&tick).unwrap();
///
/// let workers: Vec<_> = (0..4)
///     .map(|_| {
///         let tick = tick.clone();
///         thread::spawn(move || tick.fire())
///     })
///     .collect();
/// for worker in workers {
///     worker.join().unwrap().unwrap();
/// }
/// assert_eq!(machine.history().len(), 4);
/// ```
#[derive(Default)]
pub struct LockSynchronizer {
    lock: Mutex<()>,
}

impl LockSynchronizer {
    /// Create a synchronizer with its own lock.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Synchronizer for LockSynchronizer {
    fn fire_event(
        &self,
        _method: EventFireMethod,
        invoker: Invoker<'_, bool>,
    ) -> Result<bool, TransitionError> {
        let _guard = self.lock.lock();
        invoker()
    }

    fn force_transition(&self, invoker: Invoker<'_, ()>) -> Result<(), TransitionError> {
        let _guard = self.lock.lock();
        invoker()
    }

    fn reset(&self, invoker: Box<dyn FnOnce() + '_>) {
        let _guard = self.lock.lock();
        invoker()
    }
}
