//! Handler signatures shared by states, groups and transitions.

use crate::core::event::EventRef;
use crate::core::state::State;
use std::any::Any;
use std::sync::Arc;

/// Error returned by a failing guard or handler.
///
/// Any such error faults the state machine; the original error is kept in
/// the [`FaultInfo`](crate::FaultInfo) and exposed as the error source.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result returned by entry, exit and transition handlers.
pub type HandlerResult = Result<(), HandlerError>;

/// Stored form of a state or group entry/exit handler.
pub(crate) type StateHandler = Arc<dyn Fn(&StateHandlerInfo<'_>) -> HandlerResult + Send + Sync>;

/// Context passed to entry and exit handlers of states and groups.
pub struct StateHandlerInfo<'a> {
    /// State being exited
    pub from: &'a State,
    /// State being entered
    pub to: &'a State,
    /// Event that triggered the transition
    pub event: &'a EventRef,
    /// Whether this is a forced transition
    pub is_forced: bool,
    pub(crate) data: &'a (dyn Any + Send),
}

impl<'a> StateHandlerInfo<'a> {
    /// The event payload, if the triggering event carried a `T`.
    pub fn data<T: 'static>(&self) -> Option<&'a T> {
        self.data.downcast_ref::<T>()
    }
}
