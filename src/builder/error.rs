//! Configuration errors raised while declaring states, events and transitions.

use thiserror::Error;

/// Errors reported synchronously at the declaration call site.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("Initial state already set to '{existing}'")]
    InitialStateAlreadySet { existing: String },

    #[error("Event '{event}' is bound to state machine '{bound}' and cannot be used in '{machine}'")]
    InvalidEventTransition {
        event: String,
        bound: String,
        machine: String,
    },

    #[error("Cannot transition from '{from}' to '{to}': the states belong to different state machines")]
    InvalidStateTransition { from: String, to: String },

    #[error("State '{state}' already has an unconditional transition on event '{event}'; no further transitions or ignores can follow it")]
    UnconditionalTransitionNotLast { state: String, event: String },

    #[error("State '{state}' cannot join group '{group}': they belong to different state machines")]
    InvalidGroup { group: String, state: String },

    #[error("The owning state machine has been dropped")]
    MachineDropped,
}
