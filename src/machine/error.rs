//! Errors raised while firing events, forcing transitions or reading state.

use crate::machine::fault::FaultInfo;
use thiserror::Error;

/// Run-time errors of a state machine.
#[derive(Debug, Clone, Error)]
pub enum TransitionError {
    /// No transition, guard pass or ignore matched the event (Fire mode only)
    #[error("No transition from state '{from}' on event '{event}' in state machine '{machine}'")]
    TransitionNotFound {
        machine: String,
        from: String,
        event: String,
    },

    /// A guard or handler failed; the machine is now faulted
    #[error("Transition failed: {0}")]
    TransitionFailed(#[source] FaultInfo),

    /// The machine was already faulted; nothing was executed
    #[error("State machine '{machine}' is faulted: {fault}")]
    MachineFaulted { machine: String, fault: FaultInfo },

    #[error("State machine '{machine}' has no initial state")]
    NoInitialState { machine: String },

    #[error("State '{state}' does not belong to state machine '{machine}'")]
    InvalidState { machine: String, state: String },

    #[error("Event '{event}' is not used by any state machine")]
    UnboundEvent { event: String },

    #[error("State machine '{machine}' has been dropped")]
    MachineDropped { machine: String },
}

impl TransitionError {
    /// The fault behind this error, for failed or faulted machines.
    pub fn fault(&self) -> Option<&FaultInfo> {
        match self {
            Self::TransitionFailed(fault) | Self::MachineFaulted { fault, .. } => Some(fault),
            _ => None,
        }
    }
}
