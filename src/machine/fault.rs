//! Fault information captured when a guard or handler fails.

use crate::core::{EventRef, State, StateGroup};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// The part of a transition that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultedComponent {
    Guard,
    DynamicSelector,
    ExitHandler,
    GroupExitHandler,
    TransitionHandler,
    GroupEntryHandler,
    EntryHandler,
}

impl fmt::Display for FaultedComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Guard => "guard",
            Self::DynamicSelector => "dynamic selector",
            Self::ExitHandler => "exit handler",
            Self::GroupExitHandler => "group exit handler",
            Self::TransitionHandler => "transition handler",
            Self::GroupEntryHandler => "group entry handler",
            Self::EntryHandler => "entry handler",
        };
        f.write_str(name)
    }
}

/// Immutable record of the failure that faulted a state machine.
#[derive(Clone, Debug, Error)]
#[error("{}: {error}", self.context())]
pub struct FaultInfo {
    /// Name of the faulted machine
    pub machine: String,
    /// State the transition started from
    pub from: State,
    /// Destination, when it was known at the time of the failure
    pub to: Option<State>,
    pub event: EventRef,
    pub component: FaultedComponent,
    /// Group whose handler failed, for group components
    pub group: Option<StateGroup>,
    /// The original error returned by the failing component
    #[source]
    pub error: Arc<dyn std::error::Error + Send + Sync>,
}

impl FaultInfo {
    /// Where the failure happened, without the underlying error.
    fn context(&self) -> String {
        let mut context = format!(
            "{} failed in state machine '{}' during transition from '{}'",
            self.component, self.machine, self.from
        );
        if let Some(to) = &self.to {
            context.push_str(&format!(" to '{to}'"));
        }
        context.push_str(&format!(" on event '{}'", self.event));
        if let Some(group) = &self.group {
            context.push_str(&format!(" (group '{group}')"));
        }
        context
    }
}
