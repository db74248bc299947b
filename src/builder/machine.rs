//! Builder and configuration for root state machines.

use crate::machine::{StateMachine, Synchronizer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn default_history_capacity() -> usize {
    64
}

/// Serializable machine settings.
///
/// Hosts can load this from any serde format and hand it to
/// [`StateMachineBuilder::from_config`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Display name of the machine
    pub name: String,

    /// Number of completed transitions kept in the history (0 disables it)
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl MachineConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            history_capacity: default_history_capacity(),
        }
    }
}

/// Builder for constructing state machines with a fluent API.
///
/// # Example
///
/// ```rust
/// use hsm_core::{LockSynchronizer, StateMachineBuilder};
/// use std::sync::Arc;
///
/// let machine = StateMachineBuilder::new("worker")
///     .history_capacity(16)
///     .synchronizer(Arc::new(LockSynchronizer::new()))
///     .build();
///
/// assert_eq!(machine.name(), "worker");
/// ```
pub struct StateMachineBuilder {
    config: MachineConfig,
    synchronizer: Option<Arc<dyn Synchronizer>>,
}

impl StateMachineBuilder {
    /// Create a new builder with default settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_config(MachineConfig::new(name))
    }

    /// Create a builder from loaded settings.
    pub fn from_config(config: MachineConfig) -> Self {
        Self {
            config,
            synchronizer: None,
        }
    }

    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.config.history_capacity = capacity;
        self
    }

    /// Set the synchronizer wrapping fire, force-transition and reset.
    pub fn synchronizer(mut self, synchronizer: Arc<dyn Synchronizer>) -> Self {
        self.synchronizer = Some(synchronizer);
        self
    }

    /// Build the state machine.
    pub fn build(self) -> StateMachine {
        StateMachine::from_parts(self.config, self.synchronizer)
    }
}
