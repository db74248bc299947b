//! Builder API for declaring state machines.
//!
//! [`TransitionBuilder`] is returned by
//! [`State::transition_on`](crate::State::transition_on) and finalized into
//! an append-only transition record. [`StateMachineBuilder`] is the
//! configuration layer for creating the root machine itself.

pub mod error;
pub mod machine;
pub mod transition;

pub use error::BuildError;
pub use machine::{MachineConfig, StateMachineBuilder};
pub use transition::TransitionBuilder;
