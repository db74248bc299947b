//! hsm-core: an embeddable hierarchical state machine runtime
//!
//! A host declares states, events and guarded/handled transitions on a
//! [`StateMachine`], then drives it by firing events. Execution is
//! deterministic: at most one transition runs at a time, events fired from
//! inside a handler are queued and drained after the outer transition, and
//! any failing guard or handler moves the machine into a permanent fault
//! until [`StateMachine::reset`] is called.
//!
//! # Core Concepts
//!
//! - **State**: a handle into the machine's arena, with optional entry/exit handlers
//! - **Event**: an identity token, optionally carrying a typed payload
//! - **Transition**: an ordered, optionally guarded edge between two states
//! - **StateGroup**: a set of states whose entry/exit handlers fire on boundary crossing
//! - **Synchronizer**: the host-supplied concurrency discipline around fire/force/reset
//!
//! # Example
//!
//! ```rust
//! use hsm_core::{Event, StateMachine};
//!
//! let machine = StateMachine::new("door");
//! let closed = machine.create_initial_state("Closed").unwrap();
//! let open = machine.create_state("Open");
//!
//! let open_door = Event::new("Open");
//! let close_door = Event::new("Close");
//!
//! closed.transition_on(&open_door).to(&open).unwrap();
//! open.transition_on(&close_door).to(&closed).unwrap();
//!
//! open_door.fire().unwrap();
//! assert_eq!(machine.current_state().unwrap(), open);
//!
//! // No transition for "Open" while already open
//! assert!(open_door.fire().is_err());
//! assert!(!open_door.try_fire().unwrap());
//! ```

pub mod builder;
pub mod core;
pub mod machine;

// Re-export commonly used types
pub use builder::{BuildError, MachineConfig, StateMachineBuilder, TransitionBuilder};
pub use core::{
    DynamicSelectorInfo, DynamicTransition, Event, EventFireMethod, EventRef, EventWithData,
    Guard, HandlerError, HandlerResult, HistoryEntry, HistoryKind, State, StateBehavior,
    StateGroup, StateHandlerInfo, Transition, TransitionCandidate, TransitionDescription,
    TransitionHistory, TransitionInfo, TransitionKindDescription, TypedEvent,
};
pub use machine::{
    EventIgnoredEventArgs, FaultInfo, FaultedComponent, FaultedEventArgs, GroupDescription,
    Invoker, LockSynchronizer, MachineDescription, StateDescription, StateMachine, Synchronizer,
    TransitionError, TransitionEventArgs, TransitionNotFoundEventArgs,
};
