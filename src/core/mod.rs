//! Core state machine model.
//!
//! This module contains the declarative model the engine operates on:
//! - Events, with or without a typed payload
//! - States and their entry/exit handlers and behaviors
//! - State groups
//! - Transitions, their guards and handlers
//! - Bounded transition history
//!
//! Every handle in here is a lightweight reference into the arena owned by
//! a [`StateMachine`](crate::StateMachine); none of them owns the machine.

mod event;
mod group;
mod guard;
mod handler;
mod history;
mod state;
mod transition;

pub use event::{Event, EventFireMethod, EventRef, EventWithData, TypedEvent};
pub use group::StateGroup;
pub use guard::Guard;
pub use handler::{HandlerError, HandlerResult, StateHandlerInfo};
pub use history::{HistoryEntry, HistoryKind, TransitionHistory};
pub use state::{State, StateBehavior, TransitionCandidate};
pub use transition::{
    DynamicSelectorInfo, DynamicTransition, Transition, TransitionDescription, TransitionInfo,
    TransitionKindDescription,
};

pub(crate) use event::Payload;
pub(crate) use group::{GroupId, GroupRecord};
pub(crate) use handler::StateHandler;
pub(crate) use state::{StateId, StateRecord};
pub(crate) use transition::{
    erase_selector, ErasedGuard, ErasedHandler, ErasedSelector, RawSelectorInfo,
    RawTransitionInfo, TransitionKind, TransitionRecord,
};
