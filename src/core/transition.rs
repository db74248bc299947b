//! Transitions between states.

use crate::core::event::{EventFireMethod, EventRef};
use crate::core::guard::Guard;
use crate::core::handler::{HandlerError, HandlerResult};
use crate::core::state::{State, StateId};
use crate::machine::ChildStateMachine;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

/// Context passed to guards and transition handlers.
pub struct TransitionInfo<'a, D> {
    pub from: &'a State,
    pub to: &'a State,
    pub event: &'a EventRef,
    /// Payload the event was fired with
    pub data: &'a D,
    pub is_inner: bool,
    pub fire_method: EventFireMethod,
}

/// Context passed to the destination selector of a dynamic transition.
pub struct DynamicSelectorInfo<'a, D> {
    pub from: &'a State,
    pub event: &'a EventRef,
    pub data: &'a D,
    pub fire_method: EventFireMethod,
}

/// Payload-agnostic [`TransitionInfo`], as the engine builds it.
pub(crate) struct RawTransitionInfo<'a> {
    pub(crate) from: &'a State,
    pub(crate) to: &'a State,
    pub(crate) event: &'a EventRef,
    pub(crate) data: &'a (dyn Any + Send),
    pub(crate) is_inner: bool,
    pub(crate) fire_method: EventFireMethod,
}

impl<'a> RawTransitionInfo<'a> {
    pub(crate) fn typed<D: 'static>(&self) -> Result<TransitionInfo<'a, D>, HandlerError> {
        let data = payload::<D>(self.data, self.event)?;
        Ok(TransitionInfo {
            from: self.from,
            to: self.to,
            event: self.event,
            data,
            is_inner: self.is_inner,
            fire_method: self.fire_method,
        })
    }
}

pub(crate) struct RawSelectorInfo<'a> {
    pub(crate) from: &'a State,
    pub(crate) event: &'a EventRef,
    pub(crate) data: &'a (dyn Any + Send),
    pub(crate) fire_method: EventFireMethod,
}

fn payload<'a, D: 'static>(
    data: &'a (dyn Any + Send),
    event: &EventRef,
) -> Result<&'a D, HandlerError> {
    data.downcast_ref::<D>().ok_or_else(|| {
        format!(
            "event '{}' was fired with a payload of an unexpected type",
            event.name()
        )
        .into()
    })
}

pub(crate) type ErasedGuard =
    Arc<dyn Fn(&RawTransitionInfo<'_>) -> Result<bool, HandlerError> + Send + Sync>;

pub(crate) type ErasedHandler = Arc<dyn Fn(&RawTransitionInfo<'_>) -> HandlerResult + Send + Sync>;

pub(crate) type ErasedSelector =
    Arc<dyn Fn(&RawSelectorInfo<'_>) -> Result<Option<State>, HandlerError> + Send + Sync>;

#[derive(Clone)]
pub(crate) enum TransitionKind {
    /// Fixed destination
    Normal(StateId),
    /// Self-transition without exit/entry
    Inner,
    /// Destination computed at fire time
    Dynamic(ErasedSelector),
    /// Matches the event but does nothing
    Ignore,
}

/// Arena record for a transition, stored in its source state's list.
#[derive(Clone)]
pub(crate) struct TransitionRecord {
    pub(crate) event: EventRef,
    pub(crate) kind: TransitionKind,
    pub(crate) guard: Option<ErasedGuard>,
    pub(crate) handler: Option<ErasedHandler>,
}

impl TransitionRecord {
    pub(crate) fn new(event: EventRef, kind: TransitionKind) -> Self {
        Self {
            event,
            kind,
            guard: None,
            handler: None,
        }
    }

    /// Whether resolution can pass over this record to the next candidate.
    pub(crate) fn is_conditional(&self) -> bool {
        self.guard.is_some() || matches!(self.kind, TransitionKind::Dynamic(_))
    }

    pub(crate) fn describe(&self, child: &ChildStateMachine) -> TransitionDescription {
        let (kind, to) = match &self.kind {
            TransitionKind::Normal(to) => (
                TransitionKindDescription::Normal,
                Some(child.state(*to).name.to_string()),
            ),
            TransitionKind::Inner => (TransitionKindDescription::Inner, None),
            TransitionKind::Dynamic(_) => (TransitionKindDescription::Dynamic, None),
            TransitionKind::Ignore => (TransitionKindDescription::Ignored, None),
        };
        TransitionDescription {
            event: self.event.name().to_string(),
            to,
            kind,
            has_guard: self.guard.is_some(),
            has_handler: self.handler.is_some(),
        }
    }
}

/// Shape of a transition, as reported by introspection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionKindDescription {
    Normal,
    Inner,
    Dynamic,
    Ignored,
}

/// Read-only view of a registered transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionDescription {
    pub event: String,
    /// Fixed destination; `None` for inner, dynamic and ignored transitions
    pub to: Option<String>,
    pub kind: TransitionKindDescription,
    pub has_guard: bool,
    pub has_handler: bool,
}

/// A registered transition with a fixed destination (or an inner self-transition).
///
/// Returned by [`TransitionBuilder::to`](crate::TransitionBuilder::to); the
/// guard and handler are attached by chaining on this value.
///
/// # Example
///
/// ```rust
/// use hsm_core::{EventWithData, StateMachine};
///
/// let machine = StateMachine::new("vault");
/// let locked = machine.create_initial_state("Locked").unwrap();
/// let unlocked = machine.create_state("Unlocked");
/// let unlock = EventWithData::<u32>::new("Unlock");
///
/// locked
///     .transition_on(&unlock)
///     .to(&unlocked)
///     .unwrap()
///     .with_guard(|info| *info.data == 1234)
///     .with_handler(|info| {
///         println!("{} -> {}", info.from, info.to);
///         Ok(())
///     });
///
/// assert!(!unlock.try_fire(1111).unwrap());
/// assert!(unlock.try_fire(1234).unwrap());
/// ```
pub struct Transition<D> {
    from: State,
    to: State,
    event: EventRef,
    index: usize,
    is_inner: bool,
    _payload: PhantomData<fn(D)>,
}

impl<D: Send + 'static> Transition<D> {
    pub(crate) fn new(from: State, to: State, event: EventRef, index: usize, is_inner: bool) -> Self {
        Self {
            from,
            to,
            event,
            index,
            is_inner,
            _payload: PhantomData,
        }
    }

    pub fn from(&self) -> &State {
        &self.from
    }

    pub fn to(&self) -> &State {
        &self.to
    }

    pub fn event(&self) -> &EventRef {
        &self.event
    }

    pub fn is_inner(&self) -> bool {
        self.is_inner
    }

    /// Only take this transition when `predicate` holds.
    pub fn with_guard<F>(self, predicate: F) -> Self
    where
        F: Fn(&TransitionInfo<'_, D>) -> bool + Send + Sync + 'static,
    {
        self.guarded_by(Guard::new(predicate))
    }

    /// Like [`with_guard`](Self::with_guard), for predicates that can fail.
    /// A failing predicate faults the machine.
    pub fn with_fallible_guard<F>(self, predicate: F) -> Self
    where
        F: Fn(&TransitionInfo<'_, D>) -> Result<bool, HandlerError> + Send + Sync + 'static,
    {
        self.guarded_by(Guard::fallible(predicate))
    }

    /// Attach a prebuilt [`Guard`], replacing any previous one.
    pub fn guarded_by(self, guard: Guard<D>) -> Self {
        let guard = guard.erase();
        update_record(&self.from, self.index, move |record| {
            record.guard = Some(guard)
        });
        self
    }

    /// Run `handler` between the exit of the source and the entry of the destination.
    pub fn with_handler<F>(self, handler: F) -> Self
    where
        F: Fn(&TransitionInfo<'_, D>) -> HandlerResult + Send + Sync + 'static,
    {
        let handler: ErasedHandler = Arc::new(move |raw: &RawTransitionInfo<'_>| {
            let info = raw.typed::<D>()?;
            handler(&info)
        });
        update_record(&self.from, self.index, move |record| {
            record.handler = Some(handler)
        });
        self
    }
}

/// A registered transition whose destination is chosen at fire time.
pub struct DynamicTransition<D> {
    from: State,
    event: EventRef,
    index: usize,
    _payload: PhantomData<fn(D)>,
}

impl<D: Send + 'static> DynamicTransition<D> {
    pub(crate) fn new(from: State, event: EventRef, index: usize) -> Self {
        Self {
            from,
            event,
            index,
            _payload: PhantomData,
        }
    }

    pub fn from(&self) -> &State {
        &self.from
    }

    pub fn event(&self) -> &EventRef {
        &self.event
    }

    /// Run `handler` between the exit of the source and the entry of the
    /// selected destination.
    pub fn with_handler<F>(self, handler: F) -> Self
    where
        F: Fn(&TransitionInfo<'_, D>) -> HandlerResult + Send + Sync + 'static,
    {
        let handler: ErasedHandler = Arc::new(move |raw: &RawTransitionInfo<'_>| {
            let info = raw.typed::<D>()?;
            handler(&info)
        });
        update_record(&self.from, self.index, move |record| {
            record.handler = Some(handler)
        });
        self
    }
}

pub(crate) fn erase_selector<D, F>(selector: F) -> ErasedSelector
where
    D: Send + 'static,
    F: Fn(&DynamicSelectorInfo<'_, D>) -> Option<State> + Send + Sync + 'static,
{
    Arc::new(move |raw: &RawSelectorInfo<'_>| {
        let data = payload::<D>(raw.data, raw.event)?;
        Ok(selector(&DynamicSelectorInfo {
            from: raw.from,
            event: raw.event,
            data,
            fire_method: raw.fire_method,
        }))
    })
}

fn update_record(from: &State, index: usize, update: impl FnOnce(&mut TransitionRecord)) {
    if let Some(machine) = from.machine() {
        let mut inner = machine.inner.lock();
        if let Some(record) = inner.child.state_mut(from.id()).transitions.get_mut(index) {
            update(record);
        }
    }
}
