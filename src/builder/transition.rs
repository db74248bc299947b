//! Builder for declaring transitions.

use crate::builder::error::BuildError;
use crate::core::{
    DynamicSelectorInfo, DynamicTransition, EventRef, State, Transition, TransitionKind,
    TransitionRecord,
};
use std::marker::PhantomData;

/// Pending transition from a state on an event.
///
/// Consumed by exactly one of [`to`](Self::to),
/// [`to_inner_self`](Self::to_inner_self) or
/// [`to_dynamic`](Self::to_dynamic), which append the transition to the
/// source state's list.
pub struct TransitionBuilder<'a, D> {
    from: &'a State,
    event: EventRef,
    _payload: PhantomData<fn(D)>,
}

impl<'a, D: Send + 'static> TransitionBuilder<'a, D> {
    pub(crate) fn new(from: &'a State, event: EventRef) -> Self {
        Self {
            from,
            event,
            _payload: PhantomData,
        }
    }

    /// Finish with a fixed destination. `to` may equal the source, in which
    /// case exit and entry handlers still run.
    pub fn to(self, to: &State) -> Result<Transition<D>, BuildError> {
        if to.machine_id() != self.from.machine_id() {
            return Err(BuildError::InvalidStateTransition {
                from: self.from.name().to_string(),
                to: to.name().to_string(),
            });
        }
        let record = TransitionRecord::new(self.event.clone(), TransitionKind::Normal(to.id()));
        let index = self.from.register(record)?;
        Ok(Transition::new(
            self.from.clone(),
            to.clone(),
            self.event,
            index,
            false,
        ))
    }

    /// Finish as an inner self-transition: only the transition handler runs.
    pub fn to_inner_self(self) -> Result<Transition<D>, BuildError> {
        let record = TransitionRecord::new(self.event.clone(), TransitionKind::Inner);
        let index = self.from.register(record)?;
        Ok(Transition::new(
            self.from.clone(),
            self.from.clone(),
            self.event,
            index,
            true,
        ))
    }

    /// Finish with a destination chosen when the event fires.
    ///
    /// Returning `None` from `selector` rejects this candidate and
    /// resolution moves on to the next registered transition.
    pub fn to_dynamic<F>(self, selector: F) -> Result<DynamicTransition<D>, BuildError>
    where
        F: Fn(&DynamicSelectorInfo<'_, D>) -> Option<State> + Send + Sync + 'static,
    {
        let selector = crate::core::erase_selector(selector);
        let record = TransitionRecord::new(self.event.clone(), TransitionKind::Dynamic(selector));
        let index = self.from.register(record)?;
        Ok(DynamicTransition::new(self.from.clone(), self.event, index))
    }
}
