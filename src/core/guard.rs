//! Guard predicates for controlling transitions.
//!
//! A guard decides whether a candidate transition is taken. Guards are
//! evaluated in registration order; the first passing candidate wins. A
//! guard that fails (returns an error) faults the whole machine.

use crate::core::handler::HandlerError;
use crate::core::transition::{ErasedGuard, RawTransitionInfo, TransitionInfo};
use std::sync::Arc;

type Predicate<D> =
    Arc<dyn Fn(&TransitionInfo<'_, D>) -> Result<bool, HandlerError> + Send + Sync>;

/// Predicate that determines if a transition can execute.
///
/// Usually created implicitly through
/// [`Transition::with_guard`](crate::Transition::with_guard); build one
/// directly to share a predicate between several transitions.
///
/// # Example
///
/// ```rust
/// use hsm_core::{EventWithData, Guard, StateMachine, TransitionInfo};
///
/// let machine = StateMachine::new("thermostat");
/// let idle = machine.create_initial_state("Idle").unwrap();
/// let heating = machine.create_state("Heating");
/// let reading = EventWithData::<i32>::new("Reading");
///
/// let too_cold = Guard::new(|info: &TransitionInfo<'_, i32>| *info.data < 18);
///
/// idle.transition_on(&reading)
///     .to(&heating)
///     .unwrap()
///     .guarded_by(too_cold.clone());
///
/// assert!(!reading.try_fire(21).unwrap());
/// assert!(reading.try_fire(12).unwrap());
/// ```
pub struct Guard<D> {
    predicate: Predicate<D>,
}

impl<D: Send + 'static> Guard<D> {
    /// Create a guard from an infallible predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&TransitionInfo<'_, D>) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(move |info: &TransitionInfo<'_, D>| Ok(predicate(info))),
        }
    }

    /// Create a guard from a predicate that can fail.
    pub fn fallible<F>(predicate: F) -> Self
    where
        F: Fn(&TransitionInfo<'_, D>) -> Result<bool, HandlerError> + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
        }
    }

    /// Evaluate the guard against a transition context.
    pub fn check(&self, info: &TransitionInfo<'_, D>) -> Result<bool, HandlerError> {
        (self.predicate)(info)
    }

    pub(crate) fn erase(self) -> ErasedGuard {
        let predicate = self.predicate;
        Arc::new(move |raw: &RawTransitionInfo<'_>| {
            let info = raw.typed::<D>()?;
            predicate(&info)
        })
    }
}

impl<D> Clone for Guard<D> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}
