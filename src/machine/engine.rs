//! Transition execution: resolution, hierarchical coordination, the
//! re-entrant queue and fault capture.
//!
//! Every entry point follows the same shape. The machine lock is taken only
//! to read or update the arena and is always released before user code
//! (guards, handlers, behaviors, listeners) runs, so handlers are free to
//! fire events, declare transitions or query the machine.
//!
//! A panic in a guard, selector, handler or behavior hook is captured and
//! recorded as a fault of that component. Panics elsewhere (listeners,
//! `can_transition`) unwind to the caller, and the machine is released for
//! the next call.

use crate::core::{
    ErasedGuard, ErasedHandler, ErasedSelector, EventFireMethod, EventRef, HandlerError,
    HistoryEntry, HistoryKind, Payload, RawSelectorInfo, RawTransitionInfo, State, StateBehavior,
    StateGroup, StateHandler, StateHandlerInfo, StateId, TransitionCandidate, TransitionKind,
};
use crate::machine::fault::{FaultInfo, FaultedComponent};
use crate::machine::observer::{
    notify, EventIgnoredEventArgs, FaultedEventArgs, Listeners, Observers, TransitionEventArgs,
    TransitionNotFoundEventArgs,
};
use crate::machine::{MachineInner, MachineShared, Synchronizer, TransitionError};
use chrono::Utc;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, trace, warn};

/// A fire or forced transition waiting for the machine.
pub(crate) enum TransitionRequest {
    Fire {
        event: EventRef,
        data: Payload,
        method: EventFireMethod,
    },
    Force {
        to: State,
        event: EventRef,
        data: Payload,
    },
}

impl TransitionRequest {
    fn event(&self) -> &EventRef {
        match self {
            Self::Fire { event, .. } | Self::Force { event, .. } => event,
        }
    }
}

/// What a candidate leads to, resolved under the lock.
enum Target {
    Fixed { to: State, is_inner: bool },
    Dynamic(ErasedSelector),
    Ignore,
}

struct Candidate {
    target: Target,
    guard: Option<ErasedGuard>,
    handler: Option<ErasedHandler>,
}

/// A resolved transition about to be coordinated.
struct Step<'a> {
    from: State,
    to: State,
    event: &'a EventRef,
    data: &'a (dyn Any + Send),
    /// `None` for forced transitions
    fire_method: Option<EventFireMethod>,
    is_inner: bool,
}

impl Step<'_> {
    fn handler_info(&self) -> StateHandlerInfo<'_> {
        StateHandlerInfo {
            from: &self.from,
            to: &self.to,
            event: self.event,
            is_forced: self.fire_method.is_none(),
            data: self.data,
        }
    }

    fn event_args(&self, machine: &str) -> TransitionEventArgs {
        TransitionEventArgs {
            machine: machine.to_string(),
            from: self.from.clone(),
            to: self.to.clone(),
            event: self.event.clone(),
            fire_method: self.fire_method,
            is_inner: self.is_inner,
        }
    }
}

/// Handlers involved in one coordination, copied out of the arena.
struct Plan {
    exit_behavior: Option<Arc<dyn StateBehavior>>,
    exit: Option<StateHandler>,
    leaving: Vec<(StateGroup, Option<StateHandler>)>,
    entering: Vec<(StateGroup, Option<StateHandler>)>,
    entry_behavior: Option<Arc<dyn StateBehavior>>,
    entry: Option<StateHandler>,
}

fn is_current_thread(inner: &MachineInner) -> bool {
    inner.executing == Some(thread::current().id())
}

/// Runs a user callback, turning a panic into a handler error.
fn contain<T>(callback: impl FnOnce() -> Result<T, HandlerError>) -> Result<T, HandlerError> {
    panic::catch_unwind(AssertUnwindSafe(callback)).unwrap_or_else(|payload| {
        Err(format!("panicked: {}", panic_message(payload.as_ref())).into())
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic payload of unknown type".to_string())
}

/// Held by the thread running the outermost transition. Dropping it while
/// the slot is still owned (error return or unwind) discards queued work,
/// applies a deferred reset and frees the slot.
struct ExecutionSlot<'a> {
    shared: &'a MachineShared,
}

impl Drop for ExecutionSlot<'_> {
    fn drop(&mut self) {
        let mut inner = self.shared.inner.lock();
        if !is_current_thread(&inner) {
            return;
        }
        if thread::panicking() {
            warn!(
                machine = %self.shared.name,
                discarded = inner.queue.len(),
                "transition unwound, releasing the machine"
            );
        }
        inner.queue.clear();
        if inner.reset_pending {
            self.shared.apply_reset(&mut inner);
        }
        inner.executing = None;
    }
}

impl MachineShared {
    pub(crate) fn fire(
        &self,
        event: EventRef,
        data: Payload,
        method: EventFireMethod,
    ) -> Result<bool, TransitionError> {
        let request = TransitionRequest::Fire {
            event,
            data,
            method,
        };
        let Some(request) = self.enqueue_nested(request)? else {
            return Ok(true);
        };
        match self.synchronizer() {
            Some(synchronizer) => {
                synchronizer.fire_event(method, Box::new(move || self.run_outermost(request)))
            }
            None => self.run_outermost(request),
        }
    }

    pub(crate) fn force(
        &self,
        to: &State,
        event: EventRef,
        data: Payload,
    ) -> Result<(), TransitionError> {
        if to.machine_id() != self.id {
            return Err(TransitionError::InvalidState {
                machine: self.name.clone(),
                state: to.name().to_string(),
            });
        }
        let request = TransitionRequest::Force {
            to: to.clone(),
            event,
            data,
        };
        let Some(request) = self.enqueue_nested(request)? else {
            return Ok(());
        };
        let run = move || self.run_outermost(request).map(|_| ());
        match self.synchronizer() {
            Some(synchronizer) => synchronizer.force_transition(Box::new(run)),
            None => run(),
        }
    }

    pub(crate) fn reset(&self) {
        {
            let mut inner = self.inner.lock();
            if is_current_thread(&inner) {
                debug!(machine = %self.name, "reset requested during a transition, deferring");
                inner.queue.clear();
                inner.reset_pending = true;
                return;
            }
        }
        let run = || self.reset_now();
        match self.synchronizer() {
            Some(synchronizer) => synchronizer.reset(Box::new(run)),
            None => run(),
        }
    }

    fn reset_now(&self) {
        let mut inner = self.inner.lock();
        inner.queue.clear();
        inner.executing = None;
        self.apply_reset(&mut inner);
    }

    fn apply_reset(&self, inner: &mut MachineInner) {
        inner.fault = None;
        inner.reset_pending = false;
        inner.history.clear();
        inner.child.reset();
        info!(machine = %self.name, "state machine reset");
    }

    fn synchronizer(&self) -> Option<Arc<dyn Synchronizer>> {
        self.synchronizer.read().clone()
    }

    /// Fails when the machine cannot accept work, otherwise the current state.
    pub(crate) fn ready(&self, inner: &MachineInner) -> Result<StateId, TransitionError> {
        if let Some(fault) = &inner.fault {
            return Err(TransitionError::MachineFaulted {
                machine: self.name.clone(),
                fault: fault.clone(),
            });
        }
        inner
            .child
            .current()
            .ok_or_else(|| TransitionError::NoInitialState {
                machine: self.name.clone(),
            })
    }

    /// Queues `request` when called from inside a running transition on
    /// this thread. Returns the request back when it must run now.
    fn enqueue_nested(
        &self,
        request: TransitionRequest,
    ) -> Result<Option<TransitionRequest>, TransitionError> {
        let mut inner = self.inner.lock();
        self.ready(&inner)?;
        if is_current_thread(&inner) {
            debug!(
                machine = %self.name,
                event = %request.event(),
                queued = inner.queue.len() + 1,
                "queueing request fired during a transition"
            );
            inner.queue.push_back(request);
            return Ok(None);
        }
        Ok(Some(request))
    }

    fn run_outermost(&self, request: TransitionRequest) -> Result<bool, TransitionError> {
        {
            let mut inner = self.inner.lock();
            self.ready(&inner)?;
            if inner.executing.is_some() {
                // Another thread is mid-transition and no synchronizer
                // serializes callers; hand the request to that thread.
                inner.queue.push_back(request);
                return Ok(true);
            }
            inner.executing = Some(thread::current().id());
        }

        let _slot = ExecutionSlot { shared: self };
        self.execute(request)
            .and_then(|found| self.drain_queue().map(|()| found))
    }

    fn drain_queue(&self) -> Result<(), TransitionError> {
        loop {
            let request = {
                let mut inner = self.inner.lock();
                if inner.reset_pending {
                    self.apply_reset(&mut inner);
                }
                match inner.queue.pop_front() {
                    Some(request) => request,
                    None => {
                        inner.executing = None;
                        return Ok(());
                    }
                }
            };
            trace!(machine = %self.name, event = %request.event(), "draining queued request");
            self.execute(request)?;
        }
    }

    fn execute(&self, request: TransitionRequest) -> Result<bool, TransitionError> {
        match request {
            TransitionRequest::Fire {
                event,
                data,
                method,
            } => self.execute_fire(&event, &*data, method),
            TransitionRequest::Force { to, event, data } => {
                self.execute_force(to, &event, &*data).map(|()| true)
            }
        }
    }

    fn execute_fire(
        &self,
        event: &EventRef,
        data: &(dyn Any + Send),
        method: EventFireMethod,
    ) -> Result<bool, TransitionError> {
        let (from, behavior, candidates) = {
            let inner = self.inner.lock();
            let current = self.ready(&inner)?;
            let child = &inner.child;
            let candidates: Vec<Candidate> = child
                .candidates(current, event.id())
                .into_iter()
                .map(|record| {
                    let target = match record.kind {
                        TransitionKind::Normal(to) => Target::Fixed {
                            to: self.state_handle(child, to),
                            is_inner: false,
                        },
                        TransitionKind::Inner => Target::Fixed {
                            to: self.state_handle(child, current),
                            is_inner: true,
                        },
                        TransitionKind::Dynamic(selector) => Target::Dynamic(selector),
                        TransitionKind::Ignore => Target::Ignore,
                    };
                    Candidate {
                        target,
                        guard: record.guard,
                        handler: record.handler,
                    }
                })
                .collect();
            (
                self.state_handle(child, current),
                child.state(current).behavior.clone(),
                candidates,
            )
        };

        for candidate in candidates {
            if let Some(behavior) = &behavior {
                let to = match &candidate.target {
                    Target::Fixed { to, .. } => Some(to),
                    _ => None,
                };
                let candidate_info = TransitionCandidate {
                    from: &from,
                    to,
                    event,
                    fire_method: method,
                };
                if !behavior.can_transition(&candidate_info) {
                    trace!(machine = %self.name, from = %from, event = %event, "candidate rejected by state behavior");
                    continue;
                }
            }

            let (to, is_inner) = match candidate.target {
                Target::Ignore => {
                    debug!(machine = %self.name, state = %from, event = %event, "event ignored");
                    let args = EventIgnoredEventArgs {
                        machine: self.name.clone(),
                        state: from,
                        event: event.clone(),
                        fire_method: method,
                    };
                    self.emit(|o| &o.event_ignored, &args);
                    return Ok(true);
                }
                Target::Fixed { to, is_inner } => {
                    if let Some(guard) = &candidate.guard {
                        let raw = RawTransitionInfo {
                            from: &from,
                            to: &to,
                            event,
                            data,
                            is_inner,
                            fire_method: method,
                        };
                        match contain(|| guard(&raw)) {
                            Ok(true) => {}
                            Ok(false) => {
                                trace!(machine = %self.name, from = %from, to = %to, event = %event, "guard rejected transition");
                                continue;
                            }
                            Err(err) => {
                                return Err(self.fault(
                                    &from,
                                    Some(&to),
                                    event,
                                    FaultedComponent::Guard,
                                    None,
                                    err,
                                ))
                            }
                        }
                    }
                    (to, is_inner)
                }
                Target::Dynamic(selector) => {
                    let raw = RawSelectorInfo {
                        from: &from,
                        event,
                        data,
                        fire_method: method,
                    };
                    match contain(|| selector(&raw)) {
                        Ok(Some(to)) if to.machine_id() == self.id => (to, false),
                        Ok(Some(foreign)) => {
                            let err: HandlerError = format!(
                                "selector returned state '{foreign}' of another state machine"
                            )
                            .into();
                            return Err(self.fault(
                                &from,
                                None,
                                event,
                                FaultedComponent::DynamicSelector,
                                None,
                                err,
                            ));
                        }
                        Ok(None) => {
                            trace!(machine = %self.name, from = %from, event = %event, "dynamic transition selected no destination");
                            continue;
                        }
                        Err(err) => {
                            return Err(self.fault(
                                &from,
                                None,
                                event,
                                FaultedComponent::DynamicSelector,
                                None,
                                err,
                            ))
                        }
                    }
                }
            };

            let step = Step {
                from,
                to,
                event,
                data,
                fire_method: Some(method),
                is_inner,
            };
            self.coordinate(&step, candidate.handler.as_ref())?;
            return Ok(true);
        }

        let args = TransitionNotFoundEventArgs {
            machine: self.name.clone(),
            from: from.clone(),
            event: event.clone(),
            fire_method: method,
        };
        self.emit(|o| &o.transition_not_found, &args);

        match method {
            EventFireMethod::Fire => {
                warn!(machine = %self.name, from = %from, event = %event, "no transition found");
                Err(TransitionError::TransitionNotFound {
                    machine: self.name.clone(),
                    from: from.name().to_string(),
                    event: event.name().to_string(),
                })
            }
            EventFireMethod::TryFire => {
                debug!(machine = %self.name, from = %from, event = %event, "no transition found");
                Ok(false)
            }
        }
    }

    fn execute_force(
        &self,
        to: State,
        event: &EventRef,
        data: &(dyn Any + Send),
    ) -> Result<(), TransitionError> {
        let from = {
            let inner = self.inner.lock();
            let current = self.ready(&inner)?;
            if current == to.id() {
                debug!(machine = %self.name, state = %to, "already in forced state");
                return Ok(());
            }
            self.state_handle(&inner.child, current)
        };
        let step = Step {
            from,
            to,
            event,
            data,
            fire_method: None,
            is_inner: false,
        };
        self.coordinate(&step, None)
    }

    fn plan(&self, step: &Step<'_>) -> Plan {
        let inner = self.inner.lock();
        let child = &inner.child;
        let from = child.state(step.from.id());
        let to = child.state(step.to.id());

        let leaving = from
            .groups
            .iter()
            .rev()
            .filter(|group| !to.groups.contains(*group))
            .map(|&group| (self.group_handle(child, group), child.group(group).exit.clone()))
            .collect();
        let entering = to
            .groups
            .iter()
            .filter(|group| !from.groups.contains(*group))
            .map(|&group| (self.group_handle(child, group), child.group(group).entry.clone()))
            .collect();

        Plan {
            exit_behavior: from.behavior.clone(),
            exit: from.exit.clone(),
            leaving,
            entering,
            entry_behavior: to.behavior.clone(),
            entry: to.entry.clone(),
        }
    }

    fn coordinate(
        &self,
        step: &Step<'_>,
        handler: Option<&ErasedHandler>,
    ) -> Result<(), TransitionError> {
        let args = step.event_args(&self.name);
        self.emit(|o| &o.transition, &args);

        let plan = self.plan(step);
        let info = step.handler_info();
        let fail = |component, group, err| {
            self.fault(&step.from, Some(&step.to), step.event, component, group, err)
        };

        if !step.is_inner {
            if let Some(behavior) = &plan.exit_behavior {
                contain(|| behavior.on_exit(&info))
                    .map_err(|err| fail(FaultedComponent::ExitHandler, None, err))?;
            }
            if let Some(exit) = &plan.exit {
                contain(|| exit(&info))
                    .map_err(|err| fail(FaultedComponent::ExitHandler, None, err))?;
            }
            for (group, exit) in &plan.leaving {
                if let Some(exit) = exit {
                    contain(|| exit(&info)).map_err(|err| {
                        fail(FaultedComponent::GroupExitHandler, Some(group.clone()), err)
                    })?;
                }
            }
        }

        if let Some(handler) = handler {
            let raw = RawTransitionInfo {
                from: &step.from,
                to: &step.to,
                event: step.event,
                data: step.data,
                is_inner: step.is_inner,
                fire_method: step.fire_method.unwrap_or(EventFireMethod::Fire),
            };
            contain(|| handler(&raw))
                .map_err(|err| fail(FaultedComponent::TransitionHandler, None, err))?;
        }

        self.inner.lock().child.set_current(step.to.id());

        if !step.is_inner {
            for (group, entry) in &plan.entering {
                if let Some(entry) = entry {
                    contain(|| entry(&info)).map_err(|err| {
                        fail(FaultedComponent::GroupEntryHandler, Some(group.clone()), err)
                    })?;
                }
            }
            if let Some(behavior) = &plan.entry_behavior {
                contain(|| behavior.on_entry(&info))
                    .map_err(|err| fail(FaultedComponent::EntryHandler, None, err))?;
            }
            if let Some(entry) = &plan.entry {
                contain(|| entry(&info))
                    .map_err(|err| fail(FaultedComponent::EntryHandler, None, err))?;
            }
        }

        let kind = match (step.fire_method, step.is_inner) {
            (None, _) => HistoryKind::Forced,
            (Some(_), true) => HistoryKind::Inner,
            (Some(_), false) => HistoryKind::Fired,
        };
        self.inner.lock().history.record(HistoryEntry {
            from: step.from.name().to_string(),
            to: step.to.name().to_string(),
            event: step.event.name().to_string(),
            kind,
            timestamp: Utc::now(),
        });
        debug!(
            machine = %self.name,
            from = %step.from,
            to = %step.to,
            event = %step.event,
            kind = ?kind,
            "transition completed"
        );

        self.emit(|o| &o.transition_finished, &args);
        Ok(())
    }

    /// Records the fault, rolls the current state back to `from`, discards
    /// queued work and notifies listeners.
    fn fault(
        &self,
        from: &State,
        to: Option<&State>,
        event: &EventRef,
        component: FaultedComponent,
        group: Option<StateGroup>,
        err: HandlerError,
    ) -> TransitionError {
        let fault = FaultInfo {
            machine: self.name.clone(),
            from: from.clone(),
            to: to.cloned(),
            event: event.clone(),
            component,
            group,
            error: Arc::from(err),
        };
        {
            let mut inner = self.inner.lock();
            inner.child.set_current(from.id());
            inner.queue.clear();
            inner.fault = Some(fault.clone());
        }
        error!(
            machine = %self.name,
            from = %from,
            event = %event,
            component = %component,
            error = %fault.error,
            "state machine faulted"
        );

        let args = FaultedEventArgs {
            fault: fault.clone(),
        };
        self.emit(|o| &o.faulted, &args);
        TransitionError::TransitionFailed(fault)
    }

    fn emit<T>(&self, select: fn(&Observers) -> &Listeners<T>, args: &T) {
        let listeners = select(&self.observers.read()).snapshot();
        notify(listeners, args);
    }
}
