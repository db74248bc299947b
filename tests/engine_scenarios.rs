//! End-to-end scenarios for resolution, coordination, faults and the
//! re-entrant queue.

use hsm_core::{
    Event, EventFireMethod, EventWithData, FaultedComponent, HandlerResult, Invoker,
    LockSynchronizer, State, StateBehavior, StateHandlerInfo, StateMachine, StateMachineBuilder,
    Synchronizer, TransitionCandidate, TransitionError,
};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

type Log = Arc<Mutex<Vec<String>>>;

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Registers entry and exit handlers on `state` that append
/// `"<state>.Entry"` / `"<state>.Exit"` to `log`.
fn trace_state(state: &State, log: &Log) {
    let (entry, exit) = (log.clone(), log.clone());
    let (entry_name, exit_name) = (state.name().to_string(), state.name().to_string());
    state
        .with_entry(move |_| {
            entry.lock().unwrap().push(format!("{entry_name}.Entry"));
            Ok(())
        })
        .with_exit(move |_| {
            exit.lock().unwrap().push(format!("{exit_name}.Exit"));
            Ok(())
        });
}

#[test]
fn start_moves_idle_to_running() {
    let machine = StateMachine::new("scenario");
    let idle = machine.create_initial_state("Idle").unwrap();
    let running = machine.create_state("Running");
    let _faulted = machine.create_state("Faulted-test");
    let start = Event::new("Start");
    let observed = log();

    idle.transition_on(&start).to(&running).unwrap();
    let exit = observed.clone();
    idle.with_exit(move |_| {
        exit.lock().unwrap().push("Idle.Exit".to_string());
        Ok(())
    });
    let entry = observed.clone();
    running.with_entry(move |_| {
        entry.lock().unwrap().push("Running.Entry".to_string());
        Ok(())
    });

    start.fire().unwrap();

    assert_eq!(machine.current_state().unwrap(), running);
    assert_eq!(entries(&observed), vec!["Idle.Exit", "Running.Entry"]);

    let err = start.fire().unwrap_err();
    assert!(matches!(err, TransitionError::TransitionNotFound { .. }));
    assert_eq!(
        err.to_string(),
        "No transition from state 'Running' on event 'Start' in state machine 'scenario'"
    );
    assert!(!start.try_fire().unwrap());
    assert_eq!(machine.current_state().unwrap(), running);
    assert!(!machine.is_faulted());
}

#[test]
fn first_passing_guard_is_selected() {
    let machine = StateMachine::new("p1");
    let start = machine.create_initial_state("Start").unwrap();
    let targets: Vec<State> = (1..=4)
        .map(|i| machine.create_state(format!("T{i}")))
        .collect();
    let go = Event::new("Go");

    start.transition_on(&go).to(&targets[0]).unwrap().with_guard(|_| false);
    start.transition_on(&go).to(&targets[1]).unwrap().with_guard(|_| false);
    start.transition_on(&go).to(&targets[2]).unwrap().with_guard(|_| true);
    start.transition_on(&go).to(&targets[3]).unwrap();

    go.fire().unwrap();

    assert_eq!(machine.current_state().unwrap(), targets[2]);
}

#[test]
fn group_handlers_fire_only_on_boundary_crossing() {
    let machine = StateMachine::new("p3");
    let outside = machine.create_initial_state("Outside").unwrap();
    let first = machine.create_state("First");
    let second = machine.create_state("Second");
    let group = machine.create_group("Active");
    let next = Event::new("Next");
    let observed = log();

    group.add_states([&first, &second]).unwrap();
    for state in [&outside, &first, &second] {
        trace_state(state, &observed);
    }
    let (entry, exit) = (observed.clone(), observed.clone());
    group
        .with_entry(move |_| {
            entry.lock().unwrap().push("Active.Entry".to_string());
            Ok(())
        })
        .with_exit(move |_| {
            exit.lock().unwrap().push("Active.Exit".to_string());
            Ok(())
        });

    outside.transition_on(&next).to(&first).unwrap();
    first.transition_on(&next).to(&second).unwrap();
    second.transition_on(&next).to(&outside).unwrap();

    next.fire().unwrap();
    assert_eq!(
        entries(&observed),
        vec!["Outside.Exit", "Active.Entry", "First.Entry"]
    );

    observed.lock().unwrap().clear();
    next.fire().unwrap();
    assert_eq!(entries(&observed), vec!["First.Exit", "Second.Entry"]);

    observed.lock().unwrap().clear();
    next.fire().unwrap();
    assert_eq!(
        entries(&observed),
        vec!["Second.Exit", "Active.Exit", "Outside.Entry"]
    );
}

#[test]
fn group_exits_mirror_entry_order() {
    let machine = StateMachine::new("nesting");
    let inside = machine.create_initial_state("Inside").unwrap();
    let outside = machine.create_state("Outside");
    let outer = machine.create_group("Outer");
    let inner = machine.create_group("Inner");
    let toggle = Event::new("Toggle");
    let observed = log();

    inside.add_to_groups([&outer, &inner]).unwrap();
    for group in [&outer, &inner] {
        let (entry, exit) = (observed.clone(), observed.clone());
        let (entry_name, exit_name) = (group.name().to_string(), group.name().to_string());
        group
            .with_entry(move |_| {
                entry.lock().unwrap().push(format!("{entry_name}.Entry"));
                Ok(())
            })
            .with_exit(move |_| {
                exit.lock().unwrap().push(format!("{exit_name}.Exit"));
                Ok(())
            });
    }
    inside.transition_on(&toggle).to(&outside).unwrap();
    outside.transition_on(&toggle).to(&inside).unwrap();

    toggle.fire().unwrap();
    toggle.fire().unwrap();

    assert_eq!(
        entries(&observed),
        vec!["Inner.Exit", "Outer.Exit", "Outer.Entry", "Inner.Entry"]
    );
}

#[test]
fn failing_guard_faults_and_discards_events_fired_inside_it() {
    let machine = StateMachine::new("p4");
    let idle = machine.create_initial_state("Idle").unwrap();
    let running = machine.create_state("Running");
    let done = machine.create_state("Done");
    let start = Event::new("Start");
    let finish = Event::new("Finish");
    let observed = log();

    trace_state(&idle, &observed);
    trace_state(&done, &observed);
    idle.transition_on(&finish).to(&done).unwrap();
    let finish_from_guard = finish.clone();
    idle.transition_on(&start)
        .to(&running)
        .unwrap()
        .with_fallible_guard(move |_| {
            finish_from_guard.fire()?;
            Err("sensor offline".into())
        });

    let err = start.fire().unwrap_err();

    let fault = err.fault().unwrap();
    assert_eq!(fault.component, FaultedComponent::Guard);
    assert_eq!(fault.event.name(), "Start");
    assert!(machine.is_faulted());
    assert!(machine.is_in_state(&idle));
    assert!(entries(&observed).is_empty());
    assert!(matches!(
        finish.fire(),
        Err(TransitionError::MachineFaulted { .. })
    ));

    machine.reset();
    finish.fire().unwrap();
    assert_eq!(machine.current_state().unwrap(), done);
}

#[test]
fn group_exit_failure_names_the_group() {
    let machine = StateMachine::new("group-fault");
    let inside = machine.create_initial_state("Inside").unwrap();
    let outside = machine.create_state("Outside");
    let zone = machine.create_group("Zone");
    let leave = Event::new("Leave");

    zone.add_state(&inside).unwrap();
    zone.with_exit(|_| Err("door jammed".into()));
    inside.transition_on(&leave).to(&outside).unwrap();

    let err = leave.fire().unwrap_err();

    let fault = err.fault().unwrap();
    assert_eq!(fault.component, FaultedComponent::GroupExitHandler);
    assert_eq!(fault.group.as_ref(), Some(&zone));
    assert!(err.to_string().contains("(group 'Zone')"));
    assert!(machine.is_in_state(&inside));
}

#[test]
fn group_entry_failure_rolls_back_to_the_source() {
    let machine = StateMachine::new("group-entry-fault");
    let outside = machine.create_initial_state("Outside").unwrap();
    let inside = machine.create_state("Inside");
    let zone = machine.create_group("Zone");
    let enter = Event::new("Enter");
    let entered = Arc::new(AtomicUsize::new(0));

    zone.add_state(&inside).unwrap();
    zone.with_entry(|_| Err("badge reader offline".into()));
    let count = entered.clone();
    inside.with_entry(move |_| {
        count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    outside.transition_on(&enter).to(&inside).unwrap();

    let err = enter.fire().unwrap_err();

    let fault = err.fault().unwrap();
    assert_eq!(fault.component, FaultedComponent::GroupEntryHandler);
    assert_eq!(fault.group.as_ref(), Some(&zone));
    assert_eq!(fault.to.as_ref(), Some(&inside));
    assert!(machine.is_in_state(&outside));
    assert!(machine.is_faulted());
    assert_eq!(entered.load(Ordering::SeqCst), 0);
    assert!(machine.history().is_empty());
}

#[test]
fn event_fired_from_entry_runs_after_outer_transition() {
    let machine = StateMachine::new("p5");
    let a = machine.create_initial_state("A").unwrap();
    let b = machine.create_state("B");
    let c = machine.create_state("C");
    let e1 = Event::new("E1");
    let e2 = Event::new("E2");
    let observed = log();

    trace_state(&a, &observed);
    trace_state(&c, &observed);
    let (entry, e2_from_entry) = (observed.clone(), e2.clone());
    b.with_entry(move |_| {
        let queued = e2_from_entry.fire();
        entry
            .lock()
            .unwrap()
            .push(format!("B.Entry queued={}", queued.is_ok()));
        Ok(())
    })
    .with_exit({
        let exit = observed.clone();
        move |_| {
            exit.lock().unwrap().push("B.Exit".to_string());
            Ok(())
        }
    });
    a.transition_on(&e1).to(&b).unwrap();
    b.transition_on(&e2).to(&c).unwrap();
    let finished = observed.clone();
    machine.on_transition_finished(move |args| {
        finished.lock().unwrap().push(format!("finished {}", args.to));
    });

    e1.fire().unwrap();

    assert_eq!(
        entries(&observed),
        vec![
            "A.Exit",
            "B.Entry queued=true",
            "finished B",
            "B.Exit",
            "C.Entry",
            "finished C",
        ]
    );
    assert_eq!(machine.history().path(), vec!["A", "B", "C"]);
}

#[test]
fn queued_requests_can_enqueue_more_requests() {
    let machine = StateMachine::new("chain");
    let states: Vec<State> = std::iter::once(machine.create_initial_state("S0").unwrap())
        .chain((1..=3).map(|i| machine.create_state(format!("S{i}"))))
        .collect();
    let next = Event::new("Next");

    for pair in states.windows(2) {
        pair[0].transition_on(&next).to(&pair[1]).unwrap();
    }
    for state in &states[1..3] {
        let next = next.clone();
        state.with_entry(move |_| {
            next.fire()?;
            Ok(())
        });
    }

    next.fire().unwrap();

    assert_eq!(machine.current_state().unwrap(), states[3]);
}

#[test]
fn fault_in_queued_request_discards_the_rest() {
    let machine = StateMachine::new("queued-fault");
    let idle = machine.create_initial_state("Idle").unwrap();
    let busy = machine.create_state("Busy");
    let broken = machine.create_state("Broken");
    let start = Event::new("Start");
    let crash = Event::new("Crash");
    let tick = Event::new("Tick");
    let ticks = Arc::new(AtomicUsize::new(0));

    let counter = ticks.clone();
    busy.inner_self_transition_on(&tick)
        .unwrap()
        .with_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    broken.with_entry(|_| Err("unrecoverable".into()));
    busy.transition_on(&crash).to(&broken).unwrap();
    let (crash_from_entry, tick_from_entry) = (crash.clone(), tick.clone());
    busy.with_entry(move |_| {
        crash_from_entry.fire()?;
        tick_from_entry.fire()?;
        Ok(())
    });
    idle.transition_on(&start).to(&busy).unwrap();

    let err = start.fire().unwrap_err();

    assert_eq!(
        err.fault().map(|f| f.component),
        Some(FaultedComponent::EntryHandler)
    );
    assert_eq!(ticks.load(Ordering::SeqCst), 0);
    assert!(machine.is_in_state(&busy));
}

#[test]
fn unmatched_queued_fire_aborts_the_drain_without_faulting() {
    let machine = StateMachine::new("queued-miss");
    let idle = machine.create_initial_state("Idle").unwrap();
    let busy = machine.create_state("Busy");
    let start = Event::new("Start");
    let stray = Event::new("Stray");
    let tick = Event::new("Tick");
    let ticks = Arc::new(AtomicUsize::new(0));

    idle.transition_on(&start).to(&busy).unwrap();
    idle.transition_on(&stray).to(&idle).unwrap();
    let counter = ticks.clone();
    busy.inner_self_transition_on(&tick)
        .unwrap()
        .with_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    let (stray_from_entry, tick_from_entry) = (stray.clone(), tick.clone());
    busy.with_entry(move |_| {
        stray_from_entry.fire()?;
        tick_from_entry.fire()?;
        Ok(())
    });

    let err = start.fire().unwrap_err();

    assert!(matches!(err, TransitionError::TransitionNotFound { .. }));
    assert!(!machine.is_faulted());
    assert_eq!(ticks.load(Ordering::SeqCst), 0);
    assert_eq!(machine.current_state().unwrap(), busy);

    tick.fire().unwrap();
    assert_eq!(ticks.load(Ordering::SeqCst), 1);
}

#[test]
fn unconditional_transition_is_terminal_for_its_event() {
    let machine = StateMachine::new("p6");
    let a = machine.create_initial_state("A").unwrap();
    let b = machine.create_state("B");
    let c = machine.create_state("C");
    let go = Event::new("Go");
    let other = Event::new("Other");

    a.transition_on(&go).to(&b).unwrap().with_guard(|_| false);
    a.transition_on(&go).to(&c).unwrap().with_guard(|_| true);
    a.transition_on(&go).to(&b).unwrap();

    assert!(a.transition_on(&go).to(&c).is_err());
    assert!(a.ignore(&go).is_err());
    assert!(a.transition_on(&go).to_inner_self().is_err());
    assert!(a.transition_on(&other).to(&c).is_ok());
}

#[test]
fn group_membership_is_recorded_once() {
    let machine = StateMachine::new("p7");
    let a = machine.create_initial_state("A").unwrap();
    let group = machine.create_group("G");

    group.add_state(&a).unwrap();
    group.add_state(&a).unwrap();
    a.add_to_group(&group).unwrap();

    assert_eq!(group.members().len(), 1);
    assert_eq!(a.groups().len(), 1);
}

#[test]
fn dynamic_selector_falls_through_and_rejects_foreign_states() {
    let machine = StateMachine::new("dispatch");
    let idle = machine.create_initial_state("Idle").unwrap();
    let fallback = machine.create_state("Fallback");
    let route = EventWithData::<Option<u8>>::new("Route");

    let other = StateMachine::new("elsewhere");
    let foreign = other.create_initial_state("Foreign").unwrap();

    idle.transition_on(&route)
        .to_dynamic(move |info| info.data.map(|_| foreign.clone()))
        .unwrap();
    idle.transition_on(&route).to(&fallback).unwrap();

    route.fire(None).unwrap();
    assert_eq!(machine.current_state().unwrap(), fallback);

    machine.reset();
    let err = route.fire(Some(1)).unwrap_err();
    assert_eq!(
        err.fault().map(|f| f.component),
        Some(FaultedComponent::DynamicSelector)
    );
}

#[test]
fn ignored_event_reports_success_without_moving() {
    let machine = StateMachine::new("ignore");
    let idle = machine.create_initial_state("Idle").unwrap();
    let ping = Event::new("Ping");
    let ignored = Arc::new(AtomicUsize::new(0));
    let observed = log();

    trace_state(&idle, &observed);
    idle.ignore(&ping).unwrap();
    let counter = ignored.clone();
    machine.on_event_ignored(move |args| {
        assert_eq!(args.fire_method, EventFireMethod::Fire);
        counter.fetch_add(1, Ordering::SeqCst);
    });

    ping.fire().unwrap();
    assert!(ping.try_fire().unwrap());

    assert_eq!(ignored.load(Ordering::SeqCst), 2);
    assert!(entries(&observed).is_empty());
    assert!(machine.history().is_empty());
}

#[test]
fn forced_transition_from_handler_is_queued() {
    let machine = StateMachine::new("force-queue");
    let idle = machine.create_initial_state("Idle").unwrap();
    let running = machine.create_state("Running");
    let safe = machine.create_state("Safe");
    let start = Event::new("Start");
    let observed = log();

    for state in [&idle, &running, &safe] {
        trace_state(state, &observed);
    }
    let (handle, target, event) = (machine.clone(), safe.clone(), start.clone());
    idle.transition_on(&start)
        .to(&running)
        .unwrap()
        .with_handler(move |_| {
            handle.force_transition(&target, &event)?;
            Ok(())
        });

    start.fire().unwrap();

    assert_eq!(
        entries(&observed),
        vec!["Idle.Exit", "Running.Entry", "Running.Exit", "Safe.Entry"]
    );
    assert_eq!(machine.current_state().unwrap(), safe);
}

struct Counting {
    fires: AtomicUsize,
    forces: AtomicUsize,
    resets: AtomicUsize,
}

impl Synchronizer for Counting {
    fn fire_event(
        &self,
        _method: EventFireMethod,
        invoker: Invoker<'_, bool>,
    ) -> Result<bool, TransitionError> {
        self.fires.fetch_add(1, Ordering::SeqCst);
        invoker()
    }

    fn force_transition(&self, invoker: Invoker<'_, ()>) -> Result<(), TransitionError> {
        self.forces.fetch_add(1, Ordering::SeqCst);
        invoker()
    }

    fn reset(&self, invoker: Box<dyn FnOnce() + '_>) {
        self.resets.fetch_add(1, Ordering::SeqCst);
        invoker()
    }
}

#[test]
fn synchronizer_wraps_only_outermost_calls() {
    let counting = Arc::new(Counting {
        fires: AtomicUsize::new(0),
        forces: AtomicUsize::new(0),
        resets: AtomicUsize::new(0),
    });
    let machine = StateMachine::new("wrapped");
    machine.set_synchronizer(counting.clone());
    let a = machine.create_initial_state("A").unwrap();
    let b = machine.create_state("B");
    let c = machine.create_state("C");
    let go = Event::new("Go");

    a.transition_on(&go).to(&b).unwrap();
    b.transition_on(&go).to(&c).unwrap();
    let nested = go.clone();
    b.with_entry(move |_| {
        nested.fire()?;
        Ok(())
    });

    go.fire().unwrap();
    machine.force_transition(&a, &go).unwrap();
    machine.reset();

    assert_eq!(machine.current_state().unwrap(), a);
    assert_eq!(counting.fires.load(Ordering::SeqCst), 1);
    assert_eq!(counting.forces.load(Ordering::SeqCst), 1);
    assert_eq!(counting.resets.load(Ordering::SeqCst), 1);
}

#[test]
fn lock_synchronizer_serializes_threads() {
    let machine = StateMachineBuilder::new("shared")
        .history_capacity(256)
        .synchronizer(Arc::new(LockSynchronizer::new()))
        .build();
    let ping = machine.create_initial_state("Ping").unwrap();
    let pong = machine.create_state("Pong");
    let hit = Event::new("Hit");
    let in_flight = Arc::new(AtomicUsize::new(0));

    for (from, to) in [(&ping, &pong), (&pong, &ping)] {
        let in_flight = in_flight.clone();
        from.transition_on(&hit)
            .to(to)
            .unwrap()
            .with_handler(move |_| {
                assert_eq!(in_flight.fetch_add(1, Ordering::SeqCst), 0);
                thread::yield_now();
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            });
    }

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let hit = hit.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    hit.fire().unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(machine.history().len(), 100);
    assert_eq!(machine.current_state().unwrap(), ping);
}

struct Locked {
    open: AtomicUsize,
}

impl StateBehavior for Locked {
    fn can_transition(&self, candidate: &TransitionCandidate<'_>) -> bool {
        candidate.event.name() != "Open" || self.open.load(Ordering::SeqCst) > 0
    }

    fn on_exit(&self, info: &StateHandlerInfo<'_>) -> HandlerResult {
        if info.is_forced {
            return Err("locked state cannot be forced open".into());
        }
        Ok(())
    }
}

#[test]
fn state_behavior_vetoes_and_faults() {
    let machine = StateMachine::new("vault");
    let locked = machine
        .create_initial_state_with_behavior(
            "Locked",
            Locked {
                open: AtomicUsize::new(0),
            },
        )
        .unwrap();
    let opened = machine.create_state("Opened");
    let open = Event::new("Open");

    locked.transition_on(&open).to(&opened).unwrap();

    assert!(!open.try_fire().unwrap());

    let err = machine.force_transition(&opened, &open).unwrap_err();
    assert_eq!(
        err.fault().map(|f| f.component),
        Some(FaultedComponent::ExitHandler)
    );
    assert!(err.fault().map(|f| f.to.is_some()).unwrap_or_default());
}

#[test]
fn panicking_handler_faults_instead_of_wedging_the_machine() {
    let machine = StateMachine::new("panics");
    let idle = machine.create_initial_state("Idle").unwrap();
    let broken = machine.create_state("Broken");
    let boom = Event::new("Boom");
    let tick = Event::new("Tick");
    let ticks = Arc::new(AtomicUsize::new(0));

    idle.transition_on(&boom)
        .to(&broken)
        .unwrap()
        .with_handler(|_| panic!("actuator exploded"));
    let count = ticks.clone();
    idle.inner_self_transition_on(&tick)
        .unwrap()
        .with_handler(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

    let err = boom.fire().unwrap_err();

    let fault = err.fault().unwrap();
    assert_eq!(fault.component, FaultedComponent::TransitionHandler);
    assert!(fault.error.to_string().contains("actuator exploded"));
    assert!(machine.is_in_state(&idle));

    machine.reset();
    assert!(tick.fire().unwrap());
    assert_eq!(ticks.load(Ordering::SeqCst), 1);
}

#[test]
fn panicking_guard_is_reported_as_guard_fault() {
    let machine = StateMachine::new("guard-panic");
    let idle = machine.create_initial_state("Idle").unwrap();
    let running = machine.create_state("Running");
    let start = EventWithData::<Vec<u8>>::new("Start");

    idle.transition_on(&start)
        .to(&running)
        .unwrap()
        .with_guard(|info| info.data[3] == 0);

    let err = start.fire(Vec::new()).unwrap_err();

    assert_eq!(
        err.fault().map(|fault| fault.component),
        Some(FaultedComponent::Guard)
    );
    assert!(machine.is_in_state(&idle));
}

#[test]
fn panicking_listener_releases_the_machine() {
    let machine = StateMachine::new("listener-panic");
    let idle = machine.create_initial_state("Idle").unwrap();
    let boom = Event::new("Boom");
    let tick = Event::new("Tick");
    let ticks = Arc::new(AtomicUsize::new(0));

    idle.inner_self_transition_on(&boom).unwrap();
    let count = ticks.clone();
    idle.inner_self_transition_on(&tick)
        .unwrap()
        .with_handler(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    machine.on_transition(|args| {
        if args.event.name() == "Boom" {
            panic!("listener failed");
        }
    });

    let unwound = panic::catch_unwind(AssertUnwindSafe(|| boom.fire()));
    assert!(unwound.is_err());

    assert!(!machine.is_faulted());
    assert!(tick.fire().unwrap());
    assert_eq!(ticks.load(Ordering::SeqCst), 1);
}

#[test]
fn reset_from_a_handler_takes_effect_after_the_transition() {
    let machine = StateMachine::new("nested-reset");
    let idle = machine.create_initial_state("Idle").unwrap();
    let running = machine.create_state("Running");
    let start = Event::new("Start");
    let observed = log();

    trace_state(&running, &observed);
    let handle = machine.clone();
    idle.transition_on(&start)
        .to(&running)
        .unwrap()
        .with_handler(move |_| {
            handle.reset();
            Ok(())
        });

    assert!(start.fire().unwrap());

    assert!(machine.is_in_state(&idle));
    assert!(machine.history().is_empty());
    assert_eq!(entries(&observed), vec!["Running.Entry"]);
}

#[test]
fn events_fired_after_a_nested_reset_run_from_the_initial_state() {
    let machine = StateMachine::new("reset-then-fire");
    let idle = machine.create_initial_state("Idle").unwrap();
    let running = machine.create_state("Running");
    let parked = machine.create_state("Parked");
    let start = Event::new("Start");
    let stop = Event::new("Stop");
    let park = Event::new("Park");

    idle.transition_on(&start).to(&running).unwrap();
    idle.transition_on(&park).to(&parked).unwrap();
    running.transition_on(&stop).to(&idle).unwrap();

    let (handle, stop_early, park_late) = (machine.clone(), stop.clone(), park.clone());
    running.with_entry(move |_| {
        stop_early.fire()?;
        handle.reset();
        park_late.fire()?;
        Ok(())
    });

    start.fire().unwrap();

    assert!(machine.is_in_state(&parked));
    assert_eq!(machine.history().path(), vec!["Idle", "Parked"]);
}
