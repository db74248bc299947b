//! Traffic Light State Machine
//!
//! This example demonstrates a cyclic state machine with groups, guards,
//! a re-entrant event and recovery from a fault.
//!
//! Key concepts:
//! - Cyclic state transitions (states repeat)
//! - A group whose handlers fire only when crossing its boundary
//! - Guarded transitions driven by an event payload
//! - Events fired from inside a handler are queued, not run inline
//! - Faults poison the machine until reset
//!
//! Run with: cargo run --example traffic_light

use hsm_core::{Event, EventWithData, LockSynchronizer, StateMachineBuilder};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Traffic Light State Machine ===\n");

    let machine = StateMachineBuilder::new("traffic-light")
        .synchronizer(Arc::new(LockSynchronizer::new()))
        .build();

    let red = machine.create_initial_state("Red")?;
    let green = machine.create_state("Green");
    let yellow = machine.create_state("Yellow");
    let flashing = machine.create_state("Flashing");

    let moving = machine.create_group("TrafficMoving");
    moving.add_states([&green, &yellow])?;
    moving
        .with_entry(|_| {
            println!("  [group] traffic starts moving");
            Ok(())
        })
        .with_exit(|_| {
            println!("  [group] traffic stops");
            Ok(())
        });

    let next = Event::new("Next");
    let fault_report = EventWithData::<u8>::new("FaultReport");

    red.transition_on(&next).to(&green)?;
    green.transition_on(&next).to(&yellow)?;
    yellow.transition_on(&next).to(&red)?;

    // Minor faults are logged and ignored, severe ones switch to flashing.
    for state in [&red, &green, &yellow] {
        state
            .transition_on(&fault_report)
            .to(&flashing)?
            .with_guard(|info| *info.data >= 5);
        state
            .inner_self_transition_on(&fault_report)?
            .with_handler(|info| {
                println!("  minor fault (severity {}) noted", info.data);
                Ok(())
            });
    }

    // Flashing immediately asks to go back to red once the bulb is replaced.
    let recover = next.clone();
    flashing.with_entry(move |_| {
        println!("  bulb replaced, requesting recovery");
        recover.fire()?;
        Ok(())
    });
    flashing.transition_on(&next).to(&red)?;

    machine.on_transition_finished(|args| {
        println!("{} -> {} on {}", args.from, args.to, args.event);
    });

    println!("Initial state: {}\n", machine.current_state()?);

    println!("Cycle:");
    for _ in 0..3 {
        next.fire()?;
    }

    println!("\nFaults:");
    fault_report.fire(2)?;
    fault_report.fire(9)?;
    println!("Back in: {}", machine.current_state()?);
    println!("Visited: {:?}", machine.history().path());

    println!("\nA broken handler:");
    yellow.with_entry(|_| Err("lamp driver unresponsive".into()));
    next.fire()?;
    if let Err(err) = next.fire() {
        println!("  fire failed: {err}");
    }
    println!("  faulted: {}", machine.is_faulted());
    machine.reset();
    println!("  after reset: {}", machine.current_state()?);

    println!("\n=== Example Complete ===");
    Ok(())
}
