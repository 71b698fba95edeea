//! Sampling thread lifecycle: reports flow, stop returns totals, drop joins.

use std::time::Duration;

use pad_core::mocks::{ScriptedBus, default_wiring};
use pad_core::{PadWorker, SamplingScheduler, SchedulerBuilder};
use pad_hardware::SimGates;
use pad_traits::{ChannelId, MonotonicClock};

/// Wiring whose four ready waits fit in a 1 ms tick.
fn fast_bus() -> ScriptedBus {
    let mut wiring = default_wiring();
    for c in &mut wiring {
        c.ready_timeout = Duration::from_micros(200);
    }
    ScriptedBus::with_wiring(wiring)
}

fn scheduler(bus: ScriptedBus, gates: SimGates) -> SamplingScheduler<ScriptedBus, SimGates, MonotonicClock> {
    SchedulerBuilder::new(bus, gates)
        .with_period(Duration::from_millis(1))
        .build()
        .expect("build")
}

#[test]
fn worker_publishes_reports_and_status() {
    let mut bus = fast_bus();
    bus.push_values(ChannelId::ALL[0], &[0, 5000]);
    let gates = SimGates::new();
    let worker = PadWorker::spawn(scheduler(bus, gates.clone())).expect("spawn");

    std::thread::sleep(Duration::from_millis(50));
    assert!(worker.is_running());
    let status = worker.status();
    assert!(status.cycles() >= 2);
    let latest = worker.latest().expect("at least one report");
    assert!(latest.cycle >= 1);

    // Channel 1 stepped on cycle 2 and has only timed out since, so the gate holds.
    let snap = status.read_last(ChannelId::ALL[0]);
    assert_eq!(snap.weight, 5000);
    assert!(snap.step_asserted);
    assert!(snap.is_timeout);
    assert!(gates.levels()[0]);

    let summary = worker.stop().expect("clean stop");
    assert!(summary.cycles >= 2);
    assert_eq!(summary.timeouts_per_channel[0], summary.cycles - 2);
    assert_eq!(status.cycles(), summary.cycles);
}

#[test]
fn latest_drains_to_the_newest_report() {
    let worker = PadWorker::spawn(scheduler(fast_bus(), SimGates::new())).expect("spawn");
    std::thread::sleep(Duration::from_millis(20));
    let first = worker.latest().expect("report");
    std::thread::sleep(Duration::from_millis(20));
    let second = worker.latest().expect("report");
    assert!(second.cycle > first.cycle);
}

#[test]
fn dropping_workers_joins_their_threads() {
    for _ in 0..10 {
        let worker =
            PadWorker::spawn(scheduler(fast_bus(), SimGates::new())).expect("spawn");
        std::thread::sleep(Duration::from_millis(5));
        let _ = worker.latest();
        drop(worker);
    }
}
