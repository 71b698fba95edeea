//! Fixed-rate sampling loop over the four channels.
//!
//! Each tick acquires channels 1..4 in order, decides, writes the gate for
//! that channel immediately and publishes the new state. The ambient trigger
//! is polled once after the last channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use pad_traits::{
    Actuator, AmbientTrigger, CHANNEL_COUNT, ChannelId, Clock, LoadCellBus, MonotonicClock,
};
use tracing::{debug, trace};

use crate::detector::StepDetector;
use crate::observe::{ChannelOutcome, CycleObserver, CycleReport};
use crate::state::ChannelState;
use crate::status::StatusHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No tick has run yet.
    Idle,
    Running,
}

/// Totals over a scheduler's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub cycles: u64,
    /// Cycles that ended after their tick boundary.
    pub overruns: u64,
    pub timeouts_per_channel: [u64; CHANNEL_COUNT],
    /// Longest acquire-and-decide time seen.
    pub max_cycle: Duration,
}

impl RunSummary {
    pub fn total_timeouts(&self) -> u64 {
        self.timeouts_per_channel.iter().sum()
    }
}

pub type BoxedObserver = Box<dyn CycleObserver + Send>;
pub type BoxedTrigger = Box<dyn AmbientTrigger + Send>;

/// Owns the bus (and with it the clock line), the gates and all channel state.
pub struct SamplingScheduler<B, A, K = MonotonicClock> {
    pub(crate) bus: B,
    pub(crate) actuator: A,
    pub(crate) clock: K,
    pub(crate) detector: StepDetector,
    pub(crate) period: Duration,
    pub(crate) observer: BoxedObserver,
    pub(crate) ambient: Option<BoxedTrigger>,
    pub(crate) states: [ChannelState; CHANNEL_COUNT],
    pub(crate) status: StatusHandle,
    pub(crate) next_deadline: Option<Instant>,
    pub(crate) summary: RunSummary,
}

impl<B, A, K> core::fmt::Debug for SamplingScheduler<B, A, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SamplingScheduler")
            .field("period", &self.period)
            .field("thresholds", self.detector.thresholds())
            .field("states", &self.states)
            .field("ambient", &self.ambient.is_some())
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

impl<B, A, K> SamplingScheduler<B, A, K>
where
    B: LoadCellBus,
    A: Actuator,
    K: Clock,
{
    /// Run one full cycle and return its report.
    pub fn tick(&mut self) -> CycleReport {
        let started = self.clock.now();
        if self.next_deadline.is_none() {
            self.next_deadline = Some(started + self.period);
        }
        let cycle = self.summary.cycles + 1;

        let mut channels = ChannelId::ALL.map(ChannelOutcome::pending);
        for id in ChannelId::ALL {
            let i = id.index();
            let sample = self.bus.acquire(id);
            let decision = self.detector.decide_for(id, &self.states[i], sample);

            let was_asserted = self.states[i].step_asserted();
            let prior_timeouts = self.states[i].consecutive_timeouts();
            self.states[i].apply(sample, decision);
            self.actuator.set_gate(id, decision.step_asserted);
            self.status.publish(id, &self.states[i]);

            if sample.is_timeout() {
                self.summary.timeouts_per_channel[i] += 1;
            }
            trace!(channel = %id, ?sample, step = decision.step_asserted, "channel");
            channels[i] = ChannelOutcome {
                channel: id,
                sample,
                weight: decision.previous_weight,
                step_asserted: decision.step_asserted,
                rising: decision.step_asserted && !was_asserted,
                prior_timeouts,
                consecutive_timeouts: self.states[i].consecutive_timeouts(),
            };
        }

        let ambient_fired = match self.ambient.as_mut() {
            Some(trigger) => trigger.poll(),
            None => false,
        };
        if ambient_fired {
            self.actuator.pulse_all();
        }

        let elapsed = self.clock.now().saturating_duration_since(started);
        self.summary.cycles = cycle;
        self.summary.max_cycle = self.summary.max_cycle.max(elapsed);
        self.status.finish_cycle();

        let report = CycleReport {
            cycle,
            started,
            elapsed,
            channels,
            ambient_fired,
        };
        self.observer.on_cycle(&report);
        report
    }

    /// Sleep until the next tick boundary.
    ///
    /// Returns `true` when the boundary had already passed; the overrun is
    /// counted and the schedule restarts from now without catching up.
    pub fn wait_next_tick(&mut self) -> bool {
        let now = self.clock.now();
        let Some(deadline) = self.next_deadline else {
            return false;
        };
        if now > deadline {
            self.summary.overruns += 1;
            debug!(
                late_us = crate::util::as_micros_u64(now - deadline),
                cycle = self.summary.cycles,
                "tick overrun"
            );
            self.next_deadline = Some(now + self.period);
            return true;
        }
        self.clock.sleep_until(deadline);
        self.next_deadline = Some(deadline + self.period);
        false
    }

    /// Run exactly `cycles` ticks.
    pub fn run_for(&mut self, cycles: u64) -> RunSummary {
        for n in 0..cycles {
            self.tick();
            if n + 1 < cycles {
                self.wait_next_tick();
            }
        }
        self.summary
    }

    /// Run until `shutdown` is observed at a tick boundary.
    pub fn run(&mut self, shutdown: &AtomicBool) -> RunSummary {
        self.run_with(shutdown, |_| {})
    }

    /// `run` with a hook that sees every report after the observer.
    pub fn run_with<F>(&mut self, shutdown: &AtomicBool, mut on_report: F) -> RunSummary
    where
        F: FnMut(CycleReport),
    {
        debug!(period_ms = crate::util::as_millis_u64(self.period), "sampling loop started");
        while !shutdown.load(Ordering::Acquire) {
            let report = self.tick();
            on_report(report);
            if shutdown.load(Ordering::Acquire) {
                break;
            }
            self.wait_next_tick();
        }
        debug!(cycles = self.summary.cycles, overruns = self.summary.overruns, "sampling loop stopped");
        self.summary
    }
}

impl<B, A, K> SamplingScheduler<B, A, K> {
    pub fn phase(&self) -> Phase {
        if self.summary.cycles == 0 {
            Phase::Idle
        } else {
            Phase::Running
        }
    }

    pub fn state(&self, channel: ChannelId) -> &ChannelState {
        &self.states[channel.index()]
    }

    pub fn states(&self) -> &[ChannelState; CHANNEL_COUNT] {
        &self.states
    }

    /// Reader handle for the status board; clone freely.
    pub fn status(&self) -> StatusHandle {
        self.status.clone()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn detector(&self) -> &StepDetector {
        &self.detector
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Give back the bus and the gates.
    pub fn into_parts(self) -> (B, A) {
        (self.bus, self.actuator)
    }
}
