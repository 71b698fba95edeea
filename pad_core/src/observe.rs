//! Per-cycle reports and the observability hook.
//!
//! The scheduler hands every `CycleReport` to a `CycleObserver` after the
//! gates have been written, so observers never sit between a sample and its
//! gate output. `TracingObserver` is the default: edge-triggered events at
//! `info`/`warn` and a rate-limited `debug` summary.

use std::time::{Duration, Instant};

use pad_traits::{CHANNEL_COUNT, ChannelId, RawSample};
use tracing::{debug, info, warn};

use crate::config::ObserverCfg;

/// What happened to one channel during one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelOutcome {
    pub channel: ChannelId,
    pub sample: RawSample,
    /// Weight carried into the next cycle.
    pub weight: i32,
    pub step_asserted: bool,
    /// Gate went from low to high this cycle.
    pub rising: bool,
    /// Consecutive timeouts before this cycle.
    pub prior_timeouts: u32,
    /// Consecutive timeouts including this cycle.
    pub consecutive_timeouts: u32,
}

impl ChannelOutcome {
    pub(crate) const fn pending(channel: ChannelId) -> Self {
        Self {
            channel,
            sample: RawSample::Timeout,
            weight: 0,
            step_asserted: false,
            rising: false,
            prior_timeouts: 0,
            consecutive_timeouts: 0,
        }
    }
}

/// Result of one full tick over all channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// 1-based cycle number.
    pub cycle: u64,
    pub started: Instant,
    /// Time spent acquiring and deciding.
    pub elapsed: Duration,
    pub channels: [ChannelOutcome; CHANNEL_COUNT],
    /// The ambient override pulse was issued after the channel gates.
    pub ambient_fired: bool,
}

impl CycleReport {
    /// Gate level vector, channel order.
    pub fn gates(&self) -> [bool; CHANNEL_COUNT] {
        self.channels.map(|c| c.step_asserted)
    }

    pub fn timeouts(&self) -> usize {
        self.channels.iter().filter(|c| c.sample.is_timeout()).count()
    }
}

pub trait CycleObserver {
    fn on_cycle(&mut self, report: &CycleReport);
}

impl<F: FnMut(&CycleReport)> CycleObserver for F {
    fn on_cycle(&mut self, report: &CycleReport) {
        self(report);
    }
}

/// Discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl CycleObserver for NoopObserver {
    fn on_cycle(&mut self, _report: &CycleReport) {}
}

/// Structured, rate-limited logging of cycle outcomes.
#[derive(Debug)]
pub struct TracingObserver {
    cfg: ObserverCfg,
    last_summary: Option<Instant>,
    suppressed: u64,
}

impl TracingObserver {
    pub fn new(cfg: ObserverCfg) -> Self {
        Self {
            cfg,
            last_summary: None,
            suppressed: 0,
        }
    }

    fn summary_due(&mut self, now: Instant) -> bool {
        match self.last_summary {
            Some(last) if now.saturating_duration_since(last) < self.cfg.summary_interval => {
                self.suppressed += 1;
                false
            }
            _ => {
                self.last_summary = Some(now);
                true
            }
        }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new(ObserverCfg::default())
    }
}

impl CycleObserver for TracingObserver {
    fn on_cycle(&mut self, report: &CycleReport) {
        let warn_after = self.cfg.timeout_warn_after.max(1);
        for c in &report.channels {
            if c.rising {
                info!(channel = %c.channel, weight = c.weight, "step detected");
            }
            if c.consecutive_timeouts == warn_after {
                warn!(
                    channel = %c.channel,
                    cycles = c.consecutive_timeouts,
                    "load cell not ready"
                );
            } else if !c.sample.is_timeout() && c.prior_timeouts >= warn_after {
                info!(
                    channel = %c.channel,
                    after = c.prior_timeouts,
                    "load cell recovered"
                );
            }
        }
        if report.ambient_fired {
            info!(cycle = report.cycle, "ambient trigger override");
        }

        if self.summary_due(report.started) {
            let [w1, w2, w3, w4] = report.channels.map(|c| c.weight);
            debug!(
                cycle = report.cycle,
                w1,
                w2,
                w3,
                w4,
                gates = ?report.gates(),
                timeouts = report.timeouts(),
                elapsed_us = crate::util::as_micros_u64(report.elapsed),
                suppressed = self.suppressed,
                "cycle"
            );
            self.suppressed = 0;
        }
    }
}
