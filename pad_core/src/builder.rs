//! Builder for `SamplingScheduler`.
//!
//! `build()` validates the wiring reported by the bus before anything runs;
//! a scheduler never exists with a missing channel, a clashing pin, or ready
//! waits that cannot finish inside one tick.

use std::collections::HashMap;
use std::time::Duration;

use pad_traits::{
    Actuator, AmbientTrigger, CHANNEL_COUNT, ChannelConfig, ChannelId, Clock, LoadCellBus,
    MonotonicClock,
};

use crate::config::{ObserverCfg, ThresholdConfig};
use crate::detector::StepDetector;
use crate::error::{BuildError, Result};
use crate::observe::{CycleObserver, TracingObserver};
use crate::scheduler::{BoxedObserver, BoxedTrigger, RunSummary, SamplingScheduler};
use crate::state::ChannelState;
use crate::status::StatusHandle;
use crate::util::DEFAULT_TICK;

pub struct SchedulerBuilder<B, A, K = MonotonicClock> {
    bus: B,
    actuator: A,
    clock: K,
    thresholds: ThresholdConfig,
    period: Duration,
    observer: Option<BoxedObserver>,
    observer_cfg: ObserverCfg,
    ambient: Option<BoxedTrigger>,
}

impl<B, A> SchedulerBuilder<B, A, MonotonicClock>
where
    B: LoadCellBus,
    A: Actuator,
{
    pub fn new(bus: B, actuator: A) -> Self {
        Self {
            bus,
            actuator,
            clock: MonotonicClock::new(),
            thresholds: ThresholdConfig::default(),
            period: DEFAULT_TICK,
            observer: None,
            observer_cfg: ObserverCfg::default(),
            ambient: None,
        }
    }
}

impl<B, A, K> SchedulerBuilder<B, A, K>
where
    B: LoadCellBus,
    A: Actuator,
    K: Clock,
{
    pub fn with_threshold(mut self, thresholds: ThresholdConfig) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Tick period; zero is rejected by `build`.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Swap the time source used for tick pacing.
    pub fn with_clock<K2: Clock>(self, clock: K2) -> SchedulerBuilder<B, A, K2> {
        SchedulerBuilder {
            bus: self.bus,
            actuator: self.actuator,
            clock,
            thresholds: self.thresholds,
            period: self.period,
            observer: self.observer,
            observer_cfg: self.observer_cfg,
            ambient: self.ambient,
        }
    }

    /// Replace the default `TracingObserver`.
    pub fn with_observer(mut self, observer: impl CycleObserver + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Rate limits for the default observer. Ignored after `with_observer`.
    pub fn with_observer_cfg(mut self, cfg: ObserverCfg) -> Self {
        self.observer_cfg = cfg;
        self
    }

    pub fn with_ambient(mut self, trigger: impl AmbientTrigger + Send + 'static) -> Self {
        self.ambient = Some(Box::new(trigger));
        self
    }

    pub fn build(self) -> Result<SamplingScheduler<B, A, K>> {
        if self.period.is_zero() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "tick period must be > 0",
            )));
        }
        validate_wiring(self.bus.channels()).map_err(eyre::Report::new)?;
        validate_budget(self.bus.channels(), self.period).map_err(eyre::Report::new)?;

        let observer: BoxedObserver = match self.observer {
            Some(o) => o,
            None => Box::new(TracingObserver::new(self.observer_cfg)),
        };
        tracing::debug!(
            period_us = crate::util::as_micros_u64(self.period),
            threshold = self.thresholds.global,
            per_channel = self.thresholds.per_channel.is_some(),
            ambient = self.ambient.is_some(),
            "scheduler built"
        );

        Ok(SamplingScheduler {
            bus: self.bus,
            actuator: self.actuator,
            clock: self.clock,
            detector: StepDetector::new(self.thresholds),
            period: self.period,
            observer,
            ambient: self.ambient,
            states: [ChannelState::default(); CHANNEL_COUNT],
            status: StatusHandle::new(),
            next_deadline: None,
            summary: RunSummary::default(),
        })
    }
}

/// Check that `channels` describes exactly channels 1..4 on one shared clock
/// line with distinct data lines.
pub fn validate_wiring(channels: &[ChannelConfig]) -> std::result::Result<(), BuildError> {
    let mut seen = [false; CHANNEL_COUNT];
    for cfg in channels {
        let slot = &mut seen[cfg.id.index()];
        if *slot {
            return Err(BuildError::DuplicateChannel(cfg.id.get()));
        }
        *slot = true;
    }
    if let Some(missing) = ChannelId::ALL.iter().find(|id| !seen[id.index()]) {
        return Err(BuildError::MissingChannel(missing.get()));
    }

    let sck = channels[0].clock_pin;
    let mut owners: HashMap<u8, String> = HashMap::new();
    owners.insert(sck, "clock".to_string());
    for cfg in channels {
        if cfg.clock_pin != sck {
            return Err(BuildError::ClockPinMismatch(sck, cfg.clock_pin));
        }
        if cfg.ready_timeout.is_zero() {
            return Err(BuildError::InvalidConfig("ready timeout must be > 0"));
        }
        let name = format!("{} data", cfg.id);
        if let Some(first) = owners.get(&cfg.data_pin) {
            return Err(BuildError::ConflictingLine {
                pin: cfg.data_pin,
                first: first.clone(),
                second: name,
            });
        }
        owners.insert(cfg.data_pin, name);
    }
    Ok(())
}

/// Check that a cycle in which every channel times out still ends within
/// `period`, so a dead channel cannot push its neighbours into the next tick.
pub fn validate_budget(
    channels: &[ChannelConfig],
    period: Duration,
) -> std::result::Result<(), BuildError> {
    let total: Duration = channels.iter().map(|c| c.ready_timeout).sum();
    if total > period {
        return Err(BuildError::ReadyBudget { total, period });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::default_wiring;

    #[test]
    fn default_wiring_is_valid() {
        assert_eq!(validate_wiring(&default_wiring()), Ok(()));
    }

    #[test]
    fn data_pin_on_clock_line_is_rejected() {
        let mut w = default_wiring();
        w[1].data_pin = w[1].clock_pin;
        assert_eq!(
            validate_wiring(&w),
            Err(BuildError::ConflictingLine {
                pin: w[1].clock_pin,
                first: "clock".into(),
                second: "ch2 data".into(),
            })
        );
    }

    #[test]
    fn ready_budget_is_the_sum_over_channels() {
        let w = default_wiring();
        assert_eq!(validate_budget(&w, DEFAULT_TICK), Ok(()));
        let short = DEFAULT_TICK - Duration::from_micros(1);
        assert_eq!(
            validate_budget(&w, short),
            Err(BuildError::ReadyBudget {
                total: DEFAULT_TICK,
                period: short,
            })
        );
    }

    #[test]
    fn empty_wiring_reports_first_missing_channel() {
        assert_eq!(validate_wiring(&[]), Err(BuildError::MissingChannel(1)));
    }
}
