//! Bridging `pad_config` types to `pad_core` and `pad_traits` types.
//!
//! Call these on a config that already passed `Config::validate`.

use std::time::Duration;

use pad_traits::{CHANNEL_COUNT, ChannelConfig, ChannelId, Gain};

use crate::config::{ObserverCfg, ThresholdConfig};
use crate::error::{BuildError, Result};

// ── Gain ─────────────────────────────────────────────────────────────────────

pub fn map_gain(g: pad_config::GainCfg) -> Gain {
    match g {
        pad_config::GainCfg::A128 => Gain::A128,
        pad_config::GainCfg::B32 => Gain::B32,
        pad_config::GainCfg::A64 => Gain::A64,
    }
}

// ── ThresholdConfig ──────────────────────────────────────────────────────────

impl TryFrom<&pad_config::DetectorCfg> for ThresholdConfig {
    type Error = BuildError;

    fn try_from(c: &pad_config::DetectorCfg) -> std::result::Result<Self, Self::Error> {
        let per_channel = match &c.per_channel {
            None => None,
            Some(v) => Some(<[i32; CHANNEL_COUNT]>::try_from(v.as_slice()).map_err(|_| {
                BuildError::InvalidConfig("detector.per_channel must have 4 entries")
            })?),
        };
        Ok(Self {
            global: c.threshold,
            per_channel,
        })
    }
}

// ── ObserverCfg ──────────────────────────────────────────────────────────────

impl From<&pad_config::Logging> for ObserverCfg {
    fn from(c: &pad_config::Logging) -> Self {
        Self {
            summary_interval: Duration::from_millis(c.summary_interval_ms),
            timeout_warn_after: c.timeout_warn_after,
        }
    }
}

// ── Wiring ───────────────────────────────────────────────────────────────────

/// Per-channel wiring from `[pins]` and `[hx711]`.
pub fn channel_configs(cfg: &pad_config::Config) -> Result<Vec<ChannelConfig>> {
    if cfg.pins.data.len() != CHANNEL_COUNT {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "pins.data must have 4 entries",
        )));
    }
    let gain = map_gain(cfg.hx711.gain);
    let ready_timeout = Duration::from_millis(cfg.hx711.ready_timeout_ms);
    Ok(ChannelId::ALL
        .iter()
        .zip(&cfg.pins.data)
        .map(|(&id, &data_pin)| ChannelConfig {
            id,
            data_pin,
            clock_pin: cfg.pins.sck,
            gain,
            ready_timeout,
        })
        .collect())
}

/// Gate output pins, channel order.
pub fn gate_pins(cfg: &pad_config::Config) -> Result<[u8; CHANNEL_COUNT]> {
    <[u8; CHANNEL_COUNT]>::try_from(cfg.pins.gates.as_slice()).map_err(|_| {
        eyre::Report::new(BuildError::InvalidConfig("pins.gates must have 4 entries"))
    })
}

pub fn tick_period(cfg: &pad_config::Config) -> Duration {
    Duration::from_millis(cfg.scheduler.tick_ms)
}

pub fn poll_interval(cfg: &pad_config::Config) -> Duration {
    Duration::from_micros(cfg.hx711.poll_us)
}
