//! Runtime configuration types for the sampling engine.
//!
//! These are the structs the scheduler consumes. They are separate from the
//! TOML-deserialized config in `pad_config`; see `conversions`.

use std::time::Duration;

use pad_traits::{CHANNEL_COUNT, ChannelId};

/// Minimum rise required to call a step. Set once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdConfig {
    /// Threshold used for every channel without an override.
    pub global: i32,
    /// Optional per-channel overrides, channel order.
    pub per_channel: Option<[i32; CHANNEL_COUNT]>,
}

impl ThresholdConfig {
    pub const DEFAULT_THRESHOLD: i32 = 1000;

    pub const fn uniform(threshold: i32) -> Self {
        Self {
            global: threshold,
            per_channel: None,
        }
    }

    #[inline]
    pub fn for_channel(&self, channel: ChannelId) -> i32 {
        match self.per_channel {
            Some(t) => t[channel.index()],
            None => self.global,
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self::uniform(Self::DEFAULT_THRESHOLD)
    }
}

/// Rate limits for the tracing observer.
#[derive(Debug, Clone)]
pub struct ObserverCfg {
    /// At most one per-cycle summary line per interval.
    pub summary_interval: Duration,
    /// Warn once a channel has timed out this many cycles in a row.
    pub timeout_warn_after: u32,
}

impl Default for ObserverCfg {
    fn default() -> Self {
        Self {
            summary_interval: Duration::from_secs(1),
            timeout_warn_after: 10,
        }
    }
}
