//! Channel identity, amplifier gain and acquisition outcome.

use std::fmt;
use std::time::Duration;

/// Number of load-cell channels on the pad.
pub const CHANNEL_COUNT: usize = 4;

/// Identifies one load-cell circuit, 1..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u8);

impl ChannelId {
    /// All channels in sampling order.
    pub const ALL: [ChannelId; CHANNEL_COUNT] =
        [ChannelId(1), ChannelId(2), ChannelId(3), ChannelId(4)];

    /// Returns `None` outside 1..=4.
    pub const fn new(n: u8) -> Option<Self> {
        if n >= 1 && n as usize <= CHANNEL_COUNT {
            Some(Self(n))
        } else {
            None
        }
    }

    /// Channel for a zero-based slot index.
    pub const fn from_index(idx: usize) -> Option<Self> {
        if idx < CHANNEL_COUNT {
            Some(Self(idx as u8 + 1))
        } else {
            None
        }
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Zero-based slot index, 0..=3.
    #[inline]
    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

/// Amplifier gain; selected by the number of clock pulses after the 24 data bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gain {
    /// Channel A, gain 128.
    #[default]
    A128,
    /// Channel B, gain 32.
    B32,
    /// Channel A, gain 64.
    A64,
}

impl Gain {
    /// Extra clock pulses emitted after the data bits (datasheet mapping).
    pub const fn extra_pulses(self) -> u8 {
        match self {
            Gain::A128 => 1,
            Gain::B32 => 2,
            Gain::A64 => 3,
        }
    }
}

/// Wiring and acquisition contract for one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub id: ChannelId,
    /// Per-channel data (DOUT) line.
    pub data_pin: u8,
    /// Shared clock (PD_SCK) line.
    pub clock_pin: u8,
    pub gain: Gain,
    /// How long to wait for the data line to signal "ready".
    pub ready_timeout: Duration,
}

/// Outcome of one acquisition attempt. Never partially valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawSample {
    /// Signed 24-bit reading, −8_388_608..=8_388_607.
    Value(i32),
    /// The device did not signal ready within the configured wait.
    Timeout,
}

impl RawSample {
    #[inline]
    pub const fn value(self) -> Option<i32> {
        match self {
            RawSample::Value(v) => Some(v),
            RawSample::Timeout => None,
        }
    }

    #[inline]
    pub const fn is_timeout(self) -> bool {
        matches!(self, RawSample::Timeout)
    }
}
