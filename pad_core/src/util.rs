//! Common time/period helpers for pad_core.

use std::time::Duration;

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;
/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Tick period used when none is configured: ~80 Hz per channel.
pub const DEFAULT_TICK: Duration = Duration::from_millis(12);

/// Per-channel data-ready wait that keeps four waits inside [`DEFAULT_TICK`].
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_millis(3);

/// Per-channel sample rate implied by a tick period, in Hz.
/// - A zero period is treated as 1 µs.
#[inline]
pub fn rate_hz(period: Duration) -> f64 {
    let us = period.as_micros().max(1) as f64;
    MICROS_PER_SEC as f64 / us
}

/// Saturating conversion of a duration to whole microseconds.
#[inline]
pub fn as_micros_u64(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

/// Saturating conversion of a duration to whole milliseconds.
#[inline]
pub fn as_millis_u64(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tick_is_about_80_hz() {
        let hz = rate_hz(DEFAULT_TICK);
        assert!((83.0..84.0).contains(&hz), "{hz}");
    }

    #[test]
    fn zero_period_does_not_divide_by_zero() {
        assert_eq!(rate_hz(Duration::ZERO), MICROS_PER_SEC as f64);
    }

    #[test]
    fn conversions_saturate() {
        assert_eq!(as_millis_u64(Duration::from_secs(2)), 2 * MILLIS_PER_SEC);
        assert_eq!(as_micros_u64(Duration::MAX), u64::MAX);
    }
}
