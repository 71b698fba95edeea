//! Per-channel memory owned by the scheduler.

use pad_traits::RawSample;

use crate::detector::Decision;

/// Last accepted weight, last sample and gate level of one channel.
///
/// Only the scheduler mutates it; everyone else sees copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelState {
    previous_weight: i32,
    last_sample: Option<RawSample>,
    step_asserted: bool,
    consecutive_timeouts: u32,
}

impl ChannelState {
    /// Last valid reading; 0 until the first one arrives.
    #[inline]
    pub fn previous_weight(&self) -> i32 {
        self.previous_weight
    }

    /// Most recent acquisition outcome, `None` before the first cycle.
    #[inline]
    pub fn last_sample(&self) -> Option<RawSample> {
        self.last_sample
    }

    #[inline]
    pub fn step_asserted(&self) -> bool {
        self.step_asserted
    }

    /// Timeouts since the last valid sample.
    #[inline]
    pub fn consecutive_timeouts(&self) -> u32 {
        self.consecutive_timeouts
    }

    #[inline]
    pub fn is_timed_out(&self) -> bool {
        self.last_sample.is_some_and(RawSample::is_timeout)
    }

    pub(crate) fn apply(&mut self, sample: RawSample, decision: Decision) {
        self.last_sample = Some(sample);
        self.previous_weight = decision.previous_weight;
        self.step_asserted = decision.step_asserted;
        self.consecutive_timeouts = if sample.is_timeout() {
            self.consecutive_timeouts.saturating_add(1)
        } else {
            0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_zeroed_and_unsampled() {
        let s = ChannelState::default();
        assert_eq!(s.previous_weight(), 0);
        assert_eq!(s.last_sample(), None);
        assert!(!s.step_asserted());
        assert!(!s.is_timed_out());
    }

    #[test]
    fn timeouts_count_until_a_valid_sample() {
        let mut s = ChannelState::default();
        let hold = Decision {
            previous_weight: 0,
            step_asserted: false,
        };
        s.apply(RawSample::Timeout, hold);
        s.apply(RawSample::Timeout, hold);
        assert_eq!(s.consecutive_timeouts(), 2);
        assert!(s.is_timed_out());

        s.apply(
            RawSample::Value(7),
            Decision {
                previous_weight: 7,
                step_asserted: false,
            },
        );
        assert_eq!(s.consecutive_timeouts(), 0);
        assert_eq!(s.previous_weight(), 7);
        assert!(!s.is_timed_out());
    }
}
