//! Step decision for one channel.
//!
//! The comparison is a shifted absolute level against the previous accepted
//! reading: a step is asserted when `current - threshold > previous`. It is
//! evaluated in `i64`, so extreme thresholds cannot wrap the way a 32-bit
//! `current - previous > threshold` would.

use pad_traits::{ChannelId, RawSample};

use crate::config::ThresholdConfig;
use crate::state::ChannelState;

/// Outcome of one decision: the new "previous" weight and the gate level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub previous_weight: i32,
    pub step_asserted: bool,
}

/// Pure decision function.
///
/// A `Timeout` leaves both the weight and the gate level untouched. A valid
/// sample always becomes the new previous weight. The subtraction is done in
/// `i64` so no threshold can overflow it.
#[inline]
pub fn decide(
    previous_weight: i32,
    previous_step: bool,
    sample: RawSample,
    threshold: i32,
) -> Decision {
    match sample {
        RawSample::Timeout => Decision {
            previous_weight,
            step_asserted: previous_step,
        },
        RawSample::Value(w) => Decision {
            previous_weight: w,
            step_asserted: i64::from(w) - i64::from(threshold) > i64::from(previous_weight),
        },
    }
}

/// Applies the process-wide threshold policy per channel.
#[derive(Debug, Clone, Default)]
pub struct StepDetector {
    thresholds: ThresholdConfig,
}

impl StepDetector {
    pub fn new(thresholds: ThresholdConfig) -> Self {
        Self { thresholds }
    }

    #[inline]
    pub fn threshold_for(&self, channel: ChannelId) -> i32 {
        self.thresholds.for_channel(channel)
    }

    pub fn thresholds(&self) -> &ThresholdConfig {
        &self.thresholds
    }

    #[inline]
    pub fn decide_for(
        &self,
        channel: ChannelId,
        state: &ChannelState,
        sample: RawSample,
    ) -> Decision {
        decide(
            state.previous_weight(),
            state.step_asserted(),
            sample,
            self.threshold_for(channel),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 1500, true)]
    #[case(0, 900, false)]
    #[case(0, 1000, false)]
    #[case(0, 1001, true)]
    #[case(2000, 2500, false)]
    #[case(2000, 3500, true)]
    #[case(2000, 3000, false)]
    fn threshold_1000_table(#[case] prev: i32, #[case] w: i32, #[case] expect: bool) {
        let d = decide(prev, false, RawSample::Value(w), 1000);
        assert_eq!(d.step_asserted, expect);
        assert_eq!(d.previous_weight, w);
    }

    #[test]
    fn negative_threshold_asserts_on_small_drops() {
        // 0 - (-100) = 100 > 50
        let d = decide(50, false, RawSample::Value(0), -100);
        assert!(d.step_asserted);
    }

    #[test]
    fn timeout_holds_weight_and_gate() {
        for prev_step in [false, true] {
            let d = decide(1234, prev_step, RawSample::Timeout, 1000);
            assert_eq!(d.previous_weight, 1234);
            assert_eq!(d.step_asserted, prev_step);
        }
    }

    #[test]
    fn extreme_threshold_does_not_overflow() {
        let d = decide(0, false, RawSample::Value(i32::MIN), i32::MAX);
        assert!(!d.step_asserted);
        let d = decide(i32::MIN, false, RawSample::Value(i32::MAX), i32::MIN);
        assert!(d.step_asserted);
    }

    #[test]
    fn per_channel_threshold_wins() {
        let det = StepDetector::new(ThresholdConfig {
            global: 1000,
            per_channel: Some([10, 20, 30, 40]),
        });
        assert_eq!(det.threshold_for(ChannelId::ALL[2]), 30);
        let det = StepDetector::new(ThresholdConfig::uniform(5));
        assert_eq!(det.threshold_for(ChannelId::ALL[3]), 5);
    }
}
