use std::thread;
use std::time::{Duration, Instant};

/// Monotonic time source shared by the acquisition bus and the sampling loop.
///
/// - now(): returns a monotonic Instant
/// - sleep(): suspends the caller (implementations may simulate)
/// - sleep_until(): suspends until a deadline, returning at once if it passed
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Sleep until `deadline`; no-op when the deadline is already behind us.
    fn sleep_until(&self, deadline: Instant) {
        let remaining = deadline.saturating_duration_since(self.now());
        self.sleep(remaining);
    }

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        u64::try_from(dur.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Wall-clock implementation backed by `std::time::Instant`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

#[cfg(any(test, feature = "test-clock"))]
pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Deterministic clock: `sleep(d)` advances time by `d` without blocking.
    ///
    /// Clones share the same timeline, so a bus and a scheduler built from
    /// clones of one `TestClock` observe each other's sleeps.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        offset: Arc<Mutex<Duration>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        /// Advance the clock by the given duration.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = off.saturating_add(d);
            }
        }

        /// Time elapsed on this timeline since the clock was created.
        pub fn elapsed(&self) -> Duration {
            self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO)
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + self.elapsed()
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_clock::TestClock;
    use super::*;

    #[test]
    fn sleep_until_past_deadline_does_not_advance() {
        let clock = TestClock::new();
        let start = clock.now();
        clock.advance(Duration::from_millis(5));
        clock.sleep_until(start);
        assert_eq!(clock.elapsed(), Duration::from_millis(5));
    }

    #[test]
    fn sleep_until_future_deadline_lands_on_it() {
        let clock = TestClock::new();
        let deadline = clock.now() + Duration::from_millis(12);
        clock.sleep_until(deadline);
        assert_eq!(clock.now(), deadline);
        assert_eq!(clock.ms_since(deadline - Duration::from_millis(12)), 12);
    }

    #[test]
    fn clones_share_timeline() {
        let a = TestClock::new();
        let b = a.clone();
        b.sleep(Duration::from_millis(3));
        assert_eq!(a.elapsed(), Duration::from_millis(3));
    }
}
