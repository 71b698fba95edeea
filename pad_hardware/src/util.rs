use std::time::Duration;

use pad_traits::Clock;

use crate::error::{HwError, Result};

/// Wait until the provided `is_high` predicate becomes false (line goes low),
/// or `timeout` expires. Yields through `clock.sleep(poll_interval)` between
/// polls; this is the only place acquisition is allowed to suspend.
///
/// The deadline is checked before each yield, so the call returns
/// `DataReadyTimeout` no earlier than `timeout` after entry.
pub fn wait_until_low_with_timeout<K: Clock + ?Sized>(
    mut is_high: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
    clock: &K,
) -> Result<()> {
    let deadline = clock.now() + timeout;
    while is_high() {
        let now = clock.now();
        if now >= deadline {
            return Err(HwError::DataReadyTimeout);
        }
        // Never sleep past the deadline.
        clock.sleep(poll_interval.min(deadline - now));
    }
    Ok(())
}
