//! Ambient trigger sources.
//!
//! The sound-analysis side lives outside this crate; it only has to deliver
//! "a trigger fired" events. Several events between two polls collapse into
//! one pulse.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel as xch;
use pad_traits::AmbientTrigger;

/// Receives trigger events from another thread.
#[derive(Debug)]
pub struct ChannelTrigger {
    rx: xch::Receiver<()>,
}

impl ChannelTrigger {
    pub fn new(rx: xch::Receiver<()>) -> Self {
        Self { rx }
    }
}

impl AmbientTrigger for ChannelTrigger {
    fn poll(&mut self) -> bool {
        self.rx.try_iter().count() > 0
    }
}

/// Sender side for `ChannelTrigger`. Events are dropped once `capacity` are
/// pending, which is harmless since they coalesce anyway.
pub fn trigger_channel(capacity: usize) -> (TriggerSender, ChannelTrigger) {
    let (tx, rx) = xch::bounded(capacity.max(1));
    (TriggerSender { tx }, ChannelTrigger::new(rx))
}

#[derive(Debug, Clone)]
pub struct TriggerSender {
    tx: xch::Sender<()>,
}

impl TriggerSender {
    /// Report one trigger. Returns `false` once the scheduler side is gone.
    pub fn fire(&self) -> bool {
        !matches!(self.tx.try_send(()), Err(xch::TrySendError::Disconnected(_)))
    }
}

/// Shared flag; `raise` from anywhere, cleared by the poll that sees it.
#[derive(Debug, Clone, Default)]
pub struct FlagTrigger {
    flag: Arc<AtomicBool>,
}

impl FlagTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

impl AmbientTrigger for FlagTrigger {
    fn poll(&mut self) -> bool {
        self.flag.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_events_coalesce_into_one_poll() {
        let (tx, mut trig) = trigger_channel(8);
        assert!(!trig.poll());
        assert!(tx.fire());
        assert!(tx.fire());
        assert!(trig.poll());
        assert!(!trig.poll());
    }

    #[test]
    fn full_channel_still_counts_as_live() {
        let (tx, mut trig) = trigger_channel(1);
        assert!(tx.fire());
        assert!(tx.fire());
        assert!(trig.poll());
        drop(trig);
        assert!(!tx.fire());
    }

    #[test]
    fn flag_is_cleared_by_poll() {
        let f = FlagTrigger::new();
        let mut polled = f.clone();
        f.raise();
        assert!(polled.poll());
        assert!(!polled.poll());
    }
}
