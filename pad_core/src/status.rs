//! Read-only view of the latest channel states for external reporters.
//!
//! Each channel is packed into one `AtomicU64`, so a reader always sees a
//! consistent weight/flags pair for that channel. Different channels may be
//! up to one cycle apart.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use pad_traits::{CHANNEL_COUNT, ChannelId};

use crate::state::ChannelState;

const STEP_BIT: u64 = 1 << 32;
const TIMEOUT_BIT: u64 = 1 << 33;

/// What the status boundary reports for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelSnapshot {
    /// Last accepted weight. Still the last good value while `is_timeout` is set.
    pub weight: i32,
    pub step_asserted: bool,
    pub is_timeout: bool,
}

impl ChannelSnapshot {
    #[inline]
    fn pack(self) -> u64 {
        let mut word = u64::from(self.weight as u32);
        if self.step_asserted {
            word |= STEP_BIT;
        }
        if self.is_timeout {
            word |= TIMEOUT_BIT;
        }
        word
    }

    #[inline]
    fn unpack(word: u64) -> Self {
        Self {
            weight: (word & 0xFFFF_FFFF) as u32 as i32,
            step_asserted: word & STEP_BIT != 0,
            is_timeout: word & TIMEOUT_BIT != 0,
        }
    }
}

impl From<&ChannelState> for ChannelSnapshot {
    fn from(s: &ChannelState) -> Self {
        Self {
            weight: s.previous_weight(),
            step_asserted: s.step_asserted(),
            is_timeout: s.is_timed_out(),
        }
    }
}

#[derive(Debug, Default)]
struct StatusBoard {
    slots: [AtomicU64; CHANNEL_COUNT],
    cycles: AtomicU64,
}

/// Cloneable, non-blocking reader of the status board.
///
/// Only the scheduler that created the board can publish to it.
#[derive(Debug, Clone, Default)]
pub struct StatusHandle {
    board: Arc<StatusBoard>,
}

impl StatusHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn publish(&self, channel: ChannelId, state: &ChannelState) {
        self.board.slots[channel.index()].store(ChannelSnapshot::from(state).pack(), Ordering::Release);
    }

    pub(crate) fn finish_cycle(&self) {
        self.board.cycles.fetch_add(1, Ordering::Release);
    }

    /// Most recent snapshot of one channel.
    pub fn read_last(&self, channel: ChannelId) -> ChannelSnapshot {
        ChannelSnapshot::unpack(self.board.slots[channel.index()].load(Ordering::Acquire))
    }

    /// Every channel, in channel order. Not atomic across channels.
    pub fn snapshot_all(&self) -> [ChannelSnapshot; CHANNEL_COUNT] {
        ChannelId::ALL.map(|id| self.read_last(id))
    }

    /// Completed cycles so far.
    pub fn cycles(&self) -> u64 {
        self.board.cycles.load(Ordering::Acquire)
    }
}
