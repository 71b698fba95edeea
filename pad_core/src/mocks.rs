//! Test and helper mocks for pad_core

use std::collections::VecDeque;
use pad_traits::{CHANNEL_COUNT, ChannelConfig, ChannelId, Gain, LoadCellBus, RawSample};

use crate::util::DEFAULT_READY_TIMEOUT;

/// Clock pin used by [`default_wiring`].
pub const DEFAULT_SCK: u8 = 8;
/// Data pins used by [`default_wiring`], channel order.
pub const DEFAULT_DATA: [u8; CHANNEL_COUNT] = [4, 5, 6, 7];

/// A valid four-channel wiring on one shared clock line.
pub fn default_wiring() -> Vec<ChannelConfig> {
    ChannelId::ALL
        .iter()
        .map(|&id| ChannelConfig {
            id,
            data_pin: DEFAULT_DATA[id.index()],
            clock_pin: DEFAULT_SCK,
            gain: Gain::A128,
            ready_timeout: DEFAULT_READY_TIMEOUT,
        })
        .collect()
}

/// Bus that replays scripted samples per channel, then reports `Timeout`.
#[derive(Debug, Clone)]
pub struct ScriptedBus {
    wiring: Vec<ChannelConfig>,
    scripts: [VecDeque<RawSample>; CHANNEL_COUNT],
    acquired: Vec<ChannelId>,
}

impl ScriptedBus {
    pub fn new() -> Self {
        Self::with_wiring(default_wiring())
    }

    pub fn with_wiring(wiring: Vec<ChannelConfig>) -> Self {
        Self {
            wiring,
            scripts: Default::default(),
            acquired: Vec::new(),
        }
    }

    pub fn push(&mut self, channel: ChannelId, sample: RawSample) -> &mut Self {
        self.scripts[channel.index()].push_back(sample);
        self
    }

    pub fn push_values(&mut self, channel: ChannelId, values: &[i32]) -> &mut Self {
        self.scripts[channel.index()].extend(values.iter().copied().map(RawSample::Value));
        self
    }

    /// Channels in the order they were acquired.
    pub fn acquired(&self) -> &[ChannelId] {
        &self.acquired
    }
}

impl Default for ScriptedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadCellBus for ScriptedBus {
    fn channels(&self) -> &[ChannelConfig] {
        &self.wiring
    }

    fn acquire(&mut self, channel: ChannelId) -> RawSample {
        self.acquired.push(channel);
        self.scripts[channel.index()]
            .pop_front()
            .unwrap_or(RawSample::Timeout)
    }
}
