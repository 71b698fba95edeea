//! Simulated HX711 bank and gate outputs.
//!
//! The bank models the device side of the two-wire protocol: a channel with a
//! queued word pulls its data line low, then shifts one bit (MSB first) per
//! rising clock edge. Pulses beyond the 24th are counted as gain pulses and
//! DOUT returns high. Only the channel that most recently reported ready sees
//! the clock, which mirrors one read in flight at a time on the shared line.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pad_traits::{Actuator, CHANNEL_COUNT, ChannelConfig, ChannelId, Clock, InputLine, Level, OutputLine};

use crate::error::Result;
use crate::hx711::{Hx711Bus, to_word};

const DATA_BITS: u32 = 24;

/// A finished transfer as seen by the simulated device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedRead {
    pub word: u32,
    /// Clock pulses after the 24 data bits.
    pub extra_pulses: u32,
}

#[derive(Debug, Clone, Copy)]
struct Transfer {
    word: u32,
    pulses: u32,
}

#[derive(Debug, Default)]
struct SimDevice {
    queue: VecDeque<u32>,
    pattern: Vec<u32>,
    pattern_pos: usize,
    transfer: Option<Transfer>,
    completed: Vec<CompletedRead>,
}

impl SimDevice {
    fn next_word(&mut self) -> Option<u32> {
        if let Some(w) = self.queue.pop_front() {
            return Some(w);
        }
        if self.pattern.is_empty() {
            return None;
        }
        let w = self.pattern[self.pattern_pos % self.pattern.len()];
        self.pattern_pos = self.pattern_pos.wrapping_add(1);
        Some(w)
    }

    /// Close a transfer that has gone past its data bits.
    fn settle(&mut self) {
        if let Some(t) = self.transfer
            && t.pulses > DATA_BITS
        {
            self.completed.push(CompletedRead {
                word: t.word,
                extra_pulses: t.pulses - DATA_BITS,
            });
            self.transfer = None;
        }
    }
}

#[derive(Debug)]
struct BankState {
    devices: Vec<SimDevice>,
    active: Option<usize>,
    sck: Level,
    rising_edges: u64,
}

impl BankState {
    fn read(&mut self, idx: usize) -> Level {
        self.devices[idx].settle();
        if let Some(t) = self.devices[idx].transfer {
            return match t.pulses {
                0 => Level::Low,
                p if p <= DATA_BITS => Level::from((t.word >> (DATA_BITS - p)) & 1 == 1),
                _ => Level::High,
            };
        }
        match self.devices[idx].next_word() {
            Some(word) => {
                for dev in &mut self.devices {
                    dev.settle();
                }
                self.devices[idx].transfer = Some(Transfer { word, pulses: 0 });
                self.active = Some(idx);
                Level::Low
            }
            None => Level::High,
        }
    }

    fn drive_clock(&mut self, level: Level) {
        if level.is_high() && self.sck.is_low() {
            self.rising_edges += 1;
            if let Some(idx) = self.active
                && let Some(t) = self.devices[idx].transfer.as_mut()
            {
                t.pulses += 1;
            }
        }
        self.sck = level;
    }
}

/// Shared handle to four simulated HX711 devices.
#[derive(Debug, Clone)]
pub struct SimHx711Bank {
    state: Arc<Mutex<BankState>>,
}

impl Default for SimHx711Bank {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHx711Bank {
    pub fn new() -> Self {
        let devices = (0..CHANNEL_COUNT).map(|_| SimDevice::default()).collect();
        Self {
            state: Arc::new(Mutex::new(BankState {
                devices,
                active: None,
                sck: Level::Low,
                rising_edges: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BankState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn clock_line(&self) -> SimClockLine {
        SimClockLine {
            state: self.state.clone(),
        }
    }

    pub fn data_line(&self, channel: ChannelId) -> SimDataLine {
        SimDataLine {
            state: self.state.clone(),
            idx: channel.index(),
        }
    }

    /// Queue one signed reading for `channel`.
    pub fn push_value(&self, channel: ChannelId, value: i32) {
        self.push_word(channel, to_word(value));
    }

    /// Queue one raw 24-bit word for `channel`.
    pub fn push_word(&self, channel: ChannelId, word: u32) {
        self.lock().devices[channel.index()].queue.push_back(word);
    }

    /// Readings served round-robin once the queue is empty.
    pub fn set_pattern(&self, channel: ChannelId, values: &[i32]) {
        let mut st = self.lock();
        let dev = &mut st.devices[channel.index()];
        dev.pattern = values.iter().copied().map(to_word).collect();
        dev.pattern_pos = 0;
    }

    /// Drop everything queued for `channel`; its data line stays high.
    pub fn set_never_ready(&self, channel: ChannelId) {
        let mut st = self.lock();
        let dev = &mut st.devices[channel.index()];
        dev.queue.clear();
        dev.pattern.clear();
    }

    /// Transfers the device has seen complete, oldest first.
    pub fn completed(&self, channel: ChannelId) -> Vec<CompletedRead> {
        let mut st = self.lock();
        let dev = &mut st.devices[channel.index()];
        dev.settle();
        dev.completed.clone()
    }

    /// Rising clock edges observed since creation.
    pub fn rising_edges(&self) -> u64 {
        self.lock().rising_edges
    }

    /// Current level of the shared clock line.
    pub fn clock_level(&self) -> Level {
        self.lock().sck
    }

    /// Build a bus over this bank for the given channel wiring.
    pub fn bus<K: Clock>(
        &self,
        configs: &[ChannelConfig],
        clock: K,
    ) -> Result<Hx711Bus<SimClockLine, SimDataLine, K>> {
        let mut bus = Hx711Bus::new(self.clock_line(), clock);
        for cfg in configs {
            bus.add_channel(cfg.clone(), self.data_line(cfg.id))?;
        }
        Ok(bus)
    }
}

/// Host side of the simulated shared clock line.
#[derive(Debug)]
pub struct SimClockLine {
    state: Arc<Mutex<BankState>>,
}

impl OutputLine for SimClockLine {
    fn set_line(&mut self, level: Level) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drive_clock(level);
    }
}

/// Host side of one simulated data line.
#[derive(Debug)]
pub struct SimDataLine {
    state: Arc<Mutex<BankState>>,
    idx: usize,
}

impl InputLine for SimDataLine {
    fn read_line(&self) -> Level {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .read(self.idx)
    }
}

/// One gate write observed by [`SimGates`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEvent {
    Set { channel: ChannelId, asserted: bool },
    PulseAll,
}

#[derive(Debug, Default)]
struct GateLog {
    levels: [bool; CHANNEL_COUNT],
    events: Vec<GateEvent>,
}

/// Recording gate outputs; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct SimGates {
    log: Arc<Mutex<GateLog>>,
}

impl SimGates {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GateLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current level of every gate, channel order.
    pub fn levels(&self) -> [bool; CHANNEL_COUNT] {
        self.lock().levels
    }

    pub fn events(&self) -> Vec<GateEvent> {
        self.lock().events.clone()
    }

    /// Gate writes for one channel, oldest first.
    pub fn history(&self, channel: ChannelId) -> Vec<bool> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match *e {
                GateEvent::Set { channel: c, asserted } if c == channel => Some(asserted),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.lock().events.clear();
    }
}

impl Actuator for SimGates {
    fn set_gate(&mut self, channel: ChannelId, asserted: bool) {
        let mut log = self.lock();
        log.levels[channel.index()] = asserted;
        log.events.push(GateEvent::Set { channel, asserted });
    }

    fn pulse_all(&mut self) {
        let mut log = self.lock();
        log.levels = [true; CHANNEL_COUNT];
        log.events.push(GateEvent::PulseAll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_device_holds_data_high() {
        let bank = SimHx711Bank::new();
        let line = bank.data_line(ChannelId::ALL[0]);
        assert_eq!(line.read_line(), Level::High);
    }

    #[test]
    fn queued_word_shifts_out_msb_first() {
        let bank = SimHx711Bank::new();
        let ch = ChannelId::ALL[0];
        bank.push_word(ch, 0x80_0001);
        let mut sck = bank.clock_line();
        let dout = bank.data_line(ch);
        assert_eq!(dout.read_line(), Level::Low);

        let mut bits = Vec::new();
        for _ in 0..24 {
            sck.set_line(Level::High);
            sck.set_line(Level::Low);
            bits.push(dout.read_line().is_high());
        }
        assert!(bits[0]);
        assert!(bits[1..23].iter().all(|b| !b));
        assert!(bits[23]);

        sck.set_line(Level::High);
        sck.set_line(Level::Low);
        assert_eq!(
            bank.completed(ch),
            vec![CompletedRead {
                word: 0x80_0001,
                extra_pulses: 1
            }]
        );
    }

    #[test]
    fn pattern_cycles_after_queue_drains() {
        let bank = SimHx711Bank::new();
        let ch = ChannelId::ALL[2];
        bank.set_pattern(ch, &[1, 2]);
        let mut st = bank.lock();
        let dev = &mut st.devices[ch.index()];
        assert_eq!(dev.next_word(), Some(0x80_0001));
        assert_eq!(dev.next_word(), Some(0x80_0002));
        assert_eq!(dev.next_word(), Some(0x80_0001));
    }

    #[test]
    fn gates_record_levels_and_pulses() {
        let mut gates = SimGates::new();
        let view = gates.clone();
        gates.set_gate(ChannelId::ALL[1], true);
        assert_eq!(view.levels(), [false, true, false, false]);
        gates.pulse_all();
        assert_eq!(view.levels(), [true; 4]);
        assert_eq!(view.history(ChannelId::ALL[1]), vec![true]);
        assert_eq!(view.events().last(), Some(&GateEvent::PulseAll));
    }
}
