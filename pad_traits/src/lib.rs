//! Boundary types and capability traits shared by the pad crates.
//!
//! Hardware access goes through `OutputLine`/`InputLine` (one GPIO each),
//! `LoadCellBus` (ADC acquisition), `Actuator` (gate lines) and
//! `AmbientTrigger` (external sound event). Timing goes through `Clock`.
pub mod channel;
pub mod clock;

pub use channel::{CHANNEL_COUNT, ChannelConfig, ChannelId, Gain, RawSample};
pub use clock::{Clock, MonotonicClock};

/// Logic level of a digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    #[inline]
    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }

    #[inline]
    pub const fn is_low(self) -> bool {
        matches!(self, Level::Low)
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

/// A line the host drives (clock, gate).
pub trait OutputLine {
    fn set_line(&mut self, level: Level);
}

/// A line the host samples (ADC data out, trigger input).
pub trait InputLine {
    fn read_line(&self) -> Level;
}

/// Multi-channel load-cell front end.
pub trait LoadCellBus {
    /// Wiring of every channel this bus can acquire.
    fn channels(&self) -> &[ChannelConfig];

    /// Acquire one sample. A not-ready device is reported as `RawSample::Timeout`.
    fn acquire(&mut self, channel: ChannelId) -> RawSample;
}

/// Gate (LED/indicator) outputs. Fire and forget.
pub trait Actuator {
    fn set_gate(&mut self, channel: ChannelId, asserted: bool);

    /// All-channel override pulse, independent of the per-channel step logic.
    fn pulse_all(&mut self) {
        for id in ChannelId::ALL {
            self.set_gate(id, true);
        }
    }
}

/// Boolean "ambient trigger" event supplied by an external collaborator.
pub trait AmbientTrigger {
    /// True when at least one trigger fired since the previous poll.
    fn poll(&mut self) -> bool;
}

impl<T: LoadCellBus + ?Sized> LoadCellBus for Box<T> {
    fn channels(&self) -> &[ChannelConfig] {
        (**self).channels()
    }
    fn acquire(&mut self, channel: ChannelId) -> RawSample {
        (**self).acquire(channel)
    }
}

impl<T: Actuator + ?Sized> Actuator for Box<T> {
    fn set_gate(&mut self, channel: ChannelId, asserted: bool) {
        (**self).set_gate(channel, asserted);
    }
    fn pulse_all(&mut self) {
        (**self).pulse_all();
    }
}

impl<T: AmbientTrigger + ?Sized> AmbientTrigger for Box<T> {
    fn poll(&mut self) -> bool {
        (**self).poll()
    }
}
