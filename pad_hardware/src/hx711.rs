use std::time::Duration;

use pad_traits::{ChannelConfig, ChannelId, Clock, InputLine, Level, LoadCellBus, OutputLine, RawSample};
use tracing::{error, trace};

use crate::error::{HwError, Result};
use crate::util::wait_until_low_with_timeout;

/// Smallest value a 24-bit reading can take.
pub const HX711_MIN: i32 = -0x80_0000;
/// Largest value a 24-bit reading can take.
pub const HX711_MAX: i32 = 0x7F_FFFF;

const DATA_BITS: u32 = 24;
const SIGN_BIT: u32 = 0x80_0000;
const WORD_MASK: u32 = 0xFF_FFFF;

/// Default spacing between data-ready polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Convert a shifted-in 24-bit word into a reading: XOR with the sign bit,
/// then read the result as a 24-bit two's-complement value. Bits above the
/// 24th are ignored.
///
/// `to_raw_bits(sign_flip(u)) == u ^ 0x800000` for every 24-bit `u`, so a
/// zero word reads as [`HX711_MIN`] and `0xFFFFFF` as [`HX711_MAX`].
#[inline]
pub const fn sign_flip(raw: u32) -> i32 {
    let flipped = (raw & WORD_MASK) ^ SIGN_BIT;
    // sign-extend bit 23
    ((flipped << 8) as i32) >> 8
}

/// 24-bit two's-complement pattern of `value`.
#[inline]
pub const fn to_raw_bits(value: i32) -> u32 {
    (value as u32) & WORD_MASK
}

/// The word a device must shift out for [`sign_flip`] to yield `value`.
#[inline]
pub const fn to_word(value: i32) -> u32 {
    to_raw_bits(value) ^ SIGN_BIT
}

/// HX711 bank on one shared clock line with a data line per channel.
///
/// The bus owns the clock line; nothing else can toggle it while a read is in
/// progress. Only the data-ready wait may yield (through `K`); the 24-bit
/// shift and the gain pulses run without suspending.
pub struct Hx711Bus<C, D, K> {
    sck: C,
    channels: Vec<ChannelConfig>,
    data: Vec<D>,
    clock: K,
    poll_interval: Duration,
}

impl<C, D, K> Hx711Bus<C, D, K>
where
    C: OutputLine,
    D: InputLine,
    K: Clock,
{
    pub fn new(mut sck: C, clock: K) -> Self {
        sck.set_line(Level::Low); // clock idle low
        Self {
            sck,
            channels: Vec::new(),
            data: Vec::new(),
            clock,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_micros(1));
        self
    }

    /// Attach a channel's data line. Each channel id may be attached once.
    pub fn add_channel(&mut self, config: ChannelConfig, data: D) -> Result<()> {
        if self.channels.iter().any(|c| c.id == config.id) {
            return Err(HwError::Wiring(format!("{} attached twice", config.id)));
        }
        self.channels.push(config);
        self.data.push(data);
        Ok(())
    }

    pub fn with_channel(mut self, config: ChannelConfig, data: D) -> Result<Self> {
        self.add_channel(config, data)?;
        Ok(self)
    }

    fn clock_in_word(sck: &mut C, data: &D) -> u32 {
        let mut value: u32 = 0;
        for _ in 0..DATA_BITS {
            sck.set_line(Level::High);
            spin_delay();
            sck.set_line(Level::Low);
            value = (value << 1) | u32::from(data.read_line().is_high());
            spin_delay();
        }
        value
    }

    fn pulse_gain(sck: &mut C, pulses: u8) {
        for _ in 0..pulses {
            sck.set_line(Level::High);
            spin_delay();
            sck.set_line(Level::Low);
            spin_delay();
        }
    }
}

impl<C, D, K> LoadCellBus for Hx711Bus<C, D, K>
where
    C: OutputLine,
    D: InputLine,
    K: Clock,
{
    fn channels(&self) -> &[ChannelConfig] {
        &self.channels
    }

    fn acquire(&mut self, channel: ChannelId) -> RawSample {
        let Some(slot) = self.channels.iter().position(|c| c.id == channel) else {
            error!(%channel, "acquire on a channel the bus was not wired with");
            return RawSample::Timeout;
        };
        let timeout = self.channels[slot].ready_timeout;
        let gain_pulses = self.channels[slot].gain.extra_pulses();
        let data = &self.data[slot];

        self.sck.set_line(Level::Low);
        if wait_until_low_with_timeout(
            || data.read_line().is_high(),
            timeout,
            self.poll_interval,
            &self.clock,
        )
        .is_err()
        {
            trace!(%channel, ?timeout, "hx711 not ready");
            return RawSample::Timeout;
        }

        let raw = Self::clock_in_word(&mut self.sck, data);
        // Select gain for the next conversion
        Self::pulse_gain(&mut self.sck, gain_pulses);

        let value = sign_flip(raw);
        trace!(%channel, raw, value, "hx711 read");
        RawSample::Value(value)
    }
}

#[inline(always)]
fn spin_delay() {
    // A few CPU cycles; keeps the pulse well under the 50 µs power-down limit.
    std::hint::spin_loop();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_flip_extremes() {
        assert_eq!(sign_flip(0x00_0000), HX711_MIN);
        assert_eq!(sign_flip(0x00_0001), HX711_MIN + 1);
        assert_eq!(sign_flip(0x7F_FFFF), -1);
        assert_eq!(sign_flip(0x80_0000), 0);
        assert_eq!(sign_flip(0x80_0001), 1);
        assert_eq!(sign_flip(0xFF_FFFF), HX711_MAX);
    }

    #[test]
    fn sign_flip_ignores_high_byte() {
        assert_eq!(sign_flip(0xAB80_0000), 0);
        assert_eq!(sign_flip(0xAB00_0000), HX711_MIN);
    }

    #[test]
    fn sign_flip_is_xor_with_the_sign_bit() {
        assert_eq!(to_raw_bits(sign_flip(0)), 0x80_0000);
        assert_eq!(to_raw_bits(sign_flip(0xFF_FFFF)), 0x7F_FFFF);
        assert_eq!(to_raw_bits(-1), 0xFF_FFFF);
    }

    #[test]
    fn to_word_is_what_sign_flip_decodes() {
        assert_eq!(to_word(0), 0x80_0000);
        assert_eq!(to_word(1500), 0x80_05DC);
        assert_eq!(to_word(HX711_MIN), 0);
        assert_eq!(sign_flip(to_word(-2000)), -2000);
    }
}
