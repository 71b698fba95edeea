//! Raspberry Pi GPIO backend (rppal).

use std::time::Duration;

use pad_traits::{
    Actuator, AmbientTrigger, CHANNEL_COUNT, ChannelConfig, ChannelId, InputLine, Level,
    MonotonicClock, OutputLine,
};
use rppal::gpio::{Gpio, InputPin, OutputPin};

use crate::error::{HwError, Result};
use crate::hx711::Hx711Bus;

pub struct GpioOutput(OutputPin);

impl OutputLine for GpioOutput {
    #[inline]
    fn set_line(&mut self, level: Level) {
        match level {
            Level::High => self.0.set_high(),
            Level::Low => self.0.set_low(),
        }
    }
}

pub struct GpioInput(InputPin);

impl InputLine for GpioInput {
    #[inline]
    fn read_line(&self) -> Level {
        Level::from(self.0.is_high())
    }
}

fn open_gpio() -> Result<Gpio> {
    Gpio::new().map_err(|e| HwError::Gpio(format!("open gpio: {e}")))
}

fn output(gpio: &Gpio, pin: u8, what: &str) -> Result<OutputPin> {
    let mut out = gpio
        .get(pin)
        .map_err(|e| HwError::Gpio(format!("open {what} pin {pin}: {e}")))?
        .into_output();
    out.set_low();
    Ok(out)
}

fn input(gpio: &Gpio, pin: u8, what: &str) -> Result<InputPin> {
    Ok(gpio
        .get(pin)
        .map_err(|e| HwError::Gpio(format!("open {what} pin {pin}: {e}")))?
        .into_input())
}

/// Open the shared clock line and every channel's data line.
pub fn open_bus(
    configs: &[ChannelConfig],
    poll_interval: Duration,
) -> Result<Hx711Bus<GpioOutput, GpioInput, MonotonicClock>> {
    let Some(first) = configs.first() else {
        return Err(HwError::Wiring("no channels configured".into()));
    };
    let gpio = open_gpio()?;
    let sck = output(&gpio, first.clock_pin, "hx711 sck")?;
    let mut bus =
        Hx711Bus::new(GpioOutput(sck), MonotonicClock::new()).with_poll_interval(poll_interval);
    for cfg in configs {
        if cfg.clock_pin != first.clock_pin {
            return Err(HwError::Wiring(format!(
                "{} uses clock pin {} but the bus clock is {}",
                cfg.id, cfg.clock_pin, first.clock_pin
            )));
        }
        let dt = input(&gpio, cfg.data_pin, "hx711 dt")?;
        bus.add_channel(cfg.clone(), GpioInput(dt))?;
    }
    tracing::info!(sck = first.clock_pin, channels = configs.len(), "hx711 bus open");
    Ok(bus)
}

/// Gate (LED driver) outputs, one pin per channel.
pub struct GpioGates {
    pins: Vec<OutputPin>,
}

impl GpioGates {
    pub fn open(pins: [u8; CHANNEL_COUNT]) -> Result<Self> {
        let gpio = open_gpio()?;
        let pins = pins
            .iter()
            .map(|&p| output(&gpio, p, "gate"))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { pins })
    }
}

impl Actuator for GpioGates {
    fn set_gate(&mut self, channel: ChannelId, asserted: bool) {
        if let Some(pin) = self.pins.get_mut(channel.index()) {
            if asserted {
                pin.set_high();
            } else {
                pin.set_low();
            }
        }
    }
}

/// Ambient trigger wired to a GPIO input driven by the audio front end.
pub struct GpioTrigger {
    pin: InputPin,
    active_low: bool,
}

impl GpioTrigger {
    pub fn open(pin: u8, active_low: bool) -> Result<Self> {
        let gpio = open_gpio()?;
        Ok(Self {
            pin: input(&gpio, pin, "ambient")?,
            active_low,
        })
    }
}

impl AmbientTrigger for GpioTrigger {
    fn poll(&mut self) -> bool {
        self.pin.is_high() != self.active_low
    }
}
