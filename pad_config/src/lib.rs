#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the dance-pad engine.
//!
//! `Config` and its sections are deserialized from TOML and checked with
//! `Config::validate`. Everything except `[pins]` has defaults.
use serde::Deserialize;

/// Number of load-cell channels the schema describes.
pub const CHANNELS: usize = 4;

#[derive(Debug, Deserialize, Clone)]
pub struct Pins {
    /// Shared HX711 clock (PD_SCK), BCM numbering.
    pub sck: u8,
    /// HX711 data (DOUT) per channel, channel order.
    pub data: Vec<u8>,
    /// Gate output per channel, channel order.
    pub gates: Vec<u8>,
    /// Optional ambient trigger input.
    pub ambient_in: Option<u8>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GainCfg {
    #[default]
    A128,
    B32,
    A64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Hx711Cfg {
    pub gain: GainCfg,
    /// Max wait for data-ready (DOUT low) before the channel reports a timeout.
    /// All four waits together must fit in one scheduler tick.
    pub ready_timeout_ms: u64,
    /// Poll interval while waiting for data-ready.
    pub poll_us: u64,
}

impl Default for Hx711Cfg {
    fn default() -> Self {
        Self {
            gain: GainCfg::A128,
            ready_timeout_ms: 3,
            poll_us: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DetectorCfg {
    pub threshold: i32,
    /// Optional per-channel override, channel order.
    pub per_channel: Option<Vec<i32>>,
}

impl Default for DetectorCfg {
    fn default() -> Self {
        Self {
            threshold: 1000,
            per_channel: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SchedulerCfg {
    pub tick_ms: u64,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self { tick_ms: 12 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
    /// At most one per-cycle debug summary per interval.
    pub summary_interval_ms: u64,
    /// Warn when a channel has timed out this many cycles in a row.
    pub timeout_warn_after: u32,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            file: None,
            level: None,
            rotation: None,
            summary_interval_ms: 1000,
            timeout_warn_after: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AmbientCfg {
    pub enabled: bool,
    /// Trigger input is asserted when low.
    pub active_low: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub hx711: Hx711Cfg,
    #[serde(default)]
    pub detector: DetectorCfg,
    #[serde(default)]
    pub scheduler: SchedulerCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub ambient: AmbientCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        if self.pins.data.len() != CHANNELS {
            eyre::bail!(
                "pins.data must list exactly {CHANNELS} pins, got {}",
                self.pins.data.len()
            );
        }
        if self.pins.gates.len() != CHANNELS {
            eyre::bail!(
                "pins.gates must list exactly {CHANNELS} pins, got {}",
                self.pins.gates.len()
            );
        }
        let mut used: Vec<(u8, String)> = vec![(self.pins.sck, "pins.sck".to_string())];
        let named = self
            .pins
            .data
            .iter()
            .enumerate()
            .map(|(i, &p)| (p, format!("pins.data[{i}]")))
            .chain(
                self.pins
                    .gates
                    .iter()
                    .enumerate()
                    .map(|(i, &p)| (p, format!("pins.gates[{i}]"))),
            )
            .chain(self.pins.ambient_in.map(|p| (p, "pins.ambient_in".to_string())));
        for (pin, name) in named {
            if let Some((_, first)) = used.iter().find(|(p, _)| *p == pin) {
                eyre::bail!("{name} reuses pin {pin} already assigned to {first}");
            }
            used.push((pin, name));
        }

        // HX711
        if !(1..=10_000).contains(&self.hx711.ready_timeout_ms) {
            eyre::bail!("hx711.ready_timeout_ms must be in 1..=10000");
        }
        if self.hx711.poll_us == 0 {
            eyre::bail!("hx711.poll_us must be >= 1");
        }

        // Detector
        if let Some(pc) = &self.detector.per_channel
            && pc.len() != CHANNELS
        {
            eyre::bail!(
                "detector.per_channel must list exactly {CHANNELS} thresholds, got {}",
                pc.len()
            );
        }

        // Scheduler
        if !(1..=60_000).contains(&self.scheduler.tick_ms) {
            eyre::bail!("scheduler.tick_ms must be in 1..=60000");
        }
        let ready_budget = self.hx711.ready_timeout_ms * CHANNELS as u64;
        if ready_budget > self.scheduler.tick_ms {
            eyre::bail!(
                "hx711.ready_timeout_ms x {CHANNELS} channels ({ready_budget} ms) must fit in scheduler.tick_ms ({} ms)",
                self.scheduler.tick_ms
            );
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }
        if self.logging.timeout_warn_after == 0 {
            eyre::bail!("logging.timeout_warn_after must be >= 1");
        }
        if self.logging.summary_interval_ms > 3_600_000 {
            eyre::bail!("logging.summary_interval_ms is unreasonably large (>1h)");
        }

        Ok(())
    }

    /// Ambient input pin when the trigger is enabled and wired.
    pub fn ambient_pin(&self) -> Option<u8> {
        if self.ambient.enabled {
            self.pins.ambient_in
        } else {
            None
        }
    }
}
