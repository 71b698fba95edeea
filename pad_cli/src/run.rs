//! Backend assembly, the sampling loop and result printing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use pad_core::conversions::{channel_configs, poll_interval, tick_period};
use pad_core::error::{PadError, Result};
use pad_core::scheduler::BoxedTrigger;
use pad_core::{ChannelSnapshot, CycleReport, RunSummary, SchedulerBuilder, ThresholdConfig};
use pad_traits::{Actuator, ChannelConfig, ChannelId, LoadCellBus, RawSample};
use serde_json::json;

use crate::cli::RtArgs;

/// Options for `padctl run`.
#[derive(Debug, Clone, Copy)]
pub struct RunOpts {
    pub cycles: Option<u64>,
    pub tick_ms: Option<u64>,
    pub threshold: Option<i32>,
    pub stats: bool,
    pub rt: RtArgs,
}

// ── Simulated backend ────────────────────────────────────────────────────────

/// Env knob for tests: this channel's simulated HX711 never signals ready.
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
const SIM_TIMEOUT_ENV: &str = "PAD_TEST_SIM_TIMEOUT";

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn sim_pattern(id: ChannelId) -> Vec<i32> {
    // A 12-cycle press every 48 cycles, staggered per channel.
    let base = i32::from(id.get()) * 100;
    (0..48usize)
        .map(|i| {
            let phase = (i + id.index() * 12) % 48;
            if phase < 12 {
                base + 6000
            } else {
                base + (phase % 3) as i32 * 40
            }
        })
        .collect()
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn sim_timeout_channel() -> Option<ChannelId> {
    let raw = std::env::var(SIM_TIMEOUT_ENV).ok()?;
    let id = raw.trim().parse::<u8>().ok().and_then(ChannelId::new);
    if id.is_none() {
        tracing::warn!(value = %raw, "{SIM_TIMEOUT_ENV} must be a channel number 1..=4; ignored");
    }
    id
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn open_bus(
    cfg: &pad_config::Config,
    wiring: &[ChannelConfig],
) -> Result<impl LoadCellBus + Send + 'static> {
    let bank = pad_hardware::SimHx711Bank::new();
    for id in ChannelId::ALL {
        bank.set_pattern(id, &sim_pattern(id));
    }
    if let Some(id) = sim_timeout_channel() {
        tracing::info!(channel = %id, "simulated load cell held not-ready");
        bank.set_never_ready(id);
    }
    let bus = bank
        .bus(wiring, pad_traits::MonotonicClock::new())?
        .with_poll_interval(poll_interval(cfg));
    tracing::info!(channels = wiring.len(), "simulated hx711 bank ready");
    Ok(bus)
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn open_gates(_cfg: &pad_config::Config) -> Result<impl Actuator + Send + 'static> {
    Ok(pad_hardware::SimGates::new())
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn open_ambient(cfg: &pad_config::Config) -> Result<Option<BoxedTrigger>> {
    if cfg.ambient.enabled {
        tracing::warn!("ambient trigger needs a hardware build; ignored in simulation");
    }
    Ok(None)
}

// ── Hardware backend ─────────────────────────────────────────────────────────

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn open_bus(
    cfg: &pad_config::Config,
    wiring: &[ChannelConfig],
) -> Result<impl LoadCellBus + Send + 'static> {
    Ok(pad_hardware::gpio::open_bus(wiring, poll_interval(cfg))?)
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn open_gates(cfg: &pad_config::Config) -> Result<impl Actuator + Send + 'static> {
    let pins = pad_core::conversions::gate_pins(cfg)?;
    Ok(pad_hardware::gpio::GpioGates::open(pins)?)
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn open_ambient(cfg: &pad_config::Config) -> Result<Option<BoxedTrigger>> {
    match cfg.ambient_pin() {
        Some(pin) => {
            let trigger = pad_hardware::gpio::GpioTrigger::open(pin, cfg.ambient.active_low)?;
            tracing::info!(pin, active_low = cfg.ambient.active_low, "ambient trigger enabled");
            Ok(Some(Box::new(trigger)))
        }
        None => {
            if cfg.ambient.enabled {
                tracing::warn!("ambient.enabled is set but pins.ambient_in is missing; ignored");
            }
            Ok(None)
        }
    }
}

// ── Commands ─────────────────────────────────────────────────────────────────

pub fn run(
    cfg: &pad_config::Config,
    opts: &RunOpts,
    shutdown: &Arc<AtomicBool>,
    json: bool,
) -> Result<()> {
    let wiring = channel_configs(cfg)?;
    let thresholds = match opts.threshold {
        Some(t) => ThresholdConfig::uniform(t),
        None => ThresholdConfig::try_from(&cfg.detector)?,
    };
    let period = opts
        .tick_ms
        .map_or_else(|| tick_period(cfg), Duration::from_millis);

    let mut builder = SchedulerBuilder::new(open_bus(cfg, &wiring)?, open_gates(cfg)?)
        .with_threshold(thresholds)
        .with_period(period)
        .with_observer_cfg((&cfg.logging).into());
    if let Some(trigger) = open_ambient(cfg)? {
        builder = builder.with_ambient(trigger);
    }
    let mut sched = builder.build()?;
    let status = sched.status();

    #[cfg(unix)]
    crate::rt::setup_rt_once(&opts.rt);

    let mut stats = CycleStats::default();
    if opts.cycles == Some(0) {
        shutdown.store(true, Ordering::Release);
    }
    tracing::info!(
        period_ms = pad_core::util::as_millis_u64(period),
        cycles = ?opts.cycles,
        "sampling start"
    );
    let summary = sched.run_with(shutdown, |report| {
        if opts.stats {
            stats.record(&report);
        }
        if opts.cycles.is_some_and(|n| report.cycle >= n) {
            shutdown.store(true, Ordering::Release);
        }
    });
    tracing::info!(cycles = summary.cycles, overruns = summary.overruns, "sampling stopped");

    if opts.stats {
        stats.print(&summary, period);
    }
    print_status(&summary, &status.snapshot_all(), json);
    Ok(())
}

pub fn self_check(cfg: &pad_config::Config, json: bool) -> Result<()> {
    let wiring = channel_configs(cfg)?;
    pad_core::validate_wiring(&wiring)?;
    let mut bus = open_bus(cfg, &wiring)?;

    let samples = ChannelId::ALL.map(|id| (id, bus.acquire(id)));
    let responding = samples.iter().filter(|(_, s)| !s.is_timeout()).count();

    if json {
        let channels: Vec<_> = samples
            .iter()
            .map(|(id, s)| match s {
                RawSample::Value(v) => json!({ "channel": id.get(), "value": v, "timeout": false }),
                RawSample::Timeout => json!({ "channel": id.get(), "value": null, "timeout": true }),
            })
            .collect();
        println!("{}", json!({ "responding": responding, "channels": channels }));
    } else {
        for (id, s) in &samples {
            match s {
                RawSample::Value(v) => println!("{id}: value {v}"),
                RawSample::Timeout => println!("{id}: timeout"),
            }
        }
    }

    if responding == 0 {
        return Err(eyre::Report::new(PadError::Hardware(
            "no load cell responded on any channel".into(),
        )));
    }
    if !json {
        println!("self-check ok: {responding}/{} channels responded", samples.len());
    }
    Ok(())
}

// ── Output ───────────────────────────────────────────────────────────────────

fn print_status(summary: &RunSummary, snaps: &[ChannelSnapshot], json: bool) {
    if json {
        let channels: Vec<_> = snaps
            .iter()
            .zip(ChannelId::ALL)
            .map(|(s, id)| {
                json!({
                    "channel": id.get(),
                    "weight": s.weight,
                    "step": s.step_asserted,
                    "timeout": s.is_timeout,
                })
            })
            .collect();
        println!(
            "{}",
            json!({
                "cycles": summary.cycles,
                "overruns": summary.overruns,
                "timeouts": summary.timeouts_per_channel,
                "max_cycle_us": pad_core::util::as_micros_u64(summary.max_cycle),
                "channels": channels,
            })
        );
        return;
    }
    println!(
        "cycles={} overruns={} timeouts={:?}",
        summary.cycles, summary.overruns, summary.timeouts_per_channel
    );
    for (s, id) in snaps.iter().zip(ChannelId::ALL) {
        println!(
            "{id} weight={} step={} timeout={}",
            s.weight, s.step_asserted, s.is_timeout
        );
    }
}

/// Running cycle-latency statistics for `--stats`; constant memory however
/// long the loop runs.
#[derive(Debug, Default)]
struct CycleStats {
    count: u64,
    min_us: u64,
    max_us: u64,
    mean_us: f64,
    // Welford accumulator: sum of squared deviations from the running mean
    m2: f64,
    rising_edges: u64,
}

impl CycleStats {
    fn record(&mut self, report: &CycleReport) {
        let us = pad_core::util::as_micros_u64(report.elapsed);
        if self.count == 0 {
            self.min_us = us;
            self.max_us = us;
        } else {
            self.min_us = self.min_us.min(us);
            self.max_us = self.max_us.max(us);
        }
        self.count += 1;
        let x = us as f64;
        let delta = x - self.mean_us;
        self.mean_us += delta / self.count as f64;
        self.m2 += delta * (x - self.mean_us);
        self.rising_edges += report.channels.iter().filter(|c| c.rising).count() as u64;
    }

    fn stdev_us(&self) -> f64 {
        if self.count > 1 {
            (self.m2 / (self.count - 1) as f64).sqrt()
        } else {
            0.0
        }
    }

    /// Print latency/jitter stats to stderr.
    fn print(&self, summary: &RunSummary, period: Duration) {
        eprintln!("\n--- Pad Stats ---");
        eprintln!("Cycles: {}", summary.cycles);
        eprintln!(
            "Period (us): {} ({:.1} Hz per channel)",
            pad_core::util::as_micros_u64(period),
            pad_core::util::rate_hz(period)
        );
        eprintln!(
            "Cycle time min/avg/max/stdev (us): {} / {:.1} / {} / {:.1}",
            self.min_us,
            self.mean_us,
            self.max_us,
            self.stdev_us()
        );
        eprintln!("Overruns (> period): {}", summary.overruns);
        eprintln!("Timeouts per channel: {:?}", summary.timeouts_per_channel);
        eprintln!("Step edges: {}", self.rising_edges);
        eprintln!("-----------------\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(cycle: u64, elapsed_us: u64, rising_on: Option<usize>) -> CycleReport {
        let mut channels = ChannelId::ALL.map(|id| pad_core::ChannelOutcome {
            channel: id,
            sample: RawSample::Value(0),
            weight: 0,
            step_asserted: false,
            rising: false,
            prior_timeouts: 0,
            consecutive_timeouts: 0,
        });
        if let Some(i) = rising_on {
            channels[i].rising = true;
        }
        CycleReport {
            cycle,
            started: std::time::Instant::now(),
            elapsed: Duration::from_micros(elapsed_us),
            channels,
            ambient_fired: false,
        }
    }

    #[test]
    fn stats_accumulate_edges_and_latency() {
        let mut stats = CycleStats::default();
        stats.record(&report(1, 420, Some(2)));
        assert_eq!((stats.min_us, stats.max_us), (420, 420));
        assert_eq!(stats.stdev_us(), 0.0);
        stats.record(&report(2, 380, None));
        assert_eq!((stats.min_us, stats.max_us), (380, 420));
        assert!((stats.mean_us - 400.0).abs() < 1e-9);
        assert!((stats.stdev_us() - 800f64.sqrt()).abs() < 1e-9);
        assert_eq!(stats.rising_edges, 1);
    }

    #[test]
    fn stats_stay_exact_over_a_long_run() {
        let mut stats = CycleStats::default();
        for n in 0..10_000u64 {
            stats.record(&report(n + 1, 100 + n % 3, None));
        }
        assert_eq!(stats.count, 10_000);
        assert_eq!((stats.min_us, stats.max_us), (100, 102));
        assert!((stats.mean_us - 101.0).abs() < 0.01);
    }

    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    #[test]
    fn sim_patterns_press_once_per_period() {
        for id in ChannelId::ALL {
            let p = sim_pattern(id);
            assert_eq!(p.len(), 48);
            assert_eq!(p.iter().filter(|&&v| v > 5000).count(), 12);
        }
    }
}
