//! Human-readable error descriptions and structured JSON error formatting.

use pad_core::error::{BuildError, PadError};
use pad_hardware::HwError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingChannel(n) => format!(
                "What happened: Load-cell channel {n} is not wired.\nLikely causes: [pins].data lists fewer than four pins, or the bus was assembled without that channel.\nHow to fix: List one data pin per channel in [pins].data (channel order 1..4)."
            ),
            BuildError::DuplicateChannel(n) => format!(
                "What happened: Load-cell channel {n} is wired more than once.\nLikely causes: The bus was assembled with the same channel twice.\nHow to fix: Wire each of channels 1..4 exactly once."
            ),
            BuildError::ClockPinMismatch(a, b) => format!(
                "What happened: Channels disagree on the shared clock pin ({a} vs {b}).\nLikely causes: All HX711 boards must share one PD_SCK line.\nHow to fix: Set a single [pins].sck and wire every HX711 clock input to it."
            ),
            BuildError::ConflictingLine { pin, first, second } => format!(
                "What happened: Pin {pin} is used by both {first} and {second}.\nLikely causes: A data pin repeats, or equals the clock pin.\nHow to fix: Give every line its own GPIO in [pins]."
            ),
            BuildError::ReadyBudget { total, period } => format!(
                "What happened: The HX711 ready timeouts add up to {total:?}, which does not fit in one {period:?} tick.\nLikely causes: hx711.ready_timeout_ms is too high for scheduler.tick_ms or --tick-ms.\nHow to fix: Keep hx711.ready_timeout_ms x 4 at or below the tick period."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(pe) = err.downcast_ref::<PadError>() {
        return match pe {
            PadError::Config(msg) => format!(
                "What happened: Configuration is invalid or incomplete ({msg}).\nLikely causes: Missing [pins] (sck, data, gates), a typo in a key, or out-of-range values.\nHow to fix: Edit the TOML config and try again."
            ),
            PadError::Hardware(msg) => format!(
                "What happened: {msg}.\nLikely causes: HX711 boards unpowered, DOUT/PD_SCK swapped or on the wrong pins, or a tick shorter than the boards' output rate.\nHow to fix: Check [pins] and 5V/GND at each board; for boards at 10 SPS raise scheduler.tick_ms together with hx711.ready_timeout_ms."
            ),
            PadError::State(msg) => format!(
                "What happened: Internal state error ({msg}).\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(he) = err.downcast_ref::<HwError>() {
        return match he {
            HwError::Gpio(msg) => format!(
                "What happened: Failed to initialize GPIO ({msg}).\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process can access /dev/gpiomem."
            ),
            HwError::DataReadyTimeout => "What happened: HX711 did not signal data-ready within the configured timeout.\nLikely causes: Wrong DOUT/PD_SCK pins, wiring/power issues, or timeout configured too low.\nHow to fix: Check [pins] in the config, verify 5V/GND, and raise hx711.ready_timeout_ms.".to_string(),
            HwError::Wiring(msg) => format!(
                "What happened: Bus wiring rejected ({msg}).\nLikely causes: The same channel was attached twice.\nHow to fix: Wire each channel once."
            ),
            HwError::Io(e) => format!(
                "What happened: I/O error ({e}).\nLikely causes: Device access denied or unavailable.\nHow to fix: Check permissions and that the device exists."
            ),
        };
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Startup configuration problems exit with 2, everything else with 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some()
        || matches!(err.downcast_ref::<PadError>(), Some(PadError::Config(_)))
    {
        return 2;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingChannel(_) => "MissingChannel",
            BuildError::DuplicateChannel(_) => "DuplicateChannel",
            BuildError::ClockPinMismatch(..) => "ClockPinMismatch",
            BuildError::ConflictingLine { .. } => "ConflictingLine",
            BuildError::ReadyBudget { .. } => "ReadyBudget",
            BuildError::InvalidConfig(_) => "InvalidConfig",
        };
    }
    match err.downcast_ref::<PadError>() {
        Some(PadError::Config(_)) => "ConfigError",
        Some(PadError::Hardware(_)) => "HardwareError",
        Some(PadError::State(_)) => "StateError",
        None if err.downcast_ref::<HwError>().is_some() => "HardwareError",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_exit_with_two() {
        let e = eyre::Report::new(PadError::Config("pins.data must list exactly 4 pins".into()));
        assert_eq!(exit_code_for_error(&e), 2);
        assert!(humanize(&e).starts_with("What happened: Configuration is invalid"));
        let e = eyre::Report::new(BuildError::MissingChannel(3));
        assert_eq!(exit_code_for_error(&e), 2);
        assert!(format_error_json(&e).contains("\"reason\":\"MissingChannel\""));
        let e = eyre::Report::new(BuildError::ReadyBudget {
            total: std::time::Duration::from_millis(12),
            period: std::time::Duration::from_millis(4),
        });
        assert_eq!(exit_code_for_error(&e), 2);
        assert!(humanize(&e).contains("ready timeouts add up to 12ms"));
    }

    #[test]
    fn runtime_errors_exit_with_one() {
        let e = eyre::Report::new(PadError::Hardware("no load cell responded".into()));
        assert_eq!(exit_code_for_error(&e), 1);
        assert_eq!(exit_code_for_error(&eyre::eyre!("boom")), 1);
        assert!(humanize(&eyre::eyre!("boom")).contains("Original: boom"));
    }
}
