use pad_config::load_toml;
use rstest::rstest;

const BASE: &str = r#"
[pins]
sck = 8
data = [4, 5, 6, 7]
gates = [35, 36, 37, 38]

[hx711]
gain = "a128"
ready_timeout_ms = 3
poll_us = 1000

[detector]
threshold = 1000

[scheduler]
tick_ms = 12

[logging]
level = "info"
rotation = "never"
summary_interval_ms = 1000
timeout_warn_after = 10
"#;

fn with(find: &str, replace: &str) -> String {
    assert!(BASE.contains(find), "fixture missing {find}");
    BASE.replace(find, replace)
}

#[test]
fn full_config_is_valid() {
    let cfg = load_toml(BASE).expect("parse TOML");
    cfg.validate().expect("valid");
    assert_eq!(cfg.pins.data, vec![4, 5, 6, 7]);
}

#[rstest]
#[case("data = [4, 5, 6, 7]", "data = [4, 5, 6]", "pins.data must list exactly 4")]
#[case("gates = [35, 36, 37, 38]", "gates = [35, 36, 37, 38, 39]", "pins.gates must list exactly 4")]
#[case("data = [4, 5, 6, 7]", "data = [4, 5, 5, 7]", "pins.data[2] reuses pin 5")]
#[case("data = [4, 5, 6, 7]", "data = [8, 5, 6, 7]", "already assigned to pins.sck")]
#[case("gates = [35, 36, 37, 38]", "gates = [35, 36, 37, 4]", "pins.gates[3] reuses pin 4")]
#[case("tick_ms = 12", "tick_ms = 0", "scheduler.tick_ms must be in 1..=60000")]
#[case("tick_ms = 12", "tick_ms = 60001", "scheduler.tick_ms must be in 1..=60000")]
#[case("ready_timeout_ms = 3", "ready_timeout_ms = 0", "hx711.ready_timeout_ms must be in")]
#[case("ready_timeout_ms = 3", "ready_timeout_ms = 10001", "hx711.ready_timeout_ms must be in")]
#[case("ready_timeout_ms = 3", "ready_timeout_ms = 4", "hx711.ready_timeout_ms x 4 channels (16 ms) must fit in scheduler.tick_ms (12 ms)")]
#[case("tick_ms = 12", "tick_ms = 11", "must fit in scheduler.tick_ms (11 ms)")]
#[case("poll_us = 1000", "poll_us = 0", "hx711.poll_us must be >= 1")]
#[case("threshold = 1000", "threshold = 1000\nper_channel = [1, 2, 3]", "detector.per_channel must list exactly 4")]
#[case("rotation = \"never\"", "rotation = \"weekly\"", "logging.rotation must be one of")]
#[case("timeout_warn_after = 10", "timeout_warn_after = 0", "logging.timeout_warn_after must be >= 1")]
fn rejects_invalid(#[case] find: &str, #[case] replace: &str, #[case] msg: &str) {
    let cfg = load_toml(&with(find, replace)).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(format!("{err}").contains(msg), "got: {err}");
}

#[test]
fn ambient_pin_may_not_clash_with_gates() {
    let cfg = load_toml(&with("gates = [35, 36, 37, 38]", "gates = [35, 36, 37, 38]\nambient_in = 36"))
        .expect("parse TOML");
    let err = cfg.validate().expect_err("clash");
    assert!(format!("{err}").contains("pins.ambient_in reuses pin 36"));
}

#[test]
fn per_channel_thresholds_parse() {
    let cfg = load_toml(&with(
        "threshold = 1000",
        "threshold = 1000\nper_channel = [900, 1000, 1200, -5]",
    ))
    .expect("parse TOML");
    cfg.validate().expect("valid");
    assert_eq!(cfg.detector.per_channel, Some(vec![900, 1000, 1200, -5]));
}

#[test]
fn unknown_gain_fails_to_parse() {
    assert!(load_toml(&with("gain = \"a128\"", "gain = \"c16\"")).is_err());
}

#[test]
fn missing_pins_section_fails_to_parse() {
    assert!(load_toml("[scheduler]\ntick_ms = 12\n").is_err());
}
