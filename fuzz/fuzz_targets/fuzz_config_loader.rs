#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    let Ok(cfg) = pad_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    // Anything that validates must convert into wiring the scheduler accepts.
    let wiring = pad_core::conversions::channel_configs(&cfg).expect("validated pins convert");
    pad_core::validate_wiring(&wiring).expect("validated pins form a legal bus");
    pad_core::validate_budget(&wiring, pad_core::conversions::tick_period(&cfg))
        .expect("validated timeouts fit in one tick");
    let _ = pad_core::ThresholdConfig::try_from(&cfg.detector).expect("validated thresholds convert");
});
