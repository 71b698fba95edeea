#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! HX711 acquisition over bit-banged GPIO, plus a simulated device bank.

pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;
pub mod hx711;
pub mod sim;
pub mod util;

pub use error::HwError;
pub use hx711::{HX711_MAX, HX711_MIN, Hx711Bus, sign_flip, to_raw_bits, to_word};
pub use sim::{GateEvent, SimGates, SimHx711Bank};
