#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Step detection and fixed-rate sampling (hardware-agnostic).
//!
//! All hardware access goes through the `pad_traits` capabilities:
//! `LoadCellBus` for acquisition, `Actuator` for the gate lines and
//! `AmbientTrigger` for the external sound event.
//!
//! ## Architecture
//!
//! - **Detector**: pure per-channel step decision (`detector` module)
//! - **Scheduler**: one tick samples channels 1..4 in order and writes each gate
//!   immediately (`scheduler` module), built and wiring-checked by `builder`
//! - **Status**: lock-free per-channel snapshots for reporters (`status` module)
//! - **Worker**: the scheduler on its own thread (`worker` module)
//! - **Observability**: per-cycle reports and rate-limited tracing (`observe` module)
//!
//! A channel whose converter is not ready yields `RawSample::Timeout`; its
//! weight and gate level hold until the next valid sample.

pub mod builder;
pub mod config;
pub mod conversions;
pub mod detector;
pub mod error;
pub mod fusion;
pub mod mocks;
pub mod observe;
pub mod scheduler;
pub mod state;
pub mod status;
pub mod util;
pub mod worker;

pub use builder::{SchedulerBuilder, validate_budget, validate_wiring};
pub use config::{ObserverCfg, ThresholdConfig};
pub use detector::{Decision, StepDetector, decide};
pub use error::{BuildError, PadError, Report, Result};
pub use fusion::{ChannelTrigger, FlagTrigger, TriggerSender, trigger_channel};
pub use observe::{ChannelOutcome, CycleObserver, CycleReport, NoopObserver, TracingObserver};
pub use scheduler::{Phase, RunSummary, SamplingScheduler};
pub use state::ChannelState;
pub use status::{ChannelSnapshot, StatusHandle};
pub use worker::PadWorker;
