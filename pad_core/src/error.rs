use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum PadError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
}

/// Startup wiring/configuration failures. The scheduler never starts with one of these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("channel {0} is not wired")]
    MissingChannel(u8),
    #[error("channel {0} is wired more than once")]
    DuplicateChannel(u8),
    #[error("channels disagree on the shared clock pin ({0} vs {1})")]
    ClockPinMismatch(u8, u8),
    #[error("pin {pin} is used by both {first} and {second}")]
    ConflictingLine {
        pin: u8,
        first: String,
        second: String,
    },
    #[error("ready timeouts add up to {total:?}, more than the {period:?} tick")]
    ReadyBudget { total: Duration, period: Duration },
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
