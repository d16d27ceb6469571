//! Port traits: the hexagonal boundary between the measurement core and
//! the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ MeasurementScheduler (domain)
//! ```
//!
//! Driven adapters (sensors, clocks, network, uploaders, event sinks,
//! storage) implement these traits. The
//! [`MeasurementScheduler`](crate::scheduler::MeasurementScheduler) consumes
//! them via generics, so the domain core never touches hardware directly.
//!
//! Sensor failures cross this boundary only as `Err` values inside
//! [`SensorReadings`]; nothing here can abort a measurement cycle.

use core::time::Duration;

use crate::app::events::StationEvent;
use crate::app::upload::UploadBatch;
use crate::config::StationConfig;
use crate::error::{CommsError, SensorError};
use crate::sensors::SensorReadings;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the scheduler calls this once per cycle.
pub trait SensorPort {
    /// Kick off conversions on sensors with a start-then-wait protocol.
    /// Failures are absorbed; the following `read_all` reports them.
    fn start_measurements(&mut self);

    /// Read every fitted sensor. Each field carries its own validity.
    fn read_all(&mut self) -> SensorReadings;

    /// Sample the wind vane. `None` means no direction this cycle.
    fn read_wind_direction(&mut self) -> Option<u8>;

    /// Run the humidity sensor's heater sequence.
    fn run_heater(&mut self) -> Result<(), SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Two independent clock domains plus the scheduler's only suspension
/// point.
pub trait TimePort {
    /// Monotonic microseconds since boot. Never jumps.
    fn monotonic_us(&self) -> u64;

    /// Wall-clock milliseconds since the unix epoch. May jump in either
    /// direction (NTP sync, RTC reset).
    fn wall_clock_ms(&self) -> i64;

    /// Yield the processor for `duration`.
    fn sleep(&mut self, duration: Duration);
}

// ───────────────────────────────────────────────────────────────
// Network + upload ports (driven adapter: domain → outside)
// ───────────────────────────────────────────────────────────────

/// Network readiness signal.
pub trait NetworkPort {
    /// Wait up to `timeout` for the link. Returns `false` if it never came
    /// up; must not block longer than `timeout`.
    fn wait_ready(&mut self, timeout: Duration) -> bool;
}

/// Outbound measurement submission.
pub trait UploadPort {
    fn upload(&mut self, batch: &UploadBatch) -> Result<(), CommsError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`StationEvent`]s through this port.
/// Adapters decide where they go (serial log, web status page, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &StationEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists station configuration.
///
/// Implementations MUST run [`StationConfig::validate`] before persisting
/// and reject invalid values rather than clamping them.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`StationConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<StationConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &StationConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::NotFound => Self::Config("not found"),
            ConfigError::Corrupted => Self::Config("corrupted"),
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::StorageFull => Self::Config("storage full"),
            ConfigError::IoError => Self::Config("I/O error"),
        }
    }
}
