//! Unified error types for the station firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! scheduler's error handling uniform. All variants are `Copy` so they can
//! be passed through the sensor hub and event sink without allocation.
//!
//! Sensor errors never escape the adapter/hub boundary as failures of the
//! measurement cycle: the hub turns them into sentinel fields.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be read or returned invalid data.
    Sensor(SensorError),
    /// The uplink or network layer failed.
    Comms(CommsError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// I2C / UART transaction failed.
    Bus,
    /// Frame CRC did not match.
    Checksum,
    /// Registers read back their power-on defaults: the part reset and lost
    /// its configuration.
    ResetSignature,
    /// Reading is outside the physically plausible range.
    OutOfRange,
    /// ADC conversion returned an error.
    AdcReadFailed,
    /// No adapter is fitted for this quantity.
    NotPresent,
    /// The adapter does not implement the requested operation.
    Unsupported,
}

impl SensorError {
    /// Whether this error should count toward the re-initialisation
    /// threshold of the adapter that produced it.
    pub const fn counts_as_invalid_read(self) -> bool {
        matches!(
            self,
            Self::Bus | Self::Checksum | Self::ResetSignature | Self::OutOfRange
        )
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => write!(f, "bus transaction failed"),
            Self::Checksum => write!(f, "checksum mismatch"),
            Self::ResetSignature => write!(f, "power-on reset signature"),
            Self::OutOfRange => write!(f, "reading out of range"),
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::NotPresent => write!(f, "sensor not fitted"),
            Self::Unsupported => write!(f, "operation not supported"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// Link did not come up within the bounded wait.
    NetworkDown,
    /// Transport-level failure while submitting.
    UploadFailed,
    /// The remote end answered but refused the submission.
    Rejected,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkDown => write!(f, "network down"),
            Self::UploadFailed => write!(f, "upload failed"),
            Self::Rejected => write!(f, "upload rejected"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
