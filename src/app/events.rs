//! Outbound station events.
//!
//! The [`MeasurementScheduler`](crate::scheduler::MeasurementScheduler)
//! emits these through the [`EventSink`](super::ports::EventSink) port.
//! Adapters on the other side decide what to do with them.

use crate::app::upload::Quantity;
use crate::error::{CommsError, SensorError};
use crate::snapshot::EnvironmentSnapshot;

/// Structured events emitted by the measurement core.
#[derive(Debug, Clone)]
pub enum StationEvent {
    /// The scheduler has started.
    Started { period_secs: u32 },

    /// A cycle was published.
    CycleCompleted(CycleTelemetry),

    /// The wall clock went backwards; the cadence baseline was reset.
    ClockResynchronised { previous_ms: i64, now_ms: i64 },

    /// A field was written as "no data" this cycle.
    SensorFault { quantity: Quantity, error: SensorError },

    /// A heater run was attempted.
    MaintenanceRun {
        forced: bool,
        result: Result<(), SensorError>,
    },

    /// The batch was accepted by the uplink.
    Uploaded { values: usize },

    /// The batch could not be submitted; next cycle tries again.
    UploadFailed(CommsError),
}

/// Per-cycle summary suitable for logging.
#[derive(Debug, Clone, Copy)]
pub struct CycleTelemetry {
    pub cycle: u32,
    pub snapshot: EnvironmentSnapshot,
    /// Anemometer pulses drained this cycle.
    pub pulses: u32,
    /// Monotonic time from cycle start to publication.
    pub busy_ms: u32,
}
