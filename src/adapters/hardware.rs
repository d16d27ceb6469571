//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the [`SensorHub`] and the wind vane, exposing them through
//! [`SensorPort`]. The anemometer is not here: its capture state is
//! shared with the interrupt handlers and drained by the scheduler
//! directly. On non-espidf targets the underlying drivers use cfg-gated
//! simulation stubs.

use crate::app::ports::SensorPort;
use crate::error::SensorError;
use crate::sensors::wind_vane::{VaneAdc, WindVane};
use crate::sensors::{SensorHub, SensorReadings};

/// Concrete adapter that combines all polled sensors behind [`SensorPort`].
pub struct HardwareAdapter<A> {
    sensor_hub: SensorHub,
    vane: WindVane<A>,
}

impl<A: VaneAdc> HardwareAdapter<A> {
    pub fn new(sensor_hub: SensorHub, vane: WindVane<A>) -> Self {
        Self { sensor_hub, vane }
    }

    pub fn hub(&self) -> &SensorHub {
        &self.sensor_hub
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<A: VaneAdc> SensorPort for HardwareAdapter<A> {
    fn start_measurements(&mut self) {
        self.sensor_hub.start_measurements();
    }

    fn read_all(&mut self) -> SensorReadings {
        self.sensor_hub.read_all()
    }

    fn read_wind_direction(&mut self) -> Option<u8> {
        self.vane.read_direction()
    }

    fn run_heater(&mut self) -> Result<(), SensorError> {
        self.sensor_hub.run_heater()
    }
}
