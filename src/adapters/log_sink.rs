//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured station events to the
//! ESP-IDF logger (UART in production). Each line starts with a fixed tag
//! so the serial output stays greppable. Sentinel fields print as `--`.

use core::fmt;

use log::{info, warn};

use crate::app::events::StationEvent;
use crate::app::ports::EventSink;
use crate::snapshot::is_valid;

/// Renders an `f32` with one decimal, or `--` for "no data".
pub struct Reading(pub f32);

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if is_valid(self.0) {
            write!(f, "{:.1}", self.0)
        } else {
            f.write_str("--")
        }
    }
}

/// Adapter that logs every [`StationEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &StationEvent) {
        match event {
            StationEvent::CycleCompleted(t) => {
                let s = &t.snapshot;
                info!(
                    "CYCLE | #{} | T={}\u{00b0}C RH={}% | p={}/{}hPa | \
                     PM2.5={} PM10={} | lux={} uv={} | rain={}mm | \
                     wind={}/{}km/h dir={} ({} pulses) | busy={}ms",
                    t.cycle,
                    Reading(s.temperature_c),
                    Reading(s.humidity_pct),
                    Reading(s.pressure_hpa),
                    Reading(s.pressure_msl_hpa),
                    Reading(s.pm2_5),
                    Reading(s.pm10_0),
                    Reading(s.illuminance_lux),
                    Reading(s.uv_index),
                    Reading(s.rain_mm),
                    Reading(s.wind_speed_kmh),
                    Reading(s.wind_peak_kmh),
                    s.wind_direction_label().unwrap_or("--"),
                    t.pulses,
                    t.busy_ms,
                );
            }
            StationEvent::ClockResynchronised { previous_ms, now_ms } => {
                warn!(
                    "CLOCK | wall clock went back {}ms, cadence reset",
                    previous_ms - now_ms
                );
            }
            StationEvent::SensorFault { quantity, error } => {
                warn!("SENSOR | {} -> no data ({})", quantity.key(), error);
            }
            StationEvent::MaintenanceRun { forced, result } => match result {
                Ok(()) => info!("MAINT | heater run complete (forced={})", forced),
                Err(e) => warn!("MAINT | heater run failed: {} (forced={})", e, forced),
            },
            StationEvent::Uploaded { values } => {
                info!("UPLINK | {} values submitted", values);
            }
            StationEvent::UploadFailed(e) => {
                warn!("UPLINK | {}, retrying next cycle", e);
            }
            StationEvent::Started { period_secs } => {
                info!("START | period={}s", period_secs);
            }
        }
    }
}
