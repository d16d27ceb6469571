//! Pure derivation: raw readings → snapshot fields.
//!
//! Every field is gated on its own validity. A field gets a real value
//! only when its adapter reported success *and* the value passed the
//! plausibility range below; otherwise it is the sentinel. Composite
//! fields (sea-level pressure, compass bearing) are computed only from
//! valid inputs.

use core::ops::RangeInclusive;
use core::time::Duration;

use heapless::Vec;

use crate::app::upload::Quantity;
use crate::config::StationConfig;
use crate::error::SensorError;
use crate::sensors::SensorReadings;
use crate::sensors::anemometer::WindSample;
use crate::sensors::wind_vane::sector_degrees;
use crate::snapshot::{EnvironmentSnapshot, SENTINEL, is_valid};

// ── Plausibility ranges ──────────────────────────────────────

const TEMPERATURE_C: RangeInclusive<f32> = -50.0..=70.0;
const HUMIDITY_PCT: RangeInclusive<f32> = 0.0..=100.0;
const PM_UG_M3: RangeInclusive<f32> = 0.0..=1000.0;
/// LPS25HB operating range.
const PRESSURE_HPA: RangeInclusive<f32> = 260.0..=1260.0;
const ILLUMINANCE_LUX: RangeInclusive<f32> = 0.0..=200_000.0;
const UV_INDEX: RangeInclusive<f32> = 0.0..=25.0;
const RAIN_MM: RangeInclusive<f32> = 0.0..=2000.0;

/// Barometric formula constants for the sea-level reduction.
const LAPSE_FACTOR_PER_M: f64 = 0.000_022_557_7;
const BARO_EXPONENT: f64 = 5.255_88;

/// Wind inputs gathered during acquisition.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindInputs {
    pub sample: WindSample,
    /// Monotonic time since the previous wind read; `None` on the first
    /// cycle after boot.
    pub elapsed: Option<Duration>,
    pub sector: Option<u8>,
}

/// Fields that ended up as sentinel, and why.
pub type FieldFaults = Vec<(Quantity, SensorError), 16>;

fn gate(
    reading: Result<f32, SensorError>,
    range: &RangeInclusive<f32>,
) -> Result<f32, SensorError> {
    match reading {
        Ok(v) if range.contains(&v) => Ok(v),
        Ok(_) => Err(SensorError::OutOfRange),
        Err(e) => Err(e),
    }
}

fn settle(q: Quantity, r: Result<f32, SensorError>, faults: &mut FieldFaults) -> f32 {
    match r {
        Ok(v) => v,
        Err(e) => {
            if e != SensorError::NotPresent {
                let _ = faults.push((q, e));
            }
            SENTINEL
        }
    }
}

/// Reduce station pressure to mean sea level.
pub fn sea_level_pressure(station_hpa: f32, altitude_m: f32) -> f32 {
    if !is_valid(station_hpa) {
        return SENTINEL;
    }
    let base = 1.0 - f64::from(altitude_m) * LAPSE_FACTOR_PER_M;
    (f64::from(station_hpa) / base.powf(BARO_EXPONENT)) as f32
}

/// Mean wind speed over `elapsed`.
pub fn wind_speed_kmh(pulses: u32, elapsed: Option<Duration>, kmh_per_hz: f32) -> f32 {
    match elapsed {
        Some(d) if !d.is_zero() => (f64::from(pulses) * f64::from(kmh_per_hz) / d.as_secs_f64()) as f32,
        _ => SENTINEL,
    }
}

/// Gust speed from the shortest pulse interval, never below the mean.
pub fn peak_speed_kmh(interval: Option<Duration>, mean_kmh: f32, kmh_per_hz: f32) -> f32 {
    if !is_valid(mean_kmh) {
        return SENTINEL;
    }
    match interval {
        Some(d) if !d.is_zero() => {
            let gust = (f64::from(kmh_per_hz) / d.as_secs_f64()) as f32;
            gust.max(mean_kmh)
        }
        _ => mean_kmh,
    }
}

/// Populate every measured field of `out`. Cycle bookkeeping
/// (`cycle`, timestamps) is left to the caller.
pub fn derive_into(
    out: &mut EnvironmentSnapshot,
    readings: &SensorReadings,
    wind: &WindInputs,
    config: &StationConfig,
) -> FieldFaults {
    let mut faults = FieldFaults::new();

    let climate = readings.climate;
    out.temperature_c = settle(
        Quantity::Temperature,
        gate(climate.map(|c| c.temperature_c), &TEMPERATURE_C),
        &mut faults,
    );
    out.humidity_pct = settle(
        Quantity::Humidity,
        gate(climate.map(|c| c.humidity_pct), &HUMIDITY_PCT),
        &mut faults,
    );

    let pm = readings.particulate;
    out.pm1_0 = settle(Quantity::Pm1_0, gate(pm.map(|p| p.pm1_0), &PM_UG_M3), &mut faults);
    out.pm2_5 = settle(Quantity::Pm2_5, gate(pm.map(|p| p.pm2_5), &PM_UG_M3), &mut faults);
    out.pm4_0 = settle(Quantity::Pm4_0, gate(pm.map(|p| p.pm4_0), &PM_UG_M3), &mut faults);
    out.pm10_0 = settle(Quantity::Pm10_0, gate(pm.map(|p| p.pm10_0), &PM_UG_M3), &mut faults);

    out.pressure_hpa = settle(
        Quantity::Pressure,
        gate(readings.pressure_hpa, &PRESSURE_HPA),
        &mut faults,
    );
    out.pressure_msl_hpa = sea_level_pressure(out.pressure_hpa, config.altitude_m);

    out.illuminance_lux = settle(
        Quantity::Illuminance,
        gate(readings.illuminance_lux, &ILLUMINANCE_LUX),
        &mut faults,
    );
    out.uv_index = settle(Quantity::UvIndex, gate(readings.uv_index, &UV_INDEX), &mut faults);
    out.rain_mm = settle(Quantity::Rain, gate(readings.rain_mm, &RAIN_MM), &mut faults);

    let kmh_per_hz = config.anemometer_kmh_per_hz;
    out.wind_speed_kmh = wind_speed_kmh(wind.sample.pulses, wind.elapsed, kmh_per_hz);
    out.wind_peak_kmh = peak_speed_kmh(wind.sample.peak_interval, out.wind_speed_kmh, kmh_per_hz);
    out.wind_sector = wind.sector;
    out.wind_direction_deg = wind.sector.and_then(sector_degrees).unwrap_or(SENTINEL);

    faults
}
