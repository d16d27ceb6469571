//! Station configuration parameters
//!
//! All tunable parameters for the measurement station.
//! Values can be overridden via NVS (non-volatile storage); anything that
//! fails [`StationConfig::validate`] is rejected, never clamped.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::sensors::wind_vane::VanePolicy;

/// Core station configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    // --- Cadence ---
    /// Nominal measurement period (seconds)
    pub measurement_period_secs: u32,
    /// Coarse re-check interval while waiting for the next cycle (milliseconds)
    pub poll_interval_ms: u32,
    /// Wait between starting conversions and reading them back (milliseconds)
    pub settle_delay_ms: u32,
    /// Upper bound on waiting for the network before publishing (milliseconds)
    pub network_wait_ms: u32,

    // --- Wind ---
    /// Anemometer contact debounce (microseconds)
    pub debounce_us: u32,
    /// km/h per Hz of confirmed anemometer pulses
    pub anemometer_kmh_per_hz: f32,
    /// What to do with vane voltages far above the direction table
    pub vane_policy: VanePolicy,

    // --- Derivation ---
    /// Station altitude above mean sea level (metres)
    pub altitude_m: f32,

    // --- Self-healing ---
    /// Consecutive invalid reads before a sensor is re-initialised
    pub reinit_threshold: u8,

    // --- Heater integrator ---
    /// Relative humidity (%) at or above which a cycle counts as wet
    pub heater_wet_rh: f32,
    /// Integrator level that fires a heater run
    pub heater_trigger_count: u16,
    /// Amount subtracted from the integrator after a run
    pub heater_cooldown_count: u16,

    // --- Supervision ---
    /// Task watchdog timeout (seconds)
    pub watchdog_timeout_secs: u32,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            // Cadence
            measurement_period_secs: 60,
            poll_interval_ms: 1000,
            settle_delay_ms: 1100,
            network_wait_ms: 4000,

            // Wind
            debounce_us: 1000,
            anemometer_kmh_per_hz: 2.4,
            vane_policy: VanePolicy::Nearest,

            // Derivation
            altitude_m: 279.0,

            // Self-healing
            reinit_threshold: 10,

            // Heater
            heater_wet_rh: 98.0,
            heater_trigger_count: 30,
            heater_cooldown_count: 10,

            // Supervision
            watchdog_timeout_secs: 120,
        }
    }
}

impl StationConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(u64::from(self.measurement_period_secs))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.poll_interval_ms))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.settle_delay_ms))
    }

    pub fn network_wait(&self) -> Duration {
        Duration::from_millis(u64::from(self.network_wait_ms))
    }

    /// Range-check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(10..=3600).contains(&self.measurement_period_secs) {
            return Err(ConfigError::ValidationFailed(
                "measurement_period_secs must be 10–3600",
            ));
        }
        if !(50..=10_000).contains(&self.poll_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "poll_interval_ms must be 50–10000",
            ));
        }
        if u64::from(self.poll_interval_ms) >= u64::from(self.measurement_period_secs) * 1000 {
            return Err(ConfigError::ValidationFailed(
                "poll_interval_ms must be shorter than the measurement period",
            ));
        }
        if self.settle_delay_ms > 10_000 {
            return Err(ConfigError::ValidationFailed(
                "settle_delay_ms must be 0–10000",
            ));
        }
        if self.network_wait_ms > 30_000 {
            return Err(ConfigError::ValidationFailed(
                "network_wait_ms must be 0–30000",
            ));
        }
        if !(100..=20_000).contains(&self.debounce_us) {
            return Err(ConfigError::ValidationFailed(
                "debounce_us must be 100–20000",
            ));
        }
        if !(self.anemometer_kmh_per_hz > 0.0 && self.anemometer_kmh_per_hz <= 20.0) {
            return Err(ConfigError::ValidationFailed(
                "anemometer_kmh_per_hz must be in (0, 20]",
            ));
        }
        if let VanePolicy::RejectAbove { millivolts } = self.vane_policy {
            if !(2800..=3300).contains(&millivolts) {
                return Err(ConfigError::ValidationFailed(
                    "vane cutoff must be 2800–3300 mV",
                ));
            }
        }
        if !(-500.0..=9000.0).contains(&self.altitude_m) {
            return Err(ConfigError::ValidationFailed(
                "altitude_m must be -500–9000",
            ));
        }
        if self.reinit_threshold == 0 {
            return Err(ConfigError::ValidationFailed(
                "reinit_threshold must be at least 1",
            ));
        }
        if !(50.0..=100.0).contains(&self.heater_wet_rh) {
            return Err(ConfigError::ValidationFailed(
                "heater_wet_rh must be 50–100",
            ));
        }
        if self.heater_trigger_count == 0 {
            return Err(ConfigError::ValidationFailed(
                "heater_trigger_count must be at least 1",
            ));
        }
        if self.heater_cooldown_count == 0 || self.heater_cooldown_count > self.heater_trigger_count {
            return Err(ConfigError::ValidationFailed(
                "heater_cooldown_count must be 1..=heater_trigger_count",
            ));
        }
        // The watchdog is fed once per scheduler step, and a step can span a
        // full settle + network wait.
        let worst_step_ms = u64::from(self.settle_delay_ms)
            + u64::from(self.network_wait_ms)
            + u64::from(self.poll_interval_ms);
        if u64::from(self.watchdog_timeout_secs) * 1000 <= worst_step_ms
            || u64::from(self.watchdog_timeout_secs) < u64::from(self.measurement_period_secs)
        {
            return Err(ConfigError::ValidationFailed(
                "watchdog_timeout_secs must exceed one full measurement period",
            ));
        }
        Ok(())
    }
}
