//! Sensor maintenance: the humidity-sensor heater.
//!
//! Two inputs decide whether the scheduler runs the heater this cycle:
//!
//! - [`MaintenanceFlag`]: level-triggered external request (debug endpoint,
//!   console). Set any time, consumed once by the next cycle.
//! - [`HeaterController`]: integrator over humidity readings. A sensor that
//!   sits at saturation for long enough gets heated to drive condensation
//!   off the element.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::config::StationConfig;
use crate::snapshot::is_valid;

/// Force-maintenance request shared with collaborators.
#[derive(Debug, Default)]
pub struct MaintenanceFlag(AtomicBool);

impl MaintenanceFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Ask for a heater run on the next cycle. Repeated requests before
    /// then collapse into one.
    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Consume the request.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// "Too wet" integrator.
#[derive(Debug, Clone)]
pub struct HeaterController {
    wet_rh: f32,
    trigger: u16,
    cooldown: u16,
    level: u16,
}

impl HeaterController {
    pub fn new(config: &StationConfig) -> Self {
        Self {
            wet_rh: config.heater_wet_rh,
            trigger: config.heater_trigger_count,
            cooldown: config.heater_cooldown_count,
            level: 0,
        }
    }

    /// Feed one cycle's humidity. Returns `true` when a heater run is due.
    pub fn observe(&mut self, humidity_pct: f32) -> bool {
        if !is_valid(humidity_pct) {
            return false;
        }
        if humidity_pct >= self.wet_rh {
            self.level = self.level.saturating_add(1);
        } else {
            self.level = self.level.saturating_sub(1);
        }
        if self.level >= self.trigger {
            self.level = self.level.saturating_sub(self.cooldown);
            return true;
        }
        false
    }

    pub fn level(&self) -> u16 {
        self.level
    }
}
