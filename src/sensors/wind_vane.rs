//! Resistive wind vane (16-position reed/resistor network).
//!
//! The vane switches one of sixteen resistors (or a pair of adjacent ones)
//! into a divider with a fixed 22 kOhm pull-up from 3.3 V. The ADC reading is
//! mapped to the sector whose nominal divider voltage is closest; ties go to
//! the lower sector index.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: [`AdcVane`] reads the calibrated millivolts from ADC1 via
//! `hw_init`. On host/test: reads from a static `AtomicU16` for injection.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU16, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::SensorError;

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;

const SUPPLY_MV: u32 = 3300;
const PULL_UP_OHMS: u32 = 22_000;

const fn divider_mv(ohms: u32) -> u16 {
    (ohms * SUPPLY_MV / (ohms + PULL_UP_OHMS)) as u16
}

/// Vane resistance per sector, starting at north and going clockwise.
const SECTOR_OHMS: [u32; SECTORS] = [
    33_000, 6_570, 8_200, 891, 1_000, 688, 2_200, 1_410, 3_900, 3_140, 16_000, 14_120, 120_000,
    42_120, 64_900, 21_880,
];

pub const SECTORS: usize = 16;

/// Nominal divider output (mV) per sector.
pub const SECTOR_MILLIVOLTS: [u16; SECTORS] = {
    let mut out = [0u16; SECTORS];
    let mut i = 0;
    while i < SECTORS {
        out[i] = divider_mv(SECTOR_OHMS[i]);
        i += 1;
    }
    out
};

const SECTOR_LABELS: [&str; SECTORS] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Degrees per compass sector.
pub const SECTOR_DEGREES: f32 = 22.5;

/// Compass label for a sector index (0 = N).
pub fn sector_label(sector: u8) -> Option<&'static str> {
    SECTOR_LABELS.get(usize::from(sector)).copied()
}

/// Bearing in degrees for a sector index.
pub fn sector_degrees(sector: u8) -> Option<f32> {
    (usize::from(sector) < SECTORS).then(|| f32::from(sector) * SECTOR_DEGREES)
}

/// Handling of vane voltages above the top of the table (open circuit,
/// unplugged connector).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VanePolicy {
    /// Always map to the nearest sector. ADC non-linearity near the rail
    /// makes a cutoff unreliable on some boards.
    Nearest,
    /// Readings strictly above `millivolts` mean "no direction".
    RejectAbove { millivolts: u16 },
}

/// Map a divider voltage to a sector index.
pub fn sector_for_millivolts(millivolts: u16, policy: VanePolicy) -> Option<u8> {
    if let VanePolicy::RejectAbove { millivolts: cutoff } = policy {
        if millivolts > cutoff {
            return None;
        }
    }
    let mut best = 0usize;
    let mut best_diff = u16::MAX;
    for (i, &nominal) in SECTOR_MILLIVOLTS.iter().enumerate() {
        let diff = nominal.abs_diff(millivolts);
        if diff < best_diff {
            best = i;
            best_diff = diff;
        }
    }
    Some(best as u8)
}

/// One-shot analog sample of the vane divider, in calibrated millivolts.
pub trait VaneAdc {
    fn read_millivolts(&mut self) -> Result<u16, SensorError>;
}

/// Wind vane: an ADC source plus the out-of-range policy.
pub struct WindVane<A> {
    adc: A,
    policy: VanePolicy,
}

impl<A: VaneAdc> WindVane<A> {
    pub fn new(adc: A, policy: VanePolicy) -> Self {
        Self { adc, policy }
    }

    /// Sample the vane once. `None` is the "no direction" sentinel: either
    /// the conversion failed or the policy rejected the voltage.
    pub fn read_direction(&mut self) -> Option<u8> {
        match self.adc.read_millivolts() {
            Ok(mv) => {
                let sector = sector_for_millivolts(mv, self.policy);
                log::debug!("vane: {}mV -> {:?}", mv, sector);
                sector
            }
            Err(e) => {
                log::warn!("vane: {}", e);
                None
            }
        }
    }

    pub fn policy(&self) -> VanePolicy {
        self.policy
    }
}

// ── Platform ADC source ──────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
static SIM_VANE_MV: AtomicU16 = AtomicU16::new(divider_mv(33_000));

/// Inject the simulated vane voltage (host builds only).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_vane_millivolts(mv: u16) {
    SIM_VANE_MV.store(mv, Ordering::Relaxed);
}

/// Vane ADC on ADC1, configured by `hw_init`.
pub struct AdcVane;

impl VaneAdc for AdcVane {
    #[cfg(target_os = "espidf")]
    fn read_millivolts(&mut self) -> Result<u16, SensorError> {
        hw_init::vane_read_millivolts()
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_millivolts(&mut self) -> Result<u16, SensorError> {
        Ok(SIM_VANE_MV.load(Ordering::Relaxed))
    }
}
