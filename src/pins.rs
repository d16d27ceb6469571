//! GPIO / peripheral pin assignments for the weather-station board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Wind
// ---------------------------------------------------------------------------

/// Anemometer reed contact, external pull-up. LOW while closed.
/// Input-only pin; interrupt on any edge.
pub const ANEMOMETER_GPIO: i32 = 34;

/// Wind-vane resistor divider (22 kΩ to 3.3 V) on ADC1.
pub const VANE_ADC_GPIO: i32 = 35;
/// ADC1 channel for [`VANE_ADC_GPIO`].
pub const VANE_ADC1_CHANNEL: u32 = 7;

// ---------------------------------------------------------------------------
// I2C buses
// ---------------------------------------------------------------------------

// Bus pins are taken as typed `Peripherals` fields in `main`:
//   bus 0  SDA GPIO13, SCL GPIO16  SHT4x climate + LTR390 UV
//   bus 1  SDA GPIO14, SCL GPIO15  LPS25HB barometer (long cable to the shield)

/// Both buses run at standard mode; the cable on bus 1 does not tolerate
/// more.
pub const I2C_BAUD_HZ: u32 = 100_000;
