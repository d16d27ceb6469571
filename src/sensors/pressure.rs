//! LPS25HB barometer on I2C.
//!
//! One-register configuration (CTRL_REG1) puts the part into 1 Hz
//! continuous mode. When the sensor browns out it comes back powered down
//! with PRESS_OUT reading its reset value, 0x2F8000 = 760.0 hPa; that
//! pattern is reported as [`SensorError::ResetSignature`] so the hub can
//! re-send the configuration.

use embedded_hal::i2c::I2c;

use super::SensorAdapter;
use crate::error::SensorError;

/// Address with SA0 pulled high, as on the breakout.
pub const DEFAULT_ADDRESS: u8 = 0x5C;

const REG_CTRL_REG1: u8 = 0x20;
/// PD (power on) | ODR = 1 Hz.
const CTRL_REG1_ACTIVE_1HZ: u8 = 0x80 | 0x40;
const REG_PRESS_OUT_XL: u8 = 0x28;
/// Sub-address MSB enables auto-increment for multi-byte reads.
const AUTO_INCREMENT: u8 = 0x80;

/// PRESS_OUT_XL, _L, _H after power-on.
const RESET_SIGNATURE: [u8; 3] = [0x00, 0x80, 0x2F];

/// LSB per hPa.
const COUNTS_PER_HPA: f32 = 4096.0;

pub struct Lps25hb<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Lps25hb<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, DEFAULT_ADDRESS)
    }

    pub fn with_address(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> SensorAdapter for Lps25hb<I2C> {
    type Reading = f32;

    fn name(&self) -> &'static str {
        "lps25hb"
    }

    fn init(&mut self) -> Result<(), SensorError> {
        self.i2c
            .write(self.address, &[REG_CTRL_REG1, CTRL_REG1_ACTIVE_1HZ])
            .map_err(|_| SensorError::Bus)
    }

    fn read(&mut self) -> Result<f32, SensorError> {
        let mut raw = [0u8; 3];
        self.i2c
            .write_read(self.address, &[REG_PRESS_OUT_XL | AUTO_INCREMENT], &mut raw)
            .map_err(|_| SensorError::Bus)?;
        log::debug!("lps25hb: raw {:02x}{:02x}{:02x}", raw[2], raw[1], raw[0]);
        if raw == RESET_SIGNATURE {
            return Err(SensorError::ResetSignature);
        }
        let counts = u32::from(raw[2]) << 16 | u32::from(raw[1]) << 8 | u32::from(raw[0]);
        Ok(counts as f32 / COUNTS_PER_HPA)
    }
}
