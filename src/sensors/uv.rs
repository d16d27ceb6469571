//! LTR390 UV sensor on I2C.
//!
//! Runs in UVS mode, 20-bit resolution, 2 s measurement rate, gain 18: the
//! only combination the datasheet gives a UV sensitivity for. A part that
//! reset comes back in ALS standby, so MAIN_CTRL no longer reads back the
//! configured value.

use embedded_hal::i2c::I2c;

use super::SensorAdapter;
use crate::error::SensorError;

pub const DEFAULT_ADDRESS: u8 = 0x53;

const REG_MAIN_CTRL: u8 = 0x00;
const MAIN_CTRL_UVS_MODE: u8 = 0x08;
const MAIN_CTRL_ENABLE: u8 = 0x02;

const REG_MEAS_RATE: u8 = 0x04;
const MEAS_RES_20BIT: u8 = 0x00;
const MEAS_RATE_2000MS: u8 = 0x06;

const REG_GAIN: u8 = 0x05;
const GAIN_18: u8 = 0x04;

const REG_UVS_DATA_0: u8 = 0x10;

/// Counts per UV index at gain 18, 20 bit.
const UV_SENSITIVITY: f32 = 2300.0;
/// Correction for the enclosure window.
const WINDOW_FACTOR: f32 = 1.0;

const CONFIG: [(u8, u8); 3] = [
    (REG_MAIN_CTRL, MAIN_CTRL_UVS_MODE | MAIN_CTRL_ENABLE),
    (REG_MEAS_RATE, MEAS_RES_20BIT | MEAS_RATE_2000MS),
    (REG_GAIN, GAIN_18),
];

pub struct Ltr390<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Ltr390<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            address: DEFAULT_ADDRESS,
        }
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, SensorError> {
        let mut v = [0u8; 1];
        self.i2c
            .write_read(self.address, &[reg], &mut v)
            .map_err(|_| SensorError::Bus)?;
        Ok(v[0])
    }
}

impl<I2C: I2c> SensorAdapter for Ltr390<I2C> {
    type Reading = f32;

    fn name(&self) -> &'static str {
        "ltr390"
    }

    fn init(&mut self) -> Result<(), SensorError> {
        for (reg, val) in CONFIG {
            self.i2c
                .write(self.address, &[reg, val])
                .map_err(|_| SensorError::Bus)?;
        }
        Ok(())
    }

    fn read(&mut self) -> Result<f32, SensorError> {
        if self.read_reg(REG_MAIN_CTRL)? != MAIN_CTRL_UVS_MODE | MAIN_CTRL_ENABLE {
            return Err(SensorError::ResetSignature);
        }
        let lo = self.read_reg(REG_UVS_DATA_0)?;
        let mid = self.read_reg(REG_UVS_DATA_0 + 1)?;
        let hi = self.read_reg(REG_UVS_DATA_0 + 2)?;
        let counts = u32::from(hi & 0x0F) << 16 | u32::from(mid) << 8 | u32::from(lo);
        log::debug!("ltr390: {} counts", counts);
        Ok(counts as f32 / UV_SENSITIVITY * WINDOW_FACTOR)
    }
}
