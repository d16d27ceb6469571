//! SHT4x temperature / humidity sensor on I2C.
//!
//! Start-then-wait protocol: `start_measurement` sends the high-precision
//! command, the scheduler's settle delay covers the 8.3 ms conversion, and
//! `read` fetches the six result bytes (two CRC-protected words).
//!
//! The built-in heater drives condensation off the sensing element; the
//! hub runs it when the humidity integrator says the sensor has been
//! saturated for too long.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use super::{ClimateReading, SensorAdapter};
use crate::error::SensorError;

pub const DEFAULT_ADDRESS: u8 = 0x44;

const CMD_MEASURE_HIGH_PRECISION: u8 = 0xFD;
const CMD_SOFT_RESET: u8 = 0x94;
/// 200 mW for 1 s, followed by a high-precision measurement.
const CMD_HEATER_200MW_1S: u8 = 0x39;

const HEATER_PULSES: u8 = 3;
/// Heater on-time plus the trailing measurement.
const HEATER_PULSE_MS: u32 = 1100;
const SOFT_RESET_MS: u32 = 1;

/// Sensirion CRC-8: polynomial 0x31, init 0xFF.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ 0x31 } else { crc << 1 };
        }
    }
    crc
}

fn checked_word(chunk: &[u8]) -> Result<u16, SensorError> {
    if crc8(&chunk[..2]) != chunk[2] {
        return Err(SensorError::Checksum);
    }
    Ok(u16::from_be_bytes([chunk[0], chunk[1]]))
}

pub struct Sht4x<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
}

impl<I2C: I2c, D: DelayNs> Sht4x<I2C, D> {
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            i2c,
            delay,
            address: DEFAULT_ADDRESS,
        }
    }

    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    fn command(&mut self, cmd: u8) -> Result<(), SensorError> {
        self.i2c
            .write(self.address, &[cmd])
            .map_err(|_| SensorError::Bus)
    }

    fn fetch(&mut self) -> Result<[u8; 6], SensorError> {
        let mut buf = [0u8; 6];
        self.i2c
            .read(self.address, &mut buf)
            .map_err(|_| SensorError::Bus)?;
        Ok(buf)
    }
}

impl<I2C: I2c, D: DelayNs> SensorAdapter for Sht4x<I2C, D> {
    type Reading = ClimateReading;

    fn name(&self) -> &'static str {
        "sht4x"
    }

    fn init(&mut self) -> Result<(), SensorError> {
        self.command(CMD_SOFT_RESET)?;
        self.delay.delay_ms(SOFT_RESET_MS);
        Ok(())
    }

    fn start_measurement(&mut self) -> Result<(), SensorError> {
        self.command(CMD_MEASURE_HIGH_PRECISION)
    }

    fn read(&mut self) -> Result<ClimateReading, SensorError> {
        let buf = self.fetch()?;
        let t_raw = checked_word(&buf[0..3])?;
        let rh_raw = checked_word(&buf[3..6])?;
        let temperature_c = -45.0 + 175.0 * f32::from(t_raw) / 65535.0;
        let humidity_pct = (-6.0 + 125.0 * f32::from(rh_raw) / 65535.0).clamp(0.0, 100.0);
        Ok(ClimateReading {
            temperature_c,
            humidity_pct,
        })
    }

    fn run_heater(&mut self) -> Result<(), SensorError> {
        for _ in 0..HEATER_PULSES {
            self.command(CMD_HEATER_200MW_1S)?;
            self.delay.delay_ms(HEATER_PULSE_MS);
            // Drain the measurement that follows each pulse; it is taken
            // on a hot element and is not representative.
            let _ = self.fetch()?;
        }
        Ok(())
    }
}
