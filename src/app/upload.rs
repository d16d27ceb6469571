//! Upload batch: the subset of a snapshot that carries data.

use heapless::Vec;

use crate::snapshot::{EnvironmentSnapshot, is_valid};

/// Every scalar the station publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Temperature,
    Humidity,
    Pm1_0,
    Pm2_5,
    Pm4_0,
    Pm10_0,
    Pressure,
    PressureMsl,
    Illuminance,
    UvIndex,
    Rain,
    WindSpeed,
    WindPeak,
    WindDirection,
}

impl Quantity {
    pub const ALL: [Self; 14] = [
        Self::Temperature,
        Self::Humidity,
        Self::Pm1_0,
        Self::Pm2_5,
        Self::Pm4_0,
        Self::Pm10_0,
        Self::Pressure,
        Self::PressureMsl,
        Self::Illuminance,
        Self::UvIndex,
        Self::Rain,
        Self::WindSpeed,
        Self::WindPeak,
        Self::WindDirection,
    ];

    /// Short key used in logs and uplink payloads.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Temperature => "temp",
            Self::Humidity => "hum",
            Self::Pm1_0 => "pm010",
            Self::Pm2_5 => "pm025",
            Self::Pm4_0 => "pm040",
            Self::Pm10_0 => "pm100",
            Self::Pressure => "press",
            Self::PressureMsl => "press_msl",
            Self::Illuminance => "lux",
            Self::UvIndex => "uvind",
            Self::Rain => "rain",
            Self::WindSpeed => "windspeed",
            Self::WindPeak => "windspmax",
            Self::WindDirection => "winddirdeg",
        }
    }

    /// This quantity's field in a snapshot.
    pub fn value_in(self, s: &EnvironmentSnapshot) -> f32 {
        match self {
            Self::Temperature => s.temperature_c,
            Self::Humidity => s.humidity_pct,
            Self::Pm1_0 => s.pm1_0,
            Self::Pm2_5 => s.pm2_5,
            Self::Pm4_0 => s.pm4_0,
            Self::Pm10_0 => s.pm10_0,
            Self::Pressure => s.pressure_hpa,
            Self::PressureMsl => s.pressure_msl_hpa,
            Self::Illuminance => s.illuminance_lux,
            Self::UvIndex => s.uv_index,
            Self::Rain => s.rain_mm,
            Self::WindSpeed => s.wind_speed_kmh,
            Self::WindPeak => s.wind_peak_kmh,
            Self::WindDirection => s.wind_direction_deg,
        }
    }
}

pub const MAX_VALUES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadValue {
    pub quantity: Quantity,
    pub value: f32,
}

/// Values from one published snapshot, sentinels already removed.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadBatch {
    pub cycle: u32,
    pub timestamp: i64,
    pub values: Vec<UploadValue, MAX_VALUES>,
}

impl UploadBatch {
    pub fn from_snapshot(s: &EnvironmentSnapshot) -> Self {
        let mut values = Vec::new();
        for q in Quantity::ALL {
            let value = q.value_in(s);
            if is_valid(value) {
                // ALL has fewer entries than MAX_VALUES.
                let _ = values.push(UploadValue { quantity: q, value });
            }
        }
        Self {
            cycle: s.cycle,
            timestamp: s.last_update,
            values,
        }
    }

    pub fn get(&self, quantity: Quantity) -> Option<f32> {
        self.values
            .iter()
            .find(|v| v.quantity == quantity)
            .map(|v| v.value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
