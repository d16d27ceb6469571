//! Sensor subsystem: individual drivers and the aggregating [`SensorHub`].
//!
//! Every driver implements [`SensorAdapter`]. The hub wraps each fitted
//! adapter in a [`Supervised`] slot that counts consecutive invalid reads
//! and re-runs the adapter's init sequence once the count reaches the
//! configured threshold. Errors never leave the hub as anything but the
//! `Err` side of a [`SensorReadings`] field.

pub mod anemometer;
pub mod climate;
pub mod pressure;
pub mod uv;
pub mod wind_vane;

use log::{info, warn};

use crate::error::SensorError;

// ── Adapter contract ──────────────────────────────────────────

/// One physical sensor.
pub trait SensorAdapter {
    type Reading;

    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Full configuration sequence. Also used for re-initialisation.
    fn init(&mut self) -> Result<(), SensorError>;

    /// Start a conversion for sensors with a start-then-wait protocol.
    fn start_measurement(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    fn read(&mut self) -> Result<Self::Reading, SensorError>;

    /// Built-in heater, where the part has one.
    fn run_heater(&mut self) -> Result<(), SensorError> {
        Err(SensorError::Unsupported)
    }
}

impl<A: SensorAdapter + ?Sized> SensorAdapter for Box<A> {
    type Reading = A::Reading;

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn init(&mut self) -> Result<(), SensorError> {
        (**self).init()
    }

    fn start_measurement(&mut self) -> Result<(), SensorError> {
        (**self).start_measurement()
    }

    fn read(&mut self) -> Result<Self::Reading, SensorError> {
        (**self).read()
    }

    fn run_heater(&mut self) -> Result<(), SensorError> {
        (**self).run_heater()
    }
}

// ── Readings ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

/// Mass concentration per particle size bin (µg/m³).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticulateReading {
    pub pm1_0: f32,
    pub pm2_5: f32,
    pub pm4_0: f32,
    pub pm10_0: f32,
}

/// Raw result of one acquisition pass; each field carries its own validity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReadings {
    pub climate: Result<ClimateReading, SensorError>,
    pub particulate: Result<ParticulateReading, SensorError>,
    pub pressure_hpa: Result<f32, SensorError>,
    pub illuminance_lux: Result<f32, SensorError>,
    pub uv_index: Result<f32, SensorError>,
    pub rain_mm: Result<f32, SensorError>,
}

impl Default for SensorReadings {
    fn default() -> Self {
        Self {
            climate: Err(SensorError::NotPresent),
            particulate: Err(SensorError::NotPresent),
            pressure_hpa: Err(SensorError::NotPresent),
            illuminance_lux: Err(SensorError::NotPresent),
            uv_index: Err(SensorError::NotPresent),
            rain_mm: Err(SensorError::NotPresent),
        }
    }
}

// ── Self-healing ──────────────────────────────────────────────

/// Consecutive invalid-read counter.
#[derive(Debug, Clone, Copy)]
pub struct ResetWatch {
    threshold: u8,
    consecutive: u8,
}

impl ResetWatch {
    pub const fn new(threshold: u8) -> Self {
        Self {
            threshold: if threshold == 0 { 1 } else { threshold },
            consecutive: 0,
        }
    }

    /// Count one invalid read. Returns `true` when the threshold is
    /// reached; the counter is reset at that point.
    pub fn record_invalid(&mut self) -> bool {
        self.consecutive = self.consecutive.saturating_add(1);
        if self.consecutive >= self.threshold {
            self.consecutive = 0;
            true
        } else {
            false
        }
    }

    pub fn record_valid(&mut self) {
        self.consecutive = 0;
    }

    pub fn consecutive(&self) -> u8 {
        self.consecutive
    }
}

/// An adapter plus its [`ResetWatch`].
pub struct Supervised<A> {
    adapter: A,
    watch: ResetWatch,
    reinits: u32,
}

impl<A: SensorAdapter> Supervised<A> {
    pub fn new(adapter: A, reinit_threshold: u8) -> Self {
        Self {
            adapter,
            watch: ResetWatch::new(reinit_threshold),
            reinits: 0,
        }
    }

    pub fn init(&mut self) {
        match self.adapter.init() {
            Ok(()) => info!("{}: initialised", self.adapter.name()),
            Err(e) => warn!("{}: init failed ({}), will retry on read errors", self.adapter.name(), e),
        }
    }

    pub fn start_measurement(&mut self) {
        if let Err(e) = self.adapter.start_measurement() {
            log::debug!("{}: start failed ({})", self.adapter.name(), e);
        }
    }

    pub fn read(&mut self) -> Result<A::Reading, SensorError> {
        match self.adapter.read() {
            Ok(v) => {
                self.watch.record_valid();
                Ok(v)
            }
            Err(e) => {
                if e.counts_as_invalid_read() && self.watch.record_invalid() {
                    self.reinits = self.reinits.wrapping_add(1);
                    warn!(
                        "{}: repeated invalid reads (last: {}), re-initialising",
                        self.adapter.name(),
                        e
                    );
                    if let Err(init_err) = self.adapter.init() {
                        warn!("{}: re-init failed ({})", self.adapter.name(), init_err);
                    }
                }
                Err(e)
            }
        }
    }

    pub fn run_heater(&mut self) -> Result<(), SensorError> {
        self.adapter.run_heater()
    }

    pub fn invalid_streak(&self) -> u8 {
        self.watch.consecutive()
    }

    pub fn reinit_count(&self) -> u32 {
        self.reinits
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }
}

// ── Hub ───────────────────────────────────────────────────────

type Slot<R> = Option<Supervised<Box<dyn SensorAdapter<Reading = R> + Send>>>;

fn read_slot<R>(slot: &mut Slot<R>) -> Result<R, SensorError> {
    slot.as_mut().map_or(Err(SensorError::NotPresent), Supervised::read)
}

/// Aggregates all sensor drivers and produces one [`SensorReadings`].
pub struct SensorHub {
    climate: Slot<ClimateReading>,
    particulate: Slot<ParticulateReading>,
    pressure: Slot<f32>,
    illuminance: Slot<f32>,
    uv: Slot<f32>,
    rain: Slot<f32>,
    reinit_threshold: u8,
}

impl SensorHub {
    /// Empty hub; fit adapters with the `with_*` builders.
    pub fn new(reinit_threshold: u8) -> Self {
        Self {
            climate: None,
            particulate: None,
            pressure: None,
            illuminance: None,
            uv: None,
            rain: None,
            reinit_threshold,
        }
    }

    fn supervise<R>(
        &self,
        adapter: impl SensorAdapter<Reading = R> + Send + 'static,
    ) -> Slot<R> {
        let boxed: Box<dyn SensorAdapter<Reading = R> + Send> = Box::new(adapter);
        Some(Supervised::new(boxed, self.reinit_threshold))
    }

    #[must_use]
    pub fn with_climate(
        mut self,
        adapter: impl SensorAdapter<Reading = ClimateReading> + Send + 'static,
    ) -> Self {
        self.climate = self.supervise(adapter);
        self
    }

    #[must_use]
    pub fn with_particulate(
        mut self,
        adapter: impl SensorAdapter<Reading = ParticulateReading> + Send + 'static,
    ) -> Self {
        self.particulate = self.supervise(adapter);
        self
    }

    #[must_use]
    pub fn with_pressure(mut self, adapter: impl SensorAdapter<Reading = f32> + Send + 'static) -> Self {
        self.pressure = self.supervise(adapter);
        self
    }

    #[must_use]
    pub fn with_illuminance(
        mut self,
        adapter: impl SensorAdapter<Reading = f32> + Send + 'static,
    ) -> Self {
        self.illuminance = self.supervise(adapter);
        self
    }

    #[must_use]
    pub fn with_uv(mut self, adapter: impl SensorAdapter<Reading = f32> + Send + 'static) -> Self {
        self.uv = self.supervise(adapter);
        self
    }

    #[must_use]
    pub fn with_rain(mut self, adapter: impl SensorAdapter<Reading = f32> + Send + 'static) -> Self {
        self.rain = self.supervise(adapter);
        self
    }

    /// Run every fitted adapter's init sequence. Failures are logged; the
    /// self-healing path retries them later.
    pub fn init_all(&mut self) {
        if let Some(s) = self.climate.as_mut() {
            s.init();
        }
        if let Some(s) = self.particulate.as_mut() {
            s.init();
        }
        for s in [&mut self.pressure, &mut self.illuminance, &mut self.uv, &mut self.rain]
            .into_iter()
            .flatten()
        {
            s.init();
        }
    }

    pub fn start_measurements(&mut self) {
        if let Some(s) = self.climate.as_mut() {
            s.start_measurement();
        }
        if let Some(s) = self.particulate.as_mut() {
            s.start_measurement();
        }
        for s in [&mut self.pressure, &mut self.illuminance, &mut self.uv, &mut self.rain]
            .into_iter()
            .flatten()
        {
            s.start_measurement();
        }
    }

    /// Read every sensor. Absent adapters report `NotPresent`.
    pub fn read_all(&mut self) -> SensorReadings {
        SensorReadings {
            climate: read_slot(&mut self.climate),
            particulate: read_slot(&mut self.particulate),
            pressure_hpa: read_slot(&mut self.pressure),
            illuminance_lux: read_slot(&mut self.illuminance),
            uv_index: read_slot(&mut self.uv),
            rain_mm: read_slot(&mut self.rain),
        }
    }

    /// Heater on the humidity sensor.
    pub fn run_heater(&mut self) -> Result<(), SensorError> {
        self.climate
            .as_mut()
            .map_or(Err(SensorError::NotPresent), Supervised::run_heater)
    }
}
