//! Mock adapters for integration tests.
//!
//! Every port the scheduler drives has a recording stand-in here, so tests
//! can assert on the full call history without touching real peripherals.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};

use wxstation::app::events::StationEvent;
use wxstation::app::ports::{EventSink, NetworkPort, SensorPort, TimePort, UploadPort};
use wxstation::app::upload::UploadBatch;
use wxstation::error::{CommsError, SensorError};
use wxstation::sensors::{ClimateReading, SensorReadings};

// ── FakeClock ─────────────────────────────────────────────────

/// Both clock domains advance together on `sleep`; the wall clock can
/// additionally be jumped to simulate an RTC reset or NTP step. A
/// shortfall makes every sleep end that much early, the way a tick-rounded
/// RTOS delay does.
pub struct FakeClock {
    pub mono_us: u64,
    pub wall_ms: i64,
    pub sleeps: Vec<Duration>,
    pub shortfall: Duration,
}

#[allow(dead_code)]
impl FakeClock {
    pub fn new(wall_ms: i64) -> Self {
        Self {
            mono_us: 0,
            wall_ms,
            sleeps: Vec::new(),
            shortfall: Duration::ZERO,
        }
    }

    pub fn with_sleep_shortfall(mut self, shortfall: Duration) -> Self {
        self.shortfall = shortfall;
        self
    }

    pub fn jump_wall_to(&mut self, wall_ms: i64) {
        self.wall_ms = wall_ms;
    }

    pub fn last_sleep(&self) -> Option<Duration> {
        self.sleeps.last().copied()
    }
}

impl TimePort for FakeClock {
    fn monotonic_us(&self) -> u64 {
        self.mono_us
    }

    fn wall_clock_ms(&self) -> i64 {
        self.wall_ms
    }

    fn sleep(&mut self, d: Duration) {
        self.sleeps.push(d);
        let slept = d.saturating_sub(self.shortfall);
        self.mono_us += slept.as_micros() as u64;
        self.wall_ms += slept.as_millis() as i64;
    }
}

// ── MockSensors ───────────────────────────────────────────────

pub struct MockSensors {
    pub readings: SensorReadings,
    pub direction: Option<u8>,
    pub heater_result: Result<(), SensorError>,
    pub starts: u32,
    pub reads: u32,
    pub heater_runs: u32,
}

#[allow(dead_code)]
impl MockSensors {
    /// Healthy climate sensor only; everything else absent.
    pub fn new() -> Self {
        Self {
            readings: SensorReadings {
                climate: Ok(ClimateReading {
                    temperature_c: 14.2,
                    humidity_pct: 71.0,
                }),
                ..SensorReadings::default()
            },
            direction: None,
            heater_result: Ok(()),
            starts: 0,
            reads: 0,
            heater_runs: 0,
        }
    }

    pub fn with_humidity(mut self, rh: f32) -> Self {
        self.readings.climate = Ok(ClimateReading {
            temperature_c: 14.2,
            humidity_pct: rh,
        });
        self
    }
}

impl SensorPort for MockSensors {
    fn start_measurements(&mut self) {
        self.starts += 1;
    }

    fn read_all(&mut self) -> SensorReadings {
        self.reads += 1;
        self.readings
    }

    fn read_wind_direction(&mut self) -> Option<u8> {
        self.direction
    }

    fn run_heater(&mut self) -> Result<(), SensorError> {
        self.heater_runs += 1;
        self.heater_result
    }
}

// ── RecordingPublisher ────────────────────────────────────────

pub struct RecordingPublisher {
    pub link_up: bool,
    pub reject_with: Option<CommsError>,
    pub waits: Vec<Duration>,
    pub attempts: u32,
    pub batches: Vec<UploadBatch>,
}

#[allow(dead_code)]
impl RecordingPublisher {
    pub fn online() -> Self {
        Self {
            link_up: true,
            reject_with: None,
            waits: Vec::new(),
            attempts: 0,
            batches: Vec::new(),
        }
    }

    pub fn offline() -> Self {
        Self {
            link_up: false,
            ..Self::online()
        }
    }
}

impl NetworkPort for RecordingPublisher {
    fn wait_ready(&mut self, timeout: Duration) -> bool {
        self.waits.push(timeout);
        self.link_up
    }
}

impl UploadPort for RecordingPublisher {
    fn upload(&mut self, batch: &UploadBatch) -> Result<(), CommsError> {
        self.attempts += 1;
        match self.reject_with {
            Some(e) => Err(e),
            None => {
                self.batches.push(batch.clone());
                Ok(())
            }
        }
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<StationEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&StationEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &StationEvent) {
        self.events.push(event.clone());
    }
}

// ── MockI2c ───────────────────────────────────────────────────

/// Shared register file behind a mock bus. Cloned handles see the same
/// registers, so a test can keep one while the hub owns the other.
#[derive(Default)]
pub struct RegisterFile {
    pub regs: Vec<u8>,
    /// Every multi-byte write (register + data), in order.
    pub writes: Vec<Vec<u8>>,
    pub fail: bool,
}

#[derive(Clone)]
pub struct MockI2c {
    pub state: Arc<Mutex<RegisterFile>>,
    /// Sub-address bits to ignore (auto-increment flag).
    addr_mask: u8,
}

#[allow(dead_code)]
impl MockI2c {
    pub fn new(size: usize, addr_mask: u8) -> Self {
        Self {
            state: Arc::new(Mutex::new(RegisterFile {
                regs: vec![0; size],
                ..RegisterFile::default()
            })),
            addr_mask,
        }
    }

    pub fn set(&self, reg: usize, bytes: &[u8]) {
        let mut s = self.state.lock().unwrap();
        s.regs[reg..reg + bytes.len()].copy_from_slice(bytes);
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().writes.clone()
    }
}

impl ErrorType for MockI2c {
    type Error = ErrorKind;
}

impl I2c for MockI2c {
    fn transaction(&mut self, _addr: u8, ops: &mut [Operation<'_>]) -> Result<(), ErrorKind> {
        let mut s = self.state.lock().unwrap();
        if s.fail {
            return Err(ErrorKind::Other);
        }
        let mut ptr = 0usize;
        for op in ops {
            match op {
                Operation::Write(bytes) => {
                    ptr = usize::from(bytes[0] & self.addr_mask);
                    if bytes.len() > 1 {
                        s.writes.push(bytes.to_vec());
                        let data = bytes[1..].to_vec();
                        s.regs[ptr..ptr + data.len()].copy_from_slice(&data);
                    }
                }
                Operation::Read(buf) => {
                    for b in buf.iter_mut() {
                        *b = s.regs[ptr];
                        ptr += 1;
                    }
                }
            }
        }
        Ok(())
    }
}
