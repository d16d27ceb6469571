//! Double-buffered environment snapshot.
//!
//! ```text
//!            SnapshotWriter (scheduler, exactly one)
//!                  │ begin_write() → SnapshotDraft
//!                  │ draft.commit()
//!                  ▼
//!   ┌──────────┐  ┌──────────┐
//!   │ slot 0   │  │ slot 1   │      active: AtomicU8 ──▶ slot readers use
//!   │ seq+words│  │ seq+words│
//!   └──────────┘  └──────────┘
//!        ▲              ▲
//!        └──── read() ──┘   web handlers, uploaders (any number)
//! ```
//!
//! The two slots are preallocated arrays of `AtomicU32` words. A commit
//! encodes the draft into the *inactive* slot and then flips `active`; that
//! single store is the publication point. Each slot also carries a sequence
//! counter (odd while being written) so that a reader which loaded the old
//! index and then stalled for a whole cycle detects the overwrite and
//! retries instead of returning a torn record. Readers never block the
//! writer and never take a lock.

use core::hint::spin_loop;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering, fence};
use std::sync::Arc;

use serde::Serialize;

use crate::sensors::wind_vane::sector_label;

/// Marker for "no valid reading". Consumers must render it as no data.
pub const SENTINEL: f32 = f32::NAN;

/// True when `v` carries data rather than the sentinel.
pub fn is_valid(v: f32) -> bool {
    !v.is_nan()
}

/// One complete set of derived measurements for a cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentSnapshot {
    /// Measurement cycle number (1 for the first published cycle).
    pub cycle: u32,
    /// Wall-clock time of the cycle (unix seconds).
    pub last_update: i64,
    /// Wall-clock time of the last heater run (unix seconds).
    pub last_maintenance: Option<i64>,
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub pm1_0: f32,
    pub pm2_5: f32,
    pub pm4_0: f32,
    pub pm10_0: f32,
    /// Station-level pressure (hPa).
    pub pressure_hpa: f32,
    /// Pressure reduced to mean sea level (hPa).
    pub pressure_msl_hpa: f32,
    pub illuminance_lux: f32,
    pub uv_index: f32,
    /// Rain accumulation (mm).
    pub rain_mm: f32,
    /// Mean wind speed over the cycle (km/h).
    pub wind_speed_kmh: f32,
    /// Gust speed from the shortest pulse interval (km/h).
    pub wind_peak_kmh: f32,
    pub wind_direction_deg: f32,
    /// Vane sector 0..=15, 0 = N.
    pub wind_sector: Option<u8>,
}

impl EnvironmentSnapshot {
    /// Every measurement absent.
    pub const EMPTY: Self = Self {
        cycle: 0,
        last_update: 0,
        last_maintenance: None,
        temperature_c: SENTINEL,
        humidity_pct: SENTINEL,
        pm1_0: SENTINEL,
        pm2_5: SENTINEL,
        pm4_0: SENTINEL,
        pm10_0: SENTINEL,
        pressure_hpa: SENTINEL,
        pressure_msl_hpa: SENTINEL,
        illuminance_lux: SENTINEL,
        uv_index: SENTINEL,
        rain_mm: SENTINEL,
        wind_speed_kmh: SENTINEL,
        wind_peak_kmh: SENTINEL,
        wind_direction_deg: SENTINEL,
        wind_sector: None,
    };

    /// Compass label derived from the sector, if known.
    pub fn wind_direction_label(&self) -> Option<&'static str> {
        self.wind_sector.and_then(sector_label)
    }

    /// JSON rendering for the status endpoint; sentinels become `null`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&SnapshotJson::from(self))
    }

    fn encode(&self) -> [u32; WORDS] {
        let [u0, u1] = split_i64(self.last_update);
        let [m0, m1] = split_i64(self.last_maintenance.unwrap_or(NO_TIMESTAMP));
        [
            self.cycle,
            u0,
            u1,
            m0,
            m1,
            self.temperature_c.to_bits(),
            self.humidity_pct.to_bits(),
            self.pm1_0.to_bits(),
            self.pm2_5.to_bits(),
            self.pm4_0.to_bits(),
            self.pm10_0.to_bits(),
            self.pressure_hpa.to_bits(),
            self.pressure_msl_hpa.to_bits(),
            self.illuminance_lux.to_bits(),
            self.uv_index.to_bits(),
            self.rain_mm.to_bits(),
            self.wind_speed_kmh.to_bits(),
            self.wind_peak_kmh.to_bits(),
            self.wind_direction_deg.to_bits(),
            self.wind_sector.map_or(NO_SECTOR, u32::from),
        ]
    }

    fn decode(w: &[u32; WORDS]) -> Self {
        let maintenance = join_i64(w[3], w[4]);
        Self {
            cycle: w[0],
            last_update: join_i64(w[1], w[2]),
            last_maintenance: (maintenance != NO_TIMESTAMP).then_some(maintenance),
            temperature_c: f32::from_bits(w[5]),
            humidity_pct: f32::from_bits(w[6]),
            pm1_0: f32::from_bits(w[7]),
            pm2_5: f32::from_bits(w[8]),
            pm4_0: f32::from_bits(w[9]),
            pm10_0: f32::from_bits(w[10]),
            pressure_hpa: f32::from_bits(w[11]),
            pressure_msl_hpa: f32::from_bits(w[12]),
            illuminance_lux: f32::from_bits(w[13]),
            uv_index: f32::from_bits(w[14]),
            rain_mm: f32::from_bits(w[15]),
            wind_speed_kmh: f32::from_bits(w[16]),
            wind_peak_kmh: f32::from_bits(w[17]),
            wind_direction_deg: f32::from_bits(w[18]),
            wind_sector: u8::try_from(w[19]).ok(),
        }
    }
}

impl Default for EnvironmentSnapshot {
    fn default() -> Self {
        Self::EMPTY
    }
}

// ── Word encoding ─────────────────────────────────────────────

const WORDS: usize = 20;
const NO_TIMESTAMP: i64 = i64::MIN;
const NO_SECTOR: u32 = u32::MAX;

fn split_i64(v: i64) -> [u32; 2] {
    let bits = v as u64;
    [bits as u32, (bits >> 32) as u32]
}

fn join_i64(lo: u32, hi: u32) -> i64 {
    ((u64::from(hi) << 32) | u64::from(lo)) as i64
}

// ── JSON view ─────────────────────────────────────────────────

#[derive(Serialize)]
struct SnapshotJson {
    cycle: u32,
    last_update: i64,
    last_maintenance: Option<i64>,
    temperature: f32,
    humidity: f32,
    pm010: f32,
    pm025: f32,
    pm040: f32,
    pm100: f32,
    pressure: f32,
    pressure_msl: f32,
    illuminance: f32,
    uv_index: f32,
    rain: f32,
    wind_speed: f32,
    wind_peak: f32,
    wind_direction_deg: f32,
    wind_direction: Option<&'static str>,
}

impl From<&EnvironmentSnapshot> for SnapshotJson {
    fn from(s: &EnvironmentSnapshot) -> Self {
        Self {
            cycle: s.cycle,
            last_update: s.last_update,
            last_maintenance: s.last_maintenance,
            temperature: s.temperature_c,
            humidity: s.humidity_pct,
            pm010: s.pm1_0,
            pm025: s.pm2_5,
            pm040: s.pm4_0,
            pm100: s.pm10_0,
            pressure: s.pressure_hpa,
            pressure_msl: s.pressure_msl_hpa,
            illuminance: s.illuminance_lux,
            uv_index: s.uv_index,
            rain: s.rain_mm,
            wind_speed: s.wind_speed_kmh,
            wind_peak: s.wind_peak_kmh,
            wind_direction_deg: s.wind_direction_deg,
            wind_direction: s.wind_direction_label(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Store
// ═══════════════════════════════════════════════════════════════

struct Slot {
    seq: AtomicU32,
    words: [AtomicU32; WORDS],
}

impl Slot {
    fn new(init: &[u32; WORDS]) -> Self {
        Self {
            seq: AtomicU32::new(0),
            words: init.map(AtomicU32::new),
        }
    }

    fn store(&self, words: &[u32; WORDS]) {
        let seq = self.seq.load(Ordering::Relaxed);
        self.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);
        for (dst, &w) in self.words.iter().zip(words) {
            dst.store(w, Ordering::Relaxed);
        }
        self.seq.store(seq.wrapping_add(2), Ordering::Release);
    }

    /// `None` if a write overlapped the copy.
    fn try_load(&self) -> Option<[u32; WORDS]> {
        let before = self.seq.load(Ordering::Acquire);
        if before & 1 == 1 {
            return None;
        }
        let mut out = [0u32; WORDS];
        for (dst, src) in out.iter_mut().zip(&self.words) {
            *dst = src.load(Ordering::Relaxed);
        }
        fence(Ordering::Acquire);
        (self.seq.load(Ordering::Relaxed) == before).then_some(out)
    }
}

/// Latest published environment state, readable from any task.
pub struct SnapshotStore {
    slots: [Slot; 2],
    active: AtomicU8,
    generation: AtomicU32,
    writer_taken: AtomicBool,
}

impl SnapshotStore {
    /// Both slots start as [`EnvironmentSnapshot::EMPTY`].
    pub fn new() -> Arc<Self> {
        let empty = EnvironmentSnapshot::EMPTY.encode();
        Arc::new(Self {
            slots: [Slot::new(&empty), Slot::new(&empty)],
            active: AtomicU8::new(0),
            generation: AtomicU32::new(0),
            writer_taken: AtomicBool::new(false),
        })
    }

    /// Hand out the single write capability. Returns `None` on every call
    /// after the first.
    pub fn writer(self: &Arc<Self>) -> Option<SnapshotWriter> {
        if self.writer_taken.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(SnapshotWriter {
            store: Arc::clone(self),
        })
    }

    /// Copy out the active snapshot. Lock-free; at most one cycle stale.
    pub fn read(&self) -> EnvironmentSnapshot {
        loop {
            let idx = usize::from(self.active.load(Ordering::Acquire) & 1);
            if let Some(words) = self.slots[idx].try_load() {
                return EnvironmentSnapshot::decode(&words);
            }
            spin_loop();
        }
    }

    /// Number of commits so far.
    pub fn generation(&self) -> u32 {
        self.generation.load(Ordering::Acquire)
    }
}

/// Exclusive write capability for a [`SnapshotStore`].
pub struct SnapshotWriter {
    store: Arc<SnapshotStore>,
}

impl SnapshotWriter {
    /// Start a new record, pre-filled with the currently published one so
    /// that fields the caller does not touch carry over.
    pub fn begin_write(&mut self) -> SnapshotDraft<'_> {
        let current = self.store.read();
        SnapshotDraft {
            writer: self,
            snapshot: current,
        }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    fn publish(&mut self, snapshot: &EnvironmentSnapshot) {
        let store = &*self.store;
        let inactive = (store.active.load(Ordering::Relaxed) ^ 1) & 1;
        store.slots[usize::from(inactive)].store(&snapshot.encode());
        store.active.store(inactive, Ordering::Release);
        store.generation.fetch_add(1, Ordering::AcqRel);
    }
}

/// The record being assembled for the inactive slot. Dropping it without
/// [`commit`](Self::commit) publishes nothing.
pub struct SnapshotDraft<'w> {
    writer: &'w mut SnapshotWriter,
    snapshot: EnvironmentSnapshot,
}

impl SnapshotDraft<'_> {
    /// Write the draft into the inactive slot and flip the active index.
    pub fn commit(self) {
        self.writer.publish(&self.snapshot);
    }
}

impl Deref for SnapshotDraft<'_> {
    type Target = EnvironmentSnapshot;

    fn deref(&self) -> &Self::Target {
        &self.snapshot
    }
}

impl DerefMut for SnapshotDraft<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.snapshot
    }
}
