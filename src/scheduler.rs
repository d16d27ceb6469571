//! Measurement scheduler.
//!
//! Drives the fixed-cadence acquisition loop. Each call to
//! [`MeasurementScheduler::step`] either waits (one poll interval), resets
//! the cadence baseline after a wall-clock jump, or runs one full cycle:
//!
//! ```text
//! ┌──────┐   due    ┌───────────┐  readings  ┌──────────┐  draft   ┌────────────┐
//! │ Idle │ ───────▶ │ Acquiring │ ─────────▶ │ Deriving │ ───────▶ │ Publishing │
//! └──────┘          └───────────┘            └──────────┘          └─────┬──────┘
//!    ▲   start conversions, settle,          per-field gating,           │ commit,
//!    │   read sensors, drain wind,           maintenance decision        │ upload,
//!    │   sample vane                                                     │ sleep rest
//!    └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cadence uses the wall clock (published timestamps must line up with
//! it); every interval computation uses the monotonic clock. The only
//! suspension points are the settle delay, the bounded network wait and
//! the sleeps issued through [`TimePort`].

use core::time::Duration;
use std::sync::Arc;

use log::{info, warn};

use crate::app::derive::{WindInputs, derive_into};
use crate::app::events::{CycleTelemetry, StationEvent};
use crate::app::ports::{EventSink, NetworkPort, SensorPort, TimePort, UploadPort};
use crate::app::upload::UploadBatch;
use crate::config::StationConfig;
use crate::error::CommsError;
use crate::maintenance::{HeaterController, MaintenanceFlag};
use crate::sensors::anemometer::WindCapture;
use crate::snapshot::SnapshotWriter;

// ═══════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Acquiring,
    Deriving,
    Publishing,
}

/// What a single [`MeasurementScheduler::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Not due yet; slept one poll interval.
    Waiting,
    /// Wall clock went backwards; baseline reset, slept one poll interval.
    Resynchronised,
    /// Ran and published the given cycle.
    Cycled(u32),
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════

pub struct MeasurementScheduler {
    config: StationConfig,
    capture: Arc<WindCapture>,
    writer: SnapshotWriter,
    maintenance: Arc<MaintenanceFlag>,
    heater: HeaterController,
    phase: Phase,
    /// Wall-clock start of the last cycle (ms). `None` until the first.
    last_cycle_start_ms: Option<i64>,
    /// Monotonic time of the previous wind drain (µs).
    last_wind_read_us: Option<u64>,
    cycles: u32,
}

impl MeasurementScheduler {
    pub fn new(
        config: StationConfig,
        capture: Arc<WindCapture>,
        writer: SnapshotWriter,
        maintenance: Arc<MaintenanceFlag>,
    ) -> Self {
        let heater = HeaterController::new(&config);
        Self {
            config,
            capture,
            writer,
            maintenance,
            heater,
            phase: Phase::Idle,
            last_cycle_start_ms: None,
            last_wind_read_us: None,
            cycles: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Cadence baseline: wall-clock start of the last cycle, or the time
    /// the baseline was reset to after a clock jump.
    pub fn last_cycle_start_ms(&self) -> Option<i64> {
        self.last_cycle_start_ms
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    /// Announce start-up through the sink.
    pub fn start<E: EventSink>(&mut self, sink: &mut E) {
        info!(
            "Scheduler: period {}s, settle {}ms",
            self.config.measurement_period_secs, self.config.settle_delay_ms
        );
        sink.emit(&StationEvent::Started {
            period_secs: self.config.measurement_period_secs,
        });
    }

    /// One iteration of the scheduler loop. Call forever.
    pub fn step<S, T, U, E>(
        &mut self,
        sensors: &mut S,
        time: &mut T,
        uplink: &mut U,
        sink: &mut E,
    ) -> StepOutcome
    where
        S: SensorPort,
        T: TimePort,
        U: NetworkPort + UploadPort,
        E: EventSink,
    {
        let now_ms = time.wall_clock_ms();

        if let Some(last_ms) = self.last_cycle_start_ms {
            if now_ms < last_ms {
                warn!(
                    "Scheduler: wall clock went back {}ms, resetting cadence",
                    last_ms - now_ms
                );
                self.last_cycle_start_ms = Some(now_ms);
                sink.emit(&StationEvent::ClockResynchronised {
                    previous_ms: last_ms,
                    now_ms,
                });
                time.sleep(self.config.poll_interval());
                return StepOutcome::Resynchronised;
            }
            // Due once within half a poll of the boundary, so a sleep that
            // wakes a few ms early does not cost a whole extra poll.
            let period_ms = i64::from(self.config.measurement_period_secs) * 1000;
            let half_poll_ms = i64::from(self.config.poll_interval_ms) / 2;
            if now_ms - last_ms + half_poll_ms < period_ms {
                time.sleep(self.config.poll_interval());
                return StepOutcome::Waiting;
            }
        }

        let cycle = self.run_cycle(now_ms, sensors, time, uplink, sink);
        StepOutcome::Cycled(cycle)
    }

    fn run_cycle<S, T, U, E>(
        &mut self,
        now_ms: i64,
        sensors: &mut S,
        time: &mut T,
        uplink: &mut U,
        sink: &mut E,
    ) -> u32
    where
        S: SensorPort,
        T: TimePort,
        U: NetworkPort + UploadPort,
        E: EventSink,
    {
        let started_us = time.monotonic_us();
        self.last_cycle_start_ms = Some(now_ms);
        self.cycles = self.cycles.wrapping_add(1);
        let cycle = self.cycles;
        let now_s = now_ms.div_euclid(1000);

        // ── Acquiring ────────────────────────────────────────
        self.phase = Phase::Acquiring;
        sensors.start_measurements();
        time.sleep(self.config.settle_delay());
        let readings = sensors.read_all();

        let sample = self.capture.drain();
        let wind_read_us = time.monotonic_us();
        let elapsed = self
            .last_wind_read_us
            .map(|prev| Duration::from_micros(wind_read_us.saturating_sub(prev)));
        self.last_wind_read_us = Some(wind_read_us);
        let sector = sensors.read_wind_direction();

        // ── Deriving ─────────────────────────────────────────
        self.phase = Phase::Deriving;
        let wind = WindInputs {
            sample,
            elapsed,
            sector,
        };
        let mut draft = self.writer.begin_write();
        let faults = derive_into(&mut draft, &readings, &wind, &self.config);
        draft.cycle = cycle;
        draft.last_update = now_s;

        let forced = self.maintenance.take();
        let due = self.heater.observe(draft.humidity_pct);
        if forced || due {
            let result = sensors.run_heater();
            if result.is_ok() {
                draft.last_maintenance = Some(now_s);
            }
            sink.emit(&StationEvent::MaintenanceRun { forced, result });
        }

        // ── Publishing ───────────────────────────────────────
        self.phase = Phase::Publishing;
        let published = *draft;
        draft.commit();

        for (quantity, error) in faults {
            sink.emit(&StationEvent::SensorFault { quantity, error });
        }

        let batch = UploadBatch::from_snapshot(&published);
        if uplink.wait_ready(self.config.network_wait()) {
            match uplink.upload(&batch) {
                Ok(()) => sink.emit(&StationEvent::Uploaded { values: batch.len() }),
                Err(e) => sink.emit(&StationEvent::UploadFailed(e)),
            }
        } else {
            sink.emit(&StationEvent::UploadFailed(CommsError::NetworkDown));
        }

        let busy = Duration::from_micros(time.monotonic_us().saturating_sub(started_us));
        sink.emit(&StationEvent::CycleCompleted(CycleTelemetry {
            cycle,
            snapshot: published,
            pulses: sample.pulses,
            busy_ms: u32::try_from(busy.as_millis()).unwrap_or(u32::MAX),
        }));

        // ── Idle until the next boundary ─────────────────────
        self.phase = Phase::Idle;
        let period = self.config.period();
        let remaining = period.saturating_sub(busy).min(period);
        time.sleep(remaining);
        cycle
    }
}
