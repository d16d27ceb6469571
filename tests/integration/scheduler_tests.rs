//! Scheduler end-to-end: fake clock, simulated anemometer, mock sensors,
//! recording publisher and sink.

use std::sync::Arc;
use std::time::Duration;

use crate::mock_hw::{FakeClock, MockSensors, RecordingPublisher, RecordingSink};

use wxstation::adapters::hardware::HardwareAdapter;
use wxstation::app::events::StationEvent;
use wxstation::app::upload::Quantity;
use wxstation::config::StationConfig;
use wxstation::drivers::hw_timer::SimWindInput;
use wxstation::error::{CommsError, SensorError};
use wxstation::maintenance::MaintenanceFlag;
use wxstation::scheduler::{MeasurementScheduler, Phase, StepOutcome};
use wxstation::sensors::SensorHub;
use wxstation::sensors::anemometer::WindCapture;
use wxstation::sensors::wind_vane::{AdcVane, VanePolicy, WindVane, sim_set_vane_millivolts};
use wxstation::snapshot::{SnapshotStore, is_valid};

const T0_MS: i64 = 1_700_000_000_000;

struct Rig {
    scheduler: MeasurementScheduler,
    store: Arc<SnapshotStore>,
    wind: SimWindInput,
    maintenance: Arc<MaintenanceFlag>,
    clock: FakeClock,
    sink: RecordingSink,
}

fn rig(config: StationConfig) -> Rig {
    let store = SnapshotStore::new();
    let capture = Arc::new(WindCapture::new(config.debounce_us));
    let wind = SimWindInput::install(Arc::clone(&capture));
    let maintenance = Arc::new(MaintenanceFlag::new());
    let scheduler = MeasurementScheduler::new(
        config,
        capture,
        store.writer().expect("first writer"),
        Arc::clone(&maintenance),
    );
    Rig {
        scheduler,
        store,
        wind,
        maintenance,
        clock: FakeClock::new(T0_MS),
        sink: RecordingSink::new(),
    }
}

impl Rig {
    fn step<S: wxstation::app::ports::SensorPort>(
        &mut self,
        sensors: &mut S,
        publisher: &mut RecordingPublisher,
    ) -> StepOutcome {
        self.scheduler
            .step(sensors, &mut self.clock, publisher, &mut self.sink)
    }

    /// `k` clean pulses `spacing_us` apart on the simulated anemometer.
    fn pulses(&mut self, start_us: u64, k: u32, spacing_us: u64) {
        for i in 0..u64::from(k) {
            self.wind.pulse(start_us + i * spacing_us, 5_000);
        }
    }
}

// ── Cadence ───────────────────────────────────────────────────

#[test]
fn first_step_runs_a_cycle_and_publishes() {
    let mut r = rig(StationConfig::default());
    let mut sensors = MockSensors::new();
    let mut up = RecordingPublisher::online();

    r.scheduler.start(&mut r.sink);
    assert_eq!(r.step(&mut sensors, &mut up), StepOutcome::Cycled(1));
    assert_eq!(r.scheduler.phase(), Phase::Idle);
    assert_eq!(sensors.starts, 1);
    assert_eq!(sensors.reads, 1);

    let snap = r.store.read();
    assert_eq!(snap.cycle, 1);
    assert_eq!(snap.last_update, T0_MS / 1000);
    assert!((snap.temperature_c - 14.2).abs() < 1e-6);
    assert!(matches!(r.sink.events[0], StationEvent::Started { period_secs: 60 }));
    assert_eq!(r.store.generation(), 1);
}

#[test]
fn waits_in_poll_steps_until_period_elapses() {
    let mut r = rig(StationConfig::default());
    let mut sensors = MockSensors::new();
    let mut up = RecordingPublisher::online();

    r.step(&mut sensors, &mut up);
    // Settle and the trailing sleep together fill exactly one period.
    assert_eq!(r.clock.wall_ms, T0_MS + 60_000);
    assert_eq!(r.clock.sleeps, vec![Duration::from_millis(1100), Duration::from_millis(58_900)]);

    // Knock the wall clock back a little: not due yet, so it polls.
    r.clock.jump_wall_to(T0_MS + 58_000);
    assert_eq!(r.step(&mut sensors, &mut up), StepOutcome::Waiting);
    assert_eq!(r.clock.last_sleep(), Some(Duration::from_secs(1)));
    assert_eq!(r.step(&mut sensors, &mut up), StepOutcome::Waiting);
    assert_eq!(r.step(&mut sensors, &mut up), StepOutcome::Cycled(2));
}

#[test]
fn backwards_wall_clock_resets_baseline() {
    let mut r = rig(StationConfig::default());
    let mut sensors = MockSensors::new();
    let mut up = RecordingPublisher::online();

    r.step(&mut sensors, &mut up);
    let earlier = T0_MS - 3_600_000;
    r.clock.jump_wall_to(earlier);

    assert_eq!(r.step(&mut sensors, &mut up), StepOutcome::Resynchronised);
    assert_eq!(r.scheduler.last_cycle_start_ms(), Some(earlier));
    // Only ever the poll interval: never a negative or absurd duration.
    assert_eq!(r.clock.last_sleep(), Some(Duration::from_secs(1)));
    assert_eq!(
        r.sink.count(|e| matches!(
            e,
            StationEvent::ClockResynchronised { previous_ms, now_ms }
                if *previous_ms == T0_MS && *now_ms == earlier
        )),
        1
    );

    // A fresh full period from the new baseline, not a rapid-fire cycle.
    let mut waits = 0;
    loop {
        match r.step(&mut sensors, &mut up) {
            StepOutcome::Waiting => waits += 1,
            StepOutcome::Cycled(n) => {
                assert_eq!(n, 2);
                break;
            }
            StepOutcome::Resynchronised => panic!("clock only moved forward"),
        }
    }
    assert_eq!(waits, 59);
    assert_eq!(r.store.read().last_update, (earlier + 60_000) / 1000);
}

#[test]
fn overrunning_cycle_sleeps_zero() {
    let cfg = StationConfig {
        settle_delay_ms: 75_000,
        ..StationConfig::default()
    };
    let mut r = rig(cfg);
    let mut sensors = MockSensors::new();
    let mut up = RecordingPublisher::online();

    r.step(&mut sensors, &mut up);
    assert_eq!(r.clock.last_sleep(), Some(Duration::ZERO));
    // Next step is immediately due.
    assert_eq!(r.step(&mut sensors, &mut up), StepOutcome::Cycled(2));
}

#[test]
fn early_waking_sleeps_keep_the_cadence() {
    let mut r = rig(StationConfig::default());
    r.clock = FakeClock::new(T0_MS).with_sleep_shortfall(Duration::from_millis(2));
    let mut sensors = MockSensors::new();
    let mut up = RecordingPublisher::online();

    let mut starts = Vec::new();
    for _ in 0..10 {
        // Each cycle ends a few ms short of the boundary; the next step
        // must still be the cycle, not another poll.
        match r.step(&mut sensors, &mut up) {
            StepOutcome::Cycled(_) => starts.push(r.scheduler.last_cycle_start_ms().unwrap()),
            other => panic!("expected a cycle, got {other:?}"),
        }
    }
    assert_eq!(r.scheduler.cycles(), 10);
    for pair in starts.windows(2) {
        let gap = pair[1] - pair[0];
        assert!((59_500..=60_000).contains(&gap), "gap {gap}ms");
    }
    let span = starts[9] - starts[0];
    assert!((9 * 59_500..=9 * 60_000).contains(&span), "span {span}ms");
}

// ── Wind ──────────────────────────────────────────────────────

#[test]
fn first_cycle_reports_wind_as_no_data() {
    let mut r = rig(StationConfig::default());
    let mut sensors = MockSensors::new();
    let mut up = RecordingPublisher::online();

    r.pulses(0, 5, 100_000);
    r.step(&mut sensors, &mut up);
    let snap = r.store.read();
    assert!(!is_valid(snap.wind_speed_kmh));
    assert!(!is_valid(snap.wind_peak_kmh));

    // Boot-time pulses were drained with the first cycle.
    r.step(&mut sensors, &mut up);
    assert_eq!(r.store.read().wind_speed_kmh, 0.0);
}

#[test]
fn k_pulses_over_t_seconds() {
    let cfg = StationConfig {
        measurement_period_secs: 30,
        ..StationConfig::default()
    };
    let mut r = rig(cfg);
    let mut sensors = MockSensors::new();
    let mut up = RecordingPublisher::online();

    r.step(&mut sensors, &mut up);
    let k = 12;
    r.pulses(10_000_000, k, 200_000);
    r.step(&mut sensors, &mut up);

    let snap = r.store.read();
    let expected = k as f32 * 2.4 / 30.0;
    assert!((snap.wind_speed_kmh - expected).abs() < 1e-4, "got {}", snap.wind_speed_kmh);
    // Shortest interval 0.2 s → 2.4 / 0.2 km/h.
    assert!((snap.wind_peak_kmh - 12.0).abs() < 1e-3, "got {}", snap.wind_peak_kmh);

    let pulses = r.sink.events.iter().rev().find_map(|e| match e {
        StationEvent::CycleCompleted(t) => Some(t.pulses),
        _ => None,
    });
    assert_eq!(pulses, Some(k));
}

#[test]
fn vane_south_through_hardware_adapter() {
    let mut r = rig(StationConfig::default());
    sim_set_vane_millivolts(500);
    let mut hw = HardwareAdapter::new(SensorHub::new(10), WindVane::new(AdcVane, VanePolicy::Nearest));
    let mut up = RecordingPublisher::online();

    r.step(&mut hw, &mut up);
    let snap = r.store.read();
    assert_eq!(snap.wind_sector, Some(8));
    assert_eq!(snap.wind_direction_deg, 180.0);
    assert_eq!(snap.wind_direction_label(), Some("S"));
    // No sensors fitted: everything else is absent, not faulted.
    assert!(!is_valid(snap.temperature_c));
    assert_eq!(r.sink.count(|e| matches!(e, StationEvent::SensorFault { .. })), 0);
}

// ── Field gating ──────────────────────────────────────────────

#[test]
fn reset_signature_degrades_only_its_field() {
    let mut r = rig(StationConfig::default());
    let mut sensors = MockSensors::new();
    sensors.readings.pressure_hpa = Err(SensorError::ResetSignature);
    sensors.readings.uv_index = Ok(2.0);
    let mut up = RecordingPublisher::online();

    r.step(&mut sensors, &mut up);
    let snap = r.store.read();
    assert!(!is_valid(snap.pressure_hpa));
    assert!(!is_valid(snap.pressure_msl_hpa));
    assert_eq!(snap.uv_index, 2.0);
    assert!(is_valid(snap.temperature_c));
    assert_eq!(
        r.sink.count(|e| matches!(
            e,
            StationEvent::SensorFault { quantity: Quantity::Pressure, error: SensorError::ResetSignature }
        )),
        1
    );
    // The uploaded batch carries no pressure.
    assert_eq!(up.batches[0].get(Quantity::Pressure), None);
    assert_eq!(up.batches[0].get(Quantity::UvIndex), Some(2.0));
}

#[test]
fn implausible_value_is_sentinel() {
    let mut r = rig(StationConfig::default());
    let mut sensors = MockSensors::new();
    sensors.readings.pressure_hpa = Ok(5000.0);
    let mut up = RecordingPublisher::online();

    r.step(&mut sensors, &mut up);
    assert!(!is_valid(r.store.read().pressure_hpa));
    assert_eq!(
        r.sink.count(|e| matches!(
            e,
            StationEvent::SensorFault { quantity: Quantity::Pressure, error: SensorError::OutOfRange }
        )),
        1
    );
}

// ── Maintenance ───────────────────────────────────────────────

#[test]
fn forced_maintenance_runs_once_and_is_cleared() {
    let mut r = rig(StationConfig::default());
    let mut sensors = MockSensors::new();
    let mut up = RecordingPublisher::online();

    r.maintenance.request();
    r.step(&mut sensors, &mut up);
    assert_eq!(sensors.heater_runs, 1);
    assert!(!r.maintenance.is_requested());
    assert_eq!(r.store.read().last_maintenance, Some(T0_MS / 1000));
    assert_eq!(
        r.sink.count(|e| matches!(e, StationEvent::MaintenanceRun { forced: true, result: Ok(()) })),
        1
    );

    r.step(&mut sensors, &mut up);
    assert_eq!(sensors.heater_runs, 1);
    // Carried over into the next cycle's snapshot.
    assert_eq!(r.store.read().last_maintenance, Some(T0_MS / 1000));
}

#[test]
fn failed_heater_run_keeps_previous_timestamp() {
    let mut r = rig(StationConfig::default());
    let mut sensors = MockSensors::new();
    sensors.heater_result = Err(SensorError::Bus);
    let mut up = RecordingPublisher::online();

    r.maintenance.request();
    r.step(&mut sensors, &mut up);
    assert_eq!(r.store.read().last_maintenance, None);
    assert_eq!(
        r.sink.count(|e| matches!(
            e,
            StationEvent::MaintenanceRun { forced: true, result: Err(SensorError::Bus) }
        )),
        1
    );
}

#[test]
fn saturated_humidity_triggers_heater_after_trigger_count() {
    let mut r = rig(StationConfig::default());
    let mut sensors = MockSensors::new().with_humidity(100.0);
    let mut up = RecordingPublisher::online();

    for _ in 0..29 {
        r.step(&mut sensors, &mut up);
    }
    assert_eq!(sensors.heater_runs, 0);
    r.step(&mut sensors, &mut up);
    assert_eq!(sensors.heater_runs, 1);
    assert_eq!(
        r.sink.count(|e| matches!(e, StationEvent::MaintenanceRun { forced: false, .. })),
        1
    );
}

// ── Publishing ────────────────────────────────────────────────

#[test]
fn upload_failure_is_not_retried_within_the_cycle() {
    let mut r = rig(StationConfig::default());
    let mut sensors = MockSensors::new();
    let mut up = RecordingPublisher::online();
    up.reject_with = Some(CommsError::UploadFailed);

    r.step(&mut sensors, &mut up);
    assert_eq!(up.attempts, 1);
    assert_eq!(
        r.sink.count(|e| matches!(e, StationEvent::UploadFailed(CommsError::UploadFailed))),
        1
    );
    // The snapshot is published regardless.
    assert_eq!(r.store.read().cycle, 1);

    r.step(&mut sensors, &mut up);
    assert_eq!(up.attempts, 2);
}

#[test]
fn offline_link_skips_upload_after_bounded_wait() {
    let mut r = rig(StationConfig::default());
    let mut sensors = MockSensors::new();
    let mut up = RecordingPublisher::offline();

    r.step(&mut sensors, &mut up);
    assert_eq!(up.waits, vec![Duration::from_secs(4)]);
    assert_eq!(up.attempts, 0);
    assert_eq!(
        r.sink.count(|e| matches!(e, StationEvent::UploadFailed(CommsError::NetworkDown))),
        1
    );
}

#[test]
fn successful_upload_carries_cycle_and_timestamp() {
    let mut r = rig(StationConfig::default());
    let mut sensors = MockSensors::new();
    let mut up = RecordingPublisher::online();

    r.step(&mut sensors, &mut up);
    let batch = &up.batches[0];
    assert_eq!(batch.cycle, 1);
    assert_eq!(batch.timestamp, T0_MS / 1000);
    assert_eq!(batch.get(Quantity::Humidity), Some(71.0));
    assert_eq!(
        r.sink.count(|e| matches!(e, StationEvent::Uploaded { values } if *values == batch.len())),
        1
    );
}
