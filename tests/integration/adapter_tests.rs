//! Real adapters over mock buses: sensor drivers inside the hub,
//! self-healing, config storage and the publish path.

use std::sync::Arc;
use std::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::mock_hw::{FakeClock, MockI2c, RecordingSink};

use wxstation::adapters::hardware::HardwareAdapter;
use wxstation::adapters::network::LinkMonitor;
use wxstation::adapters::nvs::NvsAdapter;
use wxstation::adapters::uplink::{LogUplink, Publisher};
use wxstation::app::events::StationEvent;
use wxstation::app::ports::{ConfigError, ConfigPort, NetworkPort, SensorPort, UploadPort};
use wxstation::app::upload::UploadBatch;
use wxstation::config::StationConfig;
use wxstation::error::{CommsError, SensorError};
use wxstation::maintenance::MaintenanceFlag;
use wxstation::scheduler::{MeasurementScheduler, StepOutcome};
use wxstation::sensors::SensorHub;
use wxstation::sensors::anemometer::WindCapture;
use wxstation::sensors::climate::{Sht4x, crc8};
use wxstation::sensors::pressure::Lps25hb;
use wxstation::sensors::uv::Ltr390;
use wxstation::sensors::wind_vane::{AdcVane, VanePolicy, WindVane};
use wxstation::snapshot::{EnvironmentSnapshot, SnapshotStore, is_valid};

struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

// ── Bus fixtures ──────────────────────────────────────────────

fn lps_bus(raw: [u8; 3]) -> MockI2c {
    let bus = MockI2c::new(0x30, 0x7F);
    bus.set(0x28, &raw);
    bus
}

fn ltr_bus(counts: u32) -> MockI2c {
    let bus = MockI2c::new(0x20, 0xFF);
    bus.set(0x10, &[counts as u8, (counts >> 8) as u8, (counts >> 16) as u8]);
    bus
}

/// SHT4x answers every read from offset 0.
fn sht_bus(t_raw: u16, rh_raw: u16) -> MockI2c {
    let bus = MockI2c::new(6, 0x00);
    let t = t_raw.to_be_bytes();
    let rh = rh_raw.to_be_bytes();
    bus.set(0, &[t[0], t[1], crc8(&t), rh[0], rh[1], crc8(&rh)]);
    bus
}

const INIT_CTRL1: [u8; 2] = [0x20, 0xC0];

// ── Self-healing ──────────────────────────────────────────────

#[test]
fn pressure_reset_signature_reinitialises_on_tenth_read() {
    let bus = lps_bus([0x00, 0x80, 0x2F]);
    let mut hub = SensorHub::new(10).with_pressure(Lps25hb::new(bus.clone()));
    hub.init_all();
    assert_eq!(bus.writes(), vec![INIT_CTRL1.to_vec()]);

    for _ in 0..9 {
        assert_eq!(hub.read_all().pressure_hpa, Err(SensorError::ResetSignature));
    }
    assert_eq!(bus.writes().len(), 1);

    assert_eq!(hub.read_all().pressure_hpa, Err(SensorError::ResetSignature));
    assert_eq!(bus.writes(), vec![INIT_CTRL1.to_vec(), INIT_CTRL1.to_vec()]);

    // Sensor came back: the next read is valid and the streak restarts.
    bus.set(0x28, &[0x00, 0x40, 0x3D]);
    let p = hub.read_all().pressure_hpa.unwrap();
    assert!((p - 980.0).abs() < 1e-3);
    for _ in 0..9 {
        bus.set(0x28, &[0x00, 0x80, 0x2F]);
        let _ = hub.read_all();
    }
    assert_eq!(bus.writes().len(), 2);
}

#[test]
fn interleaved_valid_read_resets_streak() {
    let bus = lps_bus([0x00, 0x80, 0x2F]);
    let mut hub = SensorHub::new(10).with_pressure(Lps25hb::new(bus.clone()));

    for round in 0..3 {
        for _ in 0..9 {
            let _ = hub.read_all();
        }
        bus.set(0x28, &[0x00, 0x40, 0x3D]);
        assert!(hub.read_all().pressure_hpa.is_ok(), "round {round}");
        bus.set(0x28, &[0x00, 0x80, 0x2F]);
    }
    // Never ten in a row, never re-initialised.
    assert!(bus.writes().is_empty());
}

#[test]
fn bus_errors_also_trigger_reinit() {
    let bus = lps_bus([0x00, 0x40, 0x3D]);
    let mut hub = SensorHub::new(3).with_pressure(Lps25hb::new(bus.clone()));
    bus.state.lock().unwrap().fail = true;
    for _ in 0..3 {
        assert_eq!(hub.read_all().pressure_hpa, Err(SensorError::Bus));
    }
    // The re-init write failed on the dead bus; recovery is retried on
    // the next streak.
    assert!(bus.writes().is_empty());

    bus.state.lock().unwrap().fail = false;
    assert!(hub.read_all().pressure_hpa.is_ok());
}

#[test]
fn uv_sensor_power_cycle_is_detected_and_healed() {
    let bus = ltr_bus(6900);
    let mut hub = SensorHub::new(10).with_uv(Ltr390::new(bus.clone()));
    hub.init_all();
    let uv = hub.read_all().uv_index.unwrap();
    assert!((uv - 3.0).abs() < 1e-4, "got {uv}");

    // Brown-out: control register back to its power-on value.
    bus.set(0x00, &[0x00]);
    for _ in 0..10 {
        assert_eq!(hub.read_all().uv_index, Err(SensorError::ResetSignature));
    }
    assert!(hub.read_all().uv_index.is_ok());
}

// ── Climate ───────────────────────────────────────────────────

#[test]
fn climate_reading_through_hub() {
    let bus = sht_bus(24_342, 29_360);
    let mut hub = SensorHub::new(10).with_climate(Sht4x::new(bus.clone(), NoDelay));
    hub.init_all();
    hub.start_measurements();
    let c = hub.read_all().climate.unwrap();
    assert!((c.temperature_c - 20.0).abs() < 0.01);
    assert!((c.humidity_pct - 50.0).abs() < 0.01);
}

#[test]
fn corrupted_climate_frame_is_checksum_error() {
    let bus = sht_bus(24_342, 29_360);
    bus.set(2, &[0x00]);
    let mut hub = SensorHub::new(10).with_climate(Sht4x::new(bus, NoDelay));
    assert_eq!(hub.read_all().climate, Err(SensorError::Checksum));
}

#[test]
fn heater_runs_on_the_climate_sensor_only() {
    let hub = SensorHub::new(10).with_pressure(Lps25hb::new(lps_bus([0, 0x40, 0x3D])));
    let mut hw = HardwareAdapter::new(hub, WindVane::new(AdcVane, VanePolicy::Nearest));
    assert_eq!(hw.run_heater(), Err(SensorError::NotPresent));

    let hub = SensorHub::new(10).with_climate(Sht4x::new(sht_bus(24_342, 29_360), NoDelay));
    let mut hw = HardwareAdapter::new(hub, WindVane::new(AdcVane, VanePolicy::Nearest));
    assert_eq!(hw.run_heater(), Ok(()));
}

// ── Full stack ────────────────────────────────────────────────

#[test]
fn scheduler_over_real_adapters() {
    let lps = lps_bus([0x00, 0x40, 0x3D]);
    let hub = SensorHub::new(10)
        .with_climate(Sht4x::new(sht_bus(24_342, 29_360), NoDelay))
        .with_uv(Ltr390::new(ltr_bus(6900)))
        .with_pressure(Lps25hb::new(lps.clone()));
    // No init_all: the LTR390 stays unconfigured.
    let mut hw = HardwareAdapter::new(hub, WindVane::new(AdcVane, VanePolicy::Nearest));

    let store = SnapshotStore::new();
    let mut scheduler = MeasurementScheduler::new(
        StationConfig::default(),
        Arc::new(WindCapture::new(1_000)),
        store.writer().unwrap(),
        Arc::new(MaintenanceFlag::new()),
    );
    let (monitor, link) = LinkMonitor::new(FakeClock::new(0));
    link.set_up(true);
    let mut publisher = Publisher {
        network: monitor,
        upload: LogUplink::new(),
    };
    let mut clock = FakeClock::new(1_700_000_000_000);
    let mut sink = RecordingSink::new();

    let out = scheduler.step(&mut hw, &mut clock, &mut publisher, &mut sink);
    assert_eq!(out, StepOutcome::Cycled(1));
    let snap = store.read();
    assert!((snap.temperature_c - 20.0).abs() < 0.01);
    assert!((snap.pressure_hpa - 980.0).abs() < 1e-3);
    assert!(is_valid(snap.pressure_msl_hpa));
    assert!(!is_valid(snap.uv_index));
    assert_eq!(sink.count(|e| matches!(e, StationEvent::SensorFault { .. })), 1);
    assert_eq!(publisher.upload.submitted(), 1);
    assert_eq!(sink.count(|e| matches!(e, StationEvent::Uploaded { .. })), 1);
}

// ── Config storage ────────────────────────────────────────────

#[test]
fn config_store_round_trip_and_erase() {
    let nvs = NvsAdapter::new().unwrap();
    assert_eq!(nvs.load().unwrap(), StationConfig::default());

    let cfg = StationConfig {
        measurement_period_secs: 300,
        watchdog_timeout_secs: 360,
        altitude_m: 1_450.0,
        vane_policy: VanePolicy::RejectAbove { millivolts: 3_200 },
        ..StationConfig::default()
    };
    nvs.save(&cfg).unwrap();
    assert_eq!(nvs.load().unwrap(), cfg);

    nvs.erase_config().unwrap();
    assert_eq!(nvs.load().unwrap(), StationConfig::default());
}

#[test]
fn invalid_or_garbled_config_is_refused() {
    let nvs = NvsAdapter::new().unwrap();
    let bad = StationConfig {
        measurement_period_secs: 0,
        ..StationConfig::default()
    };
    assert!(nvs.save(&bad).is_err());

    // A longer period needs a watchdog that outlasts it.
    let unguarded = StationConfig {
        measurement_period_secs: 300,
        ..StationConfig::default()
    };
    assert!(matches!(
        nvs.save(&unguarded),
        Err(ConfigError::ValidationFailed(_))
    ));
    assert_eq!(nvs.load().unwrap(), StationConfig::default());

    nvs.sim_put_raw(&[0xFF; 7]);
    assert_eq!(nvs.load(), Err(ConfigError::Corrupted));
}

// ── Publish path ──────────────────────────────────────────────

#[test]
fn link_monitor_gives_up_after_timeout() {
    let (mut monitor, link) = LinkMonitor::new(FakeClock::new(0));
    assert!(!monitor.wait_ready(Duration::from_millis(450)));
    assert!(!link.is_up());

    link.set_up(true);
    assert!(monitor.wait_ready(Duration::from_millis(450)));
}

#[test]
fn publisher_delegates_to_uplink() {
    let (monitor, _link) = LinkMonitor::new(FakeClock::new(0));
    let mut publisher = Publisher {
        network: monitor,
        upload: LogUplink::new(),
    };
    let snap = EnvironmentSnapshot {
        cycle: 2,
        last_update: 1_700_000_060,
        temperature_c: 11.0,
        ..EnvironmentSnapshot::EMPTY
    };
    assert_eq!(publisher.upload(&UploadBatch::from_snapshot(&snap)), Ok(()));
    assert_eq!(
        publisher.upload(&UploadBatch::from_snapshot(&EnvironmentSnapshot::EMPTY)),
        Err(CommsError::Rejected)
    );
    assert_eq!(publisher.upload.submitted(), 1);
}
