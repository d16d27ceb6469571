//! Weather-station firmware: main entry point.
//!
//! Hexagonal architecture around a single periodic measurement task.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   NvsAdapter   Esp32Time       │
//! │  (SensorPort)      (EventSink)    (ConfigPort) (TimePort)      │
//! │  LinkMonitor + LogUplink (Publisher: NetworkPort + UploadPort) │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │        MeasurementScheduler (pure logic)               │    │
//! │  │  derive · heater integrator · upload batching          │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  GPIO ISR + esp_timer ──▶ WindCapture ──▶ drained per cycle    │
//! │  SnapshotStore ◀── commit per cycle ──▶ read() by publishers   │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use embedded_hal_bus::i2c::MutexDevice;
use esp_idf_svc::sntp::EspSntp;
use esp_idf_svc::sys::{esp, esp_netif_init};
use log::{debug, error, info, warn};

use wxstation::adapters::hardware::HardwareAdapter;
use wxstation::adapters::log_sink::LogEventSink;
use wxstation::adapters::network::LinkMonitor;
use wxstation::adapters::nvs::NvsAdapter;
use wxstation::adapters::time::Esp32TimeAdapter;
use wxstation::adapters::uplink::{LogUplink, Publisher};
use wxstation::app::ports::ConfigPort;
use wxstation::config::StationConfig;
use wxstation::drivers::{hw_init, hw_timer, watchdog::Watchdog};
use wxstation::maintenance::MaintenanceFlag;
use wxstation::pins;
use wxstation::scheduler::{MeasurementScheduler, StepOutcome};
use wxstation::sensors::SensorHub;
use wxstation::sensors::anemometer::WindCapture;
use wxstation::sensors::climate::Sht4x;
use wxstation::sensors::pressure::Lps25hb;
use wxstation::sensors::uv::Ltr390;
use wxstation::sensors::wind_vane::{AdcVane, WindVane};
use wxstation::snapshot::SnapshotStore;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  wxstation v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let config = match NvsAdapter::new().and_then(|nvs| nvs.load()) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            StationConfig::default()
        }
    };

    // ── 3. Raw peripherals: vane ADC, anemometer, ISR service ─
    // A failure here costs the wind fields only; the rest of the
    // station keeps measuring.
    if let Err(e) = hw_init::init_peripherals() {
        error!("HAL init failed: {}, wind readings unavailable", e);
    }
    let capture = Arc::new(WindCapture::new(config.debounce_us));
    match hw_init::init_isr_service() {
        Ok(()) => {
            if let Err(e) = hw_timer::install_wind_capture(Arc::clone(&capture)) {
                error!("Anemometer capture not installed: {}", e);
            }
        }
        Err(e) => error!("ISR service init failed: {}, continuing without anemometer", e),
    }

    // ── 4. I2C sensors ────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let i2c_cfg = I2cConfig::new().baudrate(Hertz(pins::I2C_BAUD_HZ));
    let i2c0 = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio13,
        peripherals.pins.gpio16,
        &i2c_cfg,
    )?;
    let i2c1 = I2cDriver::new(
        peripherals.i2c1,
        peripherals.pins.gpio14,
        peripherals.pins.gpio15,
        &i2c_cfg,
    )?;
    // Bus 0 is shared for the rest of the program.
    let bus0: &'static Mutex<I2cDriver<'static>> = Box::leak(Box::new(Mutex::new(i2c0)));

    let mut hub = SensorHub::new(config.reinit_threshold)
        .with_climate(Sht4x::new(MutexDevice::new(bus0), FreeRtos))
        .with_uv(Ltr390::new(MutexDevice::new(bus0)))
        .with_pressure(Lps25hb::new(i2c1));
    hub.init_all();

    let mut hw = HardwareAdapter::new(hub, WindVane::new(AdcVane, config.vane_policy));

    // ── 5. Snapshot store, publisher, scheduler ───────────────
    let store = SnapshotStore::new();
    let writer = store
        .writer()
        .ok_or_else(|| anyhow!("snapshot writer already taken"))?;

    let mut time = Esp32TimeAdapter::new();
    let (link_monitor, link) = LinkMonitor::new(Esp32TimeAdapter::new());
    let mut publisher = Publisher {
        network: link_monitor,
        upload: LogUplink::new(),
    };
    let mut sink = LogEventSink::new();

    let maintenance = Arc::new(MaintenanceFlag::new());
    // Dry the humidity element once after power-up.
    maintenance.request();

    let mut scheduler =
        MeasurementScheduler::new(config.clone(), capture, writer, Arc::clone(&maintenance));
    scheduler.start(&mut sink);

    // SNTP sets the wall clock once an interface has a route out. The
    // netif stack is brought up here; the station interface that provides
    // the route belongs to the uplink, so until one is attached the clock
    // stays unsynced and every cycle skips its upload.
    let _sntp = match esp!(unsafe { esp_netif_init() })
        .map_err(anyhow::Error::from)
        .and_then(|()| EspSntp::new_default().map_err(anyhow::Error::from))
    {
        Ok(sntp) => {
            info!("SNTP started");
            Some(sntp)
        }
        Err(e) => {
            warn!("SNTP unavailable: {}, uploads stay disabled", e);
            None
        }
    };

    let watchdog = Watchdog::for_config(&config);

    info!("System ready. Entering measurement loop.");

    // ── 6. Measurement loop ───────────────────────────────────
    loop {
        // Uploads carry wall-clock timestamps; without SNTP time there is
        // nothing worth submitting.
        link.set_up(time.wall_clock_synced());

        if let StepOutcome::Cycled(cycle) =
            scheduler.step(&mut hw, &mut time, &mut publisher, &mut sink)
        {
            match store.read().to_json() {
                Ok(json) => debug!("status #{}: {}", cycle, json),
                Err(e) => warn!("status #{}: JSON render failed: {}", cycle, e),
            }
        }

        watchdog.feed();
    }
}
