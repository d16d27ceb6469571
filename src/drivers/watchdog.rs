//! Task Watchdog Timer (TWDT) driver.
//!
//! Wraps the ESP-IDF TWDT API to reset the station if the scheduler task
//! stalls. The loop feeds once per scheduler step, and a cycle step blocks
//! for up to a full period plus its settle, network and heater time, so
//! the effective timeout is never allowed below that.
//!
//! ```text
//!   feed           feed                                   feed
//!    │ poll 1s      │ settle │ read │ heater │ net │  sleep rest  │
//!    ├──────────────┼──────────────────────────────────────────────┤
//!                   └──────────── one step, ≤ required_timeout ───┘
//! ```

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::{info, warn};

use crate::config::StationConfig;

/// Worst-case heater sequence (three pulses and their read-backs).
const HEATER_BUDGET_MS: u32 = 3_500;
/// Slack for sensor bus transactions and scheduling jitter.
const MARGIN_SECS: u32 = 5;

/// Shortest timeout that survives one full cycle step under `config`.
pub fn required_timeout_secs(config: &StationConfig) -> u32 {
    let blocking_ms = config
        .settle_delay_ms
        .saturating_add(config.network_wait_ms)
        .saturating_add(HEATER_BUDGET_MS);
    config
        .measurement_period_secs
        .saturating_add(blocking_ms.div_ceil(1000))
        .saturating_add(MARGIN_SECS)
}

pub struct Watchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
    timeout_secs: u32,
}

impl Watchdog {
    /// Subscribe the current task with the configured timeout, raised to
    /// [`required_timeout_secs`] if the configured value is too short.
    pub fn for_config(config: &StationConfig) -> Self {
        let required = required_timeout_secs(config);
        let timeout_secs = if config.watchdog_timeout_secs < required {
            warn!(
                "Watchdog: configured {}s cannot cover a {}s cycle, using {}s",
                config.watchdog_timeout_secs, config.measurement_period_secs, required
            );
            required
        } else {
            config.watchdog_timeout_secs
        };
        Self::new(timeout_secs)
    }

    /// Initialise and subscribe the current task to the TWDT.
    pub fn new(timeout_secs: u32) -> Self {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the scheduler task before the loop;
            // a null handle subscribes the calling task.
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms: timeout_secs.saturating_mul(1000),
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    warn!("Watchdog: reconfigure returned {}", ret);
                }

                let subscribed = esp_task_wdt_add(core::ptr::null_mut()) == ESP_OK;
                if subscribed {
                    info!("Watchdog: scheduler task subscribed ({}s)", timeout_secs);
                } else {
                    warn!("Watchdog: scheduler task not subscribed, running unguarded");
                }
                Self {
                    subscribed,
                    timeout_secs,
                }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("Watchdog(sim): {}s", timeout_secs);
            Self { timeout_secs }
        }
    }

    pub fn timeout_secs(&self) -> u32 {
        self.timeout_secs
    }

    /// Called once per scheduler step.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }
    }
}
