//! ESP32 time adapter.
//!
//! Provides the two clock domains the scheduler needs plus its sleep.
//!
//! - **`target_os = "espidf"`**: monotonic time from `esp_timer_get_time()`
//!   (microsecond precision), wall clock from `gettimeofday()`, sleep via
//!   `FreeRtos::delay_ms` so the scheduler task yields.
//! - **`not(target_os = "espidf")`**: `std::time::Instant`,
//!   `std::time::SystemTime` and `std::thread::sleep` for host-side
//!   simulation.

use core::time::Duration;

use crate::app::ports::TimePort;

/// Time adapter for the ESP32 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// `true` once SNTP (or anything else) has set the clock past 2020.
    pub fn wall_clock_synced(&self) -> bool {
        const EPOCH_2020_MS: i64 = 1_577_836_800_000;
        self.wall_clock_ms() >= EPOCH_2020_MS
    }
}

#[cfg(target_os = "espidf")]
impl TimePort for Esp32TimeAdapter {
    fn monotonic_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    fn wall_clock_ms(&self) -> i64 {
        use core::ptr;
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, ptr::null_mut()) } != 0 {
            return 0;
        }
        i64::from(tv.tv_sec) * 1000 + i64::from(tv.tv_usec) / 1000
    }

    fn sleep(&mut self, duration: Duration) {
        let ms = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        esp_idf_hal::delay::FreeRtos::delay_ms(ms);
    }
}

#[cfg(not(target_os = "espidf"))]
impl TimePort for Esp32TimeAdapter {
    fn monotonic_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    fn wall_clock_ms(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as i64)
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
