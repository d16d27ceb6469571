//! Anemometer interrupt glue using ESP-IDF's GPIO ISR and esp_timer APIs.
//!
//! The GPIO ISR samples the pin and feeds
//! [`WindCapture::on_edge_interrupt`]; the returned [`EdgeAction`] arms or
//! cancels a one-shot `esp_timer` whose callback re-reads the pin and
//! feeds [`WindCapture::on_debounce_timeout`].
//!
//! Both callbacks receive a leaked `IsrContext` as their argument, so
//! the shared capture reaches them through an explicit pointer rather
//! than a global. The context lives for the rest of the program.
//!
//! On simulation targets [`SimWindInput`] replays the same protocol
//! against a virtual clock.

use std::sync::Arc;

use crate::sensors::anemometer::{EdgeAction, WindCapture};
#[cfg(not(target_os = "espidf"))]
use crate::sensors::anemometer::{Confirmation, PinLevel};

#[cfg(target_os = "espidf")]
use super::hw_init::{self, HwInitError};
#[cfg(target_os = "espidf")]
use crate::pins;
#[cfg(target_os = "espidf")]
use crate::sensors::anemometer::PinLevel;
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
struct IsrContext {
    capture: Arc<WindCapture>,
    timer: esp_timer_handle_t,
    debounce_us: u64,
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn anemometer_isr(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the leaked IsrContext registered in
    // install_wind_capture(); it is never freed.
    let ctx = unsafe { &*(arg as *const IsrContext) };
    let now_us = (unsafe { esp_timer_get_time() }) as u64;
    let level = PinLevel::from_raw(hw_init::anemometer_level());
    match ctx.capture.on_edge_interrupt(level, now_us) {
        EdgeAction::ArmDebounce => unsafe {
            // Stop fails harmlessly when the timer is idle.
            esp_timer_stop(ctx.timer);
            esp_timer_start_once(ctx.timer, ctx.debounce_us);
        },
        EdgeAction::CancelDebounce => unsafe {
            esp_timer_stop(ctx.timer);
        },
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn debounce_timer_cb(arg: *mut core::ffi::c_void) {
    // SAFETY: see anemometer_isr().
    let ctx = unsafe { &*(arg as *const IsrContext) };
    let level = PinLevel::from_raw(hw_init::anemometer_level());
    let _ = ctx.capture.on_debounce_timeout(level);
}

/// Create the debounce timer and register the anemometer ISR.
/// Call after `hw_init::init_isr_service()`.
#[cfg(target_os = "espidf")]
pub fn install_wind_capture(capture: Arc<WindCapture>) -> Result<(), HwInitError> {
    capture.seed_level(PinLevel::from_raw(hw_init::anemometer_level()));
    let debounce_us = capture.debounce_delay().as_micros() as u64;

    let ctx: *mut IsrContext = Box::into_raw(Box::new(IsrContext {
        capture,
        timer: core::ptr::null_mut(),
        debounce_us,
    }));
    let arg = ctx as *mut core::ffi::c_void;

    // SAFETY: ctx is never freed. ctx.timer is written here once, before
    // the ISR that reads it is registered below.
    unsafe {
        let args = esp_timer_create_args_t {
            callback: Some(debounce_timer_cb),
            arg,
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"wind_debounce\0".as_ptr() as *const _,
            skip_unhandled_events: true,
        };
        let ret = esp_timer_create(&args, &raw mut (*ctx).timer);
        if ret != ESP_OK {
            return Err(HwInitError::TimerCreateFailed(ret));
        }

        let ret = gpio_isr_handler_add(pins::ANEMOMETER_GPIO, Some(anemometer_isr), arg);
        if ret != ESP_OK {
            return Err(HwInitError::IsrInstallFailed(ret));
        }
        gpio_intr_enable(pins::ANEMOMETER_GPIO);
    }

    log::info!("hw_timer: anemometer capture armed ({}us debounce)", debounce_us);
    Ok(())
}

// ── Simulation ───────────────────────────────────────────────

/// Host stand-in for the ISR + one-shot timer pair.
///
/// Drive it with pin changes at virtual timestamps; the pending timer
/// fires when [`advance_to`](Self::advance_to) passes its deadline,
/// exactly as the hardware pair would.
#[cfg(not(target_os = "espidf"))]
pub struct SimWindInput {
    capture: Arc<WindCapture>,
    level: PinLevel,
    deadline_us: Option<u64>,
    debounce_us: u64,
}

#[cfg(not(target_os = "espidf"))]
impl SimWindInput {
    /// Mirrors `install_wind_capture`: seeds the capture with the idle
    /// (pulled-up) level.
    pub fn install(capture: Arc<WindCapture>) -> Self {
        capture.seed_level(PinLevel::High);
        let debounce_us = capture.debounce_delay().as_micros() as u64;
        Self {
            capture,
            level: PinLevel::High,
            deadline_us: None,
            debounce_us,
        }
    }

    /// The pin changes to `level` at `now_us`. Fires a due timer first.
    pub fn set_level(&mut self, level: PinLevel, now_us: u64) {
        self.advance_to(now_us);
        if level == self.level {
            return;
        }
        self.level = level;
        match self.capture.on_edge_interrupt(level, now_us) {
            EdgeAction::ArmDebounce => self.deadline_us = Some(now_us + self.debounce_us),
            EdgeAction::CancelDebounce => self.deadline_us = None,
        }
    }

    /// Let virtual time pass; returns the timer outcome if it fired.
    pub fn advance_to(&mut self, now_us: u64) -> Option<Confirmation> {
        match self.deadline_us {
            Some(deadline) if deadline <= now_us => {
                self.deadline_us = None;
                Some(self.capture.on_debounce_timeout(self.level))
            }
            _ => None,
        }
    }

    /// One clean contact closure of `width_us` starting at `at_us`.
    pub fn pulse(&mut self, at_us: u64, width_us: u64) {
        self.set_level(PinLevel::Low, at_us);
        self.set_level(PinLevel::High, at_us + width_us);
        self.advance_to(at_us + width_us + self.debounce_us);
    }

    pub fn capture(&self) -> &Arc<WindCapture> {
        &self.capture
    }
}
