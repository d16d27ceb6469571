//! Cup anemometer pulse capture with contact debounce.
//!
//! The reed contact closes (pin LOW) once per third of a rotation. Every
//! edge raises a GPIO interrupt; the interrupt only records a *candidate*
//! transition and (re)arms a one-shot debounce timer. The timer callback
//! re-reads the pin and confirms the transition only if the level held for
//! the whole debounce window.
//!
//! ```text
//!   pin   ‾‾‾‾‾|_|‾|_______________|‾|_|‾‾‾‾‾‾‾‾‾‾‾‾
//!              ^ ^ ^               ^ ^ ^
//!   ISR        arm cancel arm      arm cancel arm
//!   timer                 └─ 1 ms ─┘ confirm LOW → pulse_count += 1
//! ```
//!
//! All counters live in one [`CaptureState`] behind an
//! `embassy_sync` critical-section mutex shared by the ISR, the timer
//! callback and the scheduler's drain. Each critical section is a handful
//! of integer operations; nothing in here logs, allocates or blocks.
//!
//! The state holds 64-bit timestamps, which the Xtensa core cannot update
//! atomically, hence the critical section rather than bare atomics.

use core::cell::Cell;
use core::time::Duration;

use embassy_sync::blocking_mutex::CriticalSectionMutex;

/// Electrical level of the anemometer contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinLevel {
    /// Contact closed (active).
    Low,
    /// Contact open (pulled up).
    High,
}

impl PinLevel {
    pub const fn from_raw(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

/// What the interrupt glue must do with the one-shot debounce timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeAction {
    /// Stop the timer if running, then start it for the debounce delay.
    ArmDebounce,
    /// The pin reverted to its stable level: stop the timer.
    CancelDebounce,
}

/// Result of a debounce-timer expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// A LOW transition held for the full window: one pulse counted.
    Pulse,
    /// A HIGH transition held: contact released, nothing counted.
    Release,
    /// Nothing pending or the level no longer matches the candidate.
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Debounce {
    Idle,
    Pending { since_us: u64, level: PinLevel },
}

/// Everything the capture owns. Only ever touched inside the critical
/// section.
#[derive(Debug, Clone, Copy)]
struct CaptureState {
    pulse_count: u32,
    min_interval_us: Option<u64>,
    last_edge_us: Option<u64>,
    stable_level: PinLevel,
    debounce: Debounce,
}

impl CaptureState {
    const fn new() -> Self {
        Self {
            pulse_count: 0,
            min_interval_us: None,
            last_edge_us: None,
            stable_level: PinLevel::High,
            debounce: Debounce::Idle,
        }
    }
}

/// Pulses and shortest inter-pulse interval accumulated since the last
/// drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindSample {
    pub pulses: u32,
    pub peak_interval: Option<Duration>,
}

/// Interrupt-fed wind pulse accumulator.
///
/// Shared as `Arc<WindCapture>` between the scheduler (which drains it) and
/// the interrupt glue in [`crate::drivers::hw_timer`].
pub struct WindCapture {
    state: CriticalSectionMutex<Cell<CaptureState>>,
    debounce_us: u32,
}

impl WindCapture {
    pub const fn new(debounce_us: u32) -> Self {
        Self {
            state: CriticalSectionMutex::new(Cell::new(CaptureState::new())),
            debounce_us,
        }
    }

    /// Delay the interrupt glue arms the one-shot timer with.
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_micros(u64::from(self.debounce_us))
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut CaptureState) -> R) -> R {
        self.state.lock(|cell| {
            let mut s = cell.get();
            let r = f(&mut s);
            cell.set(s);
            r
        })
    }

    /// Seed the stable level from the pin at boot so the first real edge
    /// is not mistaken for a bounce.
    pub fn seed_level(&self, level: PinLevel) {
        self.with_state(|s| {
            s.stable_level = level;
            s.debounce = Debounce::Idle;
        });
    }

    /// ISR entry: `level` is the pin as sampled in the handler, `now_us`
    /// the monotonic time of the interrupt.
    pub fn on_edge_interrupt(&self, level: PinLevel, now_us: u64) -> EdgeAction {
        self.with_state(|s| {
            if level == s.stable_level {
                s.debounce = Debounce::Idle;
                EdgeAction::CancelDebounce
            } else {
                s.debounce = Debounce::Pending { since_us: now_us, level };
                EdgeAction::ArmDebounce
            }
        })
    }

    /// Timer entry: `level` is the pin re-read when the one-shot fires.
    pub fn on_debounce_timeout(&self, level: PinLevel) -> Confirmation {
        self.with_state(|s| {
            let Debounce::Pending { since_us, level: candidate } = s.debounce else {
                return Confirmation::Rejected;
            };
            s.debounce = Debounce::Idle;
            if level != candidate || level == s.stable_level {
                return Confirmation::Rejected;
            }
            s.stable_level = level;
            if level == PinLevel::High {
                return Confirmation::Release;
            }

            s.pulse_count = s.pulse_count.saturating_add(1);
            if let Some(prev) = s.last_edge_us {
                let interval = since_us.saturating_sub(prev);
                if s.min_interval_us.is_none_or(|m| interval < m) {
                    s.min_interval_us = Some(interval);
                }
            }
            s.last_edge_us = Some(since_us);
            Confirmation::Pulse
        })
    }

    /// Read and zero the pulse counter.
    pub fn drain_pulses(&self) -> u32 {
        self.with_state(|s| core::mem::take(&mut s.pulse_count))
    }

    /// Read and clear the shortest interval between confirmed pulses.
    pub fn drain_peak_interval(&self) -> Option<Duration> {
        self.with_state(|s| s.min_interval_us.take())
            .map(Duration::from_micros)
    }

    /// Both drains under a single critical section, so the count and the
    /// peak interval describe exactly the same set of pulses.
    pub fn drain(&self) -> WindSample {
        self.with_state(|s| WindSample {
            pulses: core::mem::take(&mut s.pulse_count),
            peak_interval: s.min_interval_us.take().map(Duration::from_micros),
        })
    }

    /// True while a candidate transition awaits its timer.
    pub fn is_pending(&self) -> bool {
        self.with_state(|s| matches!(s.debounce, Debounce::Pending { .. }))
    }
}
