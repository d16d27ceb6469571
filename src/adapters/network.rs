//! Network readiness adapter.
//!
//! Implements [`NetworkPort`] as a bounded poll of a shared link-up flag.
//! Whatever brings the interface up (Wi-Fi event handler, Ethernet
//! driver, a test) holds a [`LinkHandle`] and flips the flag; the
//! scheduler never blocks on the network for longer than its configured
//! wait.

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::Arc;

use crate::app::ports::{NetworkPort, TimePort};

/// Poll granularity while waiting for the link.
const POLL_STEP: Duration = Duration::from_millis(100);

/// Producer side of the link-up flag.
#[derive(Clone)]
pub struct LinkHandle(Arc<AtomicBool>);

impl LinkHandle {
    pub fn set_up(&self, up: bool) {
        self.0.store(up, Ordering::Release);
    }

    pub fn is_up(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pub struct LinkMonitor<T> {
    link: Arc<AtomicBool>,
    time: T,
}

impl<T: TimePort> LinkMonitor<T> {
    /// Starts with the link down.
    pub fn new(time: T) -> (Self, LinkHandle) {
        let link = Arc::new(AtomicBool::new(false));
        let handle = LinkHandle(Arc::clone(&link));
        (Self { link, time }, handle)
    }

    fn is_up(&self) -> bool {
        self.link.load(Ordering::Acquire)
    }
}

impl<T: TimePort> NetworkPort for LinkMonitor<T> {
    fn wait_ready(&mut self, timeout: Duration) -> bool {
        let deadline = self.time.monotonic_us() + timeout.as_micros() as u64;
        loop {
            if self.is_up() {
                return true;
            }
            let now = self.time.monotonic_us();
            if now >= deadline {
                log::warn!("network: link not up after {}ms", timeout.as_millis());
                return false;
            }
            let left = Duration::from_micros(deadline - now);
            self.time.sleep(left.min(POLL_STEP));
        }
    }
}
