//! Fuzz target: anemometer edge stream
//!
//! Drives the capture with an arbitrary sequence of pin levels, time steps
//! and drains, and checks:
//! - No panics or arithmetic overflow
//! - Pulses never exceed the number of LOW edges delivered
//! - A reported peak interval is at least one debounce window long
//!
//! cargo fuzz run fuzz_wind_edges

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use wxstation::drivers::hw_timer::SimWindInput;
use wxstation::sensors::anemometer::{PinLevel, WindCapture};

const DEBOUNCE_US: u64 = 1_000;

fuzz_target!(|data: &[u8]| {
    let mut sim = SimWindInput::install(Arc::new(WindCapture::new(DEBOUNCE_US as u32)));
    let mut now = 0u64;
    let mut low_edges = 0u32;
    let mut counted = 0u32;

    for chunk in data.chunks(2) {
        let [op, step] = chunk else { break };
        now += u64::from(*step) * 50;
        match op % 3 {
            0 => {
                sim.set_level(PinLevel::Low, now);
                low_edges += 1;
            }
            1 => sim.set_level(PinLevel::High, now),
            _ => {
                sim.advance_to(now);
                let s = sim.capture().drain();
                counted += s.pulses;
                if let Some(d) = s.peak_interval {
                    assert!(d.as_micros() as u64 >= DEBOUNCE_US);
                }
            }
        }
    }
    sim.advance_to(now + DEBOUNCE_US);
    counted += sim.capture().drain().pulses;
    assert!(counted <= low_edges);
});
