//! Application core: pure domain logic, zero I/O.
//!
//! Field derivation, upload batching and the event vocabulary of the
//! weather station. All interaction with hardware happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod derive;
pub mod events;
pub mod ports;
pub mod upload;
