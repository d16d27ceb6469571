//! Weather-station firmware library.
//!
//! Exposes the measurement core (wind capture, snapshot store, scheduler)
//! and its adapters for integration testing and for the firmware binary.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod maintenance;
pub mod pins;
pub mod scheduler;
pub mod snapshot;

pub mod adapters;
pub mod drivers;
pub mod sensors;
