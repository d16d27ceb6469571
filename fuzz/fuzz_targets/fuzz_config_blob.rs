//! Fuzz target: stored configuration blob
//!
//! Feeds arbitrary bytes to the NVS config loader and verifies:
//! - No panics under arbitrary byte inputs
//! - Anything that loads also passes `StationConfig::validate`
//! - Anything that fails to load is reported as `Corrupted`
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use libfuzzer_sys::fuzz_target;
use wxstation::adapters::nvs::NvsAdapter;
use wxstation::app::ports::{ConfigError, ConfigPort};

fuzz_target!(|data: &[u8]| {
    let Ok(nvs) = NvsAdapter::new() else {
        return;
    };
    nvs.sim_put_raw(data);
    match nvs.load() {
        Ok(cfg) => assert!(cfg.validate().is_ok()),
        Err(e) => assert_eq!(e, ConfigError::Corrupted),
    }
});
