//! Log-only uplink.
//!
//! Implements [`UploadPort`] by rendering the batch as a single JSON
//! object (`{"temp":12.3,...}`) and writing it to the log. Stands in for
//! an HTTP submitter; a real one would post the same body.
//!
//! [`Publisher`] pairs it with a [`NetworkPort`] for the scheduler.

use core::time::Duration;

use serde_json::{Map, Number, Value};

use crate::app::ports::{NetworkPort, UploadPort};
use crate::app::upload::UploadBatch;
use crate::error::CommsError;

/// Render `batch` as a flat JSON object keyed by upload key.
pub fn batch_to_json(batch: &UploadBatch) -> Result<String, CommsError> {
    let mut obj = Map::new();
    obj.insert("ts".into(), Value::from(batch.timestamp));
    for v in &batch.values {
        let n = Number::from_f64(f64::from(v.value)).ok_or(CommsError::Rejected)?;
        obj.insert(v.quantity.key().into(), Value::Number(n));
    }
    serde_json::to_string(&Value::Object(obj)).map_err(|_| CommsError::Rejected)
}

#[derive(Default)]
pub struct LogUplink {
    submitted: u32,
}

impl LogUplink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> u32 {
        self.submitted
    }
}

impl UploadPort for LogUplink {
    fn upload(&mut self, batch: &UploadBatch) -> Result<(), CommsError> {
        if batch.is_empty() {
            return Err(CommsError::Rejected);
        }
        let body = batch_to_json(batch)?;
        log::info!("uplink: cycle {} {}", batch.cycle, body);
        self.submitted += 1;
        Ok(())
    }
}

/// Readiness signal and submitter bundled into the single publisher the
/// scheduler drives.
pub struct Publisher<N, U> {
    pub network: N,
    pub upload: U,
}

impl<N: NetworkPort, U> NetworkPort for Publisher<N, U> {
    fn wait_ready(&mut self, timeout: Duration) -> bool {
        self.network.wait_ready(timeout)
    }
}

impl<N, U: UploadPort> UploadPort for Publisher<N, U> {
    fn upload(&mut self, batch: &UploadBatch) -> Result<(), CommsError> {
        self.upload.upload(batch)
    }
}
