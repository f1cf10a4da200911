use serde::Serialize;

use crate::error::ShutdownError;

/// Outcome of one probe against `http://{host}:{port}/`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub url: String,
    pub success: bool,
}

/// What happened while draining the listeners.
#[derive(Debug, Clone, Default)]
pub struct ShutdownReport {
    pub stopped: usize,
    pub failed: Vec<ShutdownError>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
