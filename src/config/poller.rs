//! Sampling configuration: which catalog to poll and how often.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::print_warn;

/// Catalog location and polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PollerConfig {
    /// Metric catalog file (`.json`, `.yaml`, `.yml` or `.toml`).
    pub catalog: PathBuf,

    /// Seconds between the starts of consecutive rounds.
    ///
    /// Values below 1 are raised to 1 by [`PollerConfig::normalize`].
    #[validate(range(min = 1, message = "Polling interval must be at least 1 second"))]
    pub interval_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from("mib.json"),
            interval_secs: 10,
        }
    }
}

impl PollerConfig {
    /// Applies the one-second floor on the polling interval.
    pub fn normalize(&mut self) {
        if self.interval_secs < 1 {
            print_warn!(
                "Polling interval {}s is below the 1s minimum, using 1s",
                self.interval_secs
            );
            self.interval_secs = 1;
        }
    }
}
