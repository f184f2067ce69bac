//! Transport configuration for the SNMP session.
//!
//! Deserializes from the `[transport]` table of the application config file.
//! Defaults match the classic polling script: `public@127.0.0.1:161`, one
//! second per attempt and no resend.
//!
//! ```toml
//! [transport]
//! host = "192.0.2.1"
//! port = 161
//! community = "public"
//! timeout_secs = 1
//! retries = 0
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// SNMP target and request policy.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    /// Agent hostname or IP address. Resolved when the session is opened.
    #[validate(length(
        min = 1,
        max = 255,
        message = "Host must be between 1 and 255 characters"
    ))]
    pub host: String,

    /// Agent UDP port.
    #[validate(range(min = 1, max = 65535, message = "Port must be between 1 and 65535"))]
    pub port: u16,

    /// Community string sent with every request.
    #[validate(length(min = 1, message = "Community must not be empty"))]
    pub community: String,

    /// How long a single attempt waits for the response, in seconds.
    #[validate(range(min = 1, max = 300, message = "Timeout must be between 1 and 300 seconds"))]
    pub timeout_secs: u64,

    /// Number of resends after the first attempt times out.
    #[validate(range(max = 10, message = "Retries must not exceed 10"))]
    pub retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 161,
            community: "public".to_string(),
            timeout_secs: 1,
            retries: 0,
        }
    }
}

impl Config {
    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Upper bound of a single `get`: every attempt may use the full timeout.
    pub fn max_request_time(&self) -> Duration {
        self.timeout() * (self.retries + 1)
    }
}
