//! `[logger]` table: where diagnostics go and how verbose they are.
//!
//! Diagnostics cover startup progress, poll timeouts, unknown `disp` tags and
//! sink failures. They never share stdout with the CSV rows: the console
//! output writes to stderr and journald is an optional second destination.
//!
//! ```toml
//! [logger]
//! level = "info"
//!
//! [logger.console]
//! format = "compact"
//! ansi_colors = false
//!
//! [logger.journald]
//! enabled = true
//! ```

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Levels accepted by `level`, from most to least verbose.
const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Line layout of the stderr console output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    /// One JSON object per event, for log shippers.
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggerConfig {
    /// One of trace, debug, info, warn, error (any case). `RUST_LOG` wins
    /// when set.
    #[validate(custom(function = "validate_log_level"))]
    pub level: String,

    #[validate(nested)]
    pub console: Option<ConsoleConfig>,

    #[validate(nested)]
    pub journald: Option<JournaldConfig>,
}

fn level_rank(level: &str) -> Option<usize> {
    let level = level.to_ascii_lowercase();
    LEVELS.iter().position(|l| *l == level)
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    if level_rank(level).is_some() {
        return Ok(());
    }
    let mut err = ValidationError::new("invalid_log_level");
    err.message = Some(
        format!("Invalid log level '{}', expected one of {:?}", level, LEVELS).into(),
    );
    Err(err)
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            level: "info".to_string(),
            console: Some(ConsoleConfig::default()),
            journald: None,
        }
    }
}

impl LoggerConfig {
    /// Applies `-d/--debug`: at least `debug`, keeping `trace` if configured.
    pub fn raise_to_debug(&mut self) {
        let debug = level_rank("debug");
        if level_rank(&self.level).map_or(true, |rank| Some(rank) > debug) {
            self.level = "debug".to_string();
        }
    }
}

/// Console (stderr) output.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub format: LogFormat,
    /// Show the module path of each event, e.g. `mibtail::core::scheduler`.
    pub show_target: bool,
    pub show_thread_ids: bool,
    /// Emit span close events with their timings.
    pub show_spans: bool,
    /// Force colors on or off. Unset: colors only when stderr is a terminal,
    /// so redirected diagnostics stay free of escape codes.
    pub ansi_colors: Option<bool>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        ConsoleConfig {
            enabled: true,
            format: LogFormat::default(),
            show_target: false,
            show_thread_ids: false,
            show_spans: false,
            ansi_colors: None,
        }
    }
}

impl ConsoleConfig {
    pub fn use_ansi(&self) -> bool {
        self.ansi_colors.unwrap_or_else(console::colors_enabled_stderr)
    }
}

/// systemd journal output, off unless enabled.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct JournaldConfig {
    pub enabled: bool,

    /// `SYSLOG_IDENTIFIER` of the journal entries.
    #[validate(length(min = 1, message = "Journald identifier must not be empty"))]
    pub identifier: String,
}

impl Default for JournaldConfig {
    fn default() -> Self {
        JournaldConfig {
            enabled: false,
            identifier: "mibtail".to_string(),
        }
    }
}
