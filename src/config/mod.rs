//! Application configuration loading, validation, and management.
//!
//! This module provides the top-level `Config` structure that aggregates
//! logging, polling, and transport configurations. Values are layered:
//! built-in defaults, then an optional TOML file, then command-line flags.
//!
//! The configuration is resolved once at startup and is immutable thereafter.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::cli::Args;

pub mod logger;
pub mod poller;

use self::{logger::LoggerConfig, poller::PollerConfig};

/// Simple macros for printing timestamped messages before the tracing subscriber
/// is initialized. These are used during early configuration loading.
///
/// They write to stderr: stdout is reserved for data rows.
#[macro_export]
macro_rules! print_info {
    ($($arg:tt)*) => {
        eprintln!("{}  {} {}",
            console::style(
                time::OffsetDateTime::now_utc()
                    .format(&time::format_description::parse(
                        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
                    ).unwrap())
                    .unwrap()
            ).dim(),
            console::style("INFO").green(),
            format_args!($($arg)*)
        );
    };
}

#[macro_export]
macro_rules! print_warn {
    ($($arg:tt)*) => {
        eprintln!("{}  {} {}",
            console::style(
                time::OffsetDateTime::now_utc()
                    .format(&time::format_description::parse(
                        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
                    ).unwrap())
                    .unwrap()
            ).dim(),
            console::style("WARN").yellow(),
            format_args!($($arg)*)
        );
    };
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        eprintln!("{}  {} {}",
            console::style(
                time::OffsetDateTime::now_utc()
                    .format(&time::format_description::parse(
                        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
                    ).unwrap())
                    .unwrap()
            ).dim(),
            console::style("ERROR").red(),
            format_args!($($arg)*)
        );
    };
}

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "MIBTAIL_CONFIG";

/// Configuration file used when neither `--config` nor `MIBTAIL_CONFIG` is set.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/mibtail/config.toml";

/// Errors that can occur during configuration loading, parsing, or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Generic configuration-related error with a descriptive message.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error while accessing configuration files.
    #[error("IO error while reading configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// Failure to parse the TOML configuration file.
    #[error("Parse error while reading configuration: {0}")]
    ParseError(String),

    /// Validation failure after all layers were applied.
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// SNMP transport settings, owned by the transport crate.
pub type TransportConfig = mibtail_snmp::Config;

/// Top-level application configuration.
#[derive(Serialize, Deserialize, Debug, Validate, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Logging subsystem configuration.
    #[validate(nested)]
    pub logger: LoggerConfig,

    /// Catalog location and sampling cadence.
    #[validate(nested)]
    pub poller: PollerConfig,

    /// SNMP agent address and request policy.
    #[validate(nested)]
    pub transport: TransportConfig,
}

impl Config {
    /// Resolves the effective configuration for a run.
    ///
    /// The file named by `--config`, else `MIBTAIL_CONFIG`, else
    /// `/etc/mibtail/config.toml` is loaded when present; without any file
    /// the built-in defaults are used. Command-line flags are applied last.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if an explicitly named file cannot be read,
    /// parsed, or if the resulting configuration fails validation.
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match Self::get_config_path(args.config.as_deref())? {
            Some(path) => Self::parse_file(&path)?,
            None => {
                print_info!("No configuration file, using built-in defaults");
                Config::default()
            }
        };

        config.apply_args(args);
        config.poller.normalize();
        config
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        Ok(config)
    }

    /// Determines the configuration file path.
    ///
    /// Priority:
    /// 1. `--config` command-line flag
    /// 2. `MIBTAIL_CONFIG` environment variable
    /// 3. `/etc/mibtail/config.toml`, only if it exists
    fn get_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
        if let Some(path) = explicit {
            print_info!("Using config from --config: {}", path.display());
            return Self::require_exists(path.to_path_buf()).map(Some);
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(config_path);
            print_info!("Using config from {}: {}", CONFIG_ENV, path.display());
            return Self::require_exists(path).map(Some);
        }

        let fallback = Path::new(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            print_info!("Using default config path: {}", fallback.display());
            return Ok(Some(fallback.to_path_buf()));
        }

        Ok(None)
    }

    fn require_exists(path: PathBuf) -> Result<PathBuf, ConfigError> {
        if path.exists() {
            Ok(path)
        } else {
            Err(ConfigError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )))
        }
    }

    /// Loads and validates configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Propagates IO, parsing, and validation errors as `ConfigError`.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let mut config = Self::parse_file(path)?;
        config.poller.normalize();
        config
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Config, ConfigError> {
        print_info!("Loading configuration from: {}", path.display());

        let config_str = fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&config_str).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        print_info!("Successfully loaded config from: {}", path.display());
        Ok(config)
    }

    /// Overrides file values with the flags given on the command line.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(community) = &args.community {
            self.transport.community = community.clone();
        }
        if let Some(catalog) = &args.catalog {
            self.poller.catalog = catalog.clone();
        }
        if let Some(target) = &args.target {
            self.transport.host = target.clone();
        }
        if let Some(port) = args.port {
            self.transport.port = port;
        }
        if let Some(interval) = args.interval {
            self.poller.interval_secs = interval;
        }
        if let Some(timeout) = args.timeout {
            self.transport.timeout_secs = timeout;
        }
        if let Some(retries) = args.retries {
            self.transport.retries = retries;
        }
        if args.debug {
            self.logger.raise_to_debug();
        }
    }

    /// The startup banner echoing the resolved configuration.
    pub fn banner(&self) -> String {
        format!(
            "##SNMP Polling:target_ip=\"{}\" target_port=\"{}\" mdata=\"{}\" community=\"{}\" interval={} snmp_timeout={} snmp_retries={}",
            self.transport.host,
            self.transport.port,
            self.poller.catalog.display(),
            self.transport.community,
            self.poller.interval_secs,
            self.transport.timeout_secs,
            self.transport.retries,
        )
    }
}
