//! mibtail: SNMP counter poller that tails device metrics as CSV rows
//!
//! The poller reads a catalog of metrics, fetches all of them from one SNMP
//! agent in a single GET per round, and writes a timestamped row per round to
//! stdout. Counters are rendered as deltas or rates against the previous
//! round, with 32 and 64 bit wraparound handled.
//!
//! ## Modules
//!
//! * `cli`: Command line flags that override the configuration file.
//!
//! * `config`: Configuration structures, loading, validation, and defaults.
//!   Supports TOML configuration files with validation via the `validator` crate.
//!
//! * `core`: Polling runtime:
//!   - Metric catalog
//!   - Counter state and value formatting
//!   - Fetcher abstraction over the SNMP session
//!   - Scheduler and row emitter
//!
//! * `logger`: Centralized logging initialization using `tracing`.
//!   Supports console output in multiple formats (compact, pretty, JSON)
//!   and optional systemd journald integration. Logs go to stderr so that
//!   stdout carries only data rows.

pub mod cli;
pub mod config;
pub mod core;
pub mod logger;
