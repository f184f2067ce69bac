//! Command-line flags.
//!
//! Every flag is optional and overrides the corresponding configuration
//! file value. The short names follow the classic polling script.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "mibtail",
    version,
    about = "Poll SNMP counters and tail them as CSV rows",
    after_help = "Rows go to stdout, diagnostics to stderr. Stop with Ctrl+C."
)]
pub struct Args {
    /// Configuration file (TOML); defaults to $MIBTAIL_CONFIG or /etc/mibtail/config.toml
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// SNMP community
    #[arg(short = 'c', long, value_name = "COMMUNITY")]
    pub community: Option<String>,

    /// Metric catalog (mib.json | mib.yaml | mib.toml)
    #[arg(short = 'm', long = "mib", value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Target agent host or IP
    #[arg(short = 't', long, value_name = "HOST")]
    pub target: Option<String>,

    /// Target agent UDP port
    #[arg(short = 'p', long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Polling interval in seconds (minimum 1)
    #[arg(short = 'i', long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Per-attempt SNMP timeout in seconds
    #[arg(short = 'o', long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// SNMP resends after a timeout
    #[arg(short = 'r', long, value_name = "COUNT")]
    pub retries: Option<u32>,

    /// Enable debug logging
    #[arg(short = 'd', long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_flags_parse() {
        let args = Args::parse_from([
            "mibtail", "-c", "private", "-m", "mib.yaml", "-t", "10.0.0.1", "-p", "1161", "-i",
            "5", "-o", "2", "-r", "1", "-d",
        ]);
        assert_eq!(args.community.as_deref(), Some("private"));
        assert_eq!(args.catalog, Some(PathBuf::from("mib.yaml")));
        assert_eq!(args.target.as_deref(), Some("10.0.0.1"));
        assert_eq!(args.port, Some(1161));
        assert_eq!(args.interval, Some(5));
        assert_eq!(args.timeout, Some(2));
        assert_eq!(args.retries, Some(1));
        assert!(args.debug);
    }

    #[test]
    fn no_flags_leave_everything_unset() {
        let args = Args::parse_from(["mibtail"]);
        assert!(args.config.is_none());
        assert!(args.interval.is_none());
        assert!(!args.debug);
    }

    #[test]
    fn command_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
