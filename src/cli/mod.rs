//! Command-line interface
//!
//! Every flag is optional. Unset flags leave the value from the environment,
//! the `.env` file or the built-in defaults in place.

use clap::Parser;

/// Edge Speed Tester - rank edge addresses by latency and download speed
#[derive(Parser, Debug, Clone)]
#[command(name = "est")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Virtual host presented to every candidate (SNI and Host header)
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Candidate address file, one IP per line
    #[arg(short = 'f', long, value_name = "PATH")]
    pub file: Option<String>,

    /// Download payload size in MB
    #[arg(short = 's', long, value_name = "MB", value_parser = clap::value_parser!(u32).range(1..=1024))]
    pub size: Option<u32>,

    /// Latency stage workers
    #[arg(short = 'p', long, value_name = "N", value_parser = parse_positive)]
    pub ping_concurrency: Option<usize>,

    /// Endpoints kept after the latency stage
    #[arg(long, value_name = "N", value_parser = parse_positive)]
    pub ping_count: Option<usize>,

    /// Throughput stage workers
    #[arg(short = 'd', long, value_name = "N", value_parser = parse_positive)]
    pub download_concurrency: Option<usize>,

    /// Endpoints reported after the throughput stage
    #[arg(long, value_name = "N", value_parser = parse_positive)]
    pub download_count: Option<usize>,

    /// Latency probe timeout in milliseconds
    #[arg(long, value_name = "MS", value_parser = parse_millis)]
    pub ping_timeout: Option<u64>,

    /// Throughput dial and upgrade timeout in milliseconds
    #[arg(long, value_name = "MS", value_parser = parse_millis)]
    pub dial_timeout: Option<u64>,

    /// Throughput transfer timeout in seconds
    #[arg(long, value_name = "SECS", value_parser = parse_seconds)]
    pub transfer_timeout: Option<u64>,

    /// Stop probing after this many seconds and report what was measured
    #[arg(long, value_name = "SECS", value_parser = parse_seconds)]
    pub deadline: Option<u64>,

    /// Use http:// and ws:// instead of https:// and wss://
    #[arg(long)]
    pub plain: bool,

    /// Resolvers for the DNS fallback (comma-separated)
    #[arg(long, value_name = "IP,IP,..")]
    pub dns_servers: Option<String>,

    /// Never fall back to DNS when the candidate file yields nothing
    #[arg(long)]
    pub no_dns: bool,

    /// Per-resolver timeout in milliseconds
    #[arg(long, value_name = "MS", value_parser = parse_millis)]
    pub dns_timeout: Option<u64>,

    /// Print the full report as JSON
    #[arg(long)]
    pub json: bool,

    /// Force colored output
    #[arg(long, conflicts_with = "no_color")]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output (stage summaries, info logs)
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug output (per-probe logs, build banner)
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if let Some(host) = &self.host {
            if host.contains("://") {
                return Err(format!("--host takes a bare hostname, not a URL: {}", host));
            }
        }

        Ok(())
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color || self.json {
            false
        } else {
            supports_color()
        }
    }
}

fn parse_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("value must be greater than 0".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("invalid number: {}", s)),
    }
}

fn parse_millis(s: &str) -> Result<u64, String> {
    parse_bounded(s, 60_000, "ms")
}

fn parse_seconds(s: &str) -> Result<u64, String> {
    parse_bounded(s, 3600, "seconds")
}

fn parse_bounded(s: &str, max: u64, unit: &str) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid duration: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid duration: {}", s))
        .and_then(|value| {
            if value == 0 {
                Err("Duration must be greater than 0".to_string())
            } else if value > max {
                Err(format!("Duration cannot exceed {} {}", max, unit))
            } else {
                Ok(value)
            }
        })
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}
