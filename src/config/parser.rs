//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::{AppError, Result},
    models::{config::split_list, Config},
    types::{OutputFormat, Scheme},
};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        self.cli.validate().map_err(AppError::config)?;

        let mut config = Config::default();

        EnvManager::load_env_file(self.cli.debug)?;
        config.merge_from_env()?;

        self.apply_cli_overrides(&mut config);

        config.validate()?;

        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    pub fn apply_cli_overrides(&self, config: &mut Config) {
        let cli = &self.cli;

        if let Some(host) = &cli.host {
            config.host = host.trim().to_string();
        }
        if let Some(file) = &cli.file {
            config.candidate_file = file.clone();
        }
        if let Some(size) = cli.size {
            config.payload_size_mb = size;
        }
        if let Some(n) = cli.ping_concurrency {
            config.ping_concurrency = n;
        }
        if let Some(n) = cli.ping_count {
            config.ping_count = n;
        }
        if let Some(n) = cli.download_concurrency {
            config.download_concurrency = n;
        }
        if let Some(n) = cli.download_count {
            config.download_count = n;
        }
        if let Some(ms) = cli.ping_timeout {
            config.ping_timeout_ms = ms;
        }
        if let Some(ms) = cli.dial_timeout {
            config.dial_timeout_ms = ms;
        }
        if let Some(secs) = cli.transfer_timeout {
            config.transfer_timeout_seconds = secs;
        }
        if let Some(secs) = cli.deadline {
            config.deadline_seconds = Some(secs);
        }
        if cli.plain {
            config.scheme = Scheme::Plain;
        }
        if let Some(servers) = &cli.dns_servers {
            config.dns_servers = split_list(servers);
        }
        if cli.no_dns {
            config.dns_fallback = false;
        }
        if let Some(ms) = cli.dns_timeout {
            config.dns_timeout_ms = ms;
        }
        if cli.json {
            config.output_format = OutputFormat::Json;
        }

        if cli.color {
            config.enable_color = true;
        } else if cli.no_color || cli.json {
            config.enable_color = false;
        }

        // CLI-only flags
        config.verbose = cli.verbose;
        config.debug = cli.debug;

        if config.debug {
            eprintln!("Applied CLI overrides to configuration");
            eprintln!("{}", display_config_summary(config));
        }
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Host: {} ({})", config.host, config.scheme));
    summary.push(format!("Candidate file: {}", config.candidate_file));
    summary.push(format!("Payload size: {} MB", config.payload_size_mb));
    summary.push(format!(
        "Latency stage: {} workers, keep {}",
        config.ping_concurrency, config.ping_count
    ));
    summary.push(format!(
        "Throughput stage: {} workers, keep {}",
        config.download_concurrency, config.download_count
    ));
    summary.push(format!(
        "Timeouts: ping {}ms, dial {}ms, transfer {}s",
        config.ping_timeout_ms, config.dial_timeout_ms, config.transfer_timeout_seconds
    ));
    match config.deadline_seconds {
        Some(secs) => summary.push(format!("Deadline: {}s", secs)),
        None => summary.push("Deadline: none".to_string()),
    }
    if config.dns_fallback {
        summary.push(format!(
            "DNS fallback: {} resolvers, {}ms timeout",
            config.dns_servers.len(),
            config.dns_timeout_ms
        ));
    } else {
        summary.push("DNS fallback: disabled".to_string());
    }
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
