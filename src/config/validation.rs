//! Configuration validation utilities and rules
//!
//! [`Config::validate`] rejects values the pipeline cannot run with. The
//! checks here only warn: the run goes ahead, but the user probably did not
//! mean it.

use crate::{defaults, error::Result, models::Config, types::Scheme};
use colored::*;
use std::net::IpAddr;

/// Configuration validator with advisory rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Hard validation followed by the advisory checks
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::validate_funnel(config));
        warnings.extend(Self::validate_timeouts(config));
        warnings.extend(Self::validate_transport(config));
        warnings.extend(Self::validate_dns_servers(config)?);

        Ok(warnings)
    }

    /// Stage sizes and worker counts
    fn validate_funnel(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.download_count > config.ping_count {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Download count {} exceeds ping count {}; at most {} endpoints can be reported",
                    config.download_count, config.ping_count, config.ping_count
                ),
            ));
        }

        if config.download_concurrency > config.ping_count {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Download concurrency {} exceeds the {} endpoints that reach the throughput stage",
                    config.download_concurrency, config.ping_count
                ),
            ));
        }

        if config.download_concurrency > 16 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "{} parallel downloads share one uplink and will understate each endpoint's speed",
                    config.download_concurrency
                ),
            ));
        }

        if config.ping_concurrency > 1000 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Ping concurrency {} may exhaust local file descriptors",
                    config.ping_concurrency
                ),
            ));
        }

        warnings
    }

    fn validate_timeouts(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let ping_timeout = config.ping_timeout();

        if ping_timeout < defaults::RECOMMENDED_PING_TIMEOUT_MIN {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Ping timeout of {}ms is below {}ms; distant endpoints will all time out",
                    config.ping_timeout_ms,
                    defaults::RECOMMENDED_PING_TIMEOUT_MIN.as_millis()
                ),
            ));
        } else if ping_timeout > defaults::RECOMMENDED_PING_TIMEOUT_MAX {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Ping timeout of {}ms is above {}ms and will slow down the latency stage",
                    config.ping_timeout_ms,
                    defaults::RECOMMENDED_PING_TIMEOUT_MAX.as_millis()
                ),
            ));
        }

        if let Some(deadline) = config.deadline() {
            if deadline < config.transfer_timeout() {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!(
                        "Deadline of {}s is shorter than the {}s transfer timeout; the throughput stage may be cut short",
                        deadline.as_secs(),
                        config.transfer_timeout_seconds
                    ),
                ));
            }
        }

        warnings
    }

    fn validate_transport(config: &Config) -> Vec<ValidationWarning> {
        match config.scheme {
            Scheme::Plain => vec![ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Plain scheme in use: probing http://{} and ws://{} without TLS",
                    config.host, config.host
                ),
            )],
            Scheme::Secure => Vec::new(),
        }
    }

    fn validate_dns_servers(config: &Config) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();

        if !config.dns_fallback {
            return Ok(warnings);
        }

        if config.dns_servers.is_empty() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "DNS fallback is enabled but no resolvers are configured".to_string(),
            ));
        }

        for addr in config.dns_server_addrs()? {
            let ip = addr.ip();
            if ip.is_loopback() {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("DNS server {} is loopback address (localhost)", addr),
                ));
            } else if let IpAddr::V4(v4) = ip {
                if v4.is_private() {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Warning,
                        format!("DNS server {} is in private IP range, ensure it's accessible", addr),
                    ));
                }
            }
        }

        Ok(warnings)
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
    Error,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }

    /// Get color for terminal display
    pub fn color(&self) -> &'static str {
        match self {
            Self::Info => "blue",
            Self::Warning => "yellow",
            Self::Error => "red",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    /// Create a new validation warning
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        if use_color {
            format!("{} {}", tag.color(self.level.color()).bold(), self.message)
        } else {
            format!("{} {}", tag, self.message)
        }
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
