//! Configuration data model and validation

use crate::types::{AppError, OutputFormat, Result, Scheme};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Virtual host the candidates serve (SNI and `Host` header)
    #[serde(default = "default_host")]
    pub host: String,

    /// Line-delimited candidate address file
    #[serde(default = "default_candidate_file")]
    pub candidate_file: String,

    /// Payload requested from `/test?size=N`, in megabytes
    #[serde(default = "default_payload_size_mb")]
    pub payload_size_mb: u32,

    /// Workers in the latency stage
    #[serde(default = "default_ping_concurrency")]
    pub ping_concurrency: usize,

    /// Endpoints kept after the latency stage
    #[serde(default = "default_ping_count")]
    pub ping_count: usize,

    /// Workers in the throughput stage
    #[serde(default = "default_download_concurrency")]
    pub download_concurrency: usize,

    /// Endpoints reported after the throughput stage
    #[serde(default = "default_download_count")]
    pub download_count: usize,

    /// Latency probe timeout in milliseconds
    #[serde(default = "default_ping_timeout_ms")]
    pub ping_timeout_ms: u64,

    /// Throughput probe dial + upgrade timeout in milliseconds
    #[serde(default = "default_dial_timeout_ms")]
    pub dial_timeout_ms: u64,

    /// Throughput probe transfer timeout in seconds
    #[serde(default = "default_transfer_timeout_seconds")]
    pub transfer_timeout_seconds: u64,

    /// Overall run deadline in seconds (none when unset)
    #[serde(default)]
    pub deadline_seconds: Option<u64>,

    /// Resolvers queried when falling back to DNS
    #[serde(default = "default_dns_servers")]
    pub dns_servers: Vec<String>,

    /// Fall back to DNS when the candidate file yields nothing
    #[serde(default = "default_dns_fallback")]
    pub dns_fallback: bool,

    /// Per-resolver query timeout in milliseconds
    #[serde(default = "default_dns_timeout_ms")]
    pub dns_timeout_ms: u64,

    /// `secure` (https/wss) or `plain` (http/ws)
    #[serde(default)]
    pub scheme: Scheme,

    /// Report rendering mode
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            candidate_file: default_candidate_file(),
            payload_size_mb: default_payload_size_mb(),
            ping_concurrency: default_ping_concurrency(),
            ping_count: default_ping_count(),
            download_concurrency: default_download_concurrency(),
            download_count: default_download_count(),
            ping_timeout_ms: default_ping_timeout_ms(),
            dial_timeout_ms: default_dial_timeout_ms(),
            transfer_timeout_seconds: default_transfer_timeout_seconds(),
            deadline_seconds: None,
            dns_servers: default_dns_servers(),
            dns_fallback: default_dns_fallback(),
            dns_timeout_ms: default_dns_timeout_ms(),
            scheme: Scheme::default(),
            output_format: OutputFormat::default(),
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_seconds)
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_seconds.map(Duration::from_secs)
    }

    /// Resolver socket addresses; a bare IP gets port 53
    pub fn dns_server_addrs(&self) -> Result<Vec<SocketAddr>> {
        self.dns_servers.iter().map(|s| parse_dns_server(s)).collect()
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(AppError::config("Host cannot be empty"));
        }
        if host.contains('/') || host.contains(' ') || host.contains(':') {
            return Err(AppError::config(format!("Host must be a bare hostname, got '{}'", host)));
        }
        url::Host::parse(host).map_err(|e| AppError::config(format!("Invalid host '{}': {}", host, e)))?;

        if self.payload_size_mb == 0 || self.payload_size_mb > 1024 {
            return Err(AppError::config(format!(
                "Payload size must be between 1 and 1024 MB, got: {}", self.payload_size_mb
            )));
        }

        if self.ping_concurrency == 0 || self.ping_concurrency > 4096 {
            return Err(AppError::config(format!(
                "Ping concurrency must be between 1 and 4096, got: {}", self.ping_concurrency
            )));
        }

        if self.download_concurrency == 0 || self.download_concurrency > 256 {
            return Err(AppError::config(format!(
                "Download concurrency must be between 1 and 256, got: {}", self.download_concurrency
            )));
        }

        if self.ping_count == 0 {
            return Err(AppError::config("Ping result count must be greater than 0"));
        }

        if self.download_count == 0 {
            return Err(AppError::config("Download result count must be greater than 0"));
        }

        if self.ping_timeout_ms == 0 || self.ping_timeout_ms > 60_000 {
            return Err(AppError::config(format!(
                "Ping timeout must be between 1 and 60000 ms, got: {}", self.ping_timeout_ms
            )));
        }

        if self.dial_timeout_ms == 0 || self.dial_timeout_ms > 60_000 {
            return Err(AppError::config(format!(
                "Dial timeout must be between 1 and 60000 ms, got: {}", self.dial_timeout_ms
            )));
        }

        if self.transfer_timeout_seconds == 0 || self.transfer_timeout_seconds > 3600 {
            return Err(AppError::config(format!(
                "Transfer timeout must be between 1 and 3600 seconds, got: {}", self.transfer_timeout_seconds
            )));
        }

        if self.deadline_seconds == Some(0) {
            return Err(AppError::config("Deadline must be greater than 0 seconds"));
        }

        if self.dns_timeout_ms == 0 || self.dns_timeout_ms > 60_000 {
            return Err(AppError::config(format!(
                "DNS timeout must be between 1 and 60000 ms, got: {}", self.dns_timeout_ms
            )));
        }

        for server in &self.dns_servers {
            if server.trim().is_empty() {
                return Err(AppError::config("DNS server cannot be empty"));
            }
            parse_dns_server(server)?;
        }

        Ok(())
    }

    /// Merge `EST_*` environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("EST_HOST") {
            self.host = host.trim().to_string();
        }

        if let Ok(file) = std::env::var("EST_FILE") {
            self.candidate_file = file.trim().to_string();
        }

        if let Ok(size) = std::env::var("EST_SIZE_MB") {
            self.payload_size_mb = parse_env("EST_SIZE_MB", &size)?;
        }

        if let Ok(value) = std::env::var("EST_PING_CONCURRENCY") {
            self.ping_concurrency = parse_env("EST_PING_CONCURRENCY", &value)?;
        }

        if let Ok(value) = std::env::var("EST_PING_COUNT") {
            self.ping_count = parse_env("EST_PING_COUNT", &value)?;
        }

        if let Ok(value) = std::env::var("EST_DOWNLOAD_CONCURRENCY") {
            self.download_concurrency = parse_env("EST_DOWNLOAD_CONCURRENCY", &value)?;
        }

        if let Ok(value) = std::env::var("EST_DOWNLOAD_COUNT") {
            self.download_count = parse_env("EST_DOWNLOAD_COUNT", &value)?;
        }

        if let Ok(value) = std::env::var("EST_PING_TIMEOUT_MS") {
            self.ping_timeout_ms = parse_env("EST_PING_TIMEOUT_MS", &value)?;
        }

        if let Ok(value) = std::env::var("EST_DIAL_TIMEOUT_MS") {
            self.dial_timeout_ms = parse_env("EST_DIAL_TIMEOUT_MS", &value)?;
        }

        if let Ok(value) = std::env::var("EST_TRANSFER_TIMEOUT_SECONDS") {
            self.transfer_timeout_seconds = parse_env("EST_TRANSFER_TIMEOUT_SECONDS", &value)?;
        }

        if let Ok(value) = std::env::var("EST_DEADLINE_SECONDS") {
            self.deadline_seconds = Some(parse_env("EST_DEADLINE_SECONDS", &value)?);
        }

        if let Ok(servers) = std::env::var("EST_DNS_SERVERS") {
            self.dns_servers = split_list(&servers);
        }

        if let Ok(value) = std::env::var("EST_DNS_FALLBACK") {
            self.dns_fallback = parse_env("EST_DNS_FALLBACK", &value)?;
        }

        if let Ok(value) = std::env::var("EST_DNS_TIMEOUT_MS") {
            self.dns_timeout_ms = parse_env("EST_DNS_TIMEOUT_MS", &value)?;
        }

        if let Ok(value) = std::env::var("EST_SCHEME") {
            self.scheme = value.parse()?;
        }

        if let Ok(value) = std::env::var("EST_ENABLE_COLOR") {
            self.enable_color = parse_env("EST_ENABLE_COLOR", &value)?;
        }

        Ok(())
    }
}

/// Split a comma-separated list, dropping blanks
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a resolver entry: `8.8.8.8`, `8.8.8.8:5353`, `2001:4860:4860::8888`
/// or `[2001:4860:4860::8888]:53`
pub fn parse_dns_server(server: &str) -> Result<SocketAddr> {
    let server = server.trim();
    if let Ok(ip) = server.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, 53));
    }
    server
        .parse::<SocketAddr>()
        .map_err(|_| AppError::config(format!("Invalid DNS server address: {}", server)))
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))
}

// Default value functions for serde
fn default_host() -> String {
    crate::defaults::DEFAULT_HOST.to_string()
}

fn default_candidate_file() -> String {
    crate::defaults::DEFAULT_CANDIDATE_FILE.to_string()
}

fn default_payload_size_mb() -> u32 {
    crate::defaults::DEFAULT_PAYLOAD_SIZE_MB
}

fn default_ping_concurrency() -> usize {
    crate::defaults::DEFAULT_PING_CONCURRENCY
}

fn default_ping_count() -> usize {
    crate::defaults::DEFAULT_PING_COUNT
}

fn default_download_concurrency() -> usize {
    crate::defaults::DEFAULT_DOWNLOAD_CONCURRENCY
}

fn default_download_count() -> usize {
    crate::defaults::DEFAULT_DOWNLOAD_COUNT
}

fn default_ping_timeout_ms() -> u64 {
    crate::defaults::DEFAULT_PING_TIMEOUT.as_millis() as u64
}

fn default_dial_timeout_ms() -> u64 {
    crate::defaults::DEFAULT_DIAL_TIMEOUT.as_millis() as u64
}

fn default_transfer_timeout_seconds() -> u64 {
    crate::defaults::DEFAULT_TRANSFER_TIMEOUT.as_secs()
}

fn default_dns_servers() -> Vec<String> {
    crate::defaults::DEFAULT_DNS_SERVERS
        .iter()
        .map(|&s| s.to_string())
        .collect()
}

fn default_dns_fallback() -> bool {
    crate::defaults::DEFAULT_DNS_FALLBACK
}

fn default_dns_timeout_ms() -> u64 {
    crate::defaults::DEFAULT_DNS_TIMEOUT.as_millis() as u64
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ping_concurrency, 50);
        assert_eq!(config.ping_count, 50);
        assert_eq!(config.download_concurrency, 4);
        assert_eq!(config.download_count, 20);
        assert_eq!(config.payload_size_mb, 5);
        assert_eq!(config.scheme, Scheme::Secure);
    }

    #[test]
    fn test_default_dns_servers_are_unique() {
        let config = Config::default();
        let mut servers = config.dns_servers.clone();
        servers.sort();
        servers.dedup();
        assert_eq!(servers.len(), config.dns_servers.len());
    }

    #[test]
    fn test_empty_host_invalid() {
        let mut config = Config::default();
        config.host = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_host_with_scheme_invalid() {
        let mut config = Config::default();
        config.host = "https://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_host_with_forbidden_characters_invalid() {
        for host in ["bad<host", "edge|test.com", "speed^test"] {
            let mut config = Config::default();
            config.host = host.to_string();
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("Invalid host"), "{}", err);
        }

        let mut config = Config::default();
        config.host = "104.16.0.1".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_invalid() {
        let mut config = Config::default();
        config.ping_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.download_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_counts_invalid() {
        let mut config = Config::default();
        config.ping_count = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.download_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_payload_size_bounds() {
        let mut config = Config::default();
        config.payload_size_mb = 0;
        assert!(config.validate().is_err());
        config.payload_size_mb = 1024;
        assert!(config.validate().is_ok());
        config.payload_size_mb = 1025;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_deadline_invalid() {
        let mut config = Config::default();
        config.deadline_seconds = Some(0);
        assert!(config.validate().is_err());
        config.deadline_seconds = Some(30);
        assert!(config.validate().is_ok());
        assert_eq!(config.deadline(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_invalid_dns_server() {
        let mut config = Config::default();
        config.dns_servers = vec!["not-an-ip".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_dns_server_list_is_valid() {
        let mut config = Config::default();
        config.dns_servers.clear();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_dns_server_forms() {
        assert_eq!(parse_dns_server("8.8.8.8").unwrap(), "8.8.8.8:53".parse().unwrap());
        assert_eq!(parse_dns_server("8.8.8.8:5353").unwrap(), "8.8.8.8:5353".parse().unwrap());
        assert_eq!(
            parse_dns_server("2001:4860:4860::8888").unwrap(),
            "[2001:4860:4860::8888]:53".parse().unwrap()
        );
        assert!(parse_dns_server("dns.google").is_err());
    }

    #[test]
    fn test_timeouts_as_durations() {
        let config = Config::default();
        assert_eq!(config.ping_timeout(), Duration::from_millis(1500));
        assert_eq!(config.dial_timeout(), Duration::from_secs(2));
        assert_eq!(config.transfer_timeout(), Duration::from_secs(30));
        assert_eq!(config.deadline(), None);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" 1.1.1.1, ,8.8.8.8,"), vec!["1.1.1.1", "8.8.8.8"]);
        assert!(split_list("").is_empty());
    }
}
