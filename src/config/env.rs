//! Environment variable handling and .env file management

use crate::{
    error::{AppError, Result},
    models::config::{parse_dns_server, split_list},
    types::Scheme,
};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        if Path::new(".env").exists() {
            dotenv::from_filename(".env")
                .map_err(|e| AppError::config(format!("Failed to load .env file: {}", e)))?;

            if debug {
                eprintln!("Loaded configuration from .env file");
            }
        } else if debug {
            eprintln!("No .env file found, using defaults and CLI arguments");
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# Edge Speed Tester Configuration
#
# Values here become defaults for `est`. Command-line arguments still win.

# Virtual host the candidates serve (SNI and Host header)
# EST_HOST=jp.test4x.com

# Candidate address file, one IP per line
# EST_FILE=cfip.txt

# Payload requested from /test?size=N, in megabytes
# EST_SIZE_MB=5

# Latency stage: workers and how many endpoints survive
# EST_PING_CONCURRENCY=50
# EST_PING_COUNT=50

# Throughput stage: workers and how many endpoints are reported
# EST_DOWNLOAD_CONCURRENCY=4
# EST_DOWNLOAD_COUNT=20

# Probe timeouts
# EST_PING_TIMEOUT_MS=1500
# EST_DIAL_TIMEOUT_MS=2000
# EST_TRANSFER_TIMEOUT_SECONDS=30

# Stop probing after this many seconds and report what was measured
# EST_DEADLINE_SECONDS=120

# Resolvers used when the candidate file is missing or empty
# EST_DNS_SERVERS=8.8.8.8,1.1.1.1,223.5.5.5
# EST_DNS_FALLBACK=true
# EST_DNS_TIMEOUT_MS=3000

# secure (https/wss) or plain (http/ws)
# EST_SCHEME=secure

# Enable colored output (true/false)
# EST_ENABLE_COLOR=true

# Example configurations for different scenarios:
#
# Quick scan of a large pool:
# EST_PING_CONCURRENCY=200
# EST_PING_COUNT=20
# EST_DOWNLOAD_COUNT=5
#
# Lab server without TLS:
# EST_SCHEME=plain
# EST_DNS_FALLBACK=false
"#
        .to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        let content = Self::create_example_env_content();
        std::fs::write(path, content)
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))?;

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "EST_HOST" => {
                if value.is_empty() || value.contains('/') || value.contains(':') {
                    return Err(AppError::config(format!("EST_HOST must be a bare hostname, got '{}'", value)));
                }
            }
            "EST_FILE" => {
                if value.is_empty() {
                    return Err(AppError::config("EST_FILE cannot be empty"));
                }
            }
            "EST_DNS_SERVERS" => {
                for server in split_list(value) {
                    parse_dns_server(&server)
                        .map_err(|_| AppError::config(format!("Invalid EST_DNS_SERVERS entry '{}'", server)))?;
                }
            }
            "EST_SIZE_MB" => check_range(key, value, 1, 1024)?,
            "EST_PING_CONCURRENCY" => check_range(key, value, 1, 4096)?,
            "EST_DOWNLOAD_CONCURRENCY" => check_range(key, value, 1, 256)?,
            "EST_PING_COUNT" | "EST_DOWNLOAD_COUNT" | "EST_DEADLINE_SECONDS" => {
                check_range(key, value, 1, u64::MAX)?
            }
            "EST_PING_TIMEOUT_MS" | "EST_DIAL_TIMEOUT_MS" | "EST_DNS_TIMEOUT_MS" => {
                check_range(key, value, 1, 60_000)?
            }
            "EST_TRANSFER_TIMEOUT_SECONDS" => check_range(key, value, 1, 3600)?,
            "EST_SCHEME" => {
                value.parse::<Scheme>()?;
            }
            "EST_DNS_FALLBACK" | "EST_ENABLE_COLOR" => {
                value
                    .parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            }
            _ => {}
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("EST_HOST", "Virtual host presented to every candidate", "jp.test4x.com"),
            ("EST_FILE", "Candidate address file", "cfip.txt"),
            ("EST_SIZE_MB", "Download payload size in MB (1-1024)", "5"),
            ("EST_PING_CONCURRENCY", "Latency stage workers (1-4096)", "50"),
            ("EST_PING_COUNT", "Endpoints kept after the latency stage", "50"),
            ("EST_DOWNLOAD_CONCURRENCY", "Throughput stage workers (1-256)", "4"),
            ("EST_DOWNLOAD_COUNT", "Endpoints reported", "20"),
            ("EST_PING_TIMEOUT_MS", "Latency probe timeout in ms", "1500"),
            ("EST_DIAL_TIMEOUT_MS", "Throughput dial and upgrade timeout in ms", "2000"),
            ("EST_TRANSFER_TIMEOUT_SECONDS", "Throughput transfer timeout in seconds", "30"),
            ("EST_DEADLINE_SECONDS", "Overall run deadline in seconds", "120"),
            ("EST_DNS_SERVERS", "Comma-separated resolver addresses", "8.8.8.8,1.1.1.1"),
            ("EST_DNS_FALLBACK", "Resolve the host when the file is empty", "true"),
            ("EST_DNS_TIMEOUT_MS", "Per-resolver timeout in ms", "3000"),
            ("EST_SCHEME", "secure (https/wss) or plain (http/ws)", "secure"),
            ("EST_ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<30} {}\n", var, description));
            help.push_str(&format!("  {:<30} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(var_name, _, _)| {
                let value = std::env::var(var_name).ok()?;
                Self::validate_env_var(var_name, &value)
                    .err()
                    .map(|e| format!("Warning: {}", e))
            })
            .collect()
    }

    /// Check if .env file exists and validate its contents
    pub fn check_env_file() -> Result<Option<Vec<String>>> {
        Self::check_env_file_at(Path::new(".env"))
    }

    /// Validate the assignments in an env file without loading it
    pub fn check_env_file_at(path: &Path) -> Result<Option<Vec<String>>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("Failed to read {}: {}", path.display(), e)))?;

        let mut warnings = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                if let Err(e) = Self::validate_env_var(key.trim(), value) {
                    warnings.push(format!("Line '{}': {}", line, e));
                }
            }
        }

        Ok(Some(warnings))
    }
}

fn check_range(key: &str, value: &str, min: u64, max: u64) -> Result<()> {
    let parsed: u64 = value
        .parse()
        .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
    if parsed < min || parsed > max {
        return Err(AppError::config(format!(
            "{} must be between {} and {}, got: {}",
            key, min, max, parsed
        )));
    }
    Ok(())
}
