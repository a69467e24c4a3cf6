//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Transport security used to reach the test target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// `https://` for the latency probe, `wss://` for the throughput probe
    Secure,
    /// `http://` and `ws://`
    Plain,
}

impl Scheme {
    pub fn http(&self) -> &'static str {
        match self {
            Scheme::Secure => "https",
            Scheme::Plain => "http",
        }
    }

    pub fn websocket(&self) -> &'static str {
        match self {
            Scheme::Secure => "wss",
            Scheme::Plain => "ws",
        }
    }

    /// Port used when a candidate address carries none
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Secure => 443,
            Scheme::Plain => 80,
        }
    }
}

impl Default for Scheme {
    fn default() -> Self {
        Scheme::Secure
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Secure => write!(f, "secure"),
            Scheme::Plain => write!(f, "plain"),
        }
    }
}

impl FromStr for Scheme {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "secure" | "https" | "wss" | "tls" => Ok(Scheme::Secure),
            "plain" | "http" | "ws" => Ok(Scheme::Plain),
            other => Err(AppError::parse(format!("Invalid scheme: {}", other))),
        }
    }
}

/// Report rendering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable ranked list
    Text,
    /// Machine-readable JSON document
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Text
    }
}

/// Pipeline stage identifiers, used in logs and stage summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Source,
    Latency,
    Throughput,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Source => "source",
            Stage::Latency => "latency",
            Stage::Throughput => "throughput",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_parsing() {
        assert_eq!("secure".parse::<Scheme>().unwrap(), Scheme::Secure);
        assert_eq!("HTTPS".parse::<Scheme>().unwrap(), Scheme::Secure);
        assert_eq!("plain".parse::<Scheme>().unwrap(), Scheme::Plain);
        assert_eq!(" ws ".parse::<Scheme>().unwrap(), Scheme::Plain);
        assert!("gopher".parse::<Scheme>().is_err());
    }

    #[test]
    fn test_scheme_urls_and_ports() {
        assert_eq!(Scheme::Secure.http(), "https");
        assert_eq!(Scheme::Secure.websocket(), "wss");
        assert_eq!(Scheme::Secure.default_port(), 443);
        assert_eq!(Scheme::Plain.http(), "http");
        assert_eq!(Scheme::Plain.websocket(), "ws");
        assert_eq!(Scheme::Plain.default_port(), 80);
    }
}
