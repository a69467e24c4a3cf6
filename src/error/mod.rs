//! Error handling for the edge speed tester
//!
//! Two layers of errors exist:
//! - [`AppError`] aborts a run (bad configuration, no candidates, I/O).
//! - [`ProbeError`] describes why a single probe failed. It never leaves the
//!   probe: it is logged and translated into a sentinel measurement on the
//!   endpoint being probed.

use std::time::Duration;
use thiserror::Error;

/// Run-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors (URLs, numbers, addresses)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// DNS resolution errors
    #[error("DNS resolution error: {0}")]
    DnsResolution(String),

    /// Network setup errors (client construction and the like)
    #[error("Network error: {0}")]
    Network(String),

    /// Neither the candidate file nor the DNS fallback produced an address
    #[error("No candidate addresses available: {0}")]
    SourceUnavailable(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new DNS resolution error
    pub fn dns_resolution<S: Into<String>>(message: S) -> Self {
        Self::DnsResolution(message.into())
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    /// Create a new source-unavailable error
    pub fn source_unavailable<S: Into<String>>(message: S) -> Self {
        Self::SourceUnavailable(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Validation(_) => "VALIDATION",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::DnsResolution(_) => "DNS",
            Self::Network(_) => "NETWORK",
            Self::SourceUnavailable(_) => "SOURCE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Check if running again could plausibly succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::DnsResolution(_) | Self::SourceUnavailable(_) => true,
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => false,
            Self::Io(_) | Self::Internal(_) => false,
        }
    }

    /// Get user-friendly error message with suggestions
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Config(msg) => {
                format!("Configuration problem: {}\n\nSuggestion: Check your .env file, EST_* variables or command line arguments.", msg)
            }
            Self::Validation(msg) => {
                format!("Invalid input: {}\n\nSuggestion: Check concurrency, count and timeout values against `est --help`.", msg)
            }
            Self::Io(msg) => {
                format!("File operation failed: {}\n\nSuggestion: Check the candidate file path and its permissions.", msg)
            }
            Self::Parse(msg) => {
                format!("Failed to parse data: {}\n\nSuggestion: Check the format of your input data or configuration values.", msg)
            }
            Self::DnsResolution(msg) => {
                format!("DNS resolution failed: {}\n\nSuggestion: Try other resolvers with --dns-servers or provide a candidate file.", msg)
            }
            Self::Network(msg) => {
                format!("Network setup failed: {}\n\nSuggestion: Check your internet connection and try again.", msg)
            }
            Self::SourceUnavailable(msg) => {
                format!("Nothing to test: {}\n\nSuggestion: Put one address per line in the candidate file (--file) or enable the DNS fallback.", msg)
            }
            Self::Internal(msg) => {
                format!("Internal error: {}\n\nThis is likely a bug. Please report this issue with the error details.", msg)
            }
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => 1,
            Self::Network(_) | Self::DnsResolution(_) => 2,
            Self::Io(_) => 5,
            Self::SourceUnavailable(_) => 7,
            Self::Internal(_) => 99,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Validation(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Network(_) | Self::DnsResolution(_) | Self::SourceUnavailable(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Io(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

/// Why a single probe failed.
///
/// These are always caught by the probe that produced them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProbeError {
    /// The probe did not finish within its time budget
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Connection refused, TLS handshake failure, bad address or any other
    /// failure before a response/upgrade was obtained
    #[error("dial failed: {0}")]
    Dial(String),

    /// The server did not accept the WebSocket upgrade
    #[error("protocol upgrade failed: {0}")]
    ProtocolUpgrade(String),

    /// The payload stream broke or carried nothing
    #[error("stream read failed: {0}")]
    StreamRead(String),
}

impl ProbeError {
    /// Short machine-friendly label used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Dial(_) => "dial",
            Self::ProtocolUpgrade(_) => "upgrade",
            Self::StreamRead(_) => "stream",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

// Standard library error conversions
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON error: {}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        Self::network(error.to_string())
    }
}

impl From<trust_dns_resolver::error::ResolveError> for AppError {
    fn from(error: trust_dns_resolver::error::ResolveError) -> Self {
        Self::dns_resolution(error.to_string())
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<std::str::ParseBoolError> for AppError {
    fn from(error: std::str::ParseBoolError) -> Self {
        Self::parse(format!("Boolean parse error: {}", error))
    }
}

impl From<std::net::AddrParseError> for AppError {
    fn from(error: std::net::AddrParseError) -> Self {
        Self::parse(format!("IP address parse error: {}", error))
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Error context trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Add static context to an error
    fn context(self, message: &'static str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<AppError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let original_error = e.into();
            let context = f();
            // keep the category so exit codes stay meaningful
            match original_error {
                AppError::Io(msg) => AppError::Io(format!("{}: {}", context, msg)),
                AppError::Parse(msg) => AppError::Parse(format!("{}: {}", context, msg)),
                AppError::Config(msg) => AppError::Config(format!("{}: {}", context, msg)),
                other => AppError::internal(format!("{}: {}", context, other)),
            }
        })
    }

    fn context(self, message: &'static str) -> Result<T> {
        self.with_context(|| message.to_string())
    }
}

/// Print panics to stderr and let them unwind.
///
/// A panicking worker task then surfaces through its `JoinHandle` as
/// [`AppError::Internal`] instead of taking the process down.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
    }));
}

/// Error reporter for user feedback on stderr
pub struct ErrorReporter {
    pub use_color: bool,
    pub verbose: bool,
}

impl ErrorReporter {
    /// Create a new error reporter
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self { use_color, verbose }
    }

    /// Render an error the way `report_error` prints it
    pub fn render(&self, error: &AppError) -> String {
        let mut out = error.format_for_console(self.use_color);

        if self.verbose {
            out.push_str("\n\n");
            out.push_str(&error.user_friendly_message());

            if error.is_recoverable() {
                out.push_str("\n\n");
                let hint = "This error might be temporary. You can try running the command again.";
                if self.use_color {
                    use colored::Colorize;
                    out.push_str(&hint.green().to_string());
                } else {
                    out.push_str(hint);
                }
            }
        }

        out
    }

    /// Report an error to the user
    pub fn report_error(&self, error: &AppError) {
        eprintln!("{}", self.render(error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(AppError::config("x").category(), "CONFIG");
        assert_eq!(AppError::validation("x").category(), "VALIDATION");
        assert_eq!(AppError::source_unavailable("x").category(), "SOURCE");
        assert_eq!(AppError::dns_resolution("x").category(), "DNS");
        assert_eq!(AppError::internal("x").category(), "INTERNAL");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::config("x").exit_code(), 1);
        assert_eq!(AppError::validation("x").exit_code(), 1);
        assert_eq!(AppError::network("x").exit_code(), 2);
        assert_eq!(AppError::io("x").exit_code(), 5);
        assert_eq!(AppError::source_unavailable("x").exit_code(), 7);
        assert_eq!(AppError::internal("x").exit_code(), 99);
    }

    #[test]
    fn test_source_unavailable_message() {
        let error = AppError::source_unavailable("candidate file empty and DNS returned nothing");
        assert!(error.to_string().contains("No candidate addresses available"));
        assert!(error.user_friendly_message().contains("--file"));
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_plain_console_format() {
        let error = AppError::parse("bad number");
        assert_eq!(error.format_for_console(false), "[PARSE] Parsing error: bad number");
    }

    #[test]
    fn test_probe_error_kinds() {
        assert_eq!(ProbeError::Timeout(Duration::from_millis(10)).kind(), "timeout");
        assert_eq!(ProbeError::Dial("refused".into()).kind(), "dial");
        assert_eq!(ProbeError::ProtocolUpgrade("404".into()).kind(), "upgrade");
        assert_eq!(ProbeError::StreamRead("reset".into()).kind(), "stream");
        assert!(ProbeError::Timeout(Duration::from_millis(10)).is_timeout());
        assert!(!ProbeError::Dial("refused".into()).is_timeout());
    }

    #[test]
    fn test_probe_timeout_display() {
        let error = ProbeError::Timeout(Duration::from_millis(1500));
        assert_eq!(error.to_string(), "timed out after 1500ms");
    }

    #[test]
    fn test_error_context_keeps_io_category() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
        let err = result.context("reading candidate file").unwrap_err();
        assert_eq!(err.category(), "IO");
        assert!(err.to_string().contains("reading candidate file"));
    }

    #[test]
    fn test_reporter_verbose_includes_hint() {
        let reporter = ErrorReporter::new(false, true);
        let rendered = reporter.render(&AppError::network("unreachable"));
        assert!(rendered.contains("[NETWORK]"));
        assert!(rendered.contains("might be temporary"));

        let quiet = ErrorReporter::new(false, false);
        assert!(!quiet.render(&AppError::network("unreachable")).contains("Suggestion"));
    }
}
