//! Edge Speed Tester
//!
//! Ranks candidate edge/CDN addresses serving one virtual host. Every
//! candidate gets a cheap HTTP latency probe; the fastest responders then get
//! an expensive WebSocket download probe, and the best of those are reported.

pub mod cli;
pub mod config;
pub mod dns;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod probe;
pub mod ranking;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, ProbeError, Result};
pub use executor::{Probe, WorkerPool};
pub use models::{Config, Endpoint, MAX_LATENCY_MS, NO_THROUGHPUT};
pub use pipeline::{Pipeline, PipelineReport, PipelineSettings, StageSummary};
pub use probe::{LatencyProbe, ThroughputProbe};
pub use ranking::{rank_cmp, select, top_k};
pub use source::{CandidateSource, DnsSource, FallbackSource, FileSource};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_HOST: &str = "jp.test4x.com";
    pub const DEFAULT_CANDIDATE_FILE: &str = "cfip.txt";
    pub const DEFAULT_PAYLOAD_SIZE_MB: u32 = 5;
    pub const DEFAULT_PING_CONCURRENCY: usize = 50;
    pub const DEFAULT_PING_COUNT: usize = 50;
    pub const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 4;
    pub const DEFAULT_DOWNLOAD_COUNT: usize = 20;
    pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_millis(1500);
    pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(2);
    pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(3);
    pub const DEFAULT_DNS_SERVERS: &[&str] = &[
        "223.5.5.5",       // Alibaba DNS
        "223.6.6.6",       // Alibaba DNS Secondary
        "180.76.76.76",    // Baidu DNS
        "114.114.114.114", // 114DNS
        "119.29.29.29",    // DNSPod
        "182.254.116.116", // DNSPod Secondary
        "117.50.10.10",    // OneDNS
        "52.80.52.52",     // OneDNS Secondary
        "8.8.4.4",         // Google
        "8.8.8.8",         // Google
        "1.1.1.1",         // Cloudflare
        "1.0.0.1",         // Cloudflare
        "101.226.4.6",     // DNSpai
        "218.30.118.6",    // DNSpai
        "185.222.222.222", // DNS.SB
        "185.184.222.222", // DNS.SB
        "208.67.222.222",  // OpenDNS
        "1.2.4.8",         // CNNIC
        "210.2.4.8",       // CNNIC
    ];
    pub const DEFAULT_DNS_FALLBACK: bool = true;
    pub const DEFAULT_ENABLE_COLOR: bool = true;

    /// Recommended bounds for the latency probe timeout
    pub const RECOMMENDED_PING_TIMEOUT_MIN: Duration = Duration::from_millis(300);
    pub const RECOMMENDED_PING_TIMEOUT_MAX: Duration = Duration::from_millis(1500);
}
