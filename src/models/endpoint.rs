//! Candidate endpoint and its accumulated measurements

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Latency sentinel: not yet measured, or unreachable
pub const MAX_LATENCY_MS: u32 = u32::MAX;

/// Throughput sentinel: not yet measured, or the transfer failed
pub const NO_THROUGHPUT: f64 = 0.0;

/// One candidate address plus the measurements taken for it.
///
/// Endpoints are moved through the pipeline by value. Whoever holds one
/// is the only party allowed to mutate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Address as given by the candidate source (IP, optionally with port)
    pub address: String,
    /// Round-trip time of the `/204` request, or [`MAX_LATENCY_MS`]
    pub latency_ms: u32,
    /// Download rate in KB/s, or [`NO_THROUGHPUT`]
    pub throughput_kbps: f64,
}

impl Endpoint {
    /// Create an unmeasured endpoint
    pub fn new<S: Into<String>>(address: S) -> Self {
        Self {
            address: address.into(),
            latency_ms: MAX_LATENCY_MS,
            throughput_kbps: NO_THROUGHPUT,
        }
    }

    pub fn has_latency(&self) -> bool {
        self.latency_ms != MAX_LATENCY_MS
    }

    pub fn has_throughput(&self) -> bool {
        self.throughput_kbps.is_finite() && self.throughput_kbps > 0.0
    }

    /// Record a successful latency probe
    pub fn record_latency(&mut self, elapsed: Duration) {
        let ms = elapsed.as_millis().min(u128::from(MAX_LATENCY_MS - 1));
        self.latency_ms = ms as u32;
    }

    /// Record a failed latency probe. A value measured earlier in the run
    /// is kept.
    pub fn record_latency_failure(&mut self) {
        if !self.has_latency() {
            self.latency_ms = MAX_LATENCY_MS;
        }
    }

    /// Record a successful transfer of `bytes` in `elapsed`
    pub fn record_throughput(&mut self, bytes: u64, elapsed: Duration) {
        let kbps = throughput_kbps(bytes, elapsed);
        if kbps > 0.0 {
            self.throughput_kbps = kbps;
        } else {
            self.record_throughput_failure();
        }
    }

    /// Record a failed throughput probe. A value measured earlier in the
    /// run is kept.
    pub fn record_throughput_failure(&mut self) {
        if !self.has_throughput() {
            self.throughput_kbps = NO_THROUGHPUT;
        }
    }
}

/// KB/s for `bytes` received over `elapsed`; `0.0` for degenerate input
pub fn throughput_kbps(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if bytes == 0 || secs <= 0.0 {
        return NO_THROUGHPUT;
    }
    let kbps = (bytes as f64 / 1024.0) / secs;
    if kbps.is_finite() && kbps > 0.0 {
        kbps
    } else {
        NO_THROUGHPUT
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "addr: {}\tspeed: {:.2}KB/s\thttp-ping: ", self.address, self.throughput_kbps)?;
        if self.has_latency() {
            write!(f, "{}ms", self.latency_ms)
        } else {
            write!(f, "timeout")
        }
    }
}

/// Build unmeasured endpoints from addresses, dropping duplicates and
/// keeping the first occurrence
pub fn endpoints_from_addresses<I, S>(addresses: I) -> Vec<Endpoint>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    addresses
        .into_iter()
        .map(|a| a.as_ref().trim().to_string())
        .filter(|a| !a.is_empty())
        .filter(|a| seen.insert(a.clone()))
        .map(Endpoint::new)
        .collect()
}
