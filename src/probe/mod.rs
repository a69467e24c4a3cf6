//! Network probes applied to candidate endpoints
//!
//! - [`LatencyProbe`]: HTTP round trip to `/204`
//! - [`ThroughputProbe`]: WebSocket bulk download from `/test?size=N`
//!
//! Both connect to the candidate address while presenting the configured
//! hostname, and both record failures on the endpoint instead of returning
//! them.

pub mod latency;
pub mod target;
pub mod throughput;

pub use latency::LatencyProbe;
pub use target::parse_candidate;
pub use throughput::{ThroughputProbe, Transfer};
