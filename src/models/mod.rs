//! Data models and structures for the edge speed tester

pub mod config;
pub mod endpoint;

// Re-export main model types
pub use config::Config;
pub use endpoint::{Endpoint, MAX_LATENCY_MS, NO_THROUGHPUT};
