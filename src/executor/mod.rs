//! Probe execution engine
//!
//! This module contains:
//! - The [`Probe`] trait, the unit of work a stage applies to each item
//! - [`WorkerPool`], a bounded-concurrency executor that applies a probe to
//!   every item of a batch exactly once

pub mod pool;

pub use pool::{PoolOutcome, PoolStats, WorkerPool};

use async_trait::async_trait;

/// An asynchronous measurement applied to one item in place.
///
/// Implementations must not fail: whatever goes wrong is recorded on the
/// item itself (see [`crate::models::Endpoint`] sentinels). Implementations
/// need no synchronization of their own; the pool guarantees exclusive
/// access to `item` for the duration of the call.
#[async_trait]
pub trait Probe<T: Send>: Send + Sync {
    /// Measure `item`, updating it with the outcome
    async fn probe(&self, item: &mut T);

    /// Short name used in logs
    fn name(&self) -> &'static str {
        "probe"
    }
}
