//! Endpoint ranking
//!
//! One total order is used everywhere results are compared: throughput
//! descending, then latency ascending, then address ascending. Sentinel
//! values sort after every real measurement of the same key.

use crate::models::Endpoint;
use std::cmp::Ordering;


/// Throughput with non-finite and non-positive values folded to zero
fn normalized_throughput(kbps: f64) -> f64 {
    if kbps.is_finite() && kbps > 0.0 {
        kbps
    } else {
        0.0
    }
}

/// Total order over endpoints, best first
pub fn rank_cmp(a: &Endpoint, b: &Endpoint) -> Ordering {
    normalized_throughput(b.throughput_kbps)
        .total_cmp(&normalized_throughput(a.throughput_kbps))
        .then_with(|| a.latency_ms.cmp(&b.latency_ms))
        .then_with(|| a.address.cmp(&b.address))
}

/// Sort `endpoints` once and keep the best `k`
pub fn select(mut endpoints: Vec<Endpoint>, k: usize) -> Vec<Endpoint> {
    endpoints.sort_unstable_by(rank_cmp);
    endpoints.truncate(k);
    endpoints
}

/// Borrowing variant of [`select`]
pub fn top_k(endpoints: &[Endpoint], k: usize) -> Vec<&Endpoint> {
    let mut ranked: Vec<&Endpoint> = endpoints.iter().collect();
    ranked.sort_unstable_by(|a, b| rank_cmp(a, b));
    ranked.truncate(k);
    ranked
}

/// Bounded selector used at each funnel step of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankedSelector {
    capacity: usize,
}

impl RankedSelector {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Rank and truncate, taking ownership of the input
    pub fn select(&self, endpoints: Vec<Endpoint>) -> Vec<Endpoint> {
        select(endpoints, self.capacity)
    }

    /// Rank and truncate without consuming the input
    pub fn top<'a>(&self, endpoints: &'a [Endpoint]) -> Vec<&'a Endpoint> {
        top_k(endpoints, self.capacity)
    }
}
