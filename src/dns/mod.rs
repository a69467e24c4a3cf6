//! DNS A-record lookups against explicit resolvers
//!
//! Each configured resolver gets its own `TokioAsyncResolver` (UDP, a single
//! attempt, bounded timeout) so answers from different resolvers can be
//! collected independently.

use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};
use tokio::sync::RwLock;
use trust_dns_resolver::{
    config::{LookupIpStrategy, NameServerConfig, Protocol, ResolverConfig, ResolverOpts},
    TokioAsyncResolver,
};

/// A-record lookup against one named resolver
#[async_trait]
pub trait ARecordLookup: Send + Sync {
    async fn lookup_a(&self, host: &str, server: SocketAddr) -> Result<Vec<Ipv4Addr>>;
}

/// Resolver cache keyed by name server address
pub struct DnsManager {
    resolvers: Arc<RwLock<HashMap<SocketAddr, TokioAsyncResolver>>>,
    timeout: Duration,
}

impl DnsManager {
    /// Create a manager whose queries give up after `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self {
            resolvers: Arc::new(RwLock::new(HashMap::new())),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn build_resolver(&self, server: SocketAddr) -> TokioAsyncResolver {
        let mut config = ResolverConfig::new();
        config.add_name_server(NameServerConfig::new(server, Protocol::Udp));

        let mut opts = ResolverOpts::default();
        opts.timeout = self.timeout;
        opts.attempts = 1;
        opts.ip_strategy = LookupIpStrategy::Ipv4Only;
        opts.use_hosts_file = false;

        TokioAsyncResolver::tokio(config, opts)
    }

    /// Get or create the resolver for `server`
    pub async fn resolver_for(&self, server: SocketAddr) -> TokioAsyncResolver {
        if let Some(resolver) = self.resolvers.read().await.get(&server) {
            return resolver.clone();
        }

        let mut resolvers = self.resolvers.write().await;
        resolvers
            .entry(server)
            .or_insert_with(|| self.build_resolver(server))
            .clone()
    }

    /// Number of resolvers created so far
    pub async fn cached_resolvers(&self) -> usize {
        self.resolvers.read().await.len()
    }
}

#[async_trait]
impl ARecordLookup for DnsManager {
    async fn lookup_a(&self, host: &str, server: SocketAddr) -> Result<Vec<Ipv4Addr>> {
        let resolver = self.resolver_for(server).await;
        let response = resolver
            .lookup_ip(host)
            .await
            .map_err(|e| AppError::dns_resolution(format!("A lookup for {} via {} failed: {}", host, server, e)))?;

        Ok(response
            .iter()
            .filter_map(|ip| match ip {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .collect())
    }
}
