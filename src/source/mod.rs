//! Candidate address sources
//!
//! - [`FileSource`]: one address per line, `#` comments allowed
//! - [`DnsSource`]: A records for the target host from many resolvers
//! - [`FallbackSource`]: the file first, DNS when the file gives nothing
//!
//! Every source yields deduplicated, unmeasured endpoints in first-seen
//! order.

use crate::{
    dns::{ARecordLookup, DnsManager},
    error::{AppError, ErrorContext, Result},
    logging::{LogLevel, Logger, LoggerFactory, ProbeLogger},
    models::{endpoint::endpoints_from_addresses, Config, Endpoint},
};
use async_trait::async_trait;
use futures::future::join_all;
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Producer of candidate endpoints
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Load candidates. An empty list is a valid answer.
    async fn candidates(&self) -> Result<Vec<Endpoint>>;

    /// Human-readable origin, used in logs and errors
    fn describe(&self) -> String;
}

/// Addresses from the non-comment, non-blank lines of `content`
pub fn parse_candidate_lines(content: &str) -> Vec<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect()
}

/// Line-delimited candidate file
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CandidateSource for FileSource {
    async fn candidates(&self) -> Result<Vec<Endpoint>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read candidate file {}", self.path.display()))?;
        Ok(endpoints_from_addresses(parse_candidate_lines(&content)))
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// A-record fan-out over a list of resolvers
pub struct DnsSource {
    host: String,
    servers: Vec<SocketAddr>,
    lookup: Arc<dyn ARecordLookup>,
    logger: Option<ProbeLogger>,
}

impl DnsSource {
    pub fn new<S: Into<String>>(host: S, servers: Vec<SocketAddr>, lookup: Arc<dyn ARecordLookup>) -> Self {
        Self {
            host: host.into(),
            servers,
            lookup,
            logger: None,
        }
    }

    /// Source backed by trust-dns resolvers built from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let lookup = Arc::new(DnsManager::new(config.dns_timeout()));
        Ok(Self::new(config.host.clone(), config.dns_server_addrs()?, lookup))
    }

    pub fn with_logger(mut self, logger: ProbeLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn servers(&self) -> &[SocketAddr] {
        &self.servers
    }
}

#[async_trait]
impl CandidateSource for DnsSource {
    async fn candidates(&self) -> Result<Vec<Endpoint>> {
        let queries = self
            .servers
            .iter()
            .map(|&server| async move { (server, self.lookup.lookup_a(&self.host, server).await) });
        let answers = join_all(queries).await;

        let mut addresses = Vec::new();
        for (server, answer) in answers {
            let server_str = server.to_string();
            match answer {
                Ok(ips) => {
                    if let Some(logger) = &self.logger {
                        logger.log_resolver(&self.host, &server_str, Ok(ips.len())).await;
                    }
                    addresses.extend(ips.into_iter().map(|ip| ip.to_string()));
                }
                Err(e) => {
                    if let Some(logger) = &self.logger {
                        logger.log_resolver(&self.host, &server_str, Err(&e)).await;
                    }
                }
            }
        }

        Ok(endpoints_from_addresses(addresses))
    }

    fn describe(&self) -> String {
        format!("DNS A records for {} from {} resolvers", self.host, self.servers.len())
    }
}

/// The candidate file, with DNS as the fallback
pub struct FallbackSource {
    file: FileSource,
    dns: Option<DnsSource>,
    logger: Logger,
}

impl FallbackSource {
    pub fn new(file: FileSource, dns: Option<DnsSource>) -> Self {
        let mut logger = Logger::new("SOURCE".to_string());
        logger.set_level(LogLevel::Warn);
        Self { file, dns, logger }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let dns = if config.dns_fallback {
            Some(DnsSource::from_config(config)?)
        } else {
            None
        };

        Ok(Self::new(FileSource::new(&config.candidate_file), dns))
    }

    /// Log through `factory` instead of warnings only
    pub fn with_loggers(mut self, factory: &LoggerFactory) -> Self {
        self.logger = factory.create_logger("SOURCE");
        self.dns = self.dns.map(|dns| dns.with_logger(factory.create_probe_logger()));
        self
    }
}

#[async_trait]
impl CandidateSource for FallbackSource {
    async fn candidates(&self) -> Result<Vec<Endpoint>> {
        let file_problem = match self.file.candidates().await {
            Ok(endpoints) if !endpoints.is_empty() => {
                self.logger
                    .info(&format!("Loaded {} candidates from {}", endpoints.len(), self.file.describe()))
                    .field("source", "file")
                    .field("candidates", endpoints.len())
                    .log()
                    .await;
                return Ok(endpoints);
            }
            Ok(_) => format!("{} has no addresses", self.file.describe()),
            Err(e) => e.to_string(),
        };

        let Some(dns) = &self.dns else {
            return Err(AppError::source_unavailable(format!(
                "{}; DNS fallback is disabled",
                file_problem
            )));
        };

        self.logger
            .warn(&format!("{}; falling back to {}", file_problem, dns.describe()))
            .field("source", "dns")
            .log()
            .await;

        let endpoints = dns.candidates().await?;
        if endpoints.is_empty() {
            return Err(AppError::source_unavailable(format!(
                "{}; {} returned nothing",
                file_problem,
                dns.describe()
            )));
        }

        self.logger
            .info(&format!("Loaded {} candidates from {}", endpoints.len(), dns.describe()))
            .field("source", "dns")
            .field("candidates", endpoints.len())
            .log()
            .await;
        Ok(endpoints)
    }

    fn describe(&self) -> String {
        match &self.dns {
            Some(dns) => format!("{} or {}", self.file.describe(), dns.describe()),
            None => self.file.describe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::net::Ipv4Addr;
    use tempfile::NamedTempFile;

    /// Canned answers per resolver; unknown resolvers fail
    struct StaticLookup {
        answers: HashMap<SocketAddr, Vec<Ipv4Addr>>,
    }

    #[async_trait]
    impl ARecordLookup for StaticLookup {
        async fn lookup_a(&self, host: &str, server: SocketAddr) -> Result<Vec<Ipv4Addr>> {
            self.answers
                .get(&server)
                .cloned()
                .ok_or_else(|| AppError::dns_resolution(format!("{} via {} timed out", host, server)))
        }
    }

    fn resolver(n: u8) -> SocketAddr {
        SocketAddr::new(Ipv4Addr::new(10, 53, 0, n).into(), 53)
    }

    fn dns_source(answers: Vec<(u8, Vec<Ipv4Addr>)>, servers: Vec<u8>) -> DnsSource {
        let lookup = StaticLookup {
            answers: answers.into_iter().map(|(n, ips)| (resolver(n), ips)).collect(),
        };
        DnsSource::new("jp.test4x.com", servers.into_iter().map(resolver).collect(), Arc::new(lookup))
    }

    fn temp_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn addresses(endpoints: &[Endpoint]) -> Vec<&str> {
        endpoints.iter().map(|e| e.address.as_str()).collect()
    }

    #[test]
    fn test_parse_candidate_lines() {
        let content = "# edge pool\n1.1.1.1\n\n  2.2.2.2  \r\n#3.3.3.3\n[2001:db8::1]:8443\n";
        assert_eq!(
            parse_candidate_lines(content),
            vec!["1.1.1.1", "2.2.2.2", "[2001:db8::1]:8443"]
        );
    }

    #[tokio::test]
    async fn test_file_source_dedups() {
        let file = temp_file("1.1.1.1\n2.2.2.2\n1.1.1.1\n");
        let endpoints = FileSource::new(file.path()).candidates().await.unwrap();
        assert_eq!(addresses(&endpoints), vec!["1.1.1.1", "2.2.2.2"]);
        assert!(endpoints.iter().all(|e| !e.has_latency() && !e.has_throughput()));
    }

    #[tokio::test]
    async fn test_file_source_missing_file_is_io_error() {
        let err = FileSource::new("/definitely/not/here/cfip.txt")
            .candidates()
            .await
            .unwrap_err();
        assert_eq!(err.category(), "IO");
    }

    #[tokio::test]
    async fn test_dns_source_unions_in_resolver_order() {
        let a = Ipv4Addr::new(104, 16, 0, 1);
        let b = Ipv4Addr::new(104, 16, 0, 2);
        let c = Ipv4Addr::new(104, 16, 0, 3);
        let source = dns_source(vec![(1, vec![a, b]), (2, vec![b, c])], vec![1, 9, 2]);

        let endpoints = source.candidates().await.unwrap();
        assert_eq!(addresses(&endpoints), vec!["104.16.0.1", "104.16.0.2", "104.16.0.3"]);
    }

    #[tokio::test]
    async fn test_dns_source_all_resolvers_failing_is_empty() {
        let source = dns_source(vec![], vec![1, 2]);
        assert!(source.candidates().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fallback_prefers_file() {
        let file = temp_file("9.9.9.9\n");
        let dns = dns_source(vec![(1, vec![Ipv4Addr::new(1, 2, 3, 4)])], vec![1]);
        let source = FallbackSource::new(FileSource::new(file.path()), Some(dns));
        assert_eq!(addresses(&source.candidates().await.unwrap()), vec!["9.9.9.9"]);
    }

    #[tokio::test]
    async fn test_fallback_to_dns_on_empty_file() {
        let file = temp_file("# nothing yet\n\n");
        let dns = dns_source(vec![(1, vec![Ipv4Addr::new(1, 2, 3, 4)])], vec![1]);
        let source = FallbackSource::new(FileSource::new(file.path()), Some(dns));
        assert_eq!(addresses(&source.candidates().await.unwrap()), vec!["1.2.3.4"]);
    }

    #[tokio::test]
    async fn test_fallback_to_dns_on_missing_file() {
        let dns = dns_source(vec![(1, vec![Ipv4Addr::new(1, 2, 3, 4)])], vec![1]);
        let source = FallbackSource::new(FileSource::new("/definitely/not/here"), Some(dns));
        assert_eq!(source.candidates().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_both_empty_is_source_unavailable() {
        let file = temp_file("");
        let source = FallbackSource::new(FileSource::new(file.path()), Some(dns_source(vec![], vec![1])));
        let err = source.candidates().await.unwrap_err();
        assert_eq!(err.category(), "SOURCE");
        assert_eq!(err.exit_code(), 7);
    }

    #[tokio::test]
    async fn test_empty_file_without_dns_is_source_unavailable() {
        let file = temp_file("\n");
        let source = FallbackSource::new(FileSource::new(file.path()), None);
        let err = source.candidates().await.unwrap_err();
        assert!(err.to_string().contains("DNS fallback is disabled"));
    }
}
