//! HTTP latency probe
//!
//! One `GET /204` per candidate. The target hostname is pinned to the
//! candidate's socket address, so it travels as SNI and `Host` while the
//! connection goes to the candidate. Any HTTP response is a success.

use crate::{
    error::{AppError, ProbeError, Result},
    executor::Probe,
    logging::ProbeLogger,
    models::{Config, Endpoint},
    probe::target,
    types::Scheme,
};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::{Duration, Instant};

const USER_AGENT: &str = concat!("edge-speed-tester/", env!("CARGO_PKG_VERSION"));

/// Latency probe against `/204`
pub struct LatencyProbe {
    host: String,
    scheme: Scheme,
    timeout: Duration,
    logger: Option<ProbeLogger>,
}

impl LatencyProbe {
    /// Create a probe for `host` with the given timeout
    pub fn new<S: Into<String>>(host: S, scheme: Scheme, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            scheme,
            timeout,
            logger: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.host.clone(), config.scheme, config.ping_timeout())
    }

    pub fn with_logger(mut self, logger: ProbeLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Client whose DNS for the target host resolves to `addr` only
    fn pinned_client(&self, addr: std::net::SocketAddr) -> Result<Client> {
        Client::builder()
            .resolve(&self.host, addr)
            .danger_accept_invalid_certs(true)
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .redirect(Policy::none())
            .no_proxy()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))
    }

    fn classify(&self, error: reqwest::Error) -> ProbeError {
        if error.is_timeout() {
            ProbeError::Timeout(self.timeout)
        } else {
            ProbeError::Dial(error.to_string())
        }
    }

    /// Time one request against `address`
    pub async fn measure(&self, address: &str) -> std::result::Result<Duration, ProbeError> {
        let addr = target::parse_candidate(address, self.scheme.default_port())?;
        let url = target::latency_url(&self.host, self.scheme, addr.port());
        let client = self
            .pinned_client(addr)
            .map_err(|e| ProbeError::Dial(e.to_string()))?;

        let start_time = Instant::now();
        let send = client.get(&url).send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| ProbeError::Timeout(self.timeout))?
            .map_err(|e| self.classify(e))?;
        let elapsed = start_time.elapsed();

        drop(response);
        Ok(elapsed)
    }
}

#[async_trait]
impl Probe<Endpoint> for LatencyProbe {
    async fn probe(&self, endpoint: &mut Endpoint) {
        let outcome = self.measure(&endpoint.address).await;

        match &outcome {
            Ok(elapsed) => endpoint.record_latency(*elapsed),
            Err(_) => endpoint.record_latency_failure(),
        }

        if let Some(logger) = &self.logger {
            logger.log_latency(&endpoint.address, outcome.as_ref().copied()).await;
        }
    }

    fn name(&self) -> &'static str {
        "latency"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MAX_LATENCY_MS;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_probe_success_records_latency() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/204"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let probe = LatencyProbe::new("speed.test", Scheme::Plain, Duration::from_millis(1500));
        let mut endpoint = Endpoint::new(server.address().to_string());
        probe.probe(&mut endpoint).await;

        assert!(endpoint.has_latency());
        assert!(endpoint.latency_ms < 1500);
    }

    #[tokio::test]
    async fn test_any_status_counts_as_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let probe = LatencyProbe::new("speed.test", Scheme::Plain, Duration::from_millis(1500));
        assert!(probe.measure(&server.address().to_string()).await.is_ok());
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let probe = LatencyProbe::new("speed.test", Scheme::Plain, Duration::from_millis(100));
        let err = probe.measure(&server.address().to_string()).await.unwrap_err();
        assert!(err.is_timeout(), "{:?}", err);

        let mut endpoint = Endpoint::new(server.address().to_string());
        probe.probe(&mut endpoint).await;
        assert_eq!(endpoint.latency_ms, MAX_LATENCY_MS);
    }

    #[tokio::test]
    async fn test_refused_connection_is_a_dial_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = LatencyProbe::new("speed.test", Scheme::Plain, Duration::from_millis(1500));
        let err = probe.measure(&addr.to_string()).await.unwrap_err();
        assert_eq!(err.kind(), "dial");
    }

    #[tokio::test]
    async fn test_unparsable_address_leaves_sentinel() {
        let probe = LatencyProbe::new("speed.test", Scheme::Plain, Duration::from_millis(100));
        let mut endpoint = Endpoint::new("not-an-ip");
        probe.probe(&mut endpoint).await;
        assert_eq!(endpoint.latency_ms, MAX_LATENCY_MS);
    }
}
