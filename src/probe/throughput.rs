//! WebSocket download probe
//!
//! Dials the candidate directly, upgrades `{ws|wss}://{host}/test?size=N` on
//! that stream and counts payload bytes until `N` MiB have arrived or the
//! server closes. Throughput is measured from just before the dial to the
//! last byte received.

use crate::{
    error::{AppError, ProbeError, Result},
    executor::Probe,
    logging::ProbeLogger,
    models::{endpoint::throughput_kbps, Config, Endpoint},
    probe::target,
    types::Scheme,
};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    client_async_tls_with_config,
    tungstenite::{error::ProtocolError, protocol::WebSocketConfig, Error as WsError, Message},
    Connector, MaybeTlsStream, WebSocketStream,
};

const MIB: u64 = 1024 * 1024;

/// Bytes received and the time it took
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transfer {
    pub bytes: u64,
    pub elapsed: Duration,
}

impl Transfer {
    pub fn kbps(&self) -> f64 {
        throughput_kbps(self.bytes, self.elapsed)
    }
}

/// Download probe against `/test`
pub struct ThroughputProbe {
    host: String,
    scheme: Scheme,
    payload_size_mb: u32,
    dial_timeout: Duration,
    transfer_timeout: Duration,
    tls: Option<native_tls::TlsConnector>,
    logger: Option<ProbeLogger>,
}

impl ThroughputProbe {
    /// Create a probe for `host` requesting `payload_size_mb` MiB
    pub fn new<S: Into<String>>(host: S, scheme: Scheme, payload_size_mb: u32) -> Result<Self> {
        let tls = match scheme {
            Scheme::Secure => Some(
                native_tls::TlsConnector::builder()
                    .danger_accept_invalid_certs(true)
                    .danger_accept_invalid_hostnames(true)
                    .build()
                    .map_err(|e| AppError::network(format!("Failed to create TLS connector: {}", e)))?,
            ),
            Scheme::Plain => None,
        };

        Ok(Self {
            host: host.into(),
            scheme,
            payload_size_mb,
            dial_timeout: crate::defaults::DEFAULT_DIAL_TIMEOUT,
            transfer_timeout: crate::defaults::DEFAULT_TRANSFER_TIMEOUT,
            tls,
            logger: None,
        })
    }

    /// Create a probe from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.host.clone(), config.scheme, config.payload_size_mb)?
            .with_timeouts(config.dial_timeout(), config.transfer_timeout()))
    }

    pub fn with_timeouts(mut self, dial_timeout: Duration, transfer_timeout: Duration) -> Self {
        self.dial_timeout = dial_timeout;
        self.transfer_timeout = transfer_timeout;
        self
    }

    pub fn with_logger(mut self, logger: ProbeLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    fn expected_bytes(&self) -> u64 {
        u64::from(self.payload_size_mb) * MIB
    }

    fn connector(&self) -> Connector {
        match &self.tls {
            Some(tls) => Connector::NativeTls(tls.clone()),
            None => Connector::Plain,
        }
    }

    fn websocket_config() -> WebSocketConfig {
        let mut config = WebSocketConfig::default();
        config.max_message_size = None;
        config.max_frame_size = None;
        config
    }

    /// TCP connect plus (TLS and) WebSocket upgrade
    async fn open(
        &self,
        addr: std::net::SocketAddr,
    ) -> std::result::Result<WebSocketStream<MaybeTlsStream<TcpStream>>, ProbeError> {
        let url = target::throughput_url(&self.host, self.scheme, addr.port(), self.payload_size_mb);

        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| ProbeError::Dial(e.to_string()))?;
        let _ = stream.set_nodelay(true);

        let (ws, _response) =
            client_async_tls_with_config(url, stream, Some(Self::websocket_config()), Some(self.connector()))
                .await
                .map_err(|e| match e {
                    WsError::Io(io) => ProbeError::Dial(io.to_string()),
                    WsError::Tls(tls) => ProbeError::Dial(tls.to_string()),
                    other => ProbeError::ProtocolUpgrade(other.to_string()),
                })?;

        Ok(ws)
    }

    /// Count payload bytes until the target size or the end of the stream
    async fn drain(
        &self,
        ws: &mut WebSocketStream<MaybeTlsStream<TcpStream>>,
        last_byte: &mut Instant,
    ) -> std::result::Result<u64, ProbeError> {
        let expected = self.expected_bytes();
        let mut bytes = 0u64;

        while let Some(message) = ws.next().await {
            match message {
                Ok(Message::Binary(data)) => {
                    bytes += data.len() as u64;
                    *last_byte = Instant::now();
                }
                Ok(Message::Text(text)) => {
                    bytes += text.len() as u64;
                    *last_byte = Instant::now();
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                // Servers that drop the socket right after the payload
                Err(WsError::ConnectionClosed)
                | Err(WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake))
                    if bytes > 0 =>
                {
                    break
                }
                Err(e) => return Err(ProbeError::StreamRead(e.to_string())),
            }

            if bytes >= expected {
                break;
            }
        }

        if bytes == 0 {
            return Err(ProbeError::StreamRead("no payload received".to_string()));
        }
        Ok(bytes)
    }

    /// Download from `address` and report what arrived
    pub async fn measure(&self, address: &str) -> std::result::Result<Transfer, ProbeError> {
        let addr = target::parse_candidate(address, self.scheme.default_port())?;

        let start_time = Instant::now();
        let mut ws = tokio::time::timeout(self.dial_timeout, self.open(addr))
            .await
            .map_err(|_| ProbeError::Timeout(self.dial_timeout))??;

        let mut last_byte = start_time;
        let drained = tokio::time::timeout(self.transfer_timeout, self.drain(&mut ws, &mut last_byte))
            .await
            .map_err(|_| ProbeError::Timeout(self.transfer_timeout))
            .and_then(|r| r);

        if drained.is_ok() {
            let _ = tokio::time::timeout(self.dial_timeout, ws.close(None)).await;
        }
        drop(ws);

        let bytes = drained?;
        Ok(Transfer {
            bytes,
            elapsed: last_byte.duration_since(start_time),
        })
    }
}

#[async_trait]
impl Probe<Endpoint> for ThroughputProbe {
    async fn probe(&self, endpoint: &mut Endpoint) {
        let start_time = Instant::now();
        let outcome = self.measure(&endpoint.address).await;

        let (bytes, elapsed) = match &outcome {
            Ok(transfer) => {
                endpoint.record_throughput(transfer.bytes, transfer.elapsed);
                (transfer.bytes, transfer.elapsed)
            }
            Err(_) => {
                endpoint.record_throughput_failure();
                (0, start_time.elapsed())
            }
        };

        if let Some(logger) = &self.logger {
            let result = outcome.as_ref().map(|t| t.kbps());
            logger.log_throughput(&endpoint.address, bytes, elapsed, result).await;
        }
    }

    fn name(&self) -> &'static str {
        "throughput"
    }
}
