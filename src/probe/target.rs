//! Candidate address parsing and probe URL construction

use crate::error::ProbeError;
use crate::types::Scheme;
use std::net::{IpAddr, SocketAddr};

/// Parse a candidate address into the socket address to dial.
///
/// Accepted forms: `1.2.3.4`, `1.2.3.4:8443`, `2001:db8::1`,
/// `[2001:db8::1]` and `[2001:db8::1]:8443`. `default_port` applies when the
/// address carries none.
pub fn parse_candidate(address: &str, default_port: u16) -> Result<SocketAddr, ProbeError> {
    let address = address.trim();

    if let Ok(socket) = address.parse::<SocketAddr>() {
        return Ok(socket);
    }

    let bare = address
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(address);

    bare.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, default_port))
        .map_err(|_| ProbeError::Dial(format!("invalid candidate address '{}'", address)))
}

/// `host` with the port appended unless it is the scheme default
fn authority(host: &str, scheme: Scheme, port: u16) -> String {
    if port == scheme.default_port() {
        host.to_string()
    } else {
        format!("{}:{}", host, port)
    }
}

/// URL of the latency endpoint
pub fn latency_url(host: &str, scheme: Scheme, port: u16) -> String {
    format!("{}://{}/204", scheme.http(), authority(host, scheme, port))
}

/// URL of the payload endpoint, asking for `size_mb` MiB
pub fn throughput_url(host: &str, scheme: Scheme, port: u16, size_mb: u32) -> String {
    format!(
        "{}://{}/test?size={}",
        scheme.websocket(),
        authority(host, scheme, port),
        size_mb
    )
}
