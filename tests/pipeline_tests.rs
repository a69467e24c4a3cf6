//! End-to-end pipeline tests against local edge servers
//!
//! Each fake edge answers `GET /204` over plain HTTP and streams a payload
//! over a WebSocket upgrade of `GET /test?size=N`, which is all the real
//! probes need.

use edge_speed_tester::{
    models::Config,
    pipeline::{Pipeline, PipelineSettings},
    probe::{LatencyProbe, ThroughputProbe},
    source::FileSource,
    types::Scheme,
    Endpoint,
};
use futures::SinkExt;
use std::{
    io::Write,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};
use tempfile::NamedTempFile;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};
use tokio_tungstenite::tungstenite::Message;

const MIB: usize = 1024 * 1024;

/// Request heads seen by a fake edge
type Seen = Arc<Mutex<Vec<String>>>;

/// Wait until the full request head is buffered, without consuming it
async fn peek_head(stream: &TcpStream) -> Option<String> {
    let mut buf = vec![0u8; 4096];
    for _ in 0..200 {
        let n = stream.peek(&mut buf).await.ok()?;
        if n == 0 {
            return None;
        }
        let head = String::from_utf8_lossy(&buf[..n]).to_string();
        if head.contains("\r\n\r\n") {
            return Some(head);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    None
}

async fn serve(mut stream: TcpStream, payload: usize, ping_delay: Duration, seen: Seen) {
    let Some(head) = peek_head(&stream).await else {
        return;
    };
    seen.lock().unwrap().push(head.clone());

    if head.to_ascii_lowercase().contains("upgrade: websocket") {
        let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
            return;
        };
        let chunk = 64 * 1024;
        let mut sent = 0;
        while sent < payload {
            let n = chunk.min(payload - sent);
            if ws.send(Message::Binary(vec![0u8; n])).await.is_err() {
                return;
            }
            sent += n;
        }
        let _ = ws.close(None).await;
    } else {
        let mut buf = vec![0u8; 4096];
        let _ = stream.read(&mut buf).await;
        tokio::time::sleep(ping_delay).await;
        let _ = stream
            .write_all(b"HTTP/1.1 204 No Content\r\nconnection: close\r\n\r\n")
            .await;
        let _ = stream.shutdown().await;
    }
}

/// Start a fake edge and return its address
async fn spawn_edge(payload: usize, ping_delay: Duration) -> (SocketAddr, Seen) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let seen_by_server = seen.clone();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve(stream, payload, ping_delay, seen_by_server.clone()));
        }
    });

    (addr, seen)
}

/// Distinct addresses with nothing listening on them
fn dead_addresses(n: usize) -> Vec<SocketAddr> {
    let listeners: Vec<_> = (0..n)
        .map(|_| std::net::TcpListener::bind("127.0.0.1:0").unwrap())
        .collect();
    listeners.iter().map(|l| l.local_addr().unwrap()).collect()
}

fn dead_address() -> SocketAddr {
    dead_addresses(1)[0]
}

fn candidate_file(addrs: &[SocketAddr]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "# local edges").unwrap();
    for addr in addrs {
        writeln!(file, "{}", addr).unwrap();
    }
    file
}

fn pipeline(file: &NamedTempFile, ping_count: usize, download_count: usize) -> Pipeline {
    let settings = PipelineSettings {
        ping_concurrency: 4,
        ping_count,
        download_concurrency: 2,
        download_count,
        deadline: None,
    };
    let latency = LatencyProbe::new("speed.test", Scheme::Plain, Duration::from_millis(800));
    let throughput = ThroughputProbe::new("speed.test", Scheme::Plain, 1)
        .unwrap()
        .with_timeouts(Duration::from_millis(800), Duration::from_secs(10));

    Pipeline::new(
        settings,
        Box::new(FileSource::new(file.path())),
        Arc::new(latency),
        Arc::new(throughput),
    )
}

fn addresses(results: &[Endpoint]) -> Vec<String> {
    results.iter().map(|e| e.address.clone()).collect()
}

#[tokio::test]
async fn test_live_edges_rank_above_dead_ones() {
    let (fast, _) = spawn_edge(MIB, Duration::ZERO).await;
    let (slow, _) = spawn_edge(MIB / 4, Duration::from_millis(150)).await;
    let dead = dead_address();
    let file = candidate_file(&[dead, slow, fast]);

    let report = pipeline(&file, 10, 10).run().await.unwrap();

    assert_eq!(report.candidates, 3);
    assert!(!report.interrupted);

    let latency = report.latency_stage.as_ref().unwrap();
    assert_eq!(latency.input, 3);
    assert_eq!(latency.probed, 3);
    assert_eq!(latency.succeeded, 2);

    let throughput = report.throughput_stage.as_ref().unwrap();
    assert_eq!(throughput.input, 3);
    assert_eq!(throughput.succeeded, 2);

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.results[2].address, dead.to_string());
    assert!(!report.results[2].has_latency());
    assert!(!report.results[2].has_throughput());
    for live in &report.results[..2] {
        assert!(live.has_latency());
        assert!(live.has_throughput());
    }
    assert!(report.results[0].throughput_kbps >= report.results[1].throughput_kbps);
}

#[tokio::test]
async fn test_latency_funnel_limits_throughput_stage() {
    let (a, _) = spawn_edge(MIB / 8, Duration::ZERO).await;
    let (b, _) = spawn_edge(MIB / 8, Duration::from_millis(300)).await;
    let dead = dead_address();
    let file = candidate_file(&[dead, b, a]);

    let report = pipeline(&file, 1, 5).run().await.unwrap();

    let latency = report.latency_stage.as_ref().unwrap();
    assert_eq!(latency.kept, 1);

    let throughput = report.throughput_stage.as_ref().unwrap();
    assert_eq!(throughput.input, 1);
    assert_eq!(addresses(&report.results), vec![a.to_string()]);
}

#[tokio::test]
async fn test_probes_present_the_configured_host() {
    let (edge, seen) = spawn_edge(MIB, Duration::ZERO).await;
    let file = candidate_file(&[edge]);

    let report = pipeline(&file, 1, 1).run().await.unwrap();
    assert_eq!(report.results.len(), 1);

    let heads = seen.lock().unwrap().clone();
    let ping = heads.iter().find(|h| h.starts_with("GET /204 ")).unwrap();
    let download = heads.iter().find(|h| h.starts_with("GET /test?size=1 ")).unwrap();
    for head in [ping, download] {
        let host_line = head
            .lines()
            .find(|l| l.to_ascii_lowercase().starts_with("host:"))
            .unwrap();
        assert!(host_line.contains("speed.test"), "{}", host_line);
    }
}

#[tokio::test]
async fn test_pipeline_from_config_with_plain_scheme() {
    let (edge, _) = spawn_edge(MIB / 2, Duration::ZERO).await;
    let file = candidate_file(&[edge, edge]);

    let mut config = Config::default();
    config.host = "speed.test".to_string();
    config.candidate_file = file.path().to_string_lossy().to_string();
    config.scheme = Scheme::Plain;
    config.dns_fallback = false;
    config.payload_size_mb = 1;
    config.ping_timeout_ms = 800;
    config.dial_timeout_ms = 800;
    config.transfer_timeout_seconds = 10;

    let report = Pipeline::from_config(&config).unwrap().run().await.unwrap();

    // duplicate lines collapse into one candidate
    assert_eq!(report.candidates, 1);
    assert_eq!(report.results.len(), 1);
    assert!(report.results[0].has_throughput());
}

#[tokio::test]
async fn test_all_dead_edges_still_report() {
    let file = candidate_file(&dead_addresses(2));
    let report = pipeline(&file, 10, 10).run().await.unwrap();

    assert_eq!(report.candidates, 2);
    assert_eq!(report.latency_stage.as_ref().unwrap().succeeded, 0);
    assert_eq!(report.throughput_stage.as_ref().unwrap().succeeded, 0);
    assert!(report.results.iter().all(|e| !e.has_latency() && !e.has_throughput()));
}
