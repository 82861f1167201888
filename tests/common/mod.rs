//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use backend_shim::config::ShimConfig;
use backend_shim::{Backend, HttpServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// A request as the mock backend saw it on the wire.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Request line and headers exactly as received.
    pub head: Vec<u8>,
}

impl RecordedRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the raw head carries `line` as one complete header line.
    #[allow(dead_code)]
    pub fn has_raw_header_line(&self, line: &[u8]) -> bool {
        self.head.split(|&b| b == b'\n').any(|raw| raw.strip_suffix(b"\r").unwrap_or(raw) == line)
    }

    /// Exact-case header name check.
    #[allow(dead_code)]
    pub fn has_header_named(&self, name: &str) -> bool {
        self.headers.iter().any(|(key, _)| key == name)
    }
}

/// Raw response with a `Content-Length` body and `Connection: close`.
pub fn fixed_response(status_line: &str, extra_headers: &[(&str, &str)], body: &str) -> String {
    let mut response = format!("HTTP/1.1 {status_line}\r\n");
    for (name, value) in extra_headers {
        response.push_str(&format!("{name}: {value}\r\n"));
    }
    response.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    ));
    response
}

/// Raw response using chunked transfer encoding and `Connection: keep-alive`.
#[allow(dead_code)]
pub fn chunked_response(status_line: &str, extra_headers: &[(&str, &str)], body: &str) -> String {
    let mut response = format!("HTTP/1.1 {status_line}\r\n");
    for (name, value) in extra_headers {
        response.push_str(&format!("{name}: {value}\r\n"));
    }
    response.push_str("Transfer-Encoding: chunked\r\nConnection: keep-alive\r\n\r\n");
    response.push_str(&format!("{:x}\r\n{}\r\n0\r\n\r\n", body.len(), body));
    response
}

/// Start a mock backend that records every request and answers with `response`.
pub async fn start_recording_backend(response: String) -> (SocketAddr, mpsc::UnboundedReceiver<RecordedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let tx = tx.clone();
                    let response = response.clone();
                    tokio::spawn(async move {
                        if let Some(request) = read_request(&mut socket).await {
                            let _ = tx.send(request);
                        }
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, rx)
}

/// Start a mock backend that accepts connections and never answers.
#[allow(dead_code)]
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    addr
}

/// A port nothing listens on.
#[allow(dead_code)]
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.to_string(), value.trim().to_string()))
        .collect();

    let length = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(length);

    Some(RecordedRequest {
        method,
        target,
        headers,
        body,
        head: buf[..head_end].to_vec(),
    })
}

/// A backend someone else runs; the shim only needs its port.
pub struct StaticBackend {
    pub port: u16,
}

impl Backend for StaticBackend {
    fn port(&self) -> u16 {
        self.port
    }

    fn stop(&self) {}
}

/// Config that targets a loopback backend on 127.0.0.1.
pub fn loopback_config(timeout_secs: u64) -> ShimConfig {
    let mut config = ShimConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.forwarder.host = "127.0.0.1".into();
    config.forwarder.timeout_secs = timeout_secs;
    config
}

/// Start the shim in front of `backend_port`; returns its address and the
/// shutdown handle.
#[allow(dead_code)]
pub async fn start_shim(config: ShimConfig, backend_port: u16) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(&config, &StaticBackend { port: backend_port });

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}
