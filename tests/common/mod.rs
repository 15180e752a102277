//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use calendar_client::{ApiError, ApiResponse, ApiResult, CallDescriptor, ClientConfig, Transport};

type Responder = dyn Fn(&CallDescriptor, usize) -> ApiResult<ApiResponse> + Send + Sync;

/// Scripted in-memory transport. The responder receives the request and the
/// zero-based invocation index.
pub struct StubTransport {
    calls: AtomicUsize,
    latency: Duration,
    seen: Mutex<Vec<CallDescriptor>>,
    responder: Box<Responder>,
}

impl StubTransport {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&CallDescriptor, usize) -> ApiResult<ApiResponse> + Send + Sync + 'static,
    {
        Self::with_latency(Duration::ZERO, responder)
    }

    pub fn with_latency<F>(latency: Duration, responder: F) -> Arc<Self>
    where
        F: Fn(&CallDescriptor, usize) -> ApiResult<ApiResponse> + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            latency,
            seen: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CallDescriptor> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn call(&self, request: &CallDescriptor) -> ApiResult<ApiResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        (self.responder)(request, n)
    }
}

pub fn json(value: Value) -> ApiResult<ApiResponse> {
    Ok(ApiResponse::new(200, value.to_string()))
}

pub fn status(code: u16) -> ApiResult<ApiResponse> {
    Err(ApiError::Http {
        status: code,
        message: format!("status {}", code),
    })
}

pub fn timeout() -> ApiResult<ApiResponse> {
    Err(ApiError::Timeout("operation timed out".into()))
}

/// Defaults with short delays so paused-clock tests stay readable.
pub fn test_config() -> ClientConfig {
    let mut config = ClientConfig::default();
    config.retry.max_retries = 2;
    config.retry.base_delay_ms = 100;
    config.retry.max_delay_ms = 1_000;
    config.circuit_breaker.failure_threshold = 3;
    config.circuit_breaker.reset_timeout_ms = 10_000;
    config.cache.ttl_ms = 60_000;
    config.warming.max_attempts = 3;
    config.warming.retry_delay_ms = 500;
    config
}

/// Request as seen by [`start_programmable_backend`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Start a programmable HTTP/1.1 backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(RecordedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            201 => "201 Created",
                            400 => "400 Bad Request",
                            404 => "404 Not Found",
                            422 => "422 Unprocessable Entity",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Accept connections but never answer them.
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

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while buf.len() < head_end + length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[head_end..]).to_string();

    Some(RecordedRequest {
        method,
        target,
        headers,
        body,
    })
}
