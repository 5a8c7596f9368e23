//! Loopback HTTP stub for integration tests.
//!
//! Serves a fixed list of canned responses, one per connection, and records
//! every request it receives.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use tethered::{ClientOptions, DiskUsage, MetricsProvider, Result};

/// A request as it arrived at the stub.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    /// Path and query, e.g. `/v1/sites/?apikey=k`
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body should be JSON")
    }
}

pub struct StubServer {
    pub base_url: String,
    requests: Receiver<CapturedRequest>,
}

impl StubServer {
    /// Start a stub answering each connection with the next `(status, body)` pair.
    pub fn start(responses: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub listener");
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let (sender, requests) = mpsc::channel();

        thread::spawn(move || {
            for (status, body) in responses {
                let Ok((stream, _)) = listener.accept() else {
                    return;
                };
                if let Some(request) = serve(stream, status, body) {
                    let _ = sender.send(request);
                }
            }
        });

        Self { base_url, requests }
    }

    /// Client options pointing at this stub, with credentials set.
    pub fn options(&self) -> ClientOptions {
        ClientOptions::new()
            .with_apikey("k")
            .with_monitor_id(5)
            .with_base_url(self.base_url.clone())
            .with_timeout_secs(5)
            .with_system_proxy(false)
    }

    pub fn next_request(&self) -> CapturedRequest {
        self.requests
            .recv_timeout(Duration::from_secs(5))
            .expect("stub should have received a request")
    }

    pub fn received_nothing(&self) -> bool {
        self.requests.recv_timeout(Duration::from_millis(200)).is_err()
    }
}

fn serve(stream: TcpStream, status: u16, body: &str) -> Option<CapturedRequest> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.push((key.trim().to_string(), value.trim().to_string()));
        }
    }

    let length = headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);
    let mut payload = vec![0; length];
    reader.read_exact(&mut payload).ok()?;

    let response = format!(
        "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let mut stream = stream;
    stream.write_all(response.as_bytes()).ok()?;
    stream.flush().ok()?;

    Some(CapturedRequest {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&payload).into_owned(),
    })
}

/// Options reaching `base_url` directly, without credentials.
pub fn direct_options(base_url: String) -> ClientOptions {
    ClientOptions::new()
        .with_base_url(base_url)
        .with_timeout_secs(5)
        .with_system_proxy(false)
}

/// Base URL nothing is listening on.
pub fn closed_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe listener");
    let address = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{address}")
}

/// Metrics provider returning fixed readings.
pub struct FixedReadings {
    pub memory: Option<f64>,
    pub cpu: Option<f64>,
    pub disk: Option<DiskUsage>,
}

impl FixedReadings {
    pub fn new(cpu: f64, memory: f64) -> Self {
        Self {
            memory: Some(memory),
            cpu: Some(cpu),
            disk: Some(DiskUsage {
                name: "root".to_string(),
                capacity: 70.0,
            }),
        }
    }
}

fn missing(metric: &str) -> tethered::TetheredError {
    tethered::TetheredError::metrics_error(format!("{metric} unavailable"))
}

impl MetricsProvider for FixedReadings {
    fn read_memory_mb(&self) -> Result<f64> {
        self.memory.ok_or_else(|| missing("memory"))
    }

    fn read_cpu_percent(&self) -> Result<f64> {
        self.cpu.ok_or_else(|| missing("cpu"))
    }

    fn read_disk_usage(&self, _directory: &str) -> Result<DiskUsage> {
        self.disk.clone().ok_or_else(|| missing("disk"))
    }
}
