//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use traefik_kobling::config::{ExporterConfig, KoblingConfig, ServerConfig};

#[derive(Debug, Clone)]
struct Route {
    status: u16,
    body: String,
    delay: Duration,
}

/// Programmable upstream API answering by request path.
///
/// Unknown paths answer `404`. Request heads are recorded so tests can
/// inspect headers sent by the client.
#[derive(Clone)]
pub struct MockUpstream {
    pub addr: SocketAddr,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockUpstream {
    /// Bind an ephemeral port and start serving.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mock = Self {
            addr,
            routes: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        };

        let routes = mock.routes.clone();
        let requests = mock.requests.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((mut socket, _)) => {
                        let routes = routes.clone();
                        let requests = requests.clone();
                        tokio::spawn(async move {
                            let head = read_head(&mut socket).await;
                            let path = head
                                .lines()
                                .next()
                                .and_then(|line| line.split_whitespace().nth(1))
                                .unwrap_or("/")
                                .to_string();
                            requests.lock().unwrap().push(head);

                            let route = routes.lock().unwrap().get(&path).cloned();
                            let route = route.unwrap_or(Route {
                                status: 404,
                                body: "404 page not found".to_string(),
                                delay: Duration::ZERO,
                            });
                            if !route.delay.is_zero() {
                                tokio::time::sleep(route.delay).await;
                            }

                            let response = format!(
                                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                                status_line(route.status),
                                route.body.len(),
                                route.body
                            );
                            let _ = socket.write_all(response.as_bytes()).await;
                            let _ = socket.shutdown().await;
                        });
                    }
                    Err(_) => break,
                }
            }
        });

        mock
    }

    /// Base URL suitable for `api_address`.
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Answer `path` with `200` and `body`.
    pub fn json(&self, path: &str, body: impl Into<String>) {
        self.respond(path, 200, body);
    }

    pub fn respond(&self, path: &str, status: u16, body: impl Into<String>) {
        self.routes.lock().unwrap().insert(
            path.to_string(),
            Route {
                status,
                body: body.into(),
                delay: Duration::ZERO,
            },
        );
    }

    /// Answer `path` with `200` and `body` after `delay`.
    pub fn slow(&self, path: &str, body: impl Into<String>, delay: Duration) {
        self.routes.lock().unwrap().insert(
            path.to_string(),
            Route {
                status: 200,
                body: body.into(),
                delay,
            },
        );
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        401 => "401 Unauthorized",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// JSON array of HTTP routers, each `(name, rule, entry point)`.
pub fn routers_json(routers: &[(&str, &str, &str)]) -> String {
    let items: Vec<serde_json::Value> = routers
        .iter()
        .map(|(name, rule, entry_point)| {
            serde_json::json!({
                "name": name,
                "rule": rule,
                "service": "whoami",
                "entryPoints": [entry_point],
                "middlewares": [],
                "priority": 0
            })
        })
        .collect();
    serde_json::Value::Array(items).to_string()
}

/// Server whose API lives at `api_address`, mapping `web` to `web`.
pub fn server(name: &str, api_address: &str, destination: &str) -> ServerConfig {
    ServerConfig {
        name: name.to_string(),
        api_address: api_address.to_string(),
        api_host: None,
        destination_address: destination.to_string(),
        entry_points: BTreeMap::from([("web".to_string(), "web".to_string())]),
        forward_middlewares: None,
        forward_services: None,
    }
}

/// Configuration with a short timeout, polling every second.
pub fn config(servers: Vec<ServerConfig>) -> KoblingConfig {
    let mut config = KoblingConfig {
        servers,
        run_every: 1,
        exporter: Some(ExporterConfig::Redis {
            url: "redis://127.0.0.1:6379".to_string(),
        }),
        ..KoblingConfig::default()
    };
    config.upstream.timeout_secs = 2;
    config
}

/// Address nothing listens on.
pub async fn closed_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/", addr)
}
