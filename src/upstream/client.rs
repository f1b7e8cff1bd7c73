//! HTTP client for one upstream proxy API.
//!
//! # Responsibilities
//! - Resolve endpoint URLs against the server's API address
//! - Send embedded URL credentials as Basic auth
//! - Apply the optional `Host` override
//! - Decode JSON arrays into typed records

use std::time::Duration;

use reqwest::header::HOST;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::ServerConfig;
use crate::upstream::types::{
    MiddlewareRecord, Protocol, RouterRecord, ServiceRecord, UpstreamError, MIDDLEWARES_ENDPOINT,
    SERVICES_ENDPOINT,
};

/// API client bound to a single upstream server.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    server: String,
    base_url: Url,
    credentials: Option<(String, String)>,
    host: Option<String>,
    http: reqwest::Client,
}

impl UpstreamClient {
    /// Create a client for `server` with a per-request timeout.
    pub fn new(server: &ServerConfig, timeout: Duration) -> Result<Self, UpstreamError> {
        let mut base_url = Url::parse(&server.api_address).map_err(|e| {
            UpstreamError::InvalidAddress {
                server: server.name.clone(),
                reason: e.to_string(),
            }
        })?;

        let credentials = if base_url.username().is_empty() {
            None
        } else {
            Some((
                base_url.username().to_string(),
                base_url.password().unwrap_or_default().to_string(),
            ))
        };
        // Credentials travel in the Authorization header, never in the URL.
        base_url
            .set_username("")
            .and_then(|_| base_url.set_password(None))
            .map_err(|_| UpstreamError::InvalidAddress {
                server: server.name.clone(),
                reason: "address cannot carry a host".to_string(),
            })?;

        // Url::join drops the last segment unless the path ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let host = server
            .api_host
            .as_ref()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty());

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("traefik-kobling/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| UpstreamError::Client {
                server: server.name.clone(),
                source,
            })?;

        Ok(Self {
            server: server.name.clone(),
            base_url,
            credentials,
            host,
            http,
        })
    }

    /// API base URL with credentials removed.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn routers(&self, protocol: Protocol) -> Result<Vec<RouterRecord>, UpstreamError> {
        self.fetch(protocol.routers_endpoint()).await
    }

    pub async fn middlewares(&self) -> Result<Vec<MiddlewareRecord>, UpstreamError> {
        self.fetch(MIDDLEWARES_ENDPOINT).await
    }

    pub async fn services(&self) -> Result<Vec<ServiceRecord>, UpstreamError> {
        self.fetch(SERVICES_ENDPOINT).await
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
    ) -> Result<Vec<T>, UpstreamError> {
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|e| UpstreamError::InvalidAddress {
                server: self.server.clone(),
                reason: e.to_string(),
            })?;

        let mut request = self.http.get(url);
        if let Some((username, password)) = &self.credentials {
            request = request.basic_auth(username, Some(password));
        }
        if let Some(host) = &self.host {
            request = request.header(HOST, host);
        }

        tracing::debug!(server = %self.server, endpoint, "Fetching from upstream");

        let response = request.send().await.map_err(|source| UpstreamError::Unreachable {
            server: self.server.clone(),
            endpoint,
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                server: self.server.clone(),
                endpoint,
                status,
            });
        }

        let body = response.text().await.map_err(|source| UpstreamError::Unreachable {
            server: self.server.clone(),
            endpoint,
            source,
        })?;

        serde_json::from_str(&body).map_err(|source| UpstreamError::Malformed {
            server: self.server.clone(),
            endpoint,
            source,
        })
    }
}
