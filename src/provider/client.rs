//! Model transport and its HTTP implementation.
//!
//! Contains the [`ModelTransport`] seam the summarizer calls through, and
//! [`HttpTransport`] which posts to the proxy with reqwest. Keeping the
//! transport behind a trait lets the engine run against a fake in tests.

use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;

use crate::config::{normalize_base_url, normalize_token, Config};

/// A single call to the model backend.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// Endpoint path relative to the completion URL (e.g. `"chat-stream"`).
    pub endpoint: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
    pub timeout: Duration,
}

impl TransportRequest {
    /// Value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and full body of a backend response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failures of the transport itself. Non-2xx statuses are not errors here;
/// they come back as a [`TransportResponse`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to read response from {endpoint}: {source}")]
    Body {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("transport error: {0}")]
    Other(String),
}

/// Sends requests to the model backend.
#[async_trait::async_trait]
pub trait ModelTransport: Send + Sync {
    /// Sends one request and returns the collected response.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// [`ModelTransport`] over HTTP.
///
/// Posts the JSON body to `<base_url><endpoint>` with bearer auth and reads
/// the whole (streamed) body before returning.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpTransport {
    /// Creates a transport for the given proxy.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or the token is blank.
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let base_url = normalize_base_url(base_url).context("No completion URL configured")?;
        let token = normalize_token(token).context("No API token configured")?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            token,
        })
    }

    /// Creates a transport from the loaded config.
    ///
    /// # Errors
    ///
    /// Returns an error if no completion URL or token is configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let base = config
            .base_url()
            .context("No completion URL found. Set completion_url in config.toml")?;
        let token = config
            .resolve_api_token()
            .context("No API token found. Set BYOK_API_TOKEN or api_token in config.toml")?;
        Self::new(&base, &token)
    }
}

#[async_trait::async_trait]
impl ModelTransport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.endpoint.trim_start_matches('/'));
        let mut builder = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .timeout(request.timeout)
            .json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut resp = builder.send().await.map_err(|source| {
            if source.is_timeout() {
                TransportError::Timeout(request.timeout)
            } else {
                TransportError::Request {
                    endpoint: request.endpoint.clone(),
                    source,
                }
            }
        })?;
        let status = resp.status().as_u16();

        // Read the streamed body chunk by chunk
        let mut bytes = Vec::new();
        loop {
            match resp.chunk().await {
                Ok(Some(chunk)) => bytes.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(source) if source.is_timeout() => {
                    return Err(TransportError::Timeout(request.timeout))
                }
                Err(source) => {
                    return Err(TransportError::Body {
                        endpoint: request.endpoint.clone(),
                        source,
                    })
                }
            }
        }

        Ok(TransportResponse {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}
