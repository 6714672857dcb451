//! Batch transports.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, COOKIE, HeaderMap, HeaderName, HeaderValue};

use scrap_contracts::{BatchRequest, BatchResponse};

use crate::error::TransportError;

/// Sends one batch and returns the raw per-call results.
///
/// Implementations do not check that the result count matches; the client
/// does.
#[async_trait]
pub trait BatchTransport: Send + Sync {
    async fn send(&self, batch: BatchRequest) -> Result<BatchResponse, TransportError>;
}

/// POSTs batches to the server's batch endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    headers: HeaderMap,
    timeout: Duration,
}

impl HttpTransport {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// `endpoint` is the full batch URL, e.g. `http://127.0.0.1:8787/rpc`.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_timeout(endpoint, Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = build_http_client(reqwest::Client::builder().timeout(timeout))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            headers: HeaderMap::new(),
            timeout,
        })
    }

    /// Send `Authorization: Bearer <token>` with every batch.
    pub fn bearer(self, token: &str) -> Result<Self, TransportError> {
        self.header(AUTHORIZATION, &format!("Bearer {token}"))
    }

    /// Send the session cookie with every batch.
    pub fn session_cookie(self, name: &str, value: &str) -> Result<Self, TransportError> {
        self.header(COOKIE, &format!("{name}={value}"))
    }

    pub fn header(mut self, name: HeaderName, value: &str) -> Result<Self, TransportError> {
        let value = HeaderValue::from_str(value).map_err(|e| TransportError::Request {
            message: format!("invalid value for header {name}: {e}"),
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::NetworkTimeout {
                duration_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else if err.is_decode() {
            TransportError::Decode {
                message: err.to_string(),
            }
        } else {
            TransportError::Request {
                message: err.to_string(),
            }
        }
    }
}

pub(crate) fn build_http_client(
    builder: reqwest::ClientBuilder,
) -> Result<reqwest::Client, TransportError> {
    let builder = if cfg!(test) {
        builder.no_proxy()
    } else {
        builder
    };

    builder.build().map_err(|e| TransportError::Request {
        message: format!("Failed to build HTTP client: {}", e),
    })
}

#[async_trait]
impl BatchTransport for HttpTransport {
    async fn send(&self, batch: BatchRequest) -> Result<BatchResponse, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .json(&batch)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::from_http_status(status.as_u16(), &body));
        }

        let bytes = response.bytes().await.map_err(|e| self.map_error(e))?;
        serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode {
            message: e.to_string(),
        })
    }
}
