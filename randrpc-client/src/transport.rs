//! Byte-level transport
//!
//! The dispatcher only needs "send these bytes, give me the reply bytes".
//! [`Transport`] is that seam; [`HttpTransport`] is the production
//! implementation (one HTTPS POST per exchange, `Content-Type:
//! application/json`). Tests plug in scripted transports instead.
//!
//! Every failure (connection refused, timeout, non-2xx status, body read
//! error) is reported as `Error::Transport`. Nothing is retried here.

use async_trait::async_trait;
use randrpc_core::{Error, Result};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

/// Send request bytes, receive response bytes
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one request/reply exchange
    async fn exchange(&self, body: Vec<u8>) -> Result<Vec<u8>>;
}

/// HTTPS POST transport backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    /// Create a transport posting to `endpoint`, failing requests after `timeout`
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn exchange(&self, body: Vec<u8>) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!("HTTP status {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        tracing::trace!(bytes = bytes.len(), "Reply received");
        Ok(bytes.to_vec())
    }
}
