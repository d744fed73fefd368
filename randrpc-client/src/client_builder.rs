//! Client builder for configuring pacing, transport and observability
//!
//! The `ClientBuilder` provides a fluent API for configuring client behavior
//! before use. It allows you to:
//! - Point the client at another endpoint
//! - Bound how long a request may be held back by the advisory delay
//! - Choose how server errors are reported
//! - Configure observability (OpenTelemetry)
//!
//! # Endpoint Resolution
//!
//! An explicit [`ClientBuilder::endpoint`] wins. Otherwise the
//! `RANDRPC_ENDPOINT` environment variable is used when set and non-empty,
//! falling back to [`DEFAULT_ENDPOINT`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use randrpc_client::ClientBuilder;
//! use std::time::Duration;
//!
//! # fn example() -> randrpc_core::Result<()> {
//! let client = ClientBuilder::new("my-api-key")
//!     .max_blocking_time(Duration::from_secs(5))
//!     .throw_protocol_errors(true)
//!     .build()?;
//!
//! // With observability
//! let client2 = ClientBuilder::new("my-api-key")
//!     .with_default_observability()
//!     .service_name("dice-roller")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use crate::dispatcher::Dispatcher;
use crate::metrics::ClientMetrics;
use crate::pacing::{saturating_millis, DEFAULT_MAX_BLOCKING};
use crate::request::check_text;
use crate::transport::{HttpTransport, Transport};
use crate::RandomClient;
use randrpc_core::{Error, ObservabilityConfig, Result};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Production JSON-RPC endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.random.org/json-rpc/1/invoke";

/// Environment variable overriding the default endpoint
pub const ENDPOINT_ENV: &str = "RANDRPC_ENDPOINT";

/// Default HTTP timeout per exchange
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builder for configuring and creating a RandomClient
pub struct ClientBuilder {
    api_key: String,
    endpoint: Option<String>,
    max_blocking: Duration,
    request_timeout: Duration,
    throw_protocol_errors: bool,
    transport: Option<Arc<dyn Transport>>,
    observability_config: Option<ObservabilityConfig>,
    service_name: Option<String>,
}

impl ClientBuilder {
    /// Create a new client builder
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: None,
            max_blocking: DEFAULT_MAX_BLOCKING,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            throw_protocol_errors: false,
            transport: None,
            observability_config: None,
            service_name: None,
        }
    }

    /// Use another JSON-RPC endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Longest advised wait a request may block for (default 3s)
    ///
    /// Longer waits fail with `Error::PacingExceeded` instead.
    pub fn max_blocking_time(mut self, max_blocking: Duration) -> Self {
        self.max_blocking = max_blocking;
        self
    }

    /// HTTP timeout for each exchange (default 30s)
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Report server errors as `Error::Protocol` instead of tagged responses
    pub fn throw_protocol_errors(mut self, throw: bool) -> Self {
        self.throw_protocol_errors = throw;
        self
    }

    /// Use a custom transport; `endpoint` and `request_timeout` are then ignored
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Enable OpenTelemetry observability with custom configuration
    pub fn with_observability(mut self, config: ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self
    }

    /// Enable OpenTelemetry observability with default configuration
    pub fn with_default_observability(mut self) -> Self {
        self.observability_config = Some(ObservabilityConfig::default());
        self
    }

    /// Set service name for observability (used if observability is enabled)
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Build the client
    ///
    /// The pacing clock starts now. A blank key, or one that starts with `{`
    /// or contains `"` or `\`, fails with `Error::InvalidParams("apiKey")`.
    pub fn build(self) -> Result<RandomClient> {
        if self.api_key.trim().is_empty() || check_text("apiKey", &self.api_key).is_err() {
            return Err(Error::InvalidParams("apiKey".to_string()));
        }

        // Initialize observability if configured
        let metrics = if let Some(mut config) = self.observability_config {
            if let Some(name) = self.service_name {
                config.service_name = name;
            }

            randrpc_core::init_observability(config.clone())
                .map_err(|e| Error::Internal(format!("Failed to initialize observability: {}", e)))?;

            Some(Arc::new(ClientMetrics::new(config.service_name)))
        } else {
            None
        };

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => {
                let endpoint = resolve_endpoint(
                    self.endpoint.as_deref(),
                    std::env::var(ENDPOINT_ENV).ok(),
                );
                tracing::info!(endpoint = %endpoint, "Using HTTP transport");
                Arc::new(HttpTransport::new(endpoint, self.request_timeout)?)
            }
        };

        let dispatcher =
            Dispatcher::new(transport, self.max_blocking).with_metrics(metrics.clone());

        tracing::debug!(
            max_blocking_ms = saturating_millis(self.max_blocking),
            throw_protocol_errors = self.throw_protocol_errors,
            "Client built"
        );

        Ok(RandomClient {
            api_key: Arc::from(self.api_key),
            hashed_api_key: Arc::new(OnceLock::new()),
            dispatcher,
            throw_protocol_errors: self.throw_protocol_errors,
            metrics,
        })
    }
}

fn resolve_endpoint(explicit: Option<&str>, from_env: Option<String>) -> String {
    match (explicit, from_env) {
        (Some(endpoint), _) => endpoint.to_string(),
        (None, Some(endpoint)) if !endpoint.trim().is_empty() => endpoint,
        _ => DEFAULT_ENDPOINT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NullTransport;

    #[async_trait]
    impl Transport for NullTransport {
        async fn exchange(&self, _body: Vec<u8>) -> Result<Vec<u8>> {
            Err(Error::Transport("unreachable".to_string()))
        }
    }

    #[test]
    fn test_builder_defaults() {
        let builder = ClientBuilder::new("key");
        assert_eq!(builder.api_key, "key");
        assert!(builder.endpoint.is_none());
        assert_eq!(builder.max_blocking, Duration::from_millis(3000));
        assert_eq!(builder.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert!(!builder.throw_protocol_errors);
        assert!(builder.transport.is_none());
        assert!(builder.observability_config.is_none());
    }

    #[test]
    fn test_builder_setters() {
        let builder = ClientBuilder::new("key")
            .endpoint("http://localhost:9000/invoke")
            .max_blocking_time(Duration::from_millis(500))
            .request_timeout(Duration::from_secs(2))
            .throw_protocol_errors(true)
            .with_default_observability()
            .service_name("dice");

        assert_eq!(builder.endpoint.as_deref(), Some("http://localhost:9000/invoke"));
        assert_eq!(builder.max_blocking, Duration::from_millis(500));
        assert_eq!(builder.request_timeout, Duration::from_secs(2));
        assert!(builder.throw_protocol_errors);
        assert!(builder.observability_config.is_some());
        assert_eq!(builder.service_name.as_deref(), Some("dice"));
    }

    #[test]
    fn test_unusable_api_key_is_rejected() {
        for key in ["", "   ", "\t\n", "{key", "{}", "ke\"y", "key\\"] {
            match ClientBuilder::new(key).build() {
                Err(Error::InvalidParams(name)) => assert_eq!(name, "apiKey"),
                Err(other) => panic!("Expected InvalidParams, got {:?}", other),
                Ok(_) => panic!("Expected key {:?} to be rejected", key),
            }
        }
    }

    #[test]
    fn test_build_with_custom_transport() {
        let client = ClientBuilder::new("key")
            .with_transport(Arc::new(NullTransport))
            .max_blocking_time(Duration::from_millis(750))
            .throw_protocol_errors(true)
            .build()
            .unwrap();

        assert_eq!(client.max_blocking_time(), Duration::from_millis(750));
        assert!(client.throws_protocol_errors());
    }

    #[test]
    fn test_unbounded_blocking_time_builds() {
        let client = ClientBuilder::new("key")
            .with_transport(Arc::new(NullTransport))
            .max_blocking_time(Duration::MAX)
            .build()
            .unwrap();

        assert_eq!(client.max_blocking_time(), Duration::MAX);
    }

    #[test]
    fn test_endpoint_resolution() {
        assert_eq!(resolve_endpoint(None, None), DEFAULT_ENDPOINT);
        assert_eq!(
            resolve_endpoint(None, Some("http://env/invoke".to_string())),
            "http://env/invoke"
        );
        assert_eq!(resolve_endpoint(None, Some("  ".to_string())), DEFAULT_ENDPOINT);
        assert_eq!(
            resolve_endpoint(Some("http://explicit/invoke"), Some("http://env/invoke".to_string())),
            "http://explicit/invoke"
        );
    }
}
