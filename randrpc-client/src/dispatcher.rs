//! Paced JSON-RPC dispatcher
//!
//! The dispatcher owns the exchange sequence for a single client:
//!
//! 1. **Envelope**: Wrap method, pre-serialized params and id in a JSON-RPC 2.0 object
//! 2. **Gate**: Consult the pacing state; sleep out the advised delay or refuse
//! 3. **Exchange**: Hand the bytes to the transport
//! 4. **Decode**: Parse the reply with the codec
//! 5. **Record**: Replace the advisory delay with the reply's `result.advisoryDelay`
//!    (zero when absent, e.g. on error replies)
//!
//! # Concurrency
//!
//! The pacing state sits behind a `tokio::sync::Mutex` that is held from the
//! gate until the exchange is recorded. Two callers sharing a dispatcher
//! therefore never both observe "no wait needed" for the same delay window.
//!
//! # Cancellation
//!
//! Dropping a `dispatch` future (for example through `tokio::time::timeout`)
//! while it sleeps releases the lock without recording anything, so the
//! pacing state is left exactly as it was.

use crate::metrics::ClientMetrics;
use crate::pacing::{saturating_millis, PacingState};
use crate::transport::Transport;
use randrpc_core::{codec, Result, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// JSON-RPC protocol version sent in every envelope
pub const JSONRPC_VERSION: &str = "2.0";

/// Sends envelopes through a transport while honouring advisory delays
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    pacing: Arc<Mutex<PacingState>>,
    max_blocking: Duration,
    metrics: Option<Arc<ClientMetrics>>,
}

impl Dispatcher {
    /// Create a dispatcher whose pacing clock starts now
    pub fn new(transport: Arc<dyn Transport>, max_blocking: Duration) -> Self {
        Self {
            transport,
            pacing: Arc::new(Mutex::new(PacingState::new(max_blocking))),
            max_blocking,
            metrics: None,
        }
    }

    /// Attach metrics recorded for every exchange
    pub fn with_metrics(mut self, metrics: Option<Arc<ClientMetrics>>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Build the request envelope
    ///
    /// `params` must already be a serialized object; it is embedded verbatim.
    pub fn envelope(method: &str, params: String, id: i32) -> Result<String> {
        codec::serialize_pairs(&[
            "jsonrpc".into(),
            JSONRPC_VERSION.into(),
            "method".into(),
            method.into(),
            "params".into(),
            params.into(),
            "id".into(),
            id.into(),
        ])
    }

    /// Perform one paced exchange and return the decoded reply
    ///
    /// # Errors
    ///
    /// - `PacingExceeded` if the advised wait exceeds the blocking limit
    ///   (the transport is not called)
    /// - `Transport` if the exchange itself fails
    /// - any codec error if the reply is not valid JSON
    #[tracing::instrument(skip(self, params))]
    pub async fn dispatch(&self, method: &str, params: String, id: i32) -> Result<Value> {
        let request = Self::envelope(method, params, id)?;

        let mut pacing = self.pacing.lock().await;

        let wait = match pacing.gate() {
            Ok(wait) => wait,
            Err(e) => {
                tracing::warn!(error = %e, "Request refused by pacing");
                if let Some(ref m) = self.metrics {
                    m.record_pacing_exceeded();
                }
                return Err(e);
            }
        };

        if !wait.is_zero() {
            tracing::debug!(wait_ms = saturating_millis(wait), "Honouring advisory delay");
            if let Some(ref m) = self.metrics {
                m.record_pacing_wait(wait.as_secs_f64());
            }
            tokio::time::sleep(wait).await;
        }

        let start = Instant::now();
        let reply = match self.transport.exchange(request.into_bytes()).await {
            Ok(reply) => reply,
            Err(e) => {
                pacing.touch();
                tracing::error!(error = %e, "Transport exchange failed");
                if let Some(ref m) = self.metrics {
                    m.record_error("transport");
                }
                return Err(e);
            }
        };
        let duration = start.elapsed().as_secs_f64();

        let raw = match codec::parse_bytes(&reply) {
            Ok(raw) => raw,
            Err(e) => {
                pacing.touch();
                tracing::error!(error = %e, "Reply is not valid JSON");
                if let Some(ref m) = self.metrics {
                    m.record_error("parse");
                }
                return Err(e);
            }
        };

        let advisory_delay = advisory_delay_of(&raw);
        pacing.record_exchange(advisory_delay);
        drop(pacing);

        let status = if raw.get("error").is_some() { "error" } else { "success" };
        if let Some(ref m) = self.metrics {
            m.record_request(method, status, duration);
        }
        tracing::debug!(
            duration_secs = duration,
            advisory_delay_ms = saturating_millis(advisory_delay),
            status,
            "Exchange completed"
        );

        Ok(raw)
    }

    /// Remaining advised wait before the next exchange may start
    pub async fn time_until_next_allowed(&self) -> Duration {
        self.pacing.lock().await.time_until_next_allowed()
    }

    /// Advisory delay recorded from the most recent reply
    pub async fn advisory_delay(&self) -> Duration {
        self.pacing.lock().await.advisory_delay()
    }

    pub fn max_blocking(&self) -> Duration {
        self.max_blocking
    }
}

/// `result.advisoryDelay` in milliseconds, or zero when the reply has none
fn advisory_delay_of(raw: &Value) -> Duration {
    raw.get("result")
        .and_then(|result| result.get("advisoryDelay"))
        .and_then(|delay| delay.cast::<i64>().ok())
        .map_or(Duration::ZERO, |ms| Duration::from_millis(ms.max(0) as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_layout() {
        let envelope = Dispatcher::envelope(
            "generateIntegers",
            r#"{"apiKey":"k","n":1}"#.to_string(),
            42,
        )
        .unwrap();

        assert_eq!(
            envelope,
            r#"{"jsonrpc":"2.0","method":"generateIntegers","params":{"apiKey":"k","n":1},"id":42}"#
        );
    }

    #[test]
    fn test_envelope_round_trips_through_codec() {
        let envelope = Dispatcher::envelope("getUsage", r#"{"apiKey":"k"}"#.to_string(), -5).unwrap();
        let parsed = codec::parse(&envelope).unwrap();

        assert_eq!(parsed.get("jsonrpc").and_then(Value::as_str), Some("2.0"));
        assert_eq!(parsed.get("method").and_then(Value::as_str), Some("getUsage"));
        assert_eq!(parsed.get("id"), Some(&Value::Integer(-5)));
        assert_eq!(
            parsed.get("params").and_then(|p| p.get("apiKey")).and_then(Value::as_str),
            Some("k")
        );
    }

    #[test]
    fn test_advisory_delay_extraction() {
        let reply = codec::parse(r#"{"result":{"advisoryDelay":1500},"id":1}"#).unwrap();
        assert_eq!(advisory_delay_of(&reply), Duration::from_millis(1500));

        let error = codec::parse(r#"{"error":{"code":503,"message":"throttled"},"id":1}"#).unwrap();
        assert_eq!(advisory_delay_of(&error), Duration::ZERO);

        let usage = codec::parse(r#"{"result":{"bitsLeft":10},"id":1}"#).unwrap();
        assert_eq!(advisory_delay_of(&usage), Duration::ZERO);

        let negative = codec::parse(r#"{"result":{"advisoryDelay":-20},"id":1}"#).unwrap();
        assert_eq!(advisory_delay_of(&negative), Duration::ZERO);
    }
}
