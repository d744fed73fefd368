//! random.org API client
//!
//! This module provides the main `RandomClient` type. Each generation method
//! validates its options, sends one paced JSON-RPC request and classifies the
//! reply into a typed [`Response`].
//!
//! # Request Lifecycle
//!
//! 1. **Validate**: Guard clauses on the request options (`InvalidParams`)
//! 2. **Dispatch**: Wait out the advisory delay, then exchange (see `dispatcher`)
//! 3. **Classify**: Turn the reply into a typed response (see `response`)
//! 4. **Policy**: Return server errors as tagged responses, or as
//!    `Error::Protocol` when `throw_protocol_errors` is set
//!
//! # Cloning
//!
//! `RandomClient` is cheaply cloneable using `Arc` internally. All clones
//! share the same pacing state, so the advisory delay is honoured across
//! every task using the client.

use crate::dispatcher::Dispatcher;
use crate::metrics::ClientMetrics;
use crate::request::{
    check_text, BlobRequest, DecimalFractionRequest, GaussianRequest, GenerationRequest, IntegerRequest,
    StringRequest, UuidRequest,
};
use crate::response::{self, DataKind, Response};
use crate::ClientBuilder;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use rand::Rng;
use randrpc_core::{codec, Error, Result, Value};
use sha2::{Digest, Sha512};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Usage fields removed from a `random` object before it is verified
const USAGE_FIELDS: [&str; 4] = ["bitsUsed", "bitsLeft", "requestsLeft", "advisoryDelay"];

const VERIFY_SIGNATURE: &str = "verifySignature";

/// Client for the random.org JSON-RPC API
#[derive(Clone)]
pub struct RandomClient {
    pub(crate) api_key: Arc<str>,
    pub(crate) hashed_api_key: Arc<OnceLock<String>>,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) throw_protocol_errors: bool,
    pub(crate) metrics: Option<Arc<ClientMetrics>>,
}

impl RandomClient {
    /// Create a client with default settings
    ///
    /// Shorthand for `ClientBuilder::new(api_key).build()`.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        ClientBuilder::new(api_key).build()
    }

    /// Send a generation request and classify its reply
    #[tracing::instrument(skip(self, request), fields(method = request.method()))]
    pub async fn generate<R: GenerationRequest>(&self, request: &R) -> Result<Response> {
        let params = request.params(&self.api_key)?;
        let id = request.request_id().unwrap_or_else(random_id);
        let raw = self.dispatcher.dispatch(request.method(), params, id).await?;
        self.finish(&raw, request.kind())
    }

    /// Random integers, see [`IntegerRequest`]
    pub async fn generate_integers(&self, request: IntegerRequest) -> Result<Response> {
        self.generate(&request).await
    }

    /// Random decimal fractions in `[0, 1)`, see [`DecimalFractionRequest`]
    pub async fn generate_decimal_fractions(
        &self,
        request: DecimalFractionRequest,
    ) -> Result<Response> {
        self.generate(&request).await
    }

    /// Samples from a normal distribution, see [`GaussianRequest`]
    pub async fn generate_gaussians(&self, request: GaussianRequest) -> Result<Response> {
        self.generate(&request).await
    }

    /// Random strings, see [`StringRequest`]
    pub async fn generate_strings(&self, request: StringRequest) -> Result<Response> {
        self.generate(&request).await
    }

    /// Version 4 UUIDs, see [`UuidRequest`]
    pub async fn generate_uuids(&self, request: UuidRequest) -> Result<Response> {
        self.generate(&request).await
    }

    /// Random binary objects, see [`BlobRequest`]
    pub async fn generate_blobs(&self, request: BlobRequest) -> Result<Response> {
        self.generate(&request).await
    }

    /// Status and lifetime totals of the API key
    #[tracing::instrument(skip(self))]
    pub async fn get_usage(&self, id: Option<i32>) -> Result<Response> {
        let params = codec::serialize_pairs(&["apiKey".into(), Value::from(&*self.api_key)])?;
        let id = id.unwrap_or_else(random_id);
        let raw = self.dispatcher.dispatch("getUsage", params, id).await?;
        self.finish(&raw, DataKind::Usage)
    }

    /// Ask the service whether `signature` matches a previously received `random` object
    ///
    /// Usage fields (`bitsUsed`, `bitsLeft`, `requestsLeft`, `advisoryDelay`)
    /// are removed from the object before it is sent. A server error is always
    /// returned as `Error::Protocol`, whatever the protocol error policy.
    ///
    /// A string starting with `{` anywhere in `random`, or an unwritable
    /// `signature`, fails with `Error::InvalidParams` before anything is sent.
    #[tracing::instrument(skip(self, random, signature))]
    pub async fn verify_signature(&self, random: &Value, signature: &str) -> Result<bool> {
        let mut random = random.clone();
        let fields = random
            .as_object_mut()
            .ok_or_else(|| Error::InvalidParams("random must be an object".to_string()))?;
        for key in USAGE_FIELDS {
            fields.remove(key);
        }
        if let Some(text) = first_raw_string(&random) {
            return Err(Error::InvalidParams(format!(
                "random must not contain strings starting with '{{', found {:?}",
                text
            )));
        }
        check_text("signature", signature)?;

        let params = codec::serialize_pairs(&[
            "random".into(),
            codec::serialize(&random)?.into(),
            "signature".into(),
            signature.into(),
        ])?;
        let raw = self
            .dispatcher
            .dispatch(VERIFY_SIGNATURE, params, random_id())
            .await?;

        if let Some(error) = response::rpc_error(&raw)? {
            tracing::error!(code = error.code, message = %error.message, "Signature verification failed");
            self.record_error("protocol");
            return Err(Error::Protocol(error));
        }

        raw.get("result")
            .and_then(|result| result.get("authenticity"))
            .ok_or_else(|| Error::Decode("Reply has no authenticity field".to_string()))?
            .cast::<bool>()
            .map_err(|e| Error::Decode(format!("authenticity: {}", e)))
    }

    /// Base64 SHA-512 digest of the API key, as it appears in signed `random` objects
    pub fn hashed_api_key(&self) -> &str {
        self.hashed_api_key
            .get_or_init(|| BASE64_STANDARD.encode(Sha512::digest(self.api_key.as_bytes())))
    }

    /// Remaining advised wait before the next request is sent without blocking
    pub async fn time_until_next_allowed(&self) -> Duration {
        self.dispatcher.time_until_next_allowed().await
    }

    /// Advisory delay from the most recent reply
    pub async fn advisory_delay(&self) -> Duration {
        self.dispatcher.advisory_delay().await
    }

    pub fn max_blocking_time(&self) -> Duration {
        self.dispatcher.max_blocking()
    }

    pub fn throws_protocol_errors(&self) -> bool {
        self.throw_protocol_errors
    }

    fn finish(&self, raw: &Value, kind: DataKind) -> Result<Response> {
        let response = response::classify(raw, kind).inspect_err(|e| {
            tracing::error!(error = %e, kind = %kind, "Failed to decode reply");
            self.record_error("decode");
        })?;

        if let Ok(error) = response.error() {
            tracing::error!(code = error.code, message = %error.message, "Server reported an error");
            self.record_error("protocol");
            if self.throw_protocol_errors {
                return Err(Error::Protocol(error.clone()));
            }
            return Ok(response);
        }

        if let Some(ref m) = self.metrics {
            m.update_quota(response.bits_left(), response.requests_left());
        }
        Ok(response)
    }

    fn record_error(&self, error_type: &str) {
        if let Some(ref m) = self.metrics {
            m.record_error(error_type);
        }
    }
}

/// First string in `value` that the serializer would write unquoted
fn first_raw_string(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) if s.starts_with('{') => Some(s),
        Value::Object(map) => map.iter().find_map(|(_, v)| first_raw_string(v)),
        Value::Array(items) => items.iter().find_map(first_raw_string),
        _ => None,
    }
}

/// Non-negative id for requests that did not choose one
fn random_id() -> i32 {
    rand::thread_rng().gen_range(0..i32::MAX)
}
