//! Paced JSON-RPC client for the random.org randomness service
//!
//! This crate provides a client for the random.org JSON-RPC API. The service
//! advises a minimum delay between requests; the client honours it
//! transparently and refuses to block longer than a configured limit.
//!
//! # Core Features
//!
//! - **Generation methods**: Integers, decimal fractions, gaussians, strings,
//!   UUIDs and blobs, each optionally signed
//! - **Pacing**: Advisory delays are waited out before the next request
//! - **Typed responses**: Replies are classified into tagged responses with
//!   checked payload accessors
//! - **Signatures**: Signed replies can be verified through the service
//! - **Pluggable transport**: HTTPS via `reqwest` by default, any [`Transport`] in tests
//! - **Observability**: OpenTelemetry integration for traces and metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use randrpc_client::{IntegerRequest, RandomClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RandomClient::new("my-api-key")?;
//!
//!     let response = client.generate_integers(IntegerRequest::new(6, 1, 6)).await?;
//!     println!("Dice: {:?}", response.integers()?);
//!
//!     let usage = client.get_usage(None).await?;
//!     println!("Bits left: {}", usage.bits_left());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Protocol Errors
//!
//! ```rust,no_run
//! use randrpc_client::{ClientBuilder, UuidRequest};
//! use randrpc_core::Error;
//!
//! # async fn example() -> randrpc_core::Result<()> {
//! let client = ClientBuilder::new("my-api-key")
//!     .throw_protocol_errors(true)
//!     .build()?;
//!
//! match client.generate_uuids(UuidRequest::new(1)).await {
//!     Ok(response) => println!("{:?}", response.uuids()?),
//!     Err(Error::Protocol(error)) => eprintln!("Server refused: {}", error),
//!     Err(e) if e.is_retryable() => eprintln!("Try again later: {}", e),
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod client_builder;
mod dispatcher;
mod metrics;
mod pacing;
mod request;
mod response;
mod transport;

pub use client::RandomClient;
pub use client_builder::{ClientBuilder, DEFAULT_ENDPOINT, DEFAULT_REQUEST_TIMEOUT, ENDPOINT_ENV};
pub use dispatcher::{Dispatcher, JSONRPC_VERSION};
pub use metrics::ClientMetrics;
pub use pacing::{PacingState, DEFAULT_MAX_BLOCKING};
pub use request::{
    BlobFormat, BlobRequest, DecimalFractionRequest, GaussianRequest, GenerationRequest,
    IntegerRequest, StringRequest, UuidRequest, DEFAULT_CHARACTERS,
};
pub use response::{
    classify, parse_timestamp, rpc_error, DataKind, Payload, Response, Usage, UsageStatus,
    DECODE_FAILURE_CODE,
};
pub use transport::{HttpTransport, Transport};
