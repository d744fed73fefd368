//! randrpc - paced JSON-RPC client for random.org
//!
//! This is the main convenience crate that re-exports the randrpc sub-crates.
//! Use this crate if you want a single dependency for the client, the value
//! model and the error types.
//!
//! # Architecture
//!
//! randrpc is organized into modular crates:
//!
//! - **randrpc-core**: Value model, JSON codec, error handling, observability
//! - **randrpc-client**: Pacing, dispatcher, typed responses and the client
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use randrpc::{IntegerRequest, RandomClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RandomClient::new("my-api-key")?;
//!
//!     let response = client
//!         .generate_integers(IntegerRequest::new(5, 1, 100).replacement(false))
//!         .await?;
//!     println!("Lottery: {:?}", response.integers()?);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Working with raw values
//!
//! ```rust
//! use randrpc::core::{codec, Value};
//!
//! let reply = codec::parse(r#"{"result":{"advisoryDelay":1000},"id":3}"#).unwrap();
//! let delay: i64 = reply.get("result").unwrap().get("advisoryDelay").unwrap().cast().unwrap();
//! assert_eq!(delay, 1000);
//! assert_eq!(codec::serialize(&reply).unwrap(), r#"{"result":{"advisoryDelay":1000},"id":3}"#);
//! assert!(reply.get("error").map_or(true, Value::is_null));
//! ```

pub use randrpc_client as client;
pub use randrpc_core as core;

pub use randrpc_client::{
    BlobFormat, BlobRequest, ClientBuilder, DataKind, DecimalFractionRequest, GaussianRequest,
    GenerationRequest, IntegerRequest, RandomClient, Response, StringRequest, Usage, UsageStatus,
    UuidRequest,
};
pub use randrpc_core::{Error, Result, RpcErrorData, Value};
