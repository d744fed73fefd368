//! Core value model, JSON codec and error types for randrpc
//!
//! This crate provides the foundations the randrpc client is built on:
//!
//! - **Value**: A dynamic, recursively nested JSON value with explicit casts
//! - **Codec**: A self-contained recursive-descent parser and serializer
//!   (no external JSON library)
//! - **Error handling**: One error taxonomy shared by every layer
//! - **Observability**: `tracing` subscriber and OpenTelemetry bootstrap
//!
//! # Architecture
//!
//! The crate is transport-agnostic. It knows how to turn text into values and
//! values into text; `randrpc-client` adds the pacing policy, the transport and
//! the typed responses on top.
//!
//! # Example
//!
//! ```rust
//! use randrpc_core::{codec, Value};
//!
//! let reply = codec::parse(r#"{"result":{"bitsLeft":249000,"requestsLeft":999},"id":1}"#).unwrap();
//! let bits_left: i64 = reply.get("result").and_then(|r| r.get("bitsLeft")).unwrap().cast().unwrap();
//! assert_eq!(bits_left, 249000);
//!
//! let text = codec::serialize(&Value::from(vec![1, 2, 3])).unwrap();
//! assert_eq!(text, "[1,2,3]");
//! ```

pub mod codec;
pub mod error;
pub mod observability;
pub mod value;

pub use error::{Error, Result, RpcErrorData};
pub use observability::{init_observability, shutdown_observability, ObservabilityConfig};
pub use value::{FromValue, Map, Value};
