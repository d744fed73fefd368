//! Error types for randrpc
//!
//! This module provides the single error taxonomy shared by the codec, the
//! dispatcher and the client. It defines two types:
//!
//! - **Error**: Every failure condition a caller can branch on (uses thiserror)
//! - **RpcErrorData**: The `{"code": .., "message": ..}` object a server
//!   reports in the `error` branch of a reply
//!
//! # Error Categories
//!
//! - **Codec errors**: UnexpectedEof, InvalidKey, UnknownToken, InvalidNumber,
//!   Format (malformed JSON text), KeyType and DanglingKey (serializer misuse), Cast
//! - **Pacing errors**: PacingExceeded (advised wait above the configured tolerance)
//! - **Transport errors**: Transport (connection, timeout, non-2xx status)
//! - **Protocol errors**: Protocol (server-reported error under the throwing policy)
//! - **Decoding errors**: Decode (reply shape did not match the requested data kind),
//!   KindMismatch (payload accessor does not match the response tag)
//! - **Caller errors**: InvalidParams (request option guard clauses)
//!
//! # Examples
//!
//! ```rust
//! use randrpc_core::{codec, Error};
//!
//! let err = codec::parse("{\"a\" 1}").unwrap_err();
//! assert!(matches!(err, Error::Format { .. }));
//! assert!(err.is_parse_error());
//! ```

use std::time::Duration;
use thiserror::Error;

/// Result type for randrpc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Application-level error type for randrpc operations
///
/// Every variant is distinguishable, so callers can decide which conditions
/// are worth retrying. Nothing in the crate swallows an error or substitutes
/// a default value for a failed decode.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Input ended while another token was expected
    #[error("Unexpected end of input at offset {offset}")]
    UnexpectedEof {
        /// Byte offset at which the input ran out
        offset: usize,
    },

    /// An object key was not a quoted string
    #[error("Invalid object key at offset {offset}: expected a quoted string")]
    InvalidKey {
        /// Byte offset of the offending character
        offset: usize,
    },

    /// A value started with a character no reader recognises
    #[error("Unknown token at offset {offset}")]
    UnknownToken {
        /// Byte offset of the offending character
        offset: usize,
    },

    /// A number token fit none of i32, i64 or a finite f64
    #[error("Invalid number {token:?} at offset {offset}")]
    InvalidNumber {
        /// The trimmed token text
        token: String,
        /// Byte offset where the token starts
        offset: usize,
    },

    /// A structural expectation was violated
    #[error("Format error at offset {offset}: expected {expected}")]
    Format {
        /// What the parser was looking for
        expected: &'static str,
        /// Byte offset where the expectation failed
        offset: usize,
    },

    /// Object-mode serialization received a key that is not a string
    ///
    /// This is a programming error in the caller.
    #[error("Object key at position {position} must be a string, found {found}")]
    KeyType {
        /// Index of the key in the flat key/value sequence
        position: usize,
        /// Variant name of the value found in key position
        found: &'static str,
    },

    /// Object-mode serialization received a key with no value after it
    #[error("Object key at position {position} has no value")]
    DanglingKey {
        /// Index of the unpaired key in the flat key/value sequence
        position: usize,
    },

    /// An explicit cast between value variants failed
    #[error("Cannot cast {found} to {expected}")]
    Cast {
        /// Requested target type
        expected: &'static str,
        /// Variant name (or out-of-range description) of the source value
        found: &'static str,
    },

    /// The server's advisory delay exceeds the configured blocking tolerance
    ///
    /// No transport call is made. The caller may retry after `wait`.
    #[error("Advised wait of {wait:?} exceeds the maximum blocking time of {max:?}")]
    PacingExceeded {
        /// Remaining advised wait
        wait: Duration,
        /// Configured maximum blocking duration
        max: Duration,
    },

    /// Network or HTTP failure (connection refused, timeout, non-2xx status)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Server-reported application error
    ///
    /// Only produced when the client is configured to throw protocol errors;
    /// otherwise the error is returned as a tagged Error response.
    #[error("Protocol error: {0}")]
    Protocol(#[from] RpcErrorData),

    /// The reply did not have the shape required by the requested data kind
    #[error("Decode error: {0}")]
    Decode(String),

    /// A payload accessor was called on a response of another kind
    #[error("Response holds {actual} data, not {requested}")]
    KindMismatch {
        /// Payload the caller asked for
        requested: &'static str,
        /// Kind the response is tagged with
        actual: &'static str,
    },

    /// Request options failed a guard clause
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Unexpected internal failure (e.g. observability bootstrap)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error came from parsing malformed JSON text
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Error::UnexpectedEof { .. }
                | Error::InvalidKey { .. }
                | Error::UnknownToken { .. }
                | Error::InvalidNumber { .. }
                | Error::Format { .. }
        )
    }

    /// Whether repeating the same call later may succeed
    ///
    /// Pacing refusals and transport failures are transient. Everything else
    /// will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::PacingExceeded { .. } | Error::Transport(_))
    }
}

/// Error object reported by the server in the `error` branch of a reply
///
/// # Examples
///
/// ```rust
/// use randrpc_core::RpcErrorData;
///
/// let error = RpcErrorData::new(503, "throttled");
/// assert_eq!(error.to_string(), "[503] throttled");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcErrorData {
    /// Numeric error code
    pub code: i32,
    /// Human-readable error message
    pub message: String,
}

impl RpcErrorData {
    /// Create a new error object with code and message
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RpcErrorData {
    /// Formats as "[code] message" for easy readability in logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for RpcErrorData {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_display() {
        let error = RpcErrorData::new(401, "Invalid API key");
        let display = format!("{}", error);

        assert!(display.contains("401"));
        assert!(display.contains("Invalid API key"));
    }

    #[test]
    fn test_protocol_error_from_rpc_error() {
        let error: Error = RpcErrorData::new(503, "throttled").into();
        match error {
            Error::Protocol(data) => {
                assert_eq!(data.code, 503);
                assert_eq!(data.message, "throttled");
            }
            _ => panic!("Expected Protocol error"),
        }
    }

    #[test]
    fn test_parse_error_classification() {
        let parse_errors = vec![
            Error::UnexpectedEof { offset: 3 },
            Error::InvalidKey { offset: 1 },
            Error::UnknownToken { offset: 5 },
            Error::InvalidNumber {
                token: "1.2.3".to_string(),
                offset: 5,
            },
            Error::Format {
                expected: "':'",
                offset: 4,
            },
        ];

        for error in parse_errors {
            assert!(error.is_parse_error(), "{error} should be a parse error");
            assert!(!error.is_retryable());
        }

        assert!(!Error::Decode("bad".into()).is_parse_error());
    }

    #[test]
    fn test_retryable_errors() {
        let pacing = Error::PacingExceeded {
            wait: Duration::from_millis(5000),
            max: Duration::from_millis(3000),
        };
        assert!(pacing.is_retryable());
        assert!(Error::Transport("connection refused".into()).is_retryable());

        assert!(!Error::Protocol(RpcErrorData::new(401, "bad key")).is_retryable());
        assert!(!Error::InvalidParams("n".into()).is_retryable());
        assert!(!Error::Decode("data".into()).is_retryable());
    }

    #[test]
    fn test_pacing_exceeded_display() {
        let error = Error::PacingExceeded {
            wait: Duration::from_millis(5000),
            max: Duration::from_millis(3000),
        };
        let display = error.to_string();

        assert!(display.contains("5s"));
        assert!(display.contains("3s"));
    }

    #[test]
    fn test_key_type_error_display() {
        let error = Error::KeyType {
            position: 2,
            found: "Integer",
        };
        assert_eq!(
            error.to_string(),
            "Object key at position 2 must be a string, found Integer"
        );
    }

    #[test]
    fn test_kind_mismatch_display() {
        let error = Error::KindMismatch {
            requested: "integers",
            actual: "Usage",
        };
        assert_eq!(error.to_string(), "Response holds Usage data, not integers");
    }
}
