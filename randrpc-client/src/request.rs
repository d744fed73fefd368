//! Request options for the generation methods
//!
//! One options struct per request kind. Required values go through `new`,
//! optional ones through builder setters; unset options keep the service
//! defaults (`replacement: true`, unsigned, random id).
//!
//! # Example
//!
//! ```rust
//! use randrpc_client::{GenerationRequest, IntegerRequest};
//!
//! let request = IntegerRequest::new(6, 1, 49).replacement(false).signed(true).id(42);
//! let params = request.params("my-key").unwrap();
//! assert_eq!(
//!     params,
//!     r#"{"apiKey":"my-key","n":6,"min":1,"max":49,"replacement":false}"#
//! );
//! assert_eq!(request.method(), "generateSignedIntegers");
//! ```
//!
//! Guard clauses run before anything is sent; a failure is reported as
//! `Error::InvalidParams` and no request reaches the transport.

use crate::response::DataKind;
use randrpc_core::{codec, Error, Result, Value};
use std::fmt;

/// Largest `n` accepted by the integer, decimal, gaussian and string methods
pub const MAX_COUNT: u32 = 10_000;

/// Bound on `min` and `max` for integer requests
pub const INTEGER_RANGE: i32 = 1_000_000_000;

/// Bound on `mean` and `standardDeviation` for gaussian requests
pub const GAUSSIAN_RANGE: f64 = 1e6;

/// Largest blob size in bits
pub const MAX_BLOB_SIZE: u32 = 1024 * 1024;

/// Characters used by string requests unless overridden
pub const DEFAULT_CHARACTERS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A request for one of the `generate*` methods
pub trait GenerationRequest {
    /// Kind of data the reply carries, signed or not
    fn kind(&self) -> DataKind;

    /// Caller-chosen id, if any
    fn request_id(&self) -> Option<i32>;

    /// Check every option against the service limits
    fn validate(&self) -> Result<()>;

    /// Method-specific parameters in wire order, as alternating keys and values
    fn fields(&self) -> Vec<Value>;

    /// JSON-RPC method name
    fn method(&self) -> &'static str {
        self.kind().method().unwrap_or_default()
    }

    /// Serialized params object, `apiKey` first
    fn params(&self, api_key: &str) -> Result<String> {
        self.validate()?;
        check_text("apiKey", api_key)?;
        let mut entries = vec![Value::from("apiKey"), Value::from(api_key)];
        entries.extend(self.fields());
        codec::serialize_pairs(&entries)
    }
}

/// Reject text the serializer cannot write as a JSON string
///
/// Strings are written without escaping, and a leading `{` marks an
/// already serialized object that is written as is.
pub(crate) fn check_text(name: &str, text: &str) -> Result<()> {
    if text.starts_with('{') || text.contains(['"', '\\']) {
        return Err(Error::InvalidParams(format!(
            "{} must not start with '{{' or contain '\"' or '\\'",
            name
        )));
    }
    Ok(())
}

fn check_range<T: PartialOrd + fmt::Display>(name: &str, value: T, min: T, max: T) -> Result<()> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(Error::InvalidParams(format!(
            "{} must be within {} and {}",
            name, min, max
        )))
    }
}

macro_rules! common_setters {
    () => {
        /// Ask for a signed reply
        pub fn signed(mut self, signed: bool) -> Self {
            self.signed = signed;
            self
        }

        /// Id echoed in the reply; random when unset
        pub fn id(mut self, id: i32) -> Self {
            self.id = Some(id);
            self
        }
    };
}

/// `generateIntegers`: `n` integers in `[min, max]`
#[derive(Debug, Clone, PartialEq)]
pub struct IntegerRequest {
    pub n: u32,
    pub min: i32,
    pub max: i32,
    pub replacement: bool,
    pub signed: bool,
    pub id: Option<i32>,
}

impl IntegerRequest {
    pub fn new(n: u32, min: i32, max: i32) -> Self {
        Self {
            n,
            min,
            max,
            replacement: true,
            signed: false,
            id: None,
        }
    }

    common_setters!();

    /// Allow duplicates (`true`) or draw unique values (`false`)
    pub fn replacement(mut self, replacement: bool) -> Self {
        self.replacement = replacement;
        self
    }
}

impl GenerationRequest for IntegerRequest {
    fn kind(&self) -> DataKind {
        DataKind::Integer.with_signature(self.signed)
    }

    fn request_id(&self) -> Option<i32> {
        self.id
    }

    fn validate(&self) -> Result<()> {
        check_range("n", self.n, 1, MAX_COUNT)?;
        check_range("min", self.min, -INTEGER_RANGE, INTEGER_RANGE)?;
        check_range("max", self.max, -INTEGER_RANGE, INTEGER_RANGE)
    }

    fn fields(&self) -> Vec<Value> {
        vec![
            "n".into(),
            self.n.into(),
            "min".into(),
            self.min.into(),
            "max".into(),
            self.max.into(),
            "replacement".into(),
            self.replacement.into(),
        ]
    }
}

/// `generateDecimalFractions`: `n` values in `[0, 1)` with fixed decimal places
#[derive(Debug, Clone, PartialEq)]
pub struct DecimalFractionRequest {
    pub n: u32,
    pub decimal_places: u8,
    pub replacement: bool,
    pub signed: bool,
    pub id: Option<i32>,
}

impl DecimalFractionRequest {
    pub fn new(n: u32, decimal_places: u8) -> Self {
        Self {
            n,
            decimal_places,
            replacement: true,
            signed: false,
            id: None,
        }
    }

    common_setters!();

    pub fn replacement(mut self, replacement: bool) -> Self {
        self.replacement = replacement;
        self
    }
}

impl GenerationRequest for DecimalFractionRequest {
    fn kind(&self) -> DataKind {
        DataKind::Decimal.with_signature(self.signed)
    }

    fn request_id(&self) -> Option<i32> {
        self.id
    }

    fn validate(&self) -> Result<()> {
        check_range("n", self.n, 1, MAX_COUNT)?;
        check_range("decimalPlaces", self.decimal_places, 1, 20)
    }

    fn fields(&self) -> Vec<Value> {
        vec![
            "n".into(),
            self.n.into(),
            "decimalPlaces".into(),
            self.decimal_places.into(),
            "replacement".into(),
            self.replacement.into(),
        ]
    }
}

/// `generateGaussians`: `n` samples from a normal distribution
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianRequest {
    pub n: u32,
    pub mean: f64,
    pub standard_deviation: f64,
    pub significant_digits: u8,
    pub signed: bool,
    pub id: Option<i32>,
}

impl GaussianRequest {
    pub fn new(n: u32, mean: f64, standard_deviation: f64, significant_digits: u8) -> Self {
        Self {
            n,
            mean,
            standard_deviation,
            significant_digits,
            signed: false,
            id: None,
        }
    }

    common_setters!();
}

impl GenerationRequest for GaussianRequest {
    fn kind(&self) -> DataKind {
        DataKind::Gaussian.with_signature(self.signed)
    }

    fn request_id(&self) -> Option<i32> {
        self.id
    }

    fn validate(&self) -> Result<()> {
        check_range("n", self.n, 1, MAX_COUNT)?;
        check_range("mean", self.mean, -GAUSSIAN_RANGE, GAUSSIAN_RANGE)?;
        check_range(
            "standardDeviation",
            self.standard_deviation,
            -GAUSSIAN_RANGE,
            GAUSSIAN_RANGE,
        )?;
        check_range("significantDigits", self.significant_digits, 2, 20)
    }

    fn fields(&self) -> Vec<Value> {
        vec![
            "n".into(),
            self.n.into(),
            "mean".into(),
            self.mean.into(),
            "standardDeviation".into(),
            self.standard_deviation.into(),
            "significantDigits".into(),
            self.significant_digits.into(),
        ]
    }
}

/// `generateStrings`: `n` strings of `length` characters
#[derive(Debug, Clone, PartialEq)]
pub struct StringRequest {
    pub n: u32,
    pub length: u32,
    pub characters: String,
    pub replacement: bool,
    pub signed: bool,
    pub id: Option<i32>,
}

impl StringRequest {
    pub fn new(n: u32, length: u32) -> Self {
        Self {
            n,
            length,
            characters: DEFAULT_CHARACTERS.to_string(),
            replacement: true,
            signed: false,
            id: None,
        }
    }

    common_setters!();

    /// Alphabet to draw from
    pub fn characters(mut self, characters: impl Into<String>) -> Self {
        self.characters = characters.into();
        self
    }

    pub fn replacement(mut self, replacement: bool) -> Self {
        self.replacement = replacement;
        self
    }
}

impl GenerationRequest for StringRequest {
    fn kind(&self) -> DataKind {
        DataKind::String.with_signature(self.signed)
    }

    fn request_id(&self) -> Option<i32> {
        self.id
    }

    fn validate(&self) -> Result<()> {
        check_range("n", self.n, 1, MAX_COUNT)?;
        check_range("length", self.length, 1, 20)?;
        check_range("characters length", self.characters.chars().count(), 1, 80)?;
        // No generated string may start with '{'
        if self.characters.contains(['{', '"', '\\']) {
            return Err(Error::InvalidParams(
                "characters must not contain '{', '\"' or '\\'".to_string(),
            ));
        }
        Ok(())
    }

    fn fields(&self) -> Vec<Value> {
        vec![
            "n".into(),
            self.n.into(),
            "length".into(),
            self.length.into(),
            "characters".into(),
            self.characters.as_str().into(),
            "replacement".into(),
            self.replacement.into(),
        ]
    }
}

/// `generateUUIDs`: `n` version 4 UUIDs
#[derive(Debug, Clone, PartialEq)]
pub struct UuidRequest {
    pub n: u32,
    pub signed: bool,
    pub id: Option<i32>,
}

impl UuidRequest {
    pub fn new(n: u32) -> Self {
        Self {
            n,
            signed: false,
            id: None,
        }
    }

    common_setters!();
}

impl GenerationRequest for UuidRequest {
    fn kind(&self) -> DataKind {
        DataKind::Uuid.with_signature(self.signed)
    }

    fn request_id(&self) -> Option<i32> {
        self.id
    }

    fn validate(&self) -> Result<()> {
        check_range("n", self.n, 1, 1000)
    }

    fn fields(&self) -> Vec<Value> {
        vec!["n".into(), self.n.into()]
    }
}

/// Encoding of generated blobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlobFormat {
    #[default]
    Base64,
    Hex,
}

impl BlobFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            BlobFormat::Base64 => "base64",
            BlobFormat::Hex => "hex",
        }
    }
}

impl std::str::FromStr for BlobFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "base64" => Ok(BlobFormat::Base64),
            "hex" => Ok(BlobFormat::Hex),
            _ => Err(Error::InvalidParams(
                "format has to be base64 or hex".to_string(),
            )),
        }
    }
}

/// `generateBlobs`: `n` blobs of `size` bits
#[derive(Debug, Clone, PartialEq)]
pub struct BlobRequest {
    pub n: u32,
    /// Size in bits
    pub size: u32,
    pub format: BlobFormat,
    pub signed: bool,
    pub id: Option<i32>,
}

impl BlobRequest {
    pub fn new(n: u32, size: u32) -> Self {
        Self {
            n,
            size,
            format: BlobFormat::Base64,
            signed: false,
            id: None,
        }
    }

    common_setters!();

    pub fn format(mut self, format: BlobFormat) -> Self {
        self.format = format;
        self
    }
}

impl GenerationRequest for BlobRequest {
    fn kind(&self) -> DataKind {
        DataKind::Blob.with_signature(self.signed)
    }

    fn request_id(&self) -> Option<i32> {
        self.id
    }

    fn validate(&self) -> Result<()> {
        check_range("n", self.n, 1, 100)?;
        check_range("size", self.size, 1, MAX_BLOB_SIZE)?;
        if self.size % 8 != 0 {
            return Err(Error::InvalidParams(
                "size must be divisible by 8".to_string(),
            ));
        }
        Ok(())
    }

    fn fields(&self) -> Vec<Value> {
        vec![
            "n".into(),
            self.n.into(),
            "size".into(),
            self.size.into(),
            "format".into(),
            self.format.as_str().into(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_params(result: Result<String>) -> String {
        match result {
            Err(Error::InvalidParams(message)) => message,
            other => panic!("Expected InvalidParams, got {:?}", other),
        }
    }

    #[test]
    fn test_integer_params_order() {
        let params = IntegerRequest::new(5, -10, 10).params("key").unwrap();
        assert_eq!(
            params,
            r#"{"apiKey":"key","n":5,"min":-10,"max":10,"replacement":true}"#
        );
    }

    #[test]
    fn test_integer_guards() {
        assert_eq!(
            invalid_params(IntegerRequest::new(0, 1, 6).params("key")),
            "n must be within 1 and 10000"
        );
        assert_eq!(
            invalid_params(IntegerRequest::new(10_001, 1, 6).params("key")),
            "n must be within 1 and 10000"
        );
        assert_eq!(
            invalid_params(IntegerRequest::new(1, -1_000_000_001, 6).params("key")),
            "min must be within -1000000000 and 1000000000"
        );
        assert!(IntegerRequest::new(10_000, -INTEGER_RANGE, INTEGER_RANGE)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_signed_flag_selects_method() {
        let request = UuidRequest::new(3);
        assert_eq!(request.method(), "generateUUIDs");
        assert_eq!(request.kind(), DataKind::Uuid);

        let request = request.signed(true).id(9);
        assert_eq!(request.method(), "generateSignedUUIDs");
        assert!(request.kind().is_signed());
        assert_eq!(request.request_id(), Some(9));
    }

    #[test]
    fn test_decimal_guards() {
        assert!(DecimalFractionRequest::new(10, 20).validate().is_ok());
        assert_eq!(
            invalid_params(DecimalFractionRequest::new(10, 21).params("key")),
            "decimalPlaces must be within 1 and 20"
        );
        assert_eq!(
            DecimalFractionRequest::new(2, 4).replacement(false).params("key").unwrap(),
            r#"{"apiKey":"key","n":2,"decimalPlaces":4,"replacement":false}"#
        );
    }

    #[test]
    fn test_gaussian_params_and_guards() {
        assert_eq!(
            GaussianRequest::new(4, 0.0, 1.5, 8).params("key").unwrap(),
            r#"{"apiKey":"key","n":4,"mean":0.0,"standardDeviation":1.5,"significantDigits":8}"#
        );
        assert!(GaussianRequest::new(4, 2e6, 1.0, 8).validate().is_err());
        assert!(GaussianRequest::new(4, 0.0, f64::NAN, 8).validate().is_err());
        assert_eq!(
            invalid_params(GaussianRequest::new(4, 0.0, 1.0, 1).params("key")),
            "significantDigits must be within 2 and 20"
        );
    }

    #[test]
    fn test_string_defaults_and_guards() {
        let request = StringRequest::new(2, 8);
        assert_eq!(request.characters, DEFAULT_CHARACTERS);
        assert!(request.validate().is_ok());

        assert!(StringRequest::new(2, 21).validate().is_err());
        assert!(StringRequest::new(2, 8).characters("").validate().is_err());
        assert!(StringRequest::new(2, 8).characters("x".repeat(81)).validate().is_err());
        assert!(StringRequest::new(2, 8).characters("ab\"c").validate().is_err());
        assert!(StringRequest::new(2, 8).characters("ab\\c").validate().is_err());

        assert_eq!(
            StringRequest::new(1, 4).characters("01").params("key").unwrap(),
            r#"{"apiKey":"key","n":1,"length":4,"characters":"01","replacement":true}"#
        );
    }

    #[test]
    fn test_text_that_breaks_the_params_object_is_rejected() {
        assert_eq!(
            invalid_params(StringRequest::new(1, 4).characters("{}ab").params("key")),
            "characters must not contain '{', '\"' or '\\'"
        );
        assert!(StringRequest::new(1, 4).characters("ab{").validate().is_err());

        for key in ["{key", "ke\"y", "key\\"] {
            assert_eq!(
                invalid_params(UuidRequest::new(1).params(key)),
                "apiKey must not start with '{' or contain '\"' or '\\'"
            );
        }

        // A '{' past the first character is written as a plain string
        let params = UuidRequest::new(1).params("k{ey}").unwrap();
        assert_eq!(params, r#"{"apiKey":"k{ey}","n":1}"#);
        let oracle: serde_json::Value = serde_json::from_str(&params).unwrap();
        assert_eq!(oracle["apiKey"], "k{ey}");

        let params = StringRequest::new(1, 4).characters("a}b").params("key").unwrap();
        let oracle: serde_json::Value = serde_json::from_str(&params).unwrap();
        assert_eq!(oracle["characters"], "a}b");
    }

    #[test]
    fn test_uuid_guard() {
        assert!(UuidRequest::new(1000).validate().is_ok());
        assert_eq!(
            invalid_params(UuidRequest::new(1001).params("key")),
            "n must be within 1 and 1000"
        );
    }

    #[test]
    fn test_blob_guards() {
        assert!(BlobRequest::new(100, MAX_BLOB_SIZE).validate().is_ok());
        assert!(BlobRequest::new(101, 8).validate().is_err());
        assert!(BlobRequest::new(1, MAX_BLOB_SIZE + 8).validate().is_err());
        assert_eq!(
            invalid_params(BlobRequest::new(1, 12).params("key")),
            "size must be divisible by 8"
        );
        assert_eq!(
            BlobRequest::new(1, 128).format(BlobFormat::Hex).params("key").unwrap(),
            r#"{"apiKey":"key","n":1,"size":128,"format":"hex"}"#
        );
    }

    #[test]
    fn test_blob_format_parsing() {
        assert_eq!("hex".parse::<BlobFormat>().unwrap(), BlobFormat::Hex);
        assert_eq!("base64".parse::<BlobFormat>().unwrap(), BlobFormat::Base64);
        assert!(matches!("base32".parse::<BlobFormat>(), Err(Error::InvalidParams(_))));
    }
}
