//! Typed responses and the reply classifier
//!
//! A decoded reply is a dynamic [`Value`]. [`classify`] turns it into a
//! [`Response`] tagged with a [`DataKind`], extracting the shared quota
//! fields and converting the `random.data` array for the requested kind.
//!
//! # Classification
//!
//! ```text
//! top-level "error"             -> Error response (code, message)
//! "result" missing / not object -> Error response, code -1
//! Usage kind                    -> Usage record built from "result"
//! "random" missing              -> Error response, code -1
//! otherwise                     -> data converted per kind
//! ```
//!
//! Fields that are present but have the wrong shape fail with
//! `Error::Decode`; nothing falls back to a default value.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use randrpc_core::{Error, Result, RpcErrorData, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Error code used when a reply cannot be classified
pub const DECODE_FAILURE_CODE: i32 = -1;

/// What a response carries
///
/// Odd discriminants are the signed counterparts of the even kind before them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataKind {
    Integer = 0,
    SignedInteger = 1,
    String = 2,
    SignedString = 3,
    Decimal = 4,
    SignedDecimal = 5,
    Gaussian = 6,
    SignedGaussian = 7,
    Uuid = 8,
    SignedUuid = 9,
    Blob = 10,
    SignedBlob = 11,
    Usage = 12,
    Error = 14,
}

impl DataKind {
    pub fn is_signed(self) -> bool {
        self as u8 % 2 == 1 && self as u8 <= DataKind::SignedBlob as u8
    }

    /// The signed or unsigned variant of a generation kind
    ///
    /// Usage and Error have no signed form and are returned unchanged.
    pub fn with_signature(self, signed: bool) -> Self {
        match (self, signed) {
            (Self::Integer | Self::SignedInteger, false) => Self::Integer,
            (Self::Integer | Self::SignedInteger, true) => Self::SignedInteger,
            (Self::String | Self::SignedString, false) => Self::String,
            (Self::String | Self::SignedString, true) => Self::SignedString,
            (Self::Decimal | Self::SignedDecimal, false) => Self::Decimal,
            (Self::Decimal | Self::SignedDecimal, true) => Self::SignedDecimal,
            (Self::Gaussian | Self::SignedGaussian, false) => Self::Gaussian,
            (Self::Gaussian | Self::SignedGaussian, true) => Self::SignedGaussian,
            (Self::Uuid | Self::SignedUuid, false) => Self::Uuid,
            (Self::Uuid | Self::SignedUuid, true) => Self::SignedUuid,
            (Self::Blob | Self::SignedBlob, false) => Self::Blob,
            (Self::Blob | Self::SignedBlob, true) => Self::SignedBlob,
            (other, _) => other,
        }
    }

    /// JSON-RPC method that produces this kind, if any
    pub fn method(self) -> Option<&'static str> {
        match self {
            Self::Integer => Some("generateIntegers"),
            Self::SignedInteger => Some("generateSignedIntegers"),
            Self::String => Some("generateStrings"),
            Self::SignedString => Some("generateSignedStrings"),
            Self::Decimal => Some("generateDecimalFractions"),
            Self::SignedDecimal => Some("generateSignedDecimalFractions"),
            Self::Gaussian => Some("generateGaussians"),
            Self::SignedGaussian => Some("generateSignedGaussians"),
            Self::Uuid => Some("generateUUIDs"),
            Self::SignedUuid => Some("generateSignedUUIDs"),
            Self::Blob => Some("generateBlobs"),
            Self::SignedBlob => Some("generateSignedBlobs"),
            Self::Usage => Some("getUsage"),
            Self::Error => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Integer => "Integer",
            Self::SignedInteger => "SignedInteger",
            Self::String => "String",
            Self::SignedString => "SignedString",
            Self::Decimal => "Decimal",
            Self::SignedDecimal => "SignedDecimal",
            Self::Gaussian => "Gaussian",
            Self::SignedGaussian => "SignedGaussian",
            Self::Uuid => "Uuid",
            Self::SignedUuid => "SignedUuid",
            Self::Blob => "Blob",
            Self::SignedBlob => "SignedBlob",
            Self::Usage => "Usage",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// State of an API key as reported by `getUsage`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageStatus {
    Running,
    Paused,
    Stopped,
}

impl FromStr for UsageStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "running" => Ok(UsageStatus::Running),
            "paused" => Ok(UsageStatus::Paused),
            "stopped" => Ok(UsageStatus::Stopped),
            other => Err(Error::Decode(format!("Unknown usage status {:?}", other))),
        }
    }
}

/// Usage record of an API key
#[derive(Debug, Clone, PartialEq)]
pub struct Usage {
    pub status: UsageStatus,
    pub creation_time: DateTime<Utc>,
    /// Cumulative bits used since creation
    pub total_bits: i64,
    /// Cumulative requests since creation
    pub total_requests: i64,
}

/// Converted payload; exactly one per response
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Integers(Vec<i32>),
    /// Strings and blobs
    Strings(Vec<String>),
    /// Decimal fractions and gaussians
    Doubles(Vec<f64>),
    Uuids(Vec<Uuid>),
    Usage(Usage),
    Error(RpcErrorData),
}

/// A classified reply
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    kind: DataKind,
    id: Option<i32>,
    bits_used: i64,
    bits_left: i64,
    requests_left: i64,
    advisory_delay: i64,
    completion_time: Option<DateTime<Utc>>,
    payload: Payload,
    result: Option<Value>,
}

impl Response {
    fn from_error(id: Option<i32>, error: RpcErrorData) -> Self {
        Self {
            kind: DataKind::Error,
            id,
            bits_used: 0,
            bits_left: 0,
            requests_left: 0,
            advisory_delay: 0,
            completion_time: None,
            payload: Payload::Error(error),
            result: None,
        }
    }

    pub fn kind(&self) -> DataKind {
        self.kind
    }

    /// The id echoed by the server
    pub fn id(&self) -> Option<i32> {
        self.id
    }

    pub fn bits_used(&self) -> i64 {
        self.bits_used
    }

    pub fn bits_left(&self) -> i64 {
        self.bits_left
    }

    pub fn requests_left(&self) -> i64 {
        self.requests_left
    }

    /// Advised delay in milliseconds, as reported
    pub fn advisory_delay(&self) -> i64 {
        self.advisory_delay
    }

    pub fn completion_time(&self) -> Option<DateTime<Utc>> {
        self.completion_time
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn is_signed(&self) -> bool {
        self.kind.is_signed()
    }

    pub fn has_error(&self) -> bool {
        self.kind == DataKind::Error
    }

    fn mismatch(&self, requested: &'static str) -> Error {
        Error::KindMismatch {
            requested,
            actual: self.kind.name(),
        }
    }

    pub fn integers(&self) -> Result<&[i32]> {
        match (&self.payload, self.kind) {
            (Payload::Integers(data), DataKind::Integer | DataKind::SignedInteger) => Ok(data),
            _ => Err(self.mismatch("Integer")),
        }
    }

    pub fn strings(&self) -> Result<&[String]> {
        match (&self.payload, self.kind) {
            (Payload::Strings(data), DataKind::String | DataKind::SignedString) => Ok(data),
            _ => Err(self.mismatch("String")),
        }
    }

    /// Blobs in the format they were requested in
    pub fn blobs(&self) -> Result<&[String]> {
        match (&self.payload, self.kind) {
            (Payload::Strings(data), DataKind::Blob | DataKind::SignedBlob) => Ok(data),
            _ => Err(self.mismatch("Blob")),
        }
    }

    pub fn decimals(&self) -> Result<&[f64]> {
        match (&self.payload, self.kind) {
            (Payload::Doubles(data), DataKind::Decimal | DataKind::SignedDecimal) => Ok(data),
            _ => Err(self.mismatch("Decimal")),
        }
    }

    pub fn gaussians(&self) -> Result<&[f64]> {
        match (&self.payload, self.kind) {
            (Payload::Doubles(data), DataKind::Gaussian | DataKind::SignedGaussian) => Ok(data),
            _ => Err(self.mismatch("Gaussian")),
        }
    }

    pub fn uuids(&self) -> Result<&[Uuid]> {
        match &self.payload {
            Payload::Uuids(data) => Ok(data),
            _ => Err(self.mismatch("Uuid")),
        }
    }

    pub fn usage(&self) -> Result<&Usage> {
        match &self.payload {
            Payload::Usage(usage) => Ok(usage),
            _ => Err(self.mismatch("Usage")),
        }
    }

    pub fn error(&self) -> Result<&RpcErrorData> {
        match &self.payload {
            Payload::Error(error) => Ok(error),
            _ => Err(self.mismatch("Error")),
        }
    }

    /// The raw `result` object of a successful reply
    pub fn result_object(&self) -> Result<&Value> {
        self.result.as_ref().ok_or_else(|| self.mismatch("result"))
    }

    /// The `random` object, as needed for signature verification
    pub fn random_object(&self) -> Result<&Value> {
        self.result_object()?
            .get("random")
            .ok_or_else(|| Error::Decode(format!("{} response has no random object", self.kind)))
    }

    /// Base64 signature of the `random` object
    pub fn signature(&self) -> Result<&str> {
        if !self.is_signed() {
            return Err(self.mismatch("signature"));
        }
        match self.result_object()?.get("signature") {
            Some(signature) => signature
                .expect_str()
                .map_err(|e| Error::Decode(format!("signature: {}", e))),
            None => Err(Error::Decode("Signed response has no signature".to_string())),
        }
    }
}

/// The top-level `error` object of a reply, if there is one
pub fn rpc_error(raw: &Value) -> Result<Option<RpcErrorData>> {
    let Some(error) = raw.get("error") else {
        return Ok(None);
    };
    let code = field(error, "error", "code")?
        .cast::<i32>()
        .map_err(decode("error.code"))?;
    let message = field(error, "error", "message")?
        .expect_str()
        .map_err(decode("error.message"))?;
    Ok(Some(RpcErrorData::new(code, message)))
}

/// Convert a decoded reply into a typed response of the expected kind
pub fn classify(raw: &Value, expected: DataKind) -> Result<Response> {
    let id = raw.get("id").and_then(|id| id.cast::<i32>().ok());

    if let Some(error) = rpc_error(raw)? {
        return Ok(Response::from_error(id, error));
    }

    let result = match raw.get("result") {
        Some(result @ Value::Object(_)) => result,
        _ => {
            return Ok(Response::from_error(
                id,
                RpcErrorData::new(DECODE_FAILURE_CODE, "Reply has no result object"),
            ))
        }
    };

    let bits_left = long_field(result, "bitsLeft")?;
    let requests_left = long_field(result, "requestsLeft")?;

    if expected == DataKind::Usage {
        let usage = Usage {
            status: field(result, "result", "status")?
                .expect_str()
                .map_err(decode("status"))?
                .parse()?,
            creation_time: parse_timestamp(
                field(result, "result", "creationTime")?
                    .expect_str()
                    .map_err(decode("creationTime"))?,
            )?,
            total_bits: long_field(result, "totalBits")?,
            total_requests: long_field(result, "totalRequests")?,
        };
        return Ok(Response {
            kind: DataKind::Usage,
            id,
            bits_used: 0,
            bits_left,
            requests_left,
            advisory_delay: 0,
            completion_time: None,
            payload: Payload::Usage(usage),
            result: Some(result.clone()),
        });
    }

    let advisory_delay = long_field(result, "advisoryDelay")?;
    let bits_used = long_field(result, "bitsUsed")?;

    let random = match result.get("random") {
        Some(random @ Value::Object(_)) => random,
        _ => {
            return Ok(Response::from_error(
                id,
                RpcErrorData::new(DECODE_FAILURE_CODE, "Reply has no random object"),
            ))
        }
    };

    let completion_time = parse_timestamp(
        field(random, "random", "completionTime")?
            .expect_str()
            .map_err(decode("completionTime"))?,
    )?;
    let data = field(random, "random", "data")?
        .expect_array()
        .map_err(decode("data"))?;

    let payload = convert_data(data, expected)?;

    Ok(Response {
        kind: expected,
        id,
        bits_used,
        bits_left,
        requests_left,
        advisory_delay,
        completion_time: Some(completion_time),
        payload,
        result: Some(result.clone()),
    })
}

fn convert_data(data: &[Value], kind: DataKind) -> Result<Payload> {
    let payload = match kind {
        DataKind::Integer | DataKind::SignedInteger => Payload::Integers(convert_each(data, |v| v.cast::<i32>())?),
        DataKind::String | DataKind::SignedString | DataKind::Blob | DataKind::SignedBlob => {
            Payload::Strings(convert_each(data, |v| v.expect_str().map(str::to_string))?)
        }
        DataKind::Decimal
        | DataKind::SignedDecimal
        | DataKind::Gaussian
        | DataKind::SignedGaussian => {
            Payload::Doubles(convert_each(data, |v| v.cast::<f64>())?)
        }
        DataKind::Uuid | DataKind::SignedUuid => Payload::Uuids(convert_each(data, |v| {
            let text = v.expect_str()?;
            Uuid::parse_str(text).map_err(|e| Error::Decode(e.to_string()))
        })?),
        DataKind::Usage | DataKind::Error => {
            return Err(Error::Decode(format!("{} replies carry no data array", kind)))
        }
    };
    Ok(payload)
}

fn convert_each<T>(data: &[Value], convert: impl Fn(&Value) -> Result<T>) -> Result<Vec<T>> {
    data.iter()
        .enumerate()
        .map(|(index, value)| {
            convert(value).map_err(|e| Error::Decode(format!("data[{}]: {}", index, e)))
        })
        .collect()
}

fn field<'a>(object: &'a Value, context: &str, key: &str) -> Result<&'a Value> {
    object
        .get(key)
        .ok_or_else(|| Error::Decode(format!("{} is missing {:?}", context, key)))
}

fn long_field(result: &Value, key: &'static str) -> Result<i64> {
    field(result, "result", key)?.cast::<i64>().map_err(decode(key))
}

fn decode(name: &'static str) -> impl Fn(Error) -> Error {
    move |e| Error::Decode(format!("{}: {}", name, e))
}

/// Parse a service timestamp such as `2011-10-10 14:48:20Z`
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return Ok(time.with_timezone(&Utc));
    }
    let trimmed = text.trim_end_matches(['Z', 'z']);
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| Error::Decode(format!("Invalid timestamp {:?}", text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use randrpc_core::codec;

    fn reply(text: &str) -> Value {
        codec::parse(text).unwrap()
    }

    const INTEGERS: &str = r#"{"jsonrpc":"2.0","result":{"random":{"data":[1,5,3],"completionTime":"2011-10-10 13:19:12Z"},"bitsUsed":16,"bitsLeft":199984,"requestsLeft":9999,"advisoryDelay":200},"id":7}"#;

    #[test]
    fn test_data_kind_discriminants() {
        assert_eq!(DataKind::Integer as u8, 0);
        assert_eq!(DataKind::SignedBlob as u8, 11);
        assert_eq!(DataKind::Usage as u8, 12);
        assert_eq!(DataKind::Error as u8, 14);

        assert!(DataKind::SignedUuid.is_signed());
        assert!(!DataKind::Uuid.is_signed());
        assert!(!DataKind::Usage.is_signed());
        assert!(!DataKind::Error.is_signed());
    }

    #[test]
    fn test_data_kind_signature_toggle() {
        assert_eq!(DataKind::Integer.with_signature(true), DataKind::SignedInteger);
        assert_eq!(DataKind::SignedBlob.with_signature(false), DataKind::Blob);
        assert_eq!(DataKind::Usage.with_signature(true), DataKind::Usage);
        assert_eq!(
            DataKind::Decimal.with_signature(true).method(),
            Some("generateSignedDecimalFractions")
        );
        assert_eq!(DataKind::Uuid.method(), Some("generateUUIDs"));
        assert_eq!(DataKind::Error.method(), None);
    }

    #[test]
    fn test_classify_integers() {
        let response = classify(&reply(INTEGERS), DataKind::Integer).unwrap();

        assert_eq!(response.kind(), DataKind::Integer);
        assert_eq!(response.integers().unwrap(), &[1, 5, 3]);
        assert_eq!(response.id(), Some(7));
        assert_eq!(response.bits_used(), 16);
        assert_eq!(response.bits_left(), 199984);
        assert_eq!(response.requests_left(), 9999);
        assert_eq!(response.advisory_delay(), 200);
        assert!(!response.has_error());

        let completed = response.completion_time().unwrap();
        assert_eq!((completed.year(), completed.month(), completed.day()), (2011, 10, 10));
        assert_eq!((completed.hour(), completed.minute(), completed.second()), (13, 19, 12));
    }

    #[test]
    fn test_mismatched_accessor_fails() {
        let response = classify(&reply(INTEGERS), DataKind::Integer).unwrap();

        assert!(matches!(
            response.strings(),
            Err(Error::KindMismatch { requested: "String", actual: "Integer" })
        ));
        assert!(response.usage().is_err());
        assert!(response.error().is_err());
        assert!(response.signature().is_err());
    }

    #[test]
    fn test_error_reply_wins_over_kind() {
        let raw = reply(r#"{"jsonrpc":"2.0","error":{"code":401,"message":"Key not running"},"id":3}"#);
        let response = classify(&raw, DataKind::Uuid).unwrap();

        assert!(response.has_error());
        assert_eq!(response.kind(), DataKind::Error);
        assert_eq!(response.error().unwrap(), &RpcErrorData::new(401, "Key not running"));
        assert_eq!(response.id(), Some(3));
        assert!(response.uuids().is_err());
    }

    #[test]
    fn test_missing_result_degrades_to_error() {
        let response = classify(&reply(r#"{"jsonrpc":"2.0","id":1}"#), DataKind::Integer).unwrap();
        assert_eq!(response.error().unwrap().code, DECODE_FAILURE_CODE);

        let response = classify(&reply(r#"{"result":[1,2],"id":1}"#), DataKind::Integer).unwrap();
        assert_eq!(response.error().unwrap().code, DECODE_FAILURE_CODE);
    }

    #[test]
    fn test_missing_random_degrades_to_error() {
        let raw = reply(r#"{"result":{"bitsUsed":1,"bitsLeft":2,"requestsLeft":3,"advisoryDelay":0},"id":1}"#);
        let response = classify(&raw, DataKind::String).unwrap();

        assert!(response.has_error());
        assert_eq!(response.error().unwrap().code, DECODE_FAILURE_CODE);
    }

    #[test]
    fn test_non_numeric_data_is_a_decode_error() {
        let raw = reply(r#"{"result":{"random":{"data":[1,"two"],"completionTime":"2011-10-10 13:19:12Z"},"bitsUsed":1,"bitsLeft":2,"requestsLeft":3,"advisoryDelay":0},"id":1}"#);

        match classify(&raw, DataKind::Integer) {
            Err(Error::Decode(message)) => assert!(message.starts_with("data[1]")),
            other => panic!("Expected Decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_quota_field_is_a_decode_error() {
        let raw = reply(r#"{"result":{"requestsLeft":3},"id":1}"#);
        assert!(matches!(classify(&raw, DataKind::Usage), Err(Error::Decode(_))));
    }

    #[test]
    fn test_classify_decimals_accepts_integral_values() {
        let raw = reply(r#"{"result":{"random":{"data":[0.25,1,0.5e-1],"completionTime":"2014-05-19 08:32:45Z"},"bitsUsed":30,"bitsLeft":2,"requestsLeft":3,"advisoryDelay":0},"id":1}"#);
        let response = classify(&raw, DataKind::Decimal).unwrap();

        assert_eq!(response.decimals().unwrap(), &[0.25, 1.0, 0.05]);
        assert!(response.gaussians().is_err());
    }

    #[test]
    fn test_classify_uuids() {
        let raw = reply(r#"{"result":{"random":{"data":["47849fd4-b790-4f81-a5a6-dd4a1f8c4ddd"],"completionTime":"2014-05-19 08:32:45Z"},"bitsUsed":122,"bitsLeft":2,"requestsLeft":3,"advisoryDelay":0},"id":1}"#);
        let response = classify(&raw, DataKind::Uuid).unwrap();

        assert_eq!(
            response.uuids().unwrap(),
            &[Uuid::parse_str("47849fd4-b790-4f81-a5a6-dd4a1f8c4ddd").unwrap()]
        );

        let bad = reply(r#"{"result":{"random":{"data":["not-a-uuid"],"completionTime":"2014-05-19 08:32:45Z"},"bitsUsed":122,"bitsLeft":2,"requestsLeft":3,"advisoryDelay":0},"id":1}"#);
        assert!(matches!(classify(&bad, DataKind::Uuid), Err(Error::Decode(_))));
    }

    #[test]
    fn test_classify_signed_blobs() {
        let raw = reply(r#"{"result":{"random":{"method":"generateSignedBlobs","data":["aNB8L3hY3kWYXgTUUkWJcg=="],"completionTime":"2014-05-19 08:32:45Z","serialNumber":12},"signature":"c2lnbmF0dXJl","bitsUsed":128,"bitsLeft":2,"requestsLeft":3,"advisoryDelay":0},"id":1}"#);
        let response = classify(&raw, DataKind::SignedBlob).unwrap();

        assert!(response.is_signed());
        assert_eq!(response.blobs().unwrap(), &["aNB8L3hY3kWYXgTUUkWJcg==".to_string()]);
        assert_eq!(response.signature().unwrap(), "c2lnbmF0dXJl");
        assert_eq!(
            response.random_object().unwrap().get("serialNumber"),
            Some(&Value::Integer(12))
        );
        assert!(response.strings().is_err());
    }

    #[test]
    fn test_classify_usage() {
        let raw = reply(r#"{"jsonrpc":"2.0","result":{"status":"paused","creationTime":"2013-02-01 17:53:40Z","bitsLeft":998532,"requestsLeft":199996,"totalBits":1646421,"totalRequests":65036},"id":15998}"#);
        let response = classify(&raw, DataKind::Usage).unwrap();
        let usage = response.usage().unwrap();

        assert_eq!(usage.status, UsageStatus::Paused);
        assert_eq!(usage.total_bits, 1646421);
        assert_eq!(usage.total_requests, 65036);
        assert_eq!(usage.creation_time.year(), 2013);
        assert_eq!(response.bits_left(), 998532);
        assert_eq!(response.requests_left(), 199996);
        assert!(response.completion_time().is_none());
        assert!(response.random_object().is_err());
    }

    #[test]
    fn test_unknown_usage_status_fails() {
        let raw = reply(r#"{"result":{"status":"suspended","creationTime":"2013-02-01 17:53:40Z","bitsLeft":1,"requestsLeft":1,"totalBits":1,"totalRequests":1},"id":1}"#);
        assert!(matches!(classify(&raw, DataKind::Usage), Err(Error::Decode(_))));
    }

    #[test]
    fn test_timestamp_formats() {
        let space = parse_timestamp("2011-10-10 13:19:12Z").unwrap();
        let iso = parse_timestamp("2011-10-10T13:19:12Z").unwrap();
        let fraction = parse_timestamp("2011-10-10 13:19:12.5").unwrap();

        assert_eq!(space, iso);
        assert_eq!(fraction.timestamp_millis() - space.timestamp_millis(), 500);
        assert!(parse_timestamp("yesterday").is_err());
    }
}
