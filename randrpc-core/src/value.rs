//! Dynamic JSON value model
//!
//! [`Value`] is the tagged union every parsed reply and every outgoing
//! parameter object passes through. Exactly one variant is active at a time
//! and nothing converts between variants implicitly: the `as_*` accessors
//! return `None` unless the variant matches, and [`Value::cast`] performs an
//! explicit, fallible conversion (for example an `Integer` widened to `i64`).
//!
//! # Numbers
//!
//! Numbers are kept in the narrowest of three variants: `Integer` (fits
//! `i32`), `Long` (fits `i64` but not `i32`) and `Double`. The `From`
//! conversions for integer types normalize into that order so that a value
//! built in code compares equal to the value parsed back from its text.
//!
//! # Examples
//!
//! ```rust
//! use randrpc_core::{Map, Value};
//!
//! let mut map = Map::new();
//! map.insert("n", Value::from(6));
//! map.insert("big", Value::from(9_999_999_999i64));
//! let value = Value::Object(map);
//!
//! assert_eq!(value.get("n").and_then(Value::as_integer), Some(6));
//! assert_eq!(value.get("big").map(Value::kind_name), Some("Long"));
//! assert_eq!(value.get("n").unwrap().cast::<f64>().unwrap(), 6.0);
//! ```

use crate::error::{Error, Result};

/// A parsed or to-be-serialized JSON document
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// String-keyed mapping, insertion order preserved
    Object(Map),
    /// Ordered sequence of values
    Array(Vec<Value>),
    /// Raw string contents (no escape decoding)
    String(String),
    /// Number that fits a signed 32-bit integer
    Integer(i32),
    /// Number that fits a signed 64-bit integer but not 32 bits
    ///
    /// Only meaningful outside the i32 range: the parser and `Value::from(i64)`
    /// never produce `Long` for a value that fits `Integer`. A hand-built
    /// `Long(5)` serializes as `5` and parses back as `Integer(5)`, so build
    /// 64-bit values through `From<i64>`.
    Long(i64),
    /// Any other finite number
    Double(f64),
    /// `true` or `false`
    Boolean(bool),
    /// `null`
    Null,
}

impl Value {
    /// Name of the active variant, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Object(_) => "Object",
            Value::Array(_) => "Array",
            Value::String(_) => "String",
            Value::Integer(_) => "Integer",
            Value::Long(_) => "Long",
            Value::Double(_) => "Double",
            Value::Boolean(_) => "Boolean",
            Value::Null => "Null",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Look up a key if this value is an object
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Object accessor that fails loudly on mismatch
    pub fn expect_object(&self) -> Result<&Map> {
        self.as_object().ok_or(Error::Cast {
            expected: "Object",
            found: self.kind_name(),
        })
    }

    /// Array accessor that fails loudly on mismatch
    pub fn expect_array(&self) -> Result<&[Value]> {
        self.as_array().ok_or(Error::Cast {
            expected: "Array",
            found: self.kind_name(),
        })
    }

    /// String accessor that fails loudly on mismatch
    pub fn expect_str(&self) -> Result<&str> {
        self.as_str().ok_or(Error::Cast {
            expected: "String",
            found: self.kind_name(),
        })
    }

    /// Explicit conversion into a Rust type
    ///
    /// See [`FromValue`] for which variants each target accepts.
    pub fn cast<T: FromValue>(&self) -> Result<T> {
        T::from_value(self)
    }
}

/// Explicit, fallible conversion out of a [`Value`]
///
/// Numeric targets accept every variant that converts without loss:
///
/// | target   | accepted variants                              |
/// |----------|------------------------------------------------|
/// | `i32`    | `Integer`, `Long` within the i32 range         |
/// | `i64`    | `Integer`, `Long`                              |
/// | `f64`    | `Integer`, `Long`, `Double`                    |
/// | `bool`   | `Boolean`                                      |
/// | `String` | `String`                                       |
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Integer(n) => Ok(*n),
            Value::Long(n) => i32::try_from(*n).map_err(|_| Error::Cast {
                expected: "i32",
                found: "Long outside the i32 range",
            }),
            other => Err(Error::Cast {
                expected: "i32",
                found: other.kind_name(),
            }),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Integer(n) => Ok(i64::from(*n)),
            Value::Long(n) => Ok(*n),
            other => Err(Error::Cast {
                expected: "i64",
                found: other.kind_name(),
            }),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Integer(n) => Ok(f64::from(*n)),
            Value::Long(n) => Ok(*n as f64),
            Value::Double(n) => Ok(*n),
            other => Err(Error::Cast {
                expected: "f64",
                found: other.kind_name(),
            }),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_bool().ok_or(Error::Cast {
            expected: "bool",
            found: value.kind_name(),
        })
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        value.expect_str().map(str::to_owned)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n)
    }
}

impl From<i64> for Value {
    /// Normalizes to `Integer` when the number fits 32 bits
    fn from(n: i64) -> Self {
        match i32::try_from(n) {
            Ok(small) => Value::Integer(small),
            Err(_) => Value::Long(n),
        }
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::from(i64::from(n))
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Value::Integer(i32::from(n))
    }
}

impl From<u8> for Value {
    fn from(n: u8) -> Self {
        Value::Integer(i32::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(map)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

/// Insertion-ordered string-keyed map backing [`Value::Object`]
///
/// Reply objects hold a handful of keys, so lookups are linear scans.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Map {
    entries: Vec<(String, Value)>,
}

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Insert a key, replacing (in place) and returning any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Remove a key, keeping the order of the remaining entries
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Map {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Map::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl IntoIterator for Map {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
