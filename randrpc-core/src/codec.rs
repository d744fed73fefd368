//! Self-contained JSON codec
//!
//! This module turns JSON text into a [`Value`] and back without any external
//! JSON library. It covers exactly the subset the randomness service speaks:
//! objects, arrays, strings, booleans, `null` and numbers that fit an `i32`,
//! an `i64` or a finite `f64` (tried in that order).
//!
//! # Parsing
//!
//! A single left-to-right scan over a [`Cursor`] (text plus byte index) that
//! is passed explicitly through the recursive readers, so independent
//! documents can be parsed concurrently.
//!
//! # Serialization
//!
//! [`serialize_pairs`] takes an alternating flat sequence of keys and values
//! (object mode) and [`serialize_values`] a plain sequence (array mode).
//! [`serialize`] renders any [`Value`].
//!
//! # Limitations
//!
//! - Strings are raw spans between quotes. Backslash escapes are neither
//!   decoded on input nor produced on output, so a string cannot contain `"`.
//! - A string value that begins with `{` is treated as an already-serialized
//!   object and emitted without quotes. The request envelope relies on this
//!   to embed its pre-serialized `params`; a literal string starting with `{`
//!   therefore does not survive a round trip.
//!
//! # Examples
//!
//! ```rust
//! use randrpc_core::{codec, Value};
//!
//! let value = codec::parse(r#"{"a":1,"b":[1,2,3],"c":{"d":true}}"#).unwrap();
//! assert_eq!(value.get("a"), Some(&Value::Integer(1)));
//!
//! let text = codec::serialize_pairs(&["n".into(), 6.into(), "replacement".into(), true.into()]).unwrap();
//! assert_eq!(text, r#"{"n":6,"replacement":true}"#);
//! ```

use crate::error::{Error, Result};
use crate::value::{Map, Value};

/// Deepest nesting of objects and arrays accepted by the parser
pub const MAX_DEPTH: usize = 128;

const NUMBER_TERMINATORS: [u8; 3] = [b',', b'}', b']'];

const LITERALS: [(&str, Value); 3] = [
    ("true", Value::Boolean(true)),
    ("false", Value::Boolean(false)),
    ("null", Value::Null),
];

/// Parse JSON text into a [`Value`]
///
/// The whole input must be one value surrounded by optional whitespace.
///
/// # Errors
///
/// - `UnexpectedEof` if the input ends while a token is expected
/// - `InvalidKey` if an object key is not a quoted string
/// - `UnknownToken` if a value starts with an unrecognised character
/// - `InvalidNumber` if a number token fits neither i32, i64 nor f64
/// - `Format` for any other structural violation, including nesting deeper
///   than [`MAX_DEPTH`]
pub fn parse(text: &str) -> Result<Value> {
    let mut cursor = Cursor::new(text);
    let value = cursor.read_value()?;
    cursor.skip_whitespace();
    if !cursor.at_end() {
        return Err(Error::Format {
            expected: "end of input",
            offset: cursor.pos,
        });
    }
    Ok(value)
}

/// Parse JSON from raw reply bytes
///
/// Bytes that are not valid UTF-8 are rejected as an `UnknownToken` at the
/// first invalid position.
pub fn parse_bytes(bytes: &[u8]) -> Result<Value> {
    let text = std::str::from_utf8(bytes).map_err(|e| Error::UnknownToken {
        offset: e.valid_up_to(),
    })?;
    parse(text)
}

/// Byte cursor over the text being parsed
struct Cursor<'a> {
    text: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            depth: 0,
        }
    }

    fn bytes(&self) -> &'a [u8] {
        self.text.as_bytes()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.bytes().get(self.pos) {
            if !b.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
    }

    /// Skip whitespace and return the next byte without consuming it
    fn peek_token(&mut self) -> Result<u8> {
        self.skip_whitespace();
        self.bytes()
            .get(self.pos)
            .copied()
            .ok_or(Error::UnexpectedEof { offset: self.pos })
    }

    fn read_value(&mut self) -> Result<Value> {
        match self.peek_token()? {
            b'"' => {
                self.pos += 1;
                self.read_string().map(Value::String)
            }
            b'[' => {
                self.descend()?;
                let array = self.read_array();
                self.depth -= 1;
                array
            }
            b'{' => {
                self.descend()?;
                let object = self.read_object();
                self.depth -= 1;
                object
            }
            b'0'..=b'9' | b'+' | b'-' | b'.' => self.read_number(),
            _ => self.read_literal(),
        }
    }

    /// Consume an opening bracket, one level deeper
    fn descend(&mut self) -> Result<()> {
        if self.depth >= MAX_DEPTH {
            return Err(Error::Format {
                expected: "nesting depth within limit",
                offset: self.pos,
            });
        }
        self.depth += 1;
        self.pos += 1;
        Ok(())
    }

    /// Read an object body; the opening `{` is already consumed
    fn read_object(&mut self) -> Result<Value> {
        let mut map = Map::new();

        if self.peek_token()? == b'}' {
            self.pos += 1;
            return Ok(Value::Object(map));
        }

        loop {
            let key_offset = self.pos;
            if self.peek_token()? != b'"' {
                return Err(Error::InvalidKey { offset: self.pos });
            }
            self.pos += 1;
            let key = self.read_string()?;

            if self.peek_token()? != b':' {
                return Err(Error::Format {
                    expected: "':' after object key",
                    offset: self.pos,
                });
            }
            self.pos += 1;

            let value = self.read_value()?;
            if map.contains_key(&key) {
                return Err(Error::Format {
                    expected: "unique object keys",
                    offset: key_offset,
                });
            }
            map.insert(key, value);

            match self.peek_token()? {
                b',' => self.pos += 1,
                b'}' => {
                    self.pos += 1;
                    return Ok(Value::Object(map));
                }
                _ => {
                    return Err(Error::Format {
                        expected: "',' or '}' after object member",
                        offset: self.pos,
                    })
                }
            }
        }
    }

    /// Read an array body; the opening `[` is already consumed
    fn read_array(&mut self) -> Result<Value> {
        let mut items = Vec::new();

        if self.peek_token()? == b']' {
            self.pos += 1;
            return Ok(Value::Array(items));
        }

        loop {
            items.push(self.read_value()?);
            match self.peek_token()? {
                b',' => self.pos += 1,
                b']' => {
                    self.pos += 1;
                    return Ok(Value::Array(items));
                }
                _ => {
                    return Err(Error::Format {
                        expected: "',' or ']' after array element",
                        offset: self.pos,
                    })
                }
            }
        }
    }

    /// Read up to the next `"`; the opening quote is already consumed
    fn read_string(&mut self) -> Result<String> {
        let start = self.pos;
        let len = self.bytes()[start..]
            .iter()
            .position(|&b| b == b'"')
            .ok_or(Error::UnexpectedEof {
                offset: self.text.len(),
            })?;
        self.pos = start + len + 1;
        Ok(self.text[start..start + len].to_owned())
    }

    /// Read a number bounded by the nearest `,`, `}` or `]`
    ///
    /// A top-level number has no terminator and runs to the end of input.
    fn read_number(&mut self) -> Result<Value> {
        let start = self.pos;
        let end = self.bytes()[start..]
            .iter()
            .position(|b| NUMBER_TERMINATORS.contains(b))
            .map_or(self.text.len(), |len| start + len);
        let token = self.text[start..end].trim();

        let value = if let Ok(n) = token.parse::<i32>() {
            Value::Integer(n)
        } else if let Ok(n) = token.parse::<i64>() {
            Value::Long(n)
        } else {
            match token.parse::<f64>() {
                Ok(n) if n.is_finite() => Value::Double(n),
                _ => {
                    return Err(Error::InvalidNumber {
                        token: token.to_owned(),
                        offset: start,
                    })
                }
            }
        };

        self.pos = end;
        Ok(value)
    }

    fn read_literal(&mut self) -> Result<Value> {
        let rest = &self.bytes()[self.pos..];
        for (literal, value) in LITERALS {
            if rest.starts_with(literal.as_bytes()) {
                self.pos += literal.len();
                return Ok(value);
            }
        }
        Err(Error::UnknownToken { offset: self.pos })
    }
}

/// Serialize any [`Value`] to JSON text
///
/// # Errors
///
/// `InvalidNumber` if the value contains a NaN or infinite double.
pub fn serialize(value: &Value) -> Result<String> {
    let mut out = String::new();
    write_value(&mut out, value)?;
    Ok(out)
}

/// Serialize an alternating `key, value, key, value, ...` sequence as an object
///
/// # Errors
///
/// - `KeyType` if an entry in key position is not a `Value::String`
/// - `DanglingKey` if the sequence ends on a key
pub fn serialize_pairs(entries: &[Value]) -> Result<String> {
    let mut out = String::from("{");
    for (index, pair) in entries.chunks(2).enumerate() {
        let position = index * 2;
        let key = match &pair[0] {
            Value::String(key) => key,
            other => {
                return Err(Error::KeyType {
                    position,
                    found: other.kind_name(),
                })
            }
        };
        let value = pair.get(1).ok_or(Error::DanglingKey { position })?;

        if index > 0 {
            out.push(',');
        }
        write_member(&mut out, key, value)?;
    }
    out.push('}');
    Ok(out)
}

/// Serialize a plain sequence of values as an array
pub fn serialize_values(values: &[Value]) -> Result<String> {
    let mut out = String::new();
    write_array(&mut out, values)?;
    Ok(out)
}

fn write_value(out: &mut String, value: &Value) -> Result<()> {
    match value {
        Value::Object(map) => write_object(out, map)?,
        Value::Array(items) => write_array(out, items)?,
        // Pre-serialized nested object
        Value::String(s) if s.starts_with('{') => out.push_str(s),
        Value::String(s) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
        Value::Integer(n) => out.push_str(&n.to_string()),
        Value::Long(n) => out.push_str(&n.to_string()),
        Value::Double(n) => {
            if !n.is_finite() {
                return Err(Error::InvalidNumber {
                    token: n.to_string(),
                    offset: out.len(),
                });
            }
            // Debug keeps a '.' or an exponent so the text re-parses as a double
            out.push_str(&format!("{:?}", n));
        }
        Value::Boolean(true) => out.push_str("true"),
        Value::Boolean(false) => out.push_str("false"),
        Value::Null => out.push_str("null"),
    }
    Ok(())
}

fn write_member(out: &mut String, key: &str, value: &Value) -> Result<()> {
    out.push('"');
    out.push_str(key);
    out.push_str("\":");
    write_value(out, value)
}

fn write_object(out: &mut String, map: &Map) -> Result<()> {
    out.push('{');
    for (index, (key, value)) in map.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        write_member(out, key, value)?;
    }
    out.push('}');
    Ok(())
}

fn write_array(out: &mut String, items: &[Value]) -> Result<()> {
    out.push('[');
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        write_value(out, item)?;
    }
    out.push(']');
    Ok(())
}
