//! Pattern-safe configuration codec
//!
//! Plugin configuration crosses the process boundary as JSON, and JSON has
//! no representation for compiled regular expressions. The codec models
//! cross-boundary values as an explicit tagged union: every node is either
//! a plain JSON value or a [`Pattern`]. On the wire a pattern becomes
//! `{"__regexp": true, "pattern": "...", "flags": "..."}`; decoding
//! recognizes the tag and reconstructs an equivalent pattern. All other
//! values pass through JSON unchanged. This is the only custom type the
//! protocol supports.

use std::collections::BTreeMap;
use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Wire tag marking an encoded pattern object.
pub const REGEXP_TAG: &str = "__regexp";

const PATTERN_FIELD: &str = "pattern";
const FLAGS_FIELD: &str = "flags";

/// Errors raised when compiling a transported pattern.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("unsupported pattern flag `{flag}` in `{flags}`")]
    UnsupportedFlag { flag: char, flags: String },
}

/// A regular expression in transportable form: source text plus
/// JavaScript-style flags.
///
/// The pair is preserved byte-for-byte across encode/decode so round-trips
/// are symmetric. [`Pattern::compile`] maps the flags that have a
/// [`regex`] equivalent (`i`, `m`, `s`, `x`) onto builder options; the
/// flags `g`, `u` and `y` carry no meaning for a compiled Rust regex
/// (global matching is call-site behavior here) and are kept only for
/// round-trip fidelity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub source: String,
    pub flags: String,
}

impl Pattern {
    pub fn new(source: impl Into<String>, flags: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            flags: flags.into(),
        }
    }

    /// Compile into a [`Regex`] with equivalent match behavior.
    pub fn compile(&self) -> Result<Regex, PatternError> {
        let mut builder = RegexBuilder::new(&self.source);
        for flag in self.flags.chars() {
            match flag {
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'x' => {
                    builder.ignore_whitespace(true);
                }
                'g' | 'u' | 'y' => {}
                other => {
                    return Err(PatternError::UnsupportedFlag {
                        flag: other,
                        flags: self.flags.clone(),
                    });
                }
            }
        }
        builder.build().map_err(|e| PatternError::InvalidPattern {
            pattern: self.source.clone(),
            message: e.to_string(),
        })
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

/// A configuration value that may carry patterns anywhere in its tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConfigValue {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Pattern(Pattern),
    Array(Vec<ConfigValue>),
    Object(BTreeMap<String, ConfigValue>),
}

impl ConfigValue {
    /// Decode a wire-format JSON value, reconstructing tagged patterns.
    pub fn from_wire(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from_wire).collect()),
            Value::Object(map) => match decode_pattern(&map) {
                Some(pattern) => Self::Pattern(pattern),
                None => Self::Object(
                    map.into_iter()
                        .map(|(k, v)| (k, Self::from_wire(v)))
                        .collect(),
                ),
            },
        }
    }

    /// Encode into wire-format JSON, tagging patterns.
    pub fn to_wire(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
            Self::Pattern(p) => {
                let mut map = Map::new();
                map.insert(REGEXP_TAG.to_string(), Value::Bool(true));
                map.insert(PATTERN_FIELD.to_string(), Value::String(p.source.clone()));
                map.insert(FLAGS_FIELD.to_string(), Value::String(p.flags.clone()));
                Value::Object(map)
            }
            Self::Array(items) => Value::Array(items.iter().map(Self::to_wire).collect()),
            Self::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_wire()))
                    .collect(),
            ),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Field lookup on object values.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        match self {
            Self::Object(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    pub fn as_pattern(&self) -> Option<&Pattern> {
        match self {
            Self::Pattern(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ConfigValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }
}

/// Recognize the `{__regexp: true, pattern, flags}` shape.
fn decode_pattern(map: &Map<String, Value>) -> Option<Pattern> {
    if map.get(REGEXP_TAG) != Some(&Value::Bool(true)) {
        return None;
    }
    let source = map.get(PATTERN_FIELD)?.as_str()?;
    let flags = map
        .get(FLAGS_FIELD)
        .and_then(Value::as_str)
        .unwrap_or_default();
    Some(Pattern::new(source, flags))
}

impl Serialize for ConfigValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ConfigValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer).map_err(D::Error::custom)?;
        Ok(Self::from_wire(value))
    }
}
