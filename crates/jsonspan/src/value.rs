//! Dynamic JSON values.
//!
//! [`JsonValue`] represents any JSON document in memory. The mapping engine
//! uses it for extension data (unknown properties captured by a catch-all
//! member) and as an ordinary convertible type for callers that want the
//! document shape without declaring one. Object members preserve insertion
//! order.
//!
//! # Examples
//!
//! ```
//! use jsonspan::value::{JsonValue, Map};
//!
//! let mut map = Map::new();
//! map.insert("key".to_string(), JsonValue::String("value".into()));
//! let v = JsonValue::Object(map);
//! assert_eq!(v.to_string(), r#"{"key":"value"}"#);
//! ```

use indexmap::IndexMap;

use crate::{
    error::Result,
    writer::{JsonWriter, WriterOptions, WriterState},
};

/// Insertion-ordered object members.
pub type Map = IndexMap<String, JsonValue>;
/// Array elements.
pub type Array = Vec<JsonValue>;

/// A JSON number, kept in the narrowest lossless representation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Fits in `i64`.
    Int(i64),
    /// Positive and beyond `i64::MAX`.
    UInt(u64),
    /// Everything else.
    Float(f64),
}

impl Number {
    /// The value as `f64`, possibly lossy for large integers.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::UInt(v) => v as f64,
            Self::Float(v) => v,
        }
    }

    /// The value as `i64` when it is a lossless integer.
    #[must_use]
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(v),
            Self::UInt(v) => i64::try_from(v).ok(),
            Self::Float(_) => None,
        }
    }
}

/// A JSON value as defined by [RFC 8259].
///
/// [RFC 8259]: https://datatracker.ietf.org/doc/html/rfc8259
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JsonValue {
    #[default]
    Null,
    Boolean(bool),
    Number(Number),
    String(String),
    Array(Array),
    Object(Map),
}

impl From<bool> for JsonValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i64> for JsonValue {
    fn from(v: i64) -> Self {
        Self::Number(Number::Int(v))
    }
}

impl From<f64> for JsonValue {
    fn from(v: f64) -> Self {
        Self::Number(Number::Float(v))
    }
}

impl From<&str> for JsonValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for JsonValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Array> for JsonValue {
    fn from(v: Array) -> Self {
        Self::Array(v)
    }
}

impl From<Map> for JsonValue {
    fn from(v: Map) -> Self {
        Self::Object(v)
    }
}

impl JsonValue {
    /// Returns `true` if the value is [`Null`].
    ///
    /// [`Null`]: JsonValue::Null
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` if the value is an object.
    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(..))
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Self::Object(m) => Some(m),
            _ => None,
        }
    }

    /// Emits the value through a writer. Containers are walked with an
    /// explicit work stack so arbitrarily deep values cannot exhaust the
    /// host call stack (the writer's depth cap still applies).
    pub(crate) fn write_to(&self, writer: &mut JsonWriter<'_>) -> Result<()> {
        enum Step<'v> {
            Value(&'v JsonValue),
            Member(&'v str, &'v JsonValue),
            EndObject,
            EndArray,
        }

        let mut work = vec![Step::Value(self)];
        while let Some(step) = work.pop() {
            match step {
                Step::Value(JsonValue::Null) => writer.write_null()?,
                Step::Value(JsonValue::Boolean(b)) => writer.write_bool(*b)?,
                Step::Value(JsonValue::Number(Number::Int(v))) => writer.write_i64(*v)?,
                Step::Value(JsonValue::Number(Number::UInt(v))) => writer.write_u64(*v)?,
                Step::Value(JsonValue::Number(Number::Float(v))) => writer.write_f64(*v)?,
                Step::Value(JsonValue::String(s)) => writer.write_string(s)?,
                Step::Value(JsonValue::Array(items)) => {
                    writer.write_start_array()?;
                    work.push(Step::EndArray);
                    for item in items.iter().rev() {
                        work.push(Step::Value(item));
                    }
                }
                Step::Value(JsonValue::Object(members)) => {
                    writer.write_start_object()?;
                    work.push(Step::EndObject);
                    for (name, member) in members.iter().rev() {
                        work.push(Step::Member(name, member));
                    }
                }
                Step::Member(name, value) => {
                    writer.write_property_name(name)?;
                    work.push(Step::Value(value));
                }
                Step::EndObject => writer.write_end_object()?,
                Step::EndArray => writer.write_end_array()?,
            }
        }
        Ok(())
    }
}

impl core::fmt::Display for JsonValue {
    /// Formats the value as compact JSON.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut out = Vec::new();
        let mut writer = JsonWriter::new(&mut out, WriterState::new(WriterOptions::default()));
        self.write_to(&mut writer).map_err(|_| core::fmt::Error)?;
        f.write_str(core::str::from_utf8(&out).map_err(|_| core::fmt::Error)?)
    }
}

#[cfg(test)]
mod tests {
    use super::{JsonValue, Map, Number};

    #[test]
    fn display_is_compact_json() {
        let mut map = Map::new();
        map.insert("n".into(), JsonValue::Number(Number::Int(-3)));
        map.insert(
            "items".into(),
            JsonValue::Array(vec![JsonValue::Null, JsonValue::Boolean(true)]),
        );
        let v = JsonValue::Object(map);
        assert_eq!(v.to_string(), r#"{"n":-3,"items":[null,true]}"#);
    }

    #[test]
    fn member_order_is_preserved() {
        let mut map = Map::new();
        for key in ["zeta", "alpha", "mid"] {
            map.insert(key.into(), JsonValue::Null);
        }
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn number_accessors() {
        assert_eq!(Number::Int(-5).as_i64(), Some(-5));
        assert_eq!(Number::UInt(u64::MAX).as_i64(), None);
        assert!((Number::Float(0.5).as_f64() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn deep_value_writes_within_depth_cap() {
        let mut v = JsonValue::Null;
        for _ in 0..60 {
            v = JsonValue::Array(vec![v]);
        }
        let text = v.to_string();
        assert!(text.starts_with("[[[["));
        assert!(text.ends_with("]]]]"));
    }
}
