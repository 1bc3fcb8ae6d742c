//! Built-in converters for scalar types and dynamic values.
//!
//! One converter per primitive, resolved by type handle through a table
//! built once per process. All of them are `Simple`: the engine guarantees
//! the value is fully buffered before they run, so they read from the
//! current token and return.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

use crate::{
    convert::{Converter, ReadOutcome},
    descriptor::TypeRef,
    engine::{read_significant, ReadStack, WriteStack},
    error::{ConversionError, Error, Result, StructuralError},
    options::SerializerOptions,
    reader::{JsonReader, TokenType},
    value::{JsonValue, Map, Number},
    writer::JsonWriter,
};

/// Looks up the built-in converter for a primitive type handle.
pub(crate) fn lookup(ty: TypeId) -> Option<Arc<dyn Converter>> {
    static TABLE: OnceLock<HashMap<TypeId, Arc<dyn Converter>>> = OnceLock::new();
    let table = TABLE.get_or_init(|| {
        let converters: Vec<Arc<dyn Converter>> = vec![
            Arc::new(BoolConverter),
            Arc::new(I32Converter),
            Arc::new(I64Converter),
            Arc::new(U32Converter),
            Arc::new(U64Converter),
            Arc::new(F32Converter),
            Arc::new(F64Converter),
            Arc::new(StringConverter),
            Arc::new(DateTimeConverter),
            Arc::new(UuidConverter),
            Arc::new(BytesConverter),
            Arc::new(JsonValueConverter),
        ];
        converters
            .into_iter()
            .map(|c| (c.converted_type().id, c))
            .collect()
    });
    table.get(&ty).cloned()
}

fn reject_null(reader: &JsonReader<'_>, target: &'static str) -> Result<()> {
    if reader.token_type() == TokenType::Null {
        Err(reader.err(ConversionError::NullForNonNullable { target }))
    } else {
        Ok(())
    }
}

macro_rules! scalar_converter {
    ($name:ident, $ty:ty, $label:literal, |$reader:ident| $read:expr, |$writer:ident, $value:ident| $write:expr) => {
        pub(crate) struct $name;

        impl Converter for $name {
            fn converted_type(&self) -> TypeRef {
                TypeRef::of::<$ty>()
            }

            fn try_read(
                &self,
                $reader: &mut JsonReader<'_>,
                _ty: TypeRef,
                _options: &SerializerOptions,
                _stack: &mut ReadStack,
            ) -> Result<ReadOutcome> {
                reject_null($reader, $label)?;
                let value: $ty = $read?;
                Ok(ReadOutcome::Complete(Box::new(value)))
            }

            fn try_write(
                &self,
                $writer: &mut JsonWriter<'_>,
                value: &dyn Any,
                _options: &SerializerOptions,
                _stack: &mut WriteStack,
            ) -> Result<bool> {
                let $value = value.downcast_ref::<$ty>().ok_or_else(|| {
                    Error::detached(crate::error::ConfigurationError::ConverterTypeMismatch {
                        converts: $label,
                        requested: "value of another type",
                    })
                })?;
                $write?;
                Ok(true)
            }
        }
    };
}

scalar_converter!(BoolConverter, bool, "bool",
    |reader| reader.try_get_bool(),
    |writer, v| writer.write_bool(*v));

scalar_converter!(I32Converter, i32, "i32",
    |reader| reader.try_get_i32(),
    |writer, v| writer.write_i64(i64::from(*v)));

scalar_converter!(I64Converter, i64, "i64",
    |reader| reader.try_get_i64(),
    |writer, v| writer.write_i64(*v));

scalar_converter!(U32Converter, u32, "u32",
    |reader| reader.try_get_u64().and_then(|wide| {
        u32::try_from(wide)
            .map_err(|_| reader.err(ConversionError::IntegerOverflow { target: "u32" }))
    }),
    |writer, v| writer.write_u64(u64::from(*v)));

scalar_converter!(U64Converter, u64, "u64",
    |reader| reader.try_get_u64(),
    |writer, v| writer.write_u64(*v));

scalar_converter!(F32Converter, f32, "f32",
    |reader| reader.try_get_f64().map(|wide| wide as f32),
    |writer, v| writer.write_f32(*v));

scalar_converter!(F64Converter, f64, "f64",
    |reader| reader.try_get_f64(),
    |writer, v| writer.write_f64(*v));

scalar_converter!(StringConverter, String, "String",
    |reader| match reader.token_type() {
        TokenType::String => reader.get_string(),
        other => Err(reader.err(ConversionError::TokenMismatch {
            token: other,
            target: "String",
        })),
    },
    |writer, v| writer.write_string(v));

scalar_converter!(DateTimeConverter, DateTime<FixedOffset>, "DateTime",
    |reader| reader.try_get_datetime(),
    |writer, v| writer.write_datetime(v));

scalar_converter!(UuidConverter, Uuid, "Uuid",
    |reader| reader.try_get_uuid(),
    |writer, v| writer.write_uuid(*v));

scalar_converter!(BytesConverter, Vec<u8>, "Vec<u8>",
    |reader| reader.try_get_base64(),
    |writer, v| writer.write_base64_string(v));

/// Converter for [`JsonValue`]: materializes whatever the document holds.
///
/// Reading walks the buffered tokens with an explicit container stack, so
/// deep documents cost heap, not host call stack. The engine's read-ahead
/// guarantees the whole value is present before this runs.
pub(crate) struct JsonValueConverter;

impl Converter for JsonValueConverter {
    fn converted_type(&self) -> TypeRef {
        TypeRef::of::<JsonValue>()
    }

    fn try_read(
        &self,
        reader: &mut JsonReader<'_>,
        _ty: TypeRef,
        _options: &SerializerOptions,
        _stack: &mut ReadStack,
    ) -> Result<ReadOutcome> {
        let value = read_value_tree(reader)?;
        Ok(ReadOutcome::Complete(Box::new(value)))
    }

    fn try_write(
        &self,
        writer: &mut JsonWriter<'_>,
        value: &dyn Any,
        _options: &SerializerOptions,
        _stack: &mut WriteStack,
    ) -> Result<bool> {
        let value = value.downcast_ref::<JsonValue>().ok_or_else(|| {
            Error::detached(crate::error::ConfigurationError::ConverterTypeMismatch {
                converts: "JsonValue",
                requested: "value of another type",
            })
        })?;
        value.write_to(writer)?;
        Ok(true)
    }
}

/// Builds a [`JsonValue`] from the current token onward.
pub(crate) fn read_value_tree(reader: &mut JsonReader<'_>) -> Result<JsonValue> {
    enum Open {
        Array(Vec<JsonValue>),
        Object(Map, Option<String>),
    }

    let mut open: Vec<Open> = Vec::new();
    loop {
        let completed = match reader.token_type() {
            TokenType::Null => Some(JsonValue::Null),
            TokenType::True => Some(JsonValue::Boolean(true)),
            TokenType::False => Some(JsonValue::Boolean(false)),
            TokenType::Number => Some(JsonValue::Number(read_number(reader)?)),
            TokenType::String => Some(JsonValue::String(reader.get_string()?)),
            TokenType::StartArray => {
                open.push(Open::Array(Vec::new()));
                None
            }
            TokenType::StartObject => {
                open.push(Open::Object(Map::new(), None));
                None
            }
            TokenType::PropertyName => {
                let key = reader.get_string()?;
                if let Some(Open::Object(_, slot)) = open.last_mut() {
                    *slot = Some(key);
                }
                None
            }
            TokenType::EndArray => match open.pop() {
                Some(Open::Array(items)) => Some(JsonValue::Array(items)),
                _ => return Err(reader.err(StructuralError::MismatchedBracket)),
            },
            TokenType::EndObject => match open.pop() {
                Some(Open::Object(map, _)) => Some(JsonValue::Object(map)),
                _ => return Err(reader.err(StructuralError::MismatchedBracket)),
            },
            TokenType::Comment | TokenType::None => None,
        };

        if let Some(value) = completed {
            match open.last_mut() {
                None => return Ok(value),
                Some(Open::Array(items)) => items.push(value),
                Some(Open::Object(map, slot)) => {
                    if let Some(key) = slot.take() {
                        // Duplicate keys: last one wins.
                        map.insert(key, value);
                    }
                }
            }
        }

        if !read_significant(reader)? {
            return Err(reader.err(StructuralError::UnexpectedEndOfData));
        }
    }
}

fn read_number(reader: &JsonReader<'_>) -> Result<Number> {
    let span = reader.value_span();
    let looks_integral = !span.iter().any(|b| matches!(b, b'.' | b'e' | b'E'));
    if looks_integral {
        if span.first() == Some(&b'-') {
            if let Ok(v) = reader.try_get_i64() {
                return Ok(Number::Int(v));
            }
        } else {
            if let Ok(v) = reader.try_get_i64() {
                return Ok(Number::Int(v));
            }
            if let Ok(v) = reader.try_get_u64() {
                return Ok(Number::UInt(v));
            }
        }
    }
    reader.try_get_f64().map(Number::Float)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{ReaderOptions, ReaderState};

    fn value_of(input: &[u8]) -> JsonValue {
        let mut reader = JsonReader::new(input, true, ReaderState::new(ReaderOptions::default()));
        assert!(reader.read().unwrap());
        read_value_tree(&mut reader).unwrap()
    }

    #[test]
    fn scalar_tree() {
        assert_eq!(value_of(b"true"), JsonValue::Boolean(true));
        assert_eq!(value_of(b"\"hi\""), JsonValue::String("hi".into()));
        assert_eq!(value_of(b"12"), JsonValue::Number(Number::Int(12)));
        assert_eq!(value_of(b"0.5"), JsonValue::Number(Number::Float(0.5)));
        assert_eq!(
            value_of(b"18446744073709551615"),
            JsonValue::Number(Number::UInt(u64::MAX))
        );
    }

    #[test]
    fn nested_tree_preserves_member_order() {
        let value = value_of(br#"{"z":1,"a":[true,null],"m":{"k":"v"}}"#);
        let JsonValue::Object(map) = value else {
            panic!("expected object");
        };
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn duplicate_keys_last_wins() {
        let value = value_of(br#"{"a":1,"a":2}"#);
        let JsonValue::Object(map) = value else {
            panic!("expected object");
        };
        assert_eq!(map.len(), 1);
        assert_eq!(map["a"], JsonValue::Number(Number::Int(2)));
    }

    #[test]
    fn lookup_covers_primitives() {
        assert!(lookup(std::any::TypeId::of::<i32>()).is_some());
        assert!(lookup(std::any::TypeId::of::<String>()).is_some());
        assert!(lookup(std::any::TypeId::of::<JsonValue>()).is_some());
        assert!(lookup(std::any::TypeId::of::<std::net::IpAddr>()).is_none());
    }
}
