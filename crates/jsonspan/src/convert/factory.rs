//! Factory converters and the concrete converters they produce.
//!
//! Factories are probed in a fixed order (nullable, enum, key-value pair,
//! collection/dictionary, object) when no user, declared, or built-in
//! converter claims a type. Each factory consults the type catalog and
//! manufactures a converter bound to the shape's thunks. The object factory
//! is last because it accepts anything that has a descriptor.

use std::any::Any;
use std::sync::Arc;

use crate::{
    convert::{Converter, ConverterKind, ReadOutcome},
    descriptor::{
        ClassInfo, CollectionShape, DictionaryShape, EnumShape, KeyValueShape, NullableShape,
        TypeRef, TypeShape,
    },
    engine::{read, write, ReadStack, WriteStack},
    error::{ConfigurationError, ConversionError, Error, Result},
    options::SerializerOptions,
    reader::{JsonReader, TokenType},
    registry,
    writer::JsonWriter,
};

fn factory_invoked(ty: TypeRef) -> Error {
    Error::detached(ConfigurationError::ConverterTypeMismatch {
        converts: "factory",
        requested: ty.name,
    })
}

/// Fills in the parts of `Converter` that are identical for every factory:
/// factories are resolved through `build` and must never read or write.
macro_rules! factory_boilerplate {
    () => {
        fn converted_type(&self) -> TypeRef {
            TypeRef::of::<()>()
        }

        fn kind(&self) -> ConverterKind {
            ConverterKind::Factory
        }

        fn can_convert(&self, _ty: TypeRef) -> bool {
            // Resolution probes `build` directly; factories never match as
            // direct converters.
            false
        }

        fn try_read(
            &self,
            _reader: &mut JsonReader<'_>,
            ty: TypeRef,
            _options: &SerializerOptions,
            _stack: &mut ReadStack,
        ) -> Result<ReadOutcome> {
            Err(factory_invoked(ty))
        }

        fn try_write(
            &self,
            _writer: &mut JsonWriter<'_>,
            _value: &dyn Any,
            _options: &SerializerOptions,
            _stack: &mut WriteStack,
        ) -> Result<bool> {
            Err(factory_invoked(self.converted_type()))
        }
    };
}

pub(crate) struct NullableFactory;

impl Converter for NullableFactory {
    factory_boilerplate!();

    fn build(
        &self,
        ty: TypeRef,
        options: &SerializerOptions,
    ) -> Option<Result<Arc<dyn Converter>>> {
        let shape = options.catalog().shape(ty.id)?;
        let TypeShape::Nullable(nullable) = shape.as_ref() else {
            return None;
        };
        let inner = match registry::resolve_converter(options, nullable.inner) {
            Ok(inner) => inner,
            Err(e) => return Some(Err(e)),
        };
        Some(Ok(Arc::new(NullableConverter { ty, shape: shape.clone(), inner })))
    }
}

pub(crate) struct EnumFactory;

impl Converter for EnumFactory {
    factory_boilerplate!();

    fn build(
        &self,
        ty: TypeRef,
        options: &SerializerOptions,
    ) -> Option<Result<Arc<dyn Converter>>> {
        let shape = options.catalog().shape(ty.id)?;
        if !matches!(shape.as_ref(), TypeShape::Enum(_)) {
            return None;
        }
        Some(Ok(Arc::new(EnumConverter { ty, shape })))
    }
}

pub(crate) struct KeyValueFactory;

impl Converter for KeyValueFactory {
    factory_boilerplate!();

    fn build(
        &self,
        ty: TypeRef,
        options: &SerializerOptions,
    ) -> Option<Result<Arc<dyn Converter>>> {
        let shape = options.catalog().shape(ty.id)?;
        let TypeShape::KeyValue(kv) = shape.as_ref() else {
            return None;
        };
        let value = match registry::resolve_converter(options, kv.value) {
            Ok(value) => value,
            Err(e) => return Some(Err(e)),
        };
        let key_name = options.property_naming_policy().apply("Key");
        let value_name = options.property_naming_policy().apply("Value");
        Some(Ok(Arc::new(KeyValueConverter {
            ty,
            shape: shape.clone(),
            value,
            key_name,
            value_name,
        })))
    }
}

pub(crate) struct CollectionFactory;

impl Converter for CollectionFactory {
    factory_boilerplate!();

    fn build(
        &self,
        ty: TypeRef,
        options: &SerializerOptions,
    ) -> Option<Result<Arc<dyn Converter>>> {
        let shape = options.catalog().shape(ty.id)?;
        match shape.as_ref() {
            TypeShape::Collection(c) => {
                let element = match registry::resolve_converter(options, c.element) {
                    Ok(element) => element,
                    Err(e) => return Some(Err(e)),
                };
                Some(Ok(Arc::new(CollectionConverter {
                    ty,
                    shape: shape.clone(),
                    element,
                })))
            }
            TypeShape::Dictionary(d) => {
                let value = match registry::resolve_converter(options, d.value) {
                    Ok(value) => value,
                    Err(e) => return Some(Err(e)),
                };
                Some(Ok(Arc::new(DictionaryConverter {
                    ty,
                    shape: shape.clone(),
                    value,
                })))
            }
            _ => None,
        }
    }
}

/// The object fallback: accepts any type that registered an object shape.
pub(crate) struct ObjectFactory;

impl Converter for ObjectFactory {
    factory_boilerplate!();

    fn build(
        &self,
        ty: TypeRef,
        options: &SerializerOptions,
    ) -> Option<Result<Arc<dyn Converter>>> {
        Some(
            options
                .class_info(ty)
                .map(|class| Arc::new(ObjectConverter { ty, class }) as Arc<dyn Converter>),
        )
    }
}

// -- produced converters -----------------------------------------------------

/// `Option<T>`: `null` or the inner value.
pub(crate) struct NullableConverter {
    ty: TypeRef,
    shape: Arc<TypeShape>,
    inner: Arc<dyn Converter>,
}

impl NullableConverter {
    fn nullable(&self) -> &NullableShape {
        match self.shape.as_ref() {
            TypeShape::Nullable(s) => s,
            _ => unreachable!("factory bound a nullable shape"),
        }
    }
}

impl Converter for NullableConverter {
    fn converted_type(&self) -> TypeRef {
        self.ty
    }

    fn kind(&self) -> ConverterKind {
        // Suspension behavior follows the inner converter.
        self.inner.kind()
    }

    fn try_read(
        &self,
        reader: &mut JsonReader<'_>,
        _ty: TypeRef,
        options: &SerializerOptions,
        stack: &mut ReadStack,
    ) -> Result<ReadOutcome> {
        let shape = self.nullable();
        if reader.token_type() == TokenType::Null {
            return Ok(ReadOutcome::Complete((shape.wrap)(None)));
        }
        match self.inner.try_read(reader, shape.inner, options, stack)? {
            ReadOutcome::Complete(v) => Ok(ReadOutcome::Complete((shape.wrap)(Some(v)))),
            ReadOutcome::Suspend => Ok(ReadOutcome::Suspend),
        }
    }

    fn try_write(
        &self,
        writer: &mut JsonWriter<'_>,
        value: &dyn Any,
        options: &SerializerOptions,
        stack: &mut WriteStack,
    ) -> Result<bool> {
        let shape = self.nullable();
        match (shape.project)(value) {
            None => {
                writer.write_null()?;
                Ok(true)
            }
            Some(inner) => self.inner.try_write(writer, inner.as_ref(), options, stack),
        }
    }
}

/// Unit enums carried as their variant name string.
pub(crate) struct EnumConverter {
    ty: TypeRef,
    shape: Arc<TypeShape>,
}

impl EnumConverter {
    fn variants(&self) -> &EnumShape {
        match self.shape.as_ref() {
            TypeShape::Enum(s) => s,
            _ => unreachable!("factory bound an enum shape"),
        }
    }
}

impl Converter for EnumConverter {
    fn converted_type(&self) -> TypeRef {
        self.ty
    }

    fn try_read(
        &self,
        reader: &mut JsonReader<'_>,
        _ty: TypeRef,
        _options: &SerializerOptions,
        _stack: &mut ReadStack,
    ) -> Result<ReadOutcome> {
        if reader.token_type() != TokenType::String {
            return Err(reader.err(ConversionError::TokenMismatch {
                token: reader.token_type(),
                target: self.ty.name,
            }));
        }
        let name = reader.get_string()?;
        let shape = self.variants();
        let variant = shape
            .variants
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| reader.err(ConversionError::UnknownEnumName(name.clone())))?;
        Ok(ReadOutcome::Complete((variant.make)()))
    }

    fn try_write(
        &self,
        writer: &mut JsonWriter<'_>,
        value: &dyn Any,
        _options: &SerializerOptions,
        _stack: &mut WriteStack,
    ) -> Result<bool> {
        let shape = self.variants();
        let variant = shape
            .variants
            .iter()
            .find(|v| (v.matches)(value))
            .ok_or_else(|| {
                Error::detached(ConversionError::UnknownEnumName(String::from(
                    "<unregistered variant>",
                )))
            })?;
        writer.write_string(&variant.name)?;
        Ok(true)
    }
}

/// `{Key, Value}` pairs. Resumable: the value member may itself be a
/// suspendable composite.
pub(crate) struct KeyValueConverter {
    pub(crate) ty: TypeRef,
    pub(crate) shape: Arc<TypeShape>,
    pub(crate) value: Arc<dyn Converter>,
    pub(crate) key_name: String,
    pub(crate) value_name: String,
}

impl KeyValueConverter {
    pub(crate) fn pair(&self) -> &KeyValueShape {
        match self.shape.as_ref() {
            TypeShape::KeyValue(s) => s,
            _ => unreachable!("factory bound a key-value shape"),
        }
    }
}

impl Converter for KeyValueConverter {
    fn converted_type(&self) -> TypeRef {
        self.ty
    }

    fn kind(&self) -> ConverterKind {
        ConverterKind::Resumable
    }

    fn try_read(
        &self,
        reader: &mut JsonReader<'_>,
        _ty: TypeRef,
        options: &SerializerOptions,
        stack: &mut ReadStack,
    ) -> Result<ReadOutcome> {
        read::key_value(self, reader, options, stack)
    }

    fn try_write(
        &self,
        writer: &mut JsonWriter<'_>,
        value: &dyn Any,
        options: &SerializerOptions,
        stack: &mut WriteStack,
    ) -> Result<bool> {
        write::key_value(self, writer, value, options, stack)
    }
}

/// Sequences (arrays on the wire).
pub(crate) struct CollectionConverter {
    pub(crate) ty: TypeRef,
    pub(crate) shape: Arc<TypeShape>,
    pub(crate) element: Arc<dyn Converter>,
}

impl CollectionConverter {
    pub(crate) fn collection(&self) -> &CollectionShape {
        match self.shape.as_ref() {
            TypeShape::Collection(s) => s,
            _ => unreachable!("factory bound a collection shape"),
        }
    }
}

impl Converter for CollectionConverter {
    fn converted_type(&self) -> TypeRef {
        self.ty
    }

    fn kind(&self) -> ConverterKind {
        ConverterKind::Resumable
    }

    fn try_read(
        &self,
        reader: &mut JsonReader<'_>,
        _ty: TypeRef,
        options: &SerializerOptions,
        stack: &mut ReadStack,
    ) -> Result<ReadOutcome> {
        read::collection(self, reader, options, stack)
    }

    fn try_write(
        &self,
        writer: &mut JsonWriter<'_>,
        value: &dyn Any,
        options: &SerializerOptions,
        stack: &mut WriteStack,
    ) -> Result<bool> {
        write::collection(self, writer, value, options, stack)
    }
}

/// String-keyed mappings (objects on the wire).
pub(crate) struct DictionaryConverter {
    pub(crate) ty: TypeRef,
    pub(crate) shape: Arc<TypeShape>,
    pub(crate) value: Arc<dyn Converter>,
}

impl DictionaryConverter {
    pub(crate) fn dictionary(&self) -> &DictionaryShape {
        match self.shape.as_ref() {
            TypeShape::Dictionary(s) => s,
            _ => unreachable!("factory bound a dictionary shape"),
        }
    }
}

impl Converter for DictionaryConverter {
    fn converted_type(&self) -> TypeRef {
        self.ty
    }

    fn kind(&self) -> ConverterKind {
        ConverterKind::Resumable
    }

    fn try_read(
        &self,
        reader: &mut JsonReader<'_>,
        _ty: TypeRef,
        options: &SerializerOptions,
        stack: &mut ReadStack,
    ) -> Result<ReadOutcome> {
        read::dictionary(self, reader, options, stack)
    }

    fn try_write(
        &self,
        writer: &mut JsonWriter<'_>,
        value: &dyn Any,
        options: &SerializerOptions,
        stack: &mut WriteStack,
    ) -> Result<bool> {
        write::dictionary(self, writer, value, options, stack)
    }
}

/// Declared objects, driven by their compiled [`ClassInfo`].
pub(crate) struct ObjectConverter {
    pub(crate) ty: TypeRef,
    pub(crate) class: Arc<ClassInfo>,
}

impl Converter for ObjectConverter {
    fn converted_type(&self) -> TypeRef {
        self.ty
    }

    fn kind(&self) -> ConverterKind {
        ConverterKind::Resumable
    }

    fn try_read(
        &self,
        reader: &mut JsonReader<'_>,
        _ty: TypeRef,
        options: &SerializerOptions,
        stack: &mut ReadStack,
    ) -> Result<ReadOutcome> {
        read::object(self, reader, options, stack)
    }

    fn try_write(
        &self,
        writer: &mut JsonWriter<'_>,
        value: &dyn Any,
        options: &SerializerOptions,
        stack: &mut WriteStack,
    ) -> Result<bool> {
        write::object(self, writer, value, options, stack)
    }
}
