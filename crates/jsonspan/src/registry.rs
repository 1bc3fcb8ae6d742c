//! Converter resolution.
//!
//! `resolve_converter` turns a type handle into its effective converter
//! using a fixed precedence: the per-options cache, user-registered
//! converters in registration order, the converter a type declares for
//! itself, built-in primitives by type handle, and finally the factory
//! chain (nullable, enum, key-value pair, collection/dictionary, object
//! fallback). Results are cached only once the options have frozen, since
//! the user may still be editing the converter list before that.

use std::sync::Arc;

use crate::{
    convert::{
        factory::{
            CollectionFactory, EnumFactory, KeyValueFactory, NullableFactory, ObjectFactory,
        },
        simple, Converter, ConverterKind,
    },
    descriptor::TypeRef,
    error::{ConfigurationError, Error, Result},
    options::SerializerOptions,
};

/// The factory chain, probed in this exact order. The object fallback is
/// last because it accepts anything with a descriptor.
fn factories() -> [&'static dyn Converter; 5] {
    static NULLABLE: NullableFactory = NullableFactory;
    static ENUM: EnumFactory = EnumFactory;
    static KEY_VALUE: KeyValueFactory = KeyValueFactory;
    static COLLECTION: CollectionFactory = CollectionFactory;
    static OBJECT: ObjectFactory = ObjectFactory;
    [&NULLABLE, &ENUM, &KEY_VALUE, &COLLECTION, &OBJECT]
}

/// Resolves the effective converter for `ty` under `options`.
pub(crate) fn resolve_converter(
    options: &SerializerOptions,
    ty: TypeRef,
) -> Result<Arc<dyn Converter>> {
    if let Some(cached) = options.cached_converter(ty.id) {
        return Ok(cached);
    }

    let resolved = resolve_uncached(options, ty)?;

    // The final converter must actually handle the requested type.
    if resolved.kind() != ConverterKind::Factory
        && resolved.converted_type() != ty
        && !resolved.can_convert(ty)
    {
        return Err(Error::detached(ConfigurationError::ConverterTypeMismatch {
            converts: resolved.converted_type().name,
            requested: ty.name,
        }));
    }

    options.cache_converter(ty.id, resolved.clone());
    Ok(resolved)
}

fn resolve_uncached(options: &SerializerOptions, ty: TypeRef) -> Result<Arc<dyn Converter>> {
    // Runtime-registered converters, first registration wins.
    for user in options.user_converters() {
        if user.can_convert(ty) {
            return concretize(user, ty, options);
        }
    }

    // The converter the type declares for itself.
    if let Some(declared) = options.catalog().declared_converter(ty.id) {
        return concretize(declared, ty, options);
    }

    // Built-in primitives by type handle.
    if let Some(simple) = simple::lookup(ty.id) {
        return Ok(simple);
    }

    // The factory chain.
    for factory in factories() {
        if let Some(built) = factory.build(ty, options) {
            return built;
        }
    }

    Err(Error::detached(ConfigurationError::NoConverter(ty.name)))
}

/// Asks factory-kind converters to produce their concrete converter; passes
/// anything else through.
fn concretize(
    converter: Arc<dyn Converter>,
    ty: TypeRef,
    options: &SerializerOptions,
) -> Result<Arc<dyn Converter>> {
    if converter.kind() == ConverterKind::Factory {
        converter
            .build(ty, options)
            .unwrap_or_else(|| Err(Error::detached(ConfigurationError::NoConverter(ty.name))))
    } else {
        Ok(converter)
    }
}
