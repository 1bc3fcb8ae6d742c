//! Resumable write machines.
//!
//! The mirror image of the read machines: each level's cursor and scratch
//! live on a [`WriteFrame`], and after every member or element the machine
//! checks the output high-water mark. Crossing it suspends the whole stack
//! with a `false` return so the caller can drain the sink and re-enter.

use std::any::Any;
use std::sync::Arc;

use crate::{
    convert::{
        factory::{CollectionConverter, DictionaryConverter, KeyValueConverter, ObjectConverter},
        Converter,
    },
    descriptor::TypeRef,
    engine::{Progress, WriteStack},
    error::{ConfigurationError, Error, Result},
    options::SerializerOptions,
    registry::resolve_converter,
    value::JsonValue,
    writer::JsonWriter,
};

fn drive(
    stack: &mut WriteStack,
    inner: impl FnOnce(&mut WriteStack) -> Result<bool>,
) -> Result<bool> {
    stack.enter()?;
    match inner(stack) {
        Ok(true) => {
            stack.exit_complete();
            Ok(true)
        }
        Ok(false) => {
            stack.exit_suspend();
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Resolves the converter that writes a member value, honoring a
/// member-level converter first and re-resolving on the value's runtime
/// type when it differs from the declared one (polymorphic members carry no
/// discriminator; reading back into the declared type may lose the runtime
/// identity).
fn value_converter(
    options: &SerializerOptions,
    declared: TypeRef,
    member_level: Option<&Arc<dyn Converter>>,
    value: &dyn Any,
) -> Result<Arc<dyn Converter>> {
    if let Some(c) = member_level {
        return Ok(c.clone());
    }
    let runtime = value.type_id();
    if runtime == declared.id {
        resolve_converter(options, declared)
    } else {
        resolve_converter(
            options,
            TypeRef {
                id: runtime,
                name: "<runtime type>",
            },
        )
    }
}

/// Whether a member value reads as JSON null under the declared type.
fn is_null_value(options: &SerializerOptions, declared: TypeRef, value: &dyn Any) -> bool {
    if let Some(v) = value.downcast_ref::<JsonValue>() {
        return v.is_null();
    }
    if let Some(shape) = options.catalog().shape(declared.id) {
        if let crate::descriptor::TypeShape::Nullable(n) = shape.as_ref() {
            return (n.project)(value).is_none();
        }
    }
    false
}

// -- object ------------------------------------------------------------------

pub(crate) fn object(
    conv: &ObjectConverter,
    writer: &mut JsonWriter<'_>,
    value: &dyn Any,
    options: &SerializerOptions,
    stack: &mut WriteStack,
) -> Result<bool> {
    drive(stack, |stack| object_inner(conv, writer, value, options, stack))
}

fn object_inner(
    conv: &ObjectConverter,
    writer: &mut JsonWriter<'_>,
    value: &dyn Any,
    options: &SerializerOptions,
    stack: &mut WriteStack,
) -> Result<bool> {
    if !stack.current().flags.has(Progress::START) {
        writer.write_start_object()?;
        let frame = stack.current();
        if let Some(ext) = conv.class.extension.as_ref() {
            frame.entries = (ext.entries)(value)
                .into_iter()
                .map(|(k, v)| (k, Box::new(v) as Box<dyn Any>))
                .collect();
        }
        frame.flags.set(Progress::START);
    }

    // Declared members.
    while stack.current().index < conv.class.properties.len() {
        let idx = stack.current().index;
        let prop = &conv.class.properties[idx];

        if !stack.current().flags.has(Progress::NAME) {
            let skip = match prop.getter.as_ref() {
                None => true,
                Some(_) if options.ignore_read_only_properties() && prop.setter.is_none() => true,
                Some(getter) => {
                    let member = getter(value);
                    let skip_member = prop
                        .should_serialize
                        .as_ref()
                        .is_some_and(|pred| !pred(member.as_ref()))
                        || (options.ignore_null_values()
                            && is_null_value(options, prop.member_type, member.as_ref()));
                    if !skip_member {
                        writer.write_preescaped_name(&prop.escaped_name)?;
                        let frame = stack.current();
                        frame.current_value = Some(member);
                        frame.pending_name =
                            core::str::from_utf8(&prop.utf8_name).ok().map(str::to_owned);
                        frame.flags.set(Progress::NAME);
                    }
                    skip_member
                }
            };
            if skip {
                advance(stack);
                continue;
            }
        }

        if !stack.current().flags.has(Progress::VALUE) {
            let Some(member) = stack.current().current_value.take() else {
                return Err(Error::detached(ConfigurationError::ConverterTypeMismatch {
                    converts: conv.ty.name,
                    requested: "missing member value",
                }));
            };
            let converter = value_converter(
                options,
                prop.member_type,
                prop.converter.as_ref(),
                member.as_ref(),
            )?;
            if !converter.try_write(writer, member.as_ref(), options, stack)? {
                stack.current().current_value = Some(member);
                return Ok(false);
            }
            stack.current().flags.set(Progress::VALUE);
        }

        advance(stack);
        if stack.should_flush(writer) {
            return Ok(false);
        }
    }

    // Extension data, after the declared members.
    loop {
        let frame = stack.current();
        let slot = frame.index - conv.class.properties.len();
        if slot >= frame.entries.len() {
            break;
        }
        if !frame.flags.has(Progress::NAME) {
            let name = frame.entries[slot].0.clone();
            frame.pending_name = Some(name.clone());
            writer.write_property_name(&name)?;
            stack.current().flags.set(Progress::NAME);
        }
        if !stack.current().flags.has(Progress::VALUE) {
            let frame = stack.current();
            if let Some(extension_value) = frame.entries[slot].1.downcast_ref::<JsonValue>() {
                extension_value.write_to(writer)?;
            }
            frame.flags.set(Progress::VALUE);
        }
        advance(stack);
        if stack.should_flush(writer) {
            return Ok(false);
        }
    }

    writer.write_end_object()?;
    Ok(true)
}

fn advance(stack: &mut WriteStack) {
    let frame = stack.current();
    frame.index += 1;
    frame.flags.next_property();
    frame.pending_name = None;
    frame.current_value = None;
}

// -- collection --------------------------------------------------------------

pub(crate) fn collection(
    conv: &CollectionConverter,
    writer: &mut JsonWriter<'_>,
    value: &dyn Any,
    options: &SerializerOptions,
    stack: &mut WriteStack,
) -> Result<bool> {
    drive(stack, |stack| collection_inner(conv, writer, value, options, stack))
}

fn collection_inner(
    conv: &CollectionConverter,
    writer: &mut JsonWriter<'_>,
    value: &dyn Any,
    options: &SerializerOptions,
    stack: &mut WriteStack,
) -> Result<bool> {
    let shape = conv.collection();
    if !stack.current().flags.has(Progress::START) {
        writer.write_start_array()?;
        let frame = stack.current();
        frame.items = (shape.elements)(value);
        frame.is_array = true;
        frame.flags.set(Progress::START);
    }

    while stack.current().index < stack.current().items.len() {
        if !stack.current().flags.has(Progress::VALUE) {
            let idx = stack.current().index;
            // The element is moved out for the duration of the nested call;
            // a unit placeholder keeps the slot alive for resumption.
            let element =
                core::mem::replace(&mut stack.current().items[idx], Box::new(()) as Box<dyn Any>);
            let converter = value_converter(options, shape.element, None, element.as_ref())?;
            if !converter.try_write(writer, element.as_ref(), options, stack)? {
                stack.current().items[idx] = element;
                return Ok(false);
            }
            stack.current().flags.set(Progress::VALUE);
        }
        advance(stack);
        if stack.should_flush(writer) {
            return Ok(false);
        }
    }

    writer.write_end_array()?;
    Ok(true)
}

// -- dictionary --------------------------------------------------------------

pub(crate) fn dictionary(
    conv: &DictionaryConverter,
    writer: &mut JsonWriter<'_>,
    value: &dyn Any,
    options: &SerializerOptions,
    stack: &mut WriteStack,
) -> Result<bool> {
    drive(stack, |stack| dictionary_inner(conv, writer, value, options, stack))
}

fn dictionary_inner(
    conv: &DictionaryConverter,
    writer: &mut JsonWriter<'_>,
    value: &dyn Any,
    options: &SerializerOptions,
    stack: &mut WriteStack,
) -> Result<bool> {
    let shape = conv.dictionary();
    if !stack.current().flags.has(Progress::START) {
        writer.write_start_object()?;
        let frame = stack.current();
        frame.entries = (shape.entries)(value);
        frame.flags.set(Progress::START);
    }

    while stack.current().index < stack.current().entries.len() {
        let idx = stack.current().index;
        if !stack.current().flags.has(Progress::NAME) {
            let wire_key = options
                .dictionary_key_policy()
                .apply(&stack.current().entries[idx].0);
            writer.write_property_name(&wire_key)?;
            let frame = stack.current();
            frame.pending_name = Some(wire_key);
            frame.flags.set(Progress::NAME);
        }
        if !stack.current().flags.has(Progress::VALUE) {
            let entry_value = core::mem::replace(
                &mut stack.current().entries[idx].1,
                Box::new(()) as Box<dyn Any>,
            );
            let converter = value_converter(options, shape.value, None, entry_value.as_ref())?;
            if !converter.try_write(writer, entry_value.as_ref(), options, stack)? {
                stack.current().entries[idx].1 = entry_value;
                return Ok(false);
            }
            stack.current().flags.set(Progress::VALUE);
        }
        advance(stack);
        if stack.should_flush(writer) {
            return Ok(false);
        }
    }

    writer.write_end_object()?;
    Ok(true)
}

// -- key/value pair ----------------------------------------------------------

pub(crate) fn key_value(
    conv: &KeyValueConverter,
    writer: &mut JsonWriter<'_>,
    value: &dyn Any,
    options: &SerializerOptions,
    stack: &mut WriteStack,
) -> Result<bool> {
    drive(stack, |stack| key_value_inner(conv, writer, value, options, stack))
}

fn key_value_inner(
    conv: &KeyValueConverter,
    writer: &mut JsonWriter<'_>,
    value: &dyn Any,
    options: &SerializerOptions,
    stack: &mut WriteStack,
) -> Result<bool> {
    let shape = conv.pair();
    if !stack.current().flags.has(Progress::START) {
        writer.write_start_object()?;
        stack.current().flags.set(Progress::START);
    }

    if !stack.current().flags.has(Progress::NAME) {
        let (key, pair_value) = (shape.split)(value);
        writer.write_property_name(&conv.key_name)?;
        writer.write_string(&key)?;
        let frame = stack.current();
        frame.current_value = Some(pair_value);
        frame.flags.set(Progress::NAME);
    }

    if !stack.current().flags.has(Progress::READ_VALUE) {
        writer.write_property_name(&conv.value_name)?;
        stack.current().flags.set(Progress::READ_VALUE);
    }

    if !stack.current().flags.has(Progress::VALUE) {
        let Some(pair_value) = stack.current().current_value.take() else {
            return Err(Error::detached(ConfigurationError::ConverterTypeMismatch {
                converts: conv.ty.name,
                requested: "missing pair value",
            }));
        };
        if !conv
            .value
            .try_write(writer, pair_value.as_ref(), options, stack)?
        {
            stack.current().current_value = Some(pair_value);
            return Ok(false);
        }
        stack.current().flags.set(Progress::VALUE);
    }

    writer.write_end_object()?;
    Ok(true)
}
