//! Resumable read machines for objects, collections, dictionaries, and
//! key/value pairs.
//!
//! Every machine follows the same discipline: claim a frame, consult the
//! frame's progress flags to find the first unfinished step, and run until
//! either the value completes or the reader reports that input ran out. The
//! inner functions return `Ok(None)` for "suspended"; the wrappers translate
//! that into [`ReadOutcome::Suspend`] after releasing the frame for later
//! resumption.
//!
//! Before a non-resumable converter runs, the machine proves the whole value
//! is buffered by skipping over it on a throwaway clone of the reader (the
//! single-value read-ahead). That keeps simple converters free of partial
//! input handling.

use std::any::Any;
use std::sync::Arc;

use crate::{
    convert::{
        factory::{CollectionConverter, DictionaryConverter, KeyValueConverter, ObjectConverter},
        simple, Converter, ConverterKind, ReadOutcome,
    },
    engine::{read_significant, Pending, Progress, ReadStack},
    error::{ConfigurationError, ConversionError, Error, Result, StructuralError},
    options::{ExtensionDataConflict, SerializerOptions},
    reader::{JsonReader, TokenType},
    registry::resolve_converter,
};

/// Wraps an inner machine: claim the frame, translate `None` into a
/// suspension with the frame parked for re-entry.
fn drive(
    stack: &mut ReadStack,
    inner: impl FnOnce(&mut ReadStack) -> Result<Option<Box<dyn Any>>>,
) -> Result<ReadOutcome> {
    stack.enter()?;
    match inner(stack) {
        Ok(Some(value)) => {
            stack.exit_complete();
            Ok(ReadOutcome::Complete(value))
        }
        Ok(None) => {
            stack.exit_suspend();
            Ok(ReadOutcome::Suspend)
        }
        // Frames are left in place so the error path can be rendered.
        Err(e) => Err(e),
    }
}

/// Composite machines require their opening structural token; anything else
/// at that position is a token-shape violation of the document, not a value
/// conversion failure.
fn expect_start(reader: &JsonReader<'_>, expected: TokenType) -> Result<()> {
    if reader.token_type() == expected {
        Ok(())
    } else {
        Err(reader.err(StructuralError::UnexpectedToken(reader.token_type())))
    }
}

/// Surfaces the next significant token, first proving on a throwaway clone
/// of the reader that the whole value starting there is buffered when the
/// consumer cannot suspend (`needs_whole`). Nothing is consumed on
/// suspension, so a later re-entry probes again from the same spot.
fn surface_value(reader: &mut JsonReader<'_>, needs_whole: bool) -> Result<bool> {
    if needs_whole {
        let mut probe = reader.clone();
        if !read_significant(&mut probe)? {
            return Ok(false);
        }
        if !probe.try_skip()? {
            return Ok(false);
        }
    }
    read_significant(reader)
}

fn needs_whole_value(converter: &Arc<dyn Converter>) -> bool {
    converter.kind() != ConverterKind::Resumable
}

/// Resolves the converter for a declared member: a member-level converter
/// wins over everything else for that member.
fn member_converter(
    options: &SerializerOptions,
    declared: crate::descriptor::TypeRef,
    member_level: Option<&Arc<dyn Converter>>,
) -> Result<Arc<dyn Converter>> {
    match member_level {
        Some(c) => Ok(c.clone()),
        None => resolve_converter(options, declared),
    }
}

// -- object ------------------------------------------------------------------

pub(crate) fn object(
    conv: &ObjectConverter,
    reader: &mut JsonReader<'_>,
    options: &SerializerOptions,
    stack: &mut ReadStack,
) -> Result<ReadOutcome> {
    drive(stack, |stack| object_inner(conv, reader, options, stack))
}

fn object_inner(
    conv: &ObjectConverter,
    reader: &mut JsonReader<'_>,
    options: &SerializerOptions,
    stack: &mut ReadStack,
) -> Result<Option<Box<dyn Any>>> {
    if !stack.current().flags.has(Progress::START) {
        expect_start(reader, TokenType::StartObject)?;
        stack.current().flags.set(Progress::START);
    }
    if stack.current().object.is_none() {
        let Some(ctor) = conv.class.ctor.clone() else {
            return Err(Error::detached(ConfigurationError::MissingConstructor(
                conv.ty.name,
            )));
        };
        stack.current().object = Some(ctor());
    }

    loop {
        if !stack.current().flags.has(Progress::READ_NAME) {
            if !read_significant(reader)? {
                return Ok(None);
            }
            stack.current().flags.set(Progress::READ_NAME);
        }

        if !stack.current().flags.has(Progress::NAME) {
            match reader.token_type() {
                TokenType::EndObject => break,
                TokenType::PropertyName => {
                    let name = reader.get_string()?;
                    let case_insensitive = options.property_name_case_insensitive();
                    let frame = stack.current();
                    let found =
                        conv.class
                            .find_property(name.as_bytes(), case_insensitive, &mut frame.name_ring);
                    frame.pending = match found {
                        Some(idx) => Pending::Member(idx),
                        None if conv.class.extension.is_some() => Pending::Extension,
                        None => Pending::Skip,
                    };
                    frame.pending_name = Some(name);
                    frame.flags.set(Progress::NAME);
                }
                _ => return Err(reader.err(StructuralError::ExpectedPropertyName)),
            }
        }

        if !stack.current().flags.has(Progress::READ_VALUE) {
            match stack.current().pending {
                Pending::Skip => {
                    if !reader.try_skip()? {
                        return Ok(None);
                    }
                    let frame = stack.current();
                    frame.flags.set(Progress::READ_VALUE);
                    frame.flags.set(Progress::VALUE);
                }
                Pending::Member(idx) => {
                    let prop = &conv.class.properties[idx];
                    let converter =
                        member_converter(options, prop.member_type, prop.converter.as_ref())?;
                    if !surface_value(reader, needs_whole_value(&converter))? {
                        return Ok(None);
                    }
                    stack.current().flags.set(Progress::READ_VALUE);
                }
                _ => {
                    // Extension values are read whole into a dynamic tree.
                    if !surface_value(reader, true)? {
                        return Ok(None);
                    }
                    stack.current().flags.set(Progress::READ_VALUE);
                }
            }
        }

        if !stack.current().flags.has(Progress::VALUE) {
            match stack.current().pending {
                Pending::Member(idx) => {
                    let prop = &conv.class.properties[idx];
                    let converter =
                        member_converter(options, prop.member_type, prop.converter.as_ref())?;
                    match converter.try_read(reader, prop.member_type, options, stack)? {
                        ReadOutcome::Suspend => return Ok(None),
                        ReadOutcome::Complete(value) => {
                            let frame = stack.current();
                            if let (Some(object), Some(setter)) =
                                (frame.object.as_deref_mut(), prop.setter.as_ref())
                            {
                                setter(object, value);
                            }
                            frame.flags.set(Progress::VALUE);
                        }
                    }
                }
                Pending::Extension => {
                    let value = simple::read_value_tree(reader)?;
                    let frame = stack.current();
                    let name = frame.pending_name.clone().unwrap_or_default();
                    if let (Some(object), Some(ext)) =
                        (frame.object.as_deref_mut(), conv.class.extension.as_ref())
                    {
                        (ext.insert)(object, name, value);
                    }
                    frame.flags.set(Progress::VALUE);
                }
                Pending::Skip | Pending::None => {
                    stack.current().flags.set(Progress::VALUE);
                }
            }
        }

        let frame = stack.current();
        frame.flags.next_property();
        frame.pending = Pending::None;
        frame.pending_name = None;
    }

    // End of object: reconcile extension data with declared members, then
    // publish the built value.
    let frame = stack.current();
    let Some(mut object) = frame.object.take() else {
        return Err(Error::detached(ConfigurationError::MissingConstructor(
            conv.ty.name,
        )));
    };
    if let Some(ext) = conv.class.extension.as_ref() {
        if options.extension_data_conflict() == ExtensionDataConflict::DeclaredMemberWins {
            for prop in conv.class.properties.iter() {
                if let Ok(wire_name) = core::str::from_utf8(&prop.utf8_name) {
                    (ext.remove)(object.as_mut(), wire_name);
                }
            }
        }
    }
    Ok(Some(object))
}

// -- collection --------------------------------------------------------------

pub(crate) fn collection(
    conv: &CollectionConverter,
    reader: &mut JsonReader<'_>,
    options: &SerializerOptions,
    stack: &mut ReadStack,
) -> Result<ReadOutcome> {
    drive(stack, |stack| collection_inner(conv, reader, options, stack))
}

fn collection_inner(
    conv: &CollectionConverter,
    reader: &mut JsonReader<'_>,
    options: &SerializerOptions,
    stack: &mut ReadStack,
) -> Result<Option<Box<dyn Any>>> {
    let shape = conv.collection();
    if !stack.current().flags.has(Progress::START) {
        expect_start(reader, TokenType::StartArray)?;
        let frame = stack.current();
        frame.is_array = true;
        frame.flags.set(Progress::START);
    }

    loop {
        if !stack.current().flags.has(Progress::READ_VALUE) {
            if !surface_value(reader, needs_whole_value(&conv.element))? {
                return Ok(None);
            }
            stack.current().flags.set(Progress::READ_VALUE);
        }

        if !stack.current().flags.has(Progress::VALUE) {
            if reader.token_type() == TokenType::EndArray {
                break;
            }
            match conv.element.try_read(reader, shape.element, options, stack)? {
                ReadOutcome::Suspend => return Ok(None),
                ReadOutcome::Complete(value) => {
                    let frame = stack.current();
                    frame.items.push(value);
                    frame.flags.set(Progress::VALUE);
                }
            }
        }

        let frame = stack.current();
        frame.flags.next_property();
        frame.index += 1;
    }

    let items = core::mem::take(&mut stack.current().items);
    (shape.finish)(items).map(Some)
}

// -- dictionary --------------------------------------------------------------

pub(crate) fn dictionary(
    conv: &DictionaryConverter,
    reader: &mut JsonReader<'_>,
    options: &SerializerOptions,
    stack: &mut ReadStack,
) -> Result<ReadOutcome> {
    drive(stack, |stack| dictionary_inner(conv, reader, options, stack))
}

fn dictionary_inner(
    conv: &DictionaryConverter,
    reader: &mut JsonReader<'_>,
    options: &SerializerOptions,
    stack: &mut ReadStack,
) -> Result<Option<Box<dyn Any>>> {
    let shape = conv.dictionary();
    if !stack.current().flags.has(Progress::START) {
        expect_start(reader, TokenType::StartObject)?;
        stack.current().flags.set(Progress::START);
    }

    loop {
        if !stack.current().flags.has(Progress::READ_NAME) {
            if !read_significant(reader)? {
                return Ok(None);
            }
            stack.current().flags.set(Progress::READ_NAME);
        }

        if !stack.current().flags.has(Progress::NAME) {
            match reader.token_type() {
                TokenType::EndObject => break,
                TokenType::PropertyName => {
                    let key = reader.get_string()?;
                    let frame = stack.current();
                    frame.pending_name = Some(key.clone());
                    frame.dict_key = Some(key);
                    frame.flags.set(Progress::NAME);
                }
                _ => return Err(reader.err(StructuralError::ExpectedPropertyName)),
            }
        }

        if !stack.current().flags.has(Progress::READ_VALUE) {
            if !surface_value(reader, needs_whole_value(&conv.value))? {
                return Ok(None);
            }
            stack.current().flags.set(Progress::READ_VALUE);
        }

        if !stack.current().flags.has(Progress::VALUE) {
            match conv.value.try_read(reader, shape.value, options, stack)? {
                ReadOutcome::Suspend => return Ok(None),
                ReadOutcome::Complete(value) => {
                    let frame = stack.current();
                    let key = frame.dict_key.take().unwrap_or_default();
                    frame.entries.push((key, value));
                    frame.flags.set(Progress::VALUE);
                }
            }
        }

        let frame = stack.current();
        frame.flags.next_property();
        frame.pending_name = None;
    }

    let entries = core::mem::take(&mut stack.current().entries);
    (shape.finish)(entries).map(Some)
}

// -- key/value pair ----------------------------------------------------------

pub(crate) fn key_value(
    conv: &KeyValueConverter,
    reader: &mut JsonReader<'_>,
    options: &SerializerOptions,
    stack: &mut ReadStack,
) -> Result<ReadOutcome> {
    drive(stack, |stack| key_value_inner(conv, reader, options, stack))
}

fn key_value_inner(
    conv: &KeyValueConverter,
    reader: &mut JsonReader<'_>,
    options: &SerializerOptions,
    stack: &mut ReadStack,
) -> Result<Option<Box<dyn Any>>> {
    let shape = conv.pair();
    if !stack.current().flags.has(Progress::START) {
        expect_start(reader, TokenType::StartObject)?;
        stack.current().flags.set(Progress::START);
    }

    loop {
        if !stack.current().flags.has(Progress::READ_NAME) {
            if !read_significant(reader)? {
                return Ok(None);
            }
            stack.current().flags.set(Progress::READ_NAME);
        }

        if !stack.current().flags.has(Progress::NAME) {
            match reader.token_type() {
                TokenType::EndObject => break,
                TokenType::PropertyName => {
                    let name = reader.get_string()?;
                    let case_insensitive = options.property_name_case_insensitive();
                    let matches = |candidate: &str| {
                        if case_insensitive {
                            candidate.eq_ignore_ascii_case(&name)
                        } else {
                            candidate == name
                        }
                    };
                    let pending = if matches(&conv.key_name) {
                        Pending::Member(0)
                    } else if matches(&conv.value_name) {
                        Pending::Member(1)
                    } else {
                        return Err(reader.err(ConversionError::UnknownPairMember(name)));
                    };
                    let frame = stack.current();
                    frame.pending = pending;
                    frame.pending_name = Some(name);
                    frame.flags.set(Progress::NAME);
                }
                _ => return Err(reader.err(StructuralError::ExpectedPropertyName)),
            }
        }

        if !stack.current().flags.has(Progress::READ_VALUE) {
            let needs_whole = stack.current().pending != Pending::Member(0)
                && needs_whole_value(&conv.value);
            if !surface_value(reader, needs_whole)? {
                return Ok(None);
            }
            stack.current().flags.set(Progress::READ_VALUE);
        }

        if !stack.current().flags.has(Progress::VALUE) {
            match stack.current().pending {
                Pending::Member(0) => {
                    if reader.token_type() != TokenType::String {
                        return Err(reader.err(ConversionError::TokenMismatch {
                            token: reader.token_type(),
                            target: "pair key",
                        }));
                    }
                    let key = reader.get_string()?;
                    let frame = stack.current();
                    frame.dict_key = Some(key);
                    frame.flags.set(Progress::VALUE);
                }
                _ => {
                    match conv.value.try_read(reader, shape.value, options, stack)? {
                        ReadOutcome::Suspend => return Ok(None),
                        ReadOutcome::Complete(value) => {
                            let frame = stack.current();
                            frame.items.push(value);
                            frame.flags.set(Progress::VALUE);
                        }
                    }
                }
            }
        }

        let frame = stack.current();
        frame.flags.next_property();
        frame.pending = Pending::None;
        frame.pending_name = None;
    }

    let frame = stack.current();
    let (Some(key), Some(value)) = (frame.dict_key.take(), frame.items.pop()) else {
        return Err(reader.err(ConversionError::IncompletePair));
    };
    Ok(Some((shape.join)(key, value)))
}
