//! Entry points that drive a whole (de)serialize.
//!
//! [`Deserializer`] is the chunk-feeding front: feed it byte spans as they
//! arrive and it returns the finished value once the document completes,
//! carrying the reader state, the converter stack, and the unread tail
//! between calls. [`Serializer`] is the mirror for writing: each step runs
//! until the document finishes or the output high-water mark is reached,
//! letting the caller drain the sink between steps. `from_slice` / `to_vec`
//! are the one-shot conveniences layered on top.
//!
//! # Examples
//!
//! ```
//! use jsonspan::{
//!     descriptor::{CollectionShape, TypeShape},
//!     engine::from_slice,
//!     options::SerializerOptions,
//! };
//!
//! let options = std::sync::Arc::new(SerializerOptions::new());
//! options
//!     .register_type(TypeShape::Collection(CollectionShape::of_vec::<i32>()))
//!     .unwrap();
//! let value: Vec<i32> = from_slice(b"[1,2,3]", &options).unwrap();
//! assert_eq!(value, [1, 2, 3]);
//! ```

use std::any::Any;
use std::sync::Arc;

use crate::{
    convert::{Converter, ConverterKind, ReadOutcome},
    descriptor::TypeRef,
    engine::{read_significant, ReadStack, WriteStack},
    error::{ConfigurationError, Error, Result, StructuralError, UsageError},
    options::SerializerOptions,
    reader::{JsonReader, ReaderState},
    registry::resolve_converter,
    writer::{BufferSink, JsonWriter, WriterState},
};

/// Resumable deserialization driver.
pub struct Deserializer {
    declared: TypeRef,
    options: Arc<SerializerOptions>,
    converter: Arc<dyn Converter>,
    stack: ReadStack,
    state: Option<ReaderState>,
    tail: Vec<u8>,
    root_surfaced: bool,
    finished: bool,
}

impl Deserializer {
    /// Creates a driver for values of `declared`. Freezes the options.
    pub fn new(declared: TypeRef, options: &Arc<SerializerOptions>) -> Result<Self> {
        options.freeze();
        let converter = resolve_converter(options, declared)?;
        Ok(Self {
            declared,
            options: options.clone(),
            converter,
            stack: ReadStack::new(options.max_depth()),
            state: None,
            tail: Vec::new(),
            root_surfaced: false,
            finished: false,
        })
    }

    /// Feeds the next chunk. Returns the finished value once the document
    /// completes; `None` means more input is needed.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Option<Box<dyn Any>>> {
        self.advance(chunk, false)
    }

    /// Feeds the final chunk (possibly empty) and requires completion.
    pub fn finish(&mut self, chunk: &[u8]) -> Result<Box<dyn Any>> {
        match self.advance(chunk, true)? {
            Some(value) => Ok(value),
            None => Err(Error::detached(StructuralError::UnexpectedEndOfData)),
        }
    }

    fn advance(&mut self, chunk: &[u8], is_final: bool) -> Result<Option<Box<dyn Any>>> {
        if self.finished {
            return Err(Error::detached(UsageError::SecondRootValue));
        }
        let mut buf = core::mem::take(&mut self.tail);
        buf.extend_from_slice(chunk);
        let state = self
            .state
            .take()
            .unwrap_or_else(|| ReaderState::new(self.options.reader_options()));
        let mut reader = JsonReader::new(&buf, is_final, state);

        let outcome = self.pump(&mut reader);

        let consumed = reader.bytes_consumed();
        self.state = Some(reader.into_state());
        self.tail = buf.split_off(consumed);

        match outcome {
            Ok(Some(value)) => {
                self.finished = true;
                Ok(Some(value))
            }
            other => other,
        }
    }

    fn pump(&mut self, reader: &mut JsonReader<'_>) -> Result<Option<Box<dyn Any>>> {
        let result = self.pump_inner(reader);
        result.map_err(|e| e.with_path(self.stack.path()))
    }

    fn pump_inner(&mut self, reader: &mut JsonReader<'_>) -> Result<Option<Box<dyn Any>>> {
        if !self.root_surfaced {
            if self.converter.kind() != ConverterKind::Resumable {
                // Non-resumable root converters get the same whole-value
                // guarantee the engine gives members: nothing is consumed
                // until a probe proves the document is fully buffered.
                let mut probe = reader.clone();
                if !read_significant(&mut probe)? {
                    return Ok(None);
                }
                if !probe.try_skip()? {
                    return Ok(None);
                }
            }
            if !read_significant(reader)? {
                return Ok(None);
            }
            self.root_surfaced = true;
        }

        match self
            .converter
            .try_read(reader, self.declared, &self.options, &mut self.stack)?
        {
            ReadOutcome::Suspend => Ok(None),
            ReadOutcome::Complete(value) => {
                // Nothing but whitespace (or skipped comments) may follow.
                read_significant(reader)?;
                Ok(Some(value))
            }
        }
    }
}

/// Resumable serialization driver.
pub struct Serializer {
    declared: TypeRef,
    options: Arc<SerializerOptions>,
    converter: Arc<dyn Converter>,
    stack: WriteStack,
    state: Option<WriterState>,
    finished: bool,
}

impl Serializer {
    /// Creates a driver for values of `declared`. Freezes the options.
    pub fn new(declared: TypeRef, options: &Arc<SerializerOptions>) -> Result<Self> {
        options.freeze();
        let converter = resolve_converter(options, declared)?;
        Ok(Self {
            declared,
            options: options.clone(),
            converter,
            stack: WriteStack::new(options.max_depth(), options.default_buffer_size()),
            state: None,
            finished: false,
        })
    }

    /// Runs one write step into `sink`. Returns `true` when the document is
    /// complete; on `false`, drain the sink and call again with the same
    /// value.
    pub fn write_step(&mut self, value: &dyn Any, sink: &mut dyn BufferSink) -> Result<bool> {
        if self.finished {
            return Ok(true);
        }
        // The root honors runtime polymorphism the same way members do.
        let converter = if value.type_id() == self.declared.id {
            self.converter.clone()
        } else {
            resolve_converter(
                &self.options,
                TypeRef {
                    id: value.type_id(),
                    name: "<runtime type>",
                },
            )?
        };
        let state = self
            .state
            .take()
            .unwrap_or_else(|| WriterState::new(self.options.writer_options()));
        let mut writer = JsonWriter::new(sink, state);
        let done = converter
            .try_write(&mut writer, value, &self.options, &mut self.stack)
            .map_err(|e| e.with_path(self.stack.path()))?;
        writer.flush();
        self.state = Some(writer.into_state());
        self.finished = done;
        Ok(done)
    }
}

/// One-shot deserialization of a complete byte span into `T`.
pub fn from_slice<T: 'static>(bytes: &[u8], options: &Arc<SerializerOptions>) -> Result<T> {
    let mut driver = Deserializer::new(TypeRef::of::<T>(), options)?;
    let boxed = driver.finish(bytes)?;
    boxed.downcast::<T>().map(|b| *b).map_err(|_| {
        Error::detached(ConfigurationError::ConverterTypeMismatch {
            converts: "produced value",
            requested: core::any::type_name::<T>(),
        })
    })
}

/// One-shot deserialization with the process-wide default options.
pub fn from_slice_default<T: 'static>(bytes: &[u8]) -> Result<T> {
    from_slice(bytes, SerializerOptions::shared_default())
}

/// One-shot serialization of `value` to a byte vector.
pub fn to_vec<T: 'static>(value: &T, options: &Arc<SerializerOptions>) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut driver = Serializer::new(TypeRef::of::<T>(), options)?;
    while !driver.write_step(value, &mut out)? {
        // A Vec sink absorbs everything; each step just continues.
    }
    Ok(out)
}

/// One-shot serialization with the process-wide default options.
pub fn to_vec_default<T: 'static>(value: &T) -> Result<Vec<u8>> {
    to_vec(value, SerializerOptions::shared_default())
}
