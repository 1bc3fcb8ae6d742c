//! The converter abstraction.
//!
//! A [`Converter`] maps values of one type to and from JSON in terms of the
//! reader and writer. Converters come in three kinds: **simple** converters
//! finish in one call over already-buffered tokens; **resumable** converters
//! drive a frame on the converter stack and can suspend at any token
//! boundary; **factory** converters are never invoked directly, they
//! manufacture the concrete converter for a requested type.
//!
//! Contract: `try_read` is called with the reader positioned *on* the first
//! token of the value. A `Suspend` outcome means input ran out with all
//! progress saved in the stack; the same call is repeated once more input is
//! available. `try_write` returning `Ok(false)` means the write suspended
//! (output high-water mark reached) with progress saved; drain the sink and
//! repeat the call.

pub(crate) mod factory;
pub(crate) mod simple;

use std::any::Any;
use std::sync::Arc;

use crate::{
    descriptor::TypeRef,
    engine::{ReadStack, WriteStack},
    error::Result,
    options::SerializerOptions,
    reader::JsonReader,
    writer::JsonWriter,
};

/// How a converter participates in (de)serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterKind {
    /// Completes in one call; the engine buffers the whole value first.
    Simple,
    /// Drives a stack frame and may suspend mid-value.
    Resumable,
    /// Produces concrete converters; never reads or writes itself.
    Factory,
}

/// Outcome of a resumable read step.
pub enum ReadOutcome {
    /// The value is fully materialized.
    Complete(Box<dyn Any>),
    /// Input ran out; state is saved in the stack.
    Suspend,
}

/// Maps one type to and from JSON.
pub trait Converter: Send + Sync {
    /// The type this converter handles.
    fn converted_type(&self) -> TypeRef;

    fn kind(&self) -> ConverterKind {
        ConverterKind::Simple
    }

    /// Whether this converter can handle `ty`. The default accepts exactly
    /// the converted type.
    fn can_convert(&self, ty: TypeRef) -> bool {
        ty == self.converted_type()
    }

    /// Factory hook: produce the concrete converter for `ty`.
    fn build(
        &self,
        ty: TypeRef,
        options: &SerializerOptions,
    ) -> Option<Result<Arc<dyn Converter>>> {
        let _ = (ty, options);
        None
    }

    /// Reads one value. The reader is positioned on the value's first token.
    fn try_read(
        &self,
        reader: &mut JsonReader<'_>,
        ty: TypeRef,
        options: &SerializerOptions,
        stack: &mut ReadStack,
    ) -> Result<ReadOutcome>;

    /// Writes one value. Returns `Ok(false)` on suspension.
    fn try_write(
        &self,
        writer: &mut JsonWriter<'_>,
        value: &dyn Any,
        options: &SerializerOptions,
        stack: &mut WriteStack,
    ) -> Result<bool>;
}
