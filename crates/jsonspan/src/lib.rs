//! Resumable UTF-8 JSON reading, writing, and object mapping over byte
//! spans.
//!
//! `jsonspan` has three tightly coupled layers:
//!
//! - a pull-based [`reader`] that tokenizes one `&[u8]` span at a time and
//!   can pause at any token boundary when input runs out, resuming on the
//!   next span with carried [`reader::ReaderState`];
//! - a [`writer`] that emits validated (optionally indented) JSON into a
//!   growable [`writer::BufferSink`], with the mirror-image ability to
//!   suspend and continue over the same sink;
//! - a converter [`engine`] that maps typed values to and from JSON through
//!   descriptor tables ([`descriptor`]) and a registry of converters,
//!   keeping its progress in an explicit frame stack so a single logical
//!   (de)serialize can be driven across many input chunks without ever
//!   recursing the host call stack.
//!
//! The layers share one memory model: token values are unowned slices into
//! the input, escape handling is deferred until someone asks for decoded
//! text, and running out of data is an in-band signal (`Ok(false)` /
//! `Suspend`), never an error.
//!
//! # Reading tokens from chunked input
//!
//! ```
//! use jsonspan::reader::{JsonReader, ReaderOptions, ReaderState, TokenType};
//!
//! // First chunk ends in the middle of a number.
//! let state = ReaderState::new(ReaderOptions::default());
//! let mut reader = JsonReader::new(b"[12", false, state);
//! assert!(reader.read().unwrap()); // [
//! assert!(!reader.read().unwrap()); // need more data
//! let consumed = reader.bytes_consumed();
//! let state = reader.into_state();
//!
//! // Resume with a buffer that begins where the last one left off.
//! let rest = b"[1234]";
//! let mut reader = JsonReader::new(&rest[consumed..], true, state);
//! assert!(reader.read().unwrap());
//! assert_eq!(reader.token_type(), TokenType::Number);
//! assert_eq!(reader.try_get_i32().unwrap(), 1234);
//! ```
//!
//! # Mapping typed values
//!
//! ```
//! use std::sync::Arc;
//!
//! use jsonspan::{
//!     descriptor::ClassShape,
//!     engine::{from_slice, to_vec},
//!     options::SerializerOptions,
//! };
//!
//! #[derive(Clone, Default, PartialEq, Debug)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! let options = Arc::new(SerializerOptions::new());
//! options
//!     .register_class(
//!         ClassShape::of::<Point>()
//!             .constructor(Point::default)
//!             .property("x", |p: &Point| p.x, |p, v| p.x = v)
//!             .property("y", |p: &Point| p.y, |p, v| p.y = v),
//!     )
//!     .unwrap();
//!
//! let point: Point = from_slice(br#"{"x":1,"y":2}"#, &options).unwrap();
//! assert_eq!(point, Point { x: 1, y: 2 });
//! assert_eq!(to_vec(&point, &options).unwrap(), br#"{"x":1,"y":2}"#);
//! ```

mod bitstack;
mod escape;
mod registry;
mod scan;

pub mod convert;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod options;
pub mod path;
pub mod reader;
pub mod value;
pub mod writer;

pub use convert::{Converter, ConverterKind, ReadOutcome};
pub use engine::{from_slice, from_slice_default, to_vec, to_vec_default, Deserializer, Serializer};
pub use error::{Error, ErrorKind, Result};
pub use escape::Escaper;
pub use options::{ExtensionDataConflict, NamingPolicy, SerializerOptions};
pub use reader::{CommentHandling, JsonReader, ReaderOptions, ReaderState, TokenType};
pub use value::JsonValue;
pub use writer::{BufferSink, JsonWriter, WriterOptions, WriterState};

#[cfg(test)]
mod tests;
