//! The UTF-8 JSON writer.
//!
//! [`JsonWriter`] emits tokens into a caller-provided [`BufferSink`],
//! validating every transition against the grammar unless validation is
//! switched off. Output is compact by default; indented mode inserts
//! newlines and two-space indentation. Like the reader, the writer can be
//! torn down mid-document with [`JsonWriter::into_state`] and rebuilt over
//! the same sink after the caller drains it, which is how the mapping engine
//! suspends long writes.
//!
//! # Examples
//!
//! ```
//! use jsonspan::writer::{JsonWriter, WriterOptions, WriterState};
//!
//! let mut out = Vec::new();
//! let mut writer = JsonWriter::new(&mut out, WriterState::new(WriterOptions::default()));
//! writer.write_start_object().unwrap();
//! writer.write_property_name("answer").unwrap();
//! writer.write_i64(42).unwrap();
//! writer.write_end_object().unwrap();
//! writer.flush();
//! assert_eq!(out, br#"{"answer":42}"#);
//! ```

use chrono::{DateTime, FixedOffset, SecondsFormat};
use uuid::Uuid;

use crate::{
    bitstack::BitStack,
    error::{ConversionError, Error, Result, ResourceError, StructuralError, UsageError},
    escape::{self, Escaper},
    reader::TokenType,
};

/// A growable byte buffer the writer emits into.
///
/// The writer asks for headroom with [`request`](Self::request) before each
/// burst of output; implementations may over-allocate. `Vec<u8>` is the
/// canonical sink.
pub trait BufferSink {
    /// Ensures at least `additional` bytes can be appended.
    fn request(&mut self, additional: usize) -> core::result::Result<(), ResourceError>;
    /// Appends bytes. Only called after a successful `request`.
    fn push_bytes(&mut self, bytes: &[u8]);
}

impl BufferSink for Vec<u8> {
    fn request(&mut self, additional: usize) -> core::result::Result<(), ResourceError> {
        self.try_reserve(additional)
            .map_err(|_| ResourceError::GrowthRefused(additional))
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Writer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Pretty-print with newlines and two-space indentation.
    pub indented: bool,
    /// Escape policy for strings and property names.
    pub escaper: Escaper,
    /// Disables grammar validation. The caller is then responsible for
    /// producing well-formed output.
    pub skip_validation: bool,
    /// Maximum container nesting depth.
    pub max_depth: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            indented: false,
            escaper: Escaper::default(),
            skip_validation: false,
            max_depth: 64,
        }
    }
}

impl WriterOptions {
    /// Options with the given indentation and everything else default.
    #[must_use]
    pub fn indented(indented: bool) -> Self {
        Self {
            indented,
            ..Self::default()
        }
    }
}

/// Resumable writer state, carried when a writer is rebuilt over a drained
/// sink mid-document.
#[derive(Debug, Clone, PartialEq)]
pub struct WriterState {
    bits: BitStack,
    prev: TokenType,
    /// A separator is owed before the next token at the same level.
    need_separator: bool,
    /// A property name has been written and its value is pending.
    pending_name: bool,
    written: u64,
    committed: u64,
    options: WriterOptions,
}

impl WriterState {
    /// Fresh state for the start of a document.
    #[must_use]
    pub fn new(options: WriterOptions) -> Self {
        Self {
            bits: BitStack::default(),
            prev: TokenType::None,
            need_separator: false,
            pending_name: false,
            written: 0,
            committed: 0,
            options,
        }
    }

    /// True once the root value is complete.
    #[must_use]
    pub fn root_complete(&self) -> bool {
        self.bits.is_empty() && self.prev.closes_value()
    }
}

/// Emits JSON tokens into a [`BufferSink`].
pub struct JsonWriter<'a> {
    sink: &'a mut dyn BufferSink,
    st: WriterState,
}

impl<'a> JsonWriter<'a> {
    /// Creates a writer over `sink`, continuing from `state`.
    pub fn new(sink: &'a mut dyn BufferSink, state: WriterState) -> Self {
        Self { sink, st: state }
    }

    /// Total bytes made visible to the sink's consumer by `flush`.
    #[must_use]
    pub fn bytes_committed(&self) -> u64 {
        self.st.committed
    }

    /// Bytes written since the last `flush`.
    #[must_use]
    pub fn bytes_pending(&self) -> u64 {
        self.st.written - self.st.committed
    }

    /// Current container nesting depth.
    #[must_use]
    pub fn current_depth(&self) -> usize {
        self.st.bits.len()
    }

    /// Marks everything written so far as committed to the sink.
    pub fn flush(&mut self) {
        self.st.committed = self.st.written;
    }

    /// Clears all document state so the writer can produce a fresh document
    /// into the same sink.
    pub fn reset(&mut self) {
        self.st = WriterState::new(self.st.options);
    }

    /// Consumes the writer, returning the state for a later continuation.
    #[must_use]
    pub fn into_state(self) -> WriterState {
        self.st
    }

    // -- containers ----------------------------------------------------------

    /// Writes `{`.
    pub fn write_start_object(&mut self) -> Result<()> {
        self.start_container(true)
    }

    /// Writes `[`.
    pub fn write_start_array(&mut self) -> Result<()> {
        self.start_container(false)
    }

    /// Writes `}`.
    pub fn write_end_object(&mut self) -> Result<()> {
        self.end_container(true)
    }

    /// Writes `]`.
    pub fn write_end_array(&mut self) -> Result<()> {
        self.end_container(false)
    }

    fn start_container(&mut self, is_object: bool) -> Result<()> {
        self.validate_value_position()?;
        if self.st.bits.len() >= self.st.options.max_depth {
            return Err(Error::detached(StructuralError::DepthExceeded(
                self.st.options.max_depth,
            )));
        }
        self.before_value()?;
        self.push(if is_object { b"{" } else { b"[" })?;
        self.st.bits.push(is_object);
        self.st.prev = if is_object {
            TokenType::StartObject
        } else {
            TokenType::StartArray
        };
        self.st.need_separator = false;
        self.st.pending_name = false;
        Ok(())
    }

    fn end_container(&mut self, is_object: bool) -> Result<()> {
        if !self.st.options.skip_validation {
            match self.st.bits.peek() {
                None => return Err(Error::detached(UsageError::NothingToClose)),
                Some(top) if top != is_object => {
                    return Err(Error::detached(UsageError::MismatchedClose));
                }
                Some(_) if self.st.pending_name => {
                    return Err(Error::detached(UsageError::ValueExpected));
                }
                Some(_) => {}
            }
        }
        let was_empty = matches!(self.st.prev, TokenType::StartObject | TokenType::StartArray);
        self.st.bits.pop();
        if self.st.options.indented && !was_empty {
            self.newline_indent()?;
        }
        self.push(if is_object { b"}" } else { b"]" })?;
        self.st.prev = if is_object {
            TokenType::EndObject
        } else {
            TokenType::EndArray
        };
        self.st.need_separator = true;
        Ok(())
    }

    // -- names ---------------------------------------------------------------

    /// Writes a property name and its `:` separator.
    pub fn write_property_name(&mut self, name: &str) -> Result<()> {
        self.validate_name_position()?;
        self.before_name()?;
        self.push_quoted(name)?;
        self.finish_name()
    }

    /// Writes a property name whose quoted, already-escaped bytes were
    /// prepared ahead of time (descriptor tables cache these).
    pub(crate) fn write_preescaped_name(&mut self, quoted: &[u8]) -> Result<()> {
        self.validate_name_position()?;
        self.before_name()?;
        self.push(quoted)?;
        self.finish_name()
    }

    fn finish_name(&mut self) -> Result<()> {
        self.push(if self.st.options.indented { b": " } else { b":" })?;
        self.st.prev = TokenType::PropertyName;
        self.st.pending_name = true;
        self.st.need_separator = false;
        Ok(())
    }

    fn validate_name_position(&self) -> Result<()> {
        if self.st.options.skip_validation {
            return Ok(());
        }
        if self.st.pending_name {
            return Err(Error::detached(UsageError::ValueExpected));
        }
        match self.st.bits.peek() {
            Some(true) => Ok(()),
            _ => Err(Error::detached(UsageError::NameNotAllowed)),
        }
    }

    // -- scalar values -------------------------------------------------------

    /// Writes a string value, escaping per the configured policy.
    pub fn write_string(&mut self, text: &str) -> Result<()> {
        self.validate_value_position()?;
        self.before_value()?;
        self.push_quoted(text)?;
        self.complete_value(TokenType::String);
        Ok(())
    }

    /// Writes `true` or `false`.
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.validate_value_position()?;
        self.before_value()?;
        self.push(if value { b"true" } else { b"false" })?;
        self.complete_value(if value { TokenType::True } else { TokenType::False });
        Ok(())
    }

    /// Writes `null`.
    pub fn write_null(&mut self) -> Result<()> {
        self.validate_value_position()?;
        self.before_value()?;
        self.push(b"null")?;
        self.complete_value(TokenType::Null);
        Ok(())
    }

    /// Writes a signed integer.
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        let mut digits = itoa::Buffer::new();
        self.write_number_text(digits.format(value))
    }

    /// Writes an unsigned integer.
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        let mut digits = itoa::Buffer::new();
        self.write_number_text(digits.format(value))
    }

    /// Writes a double in its shortest round-trip form. Non-finite values
    /// are a conversion error; JSON has no representation for them.
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::detached(ConversionError::NonFiniteFloat));
        }
        let mut digits = ryu::Buffer::new();
        self.write_number_text(digits.format_finite(value))
    }

    /// Writes a single-precision float in its shortest round-trip form.
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::detached(ConversionError::NonFiniteFloat));
        }
        let mut digits = ryu::Buffer::new();
        self.write_number_text(digits.format_finite(value))
    }

    fn write_number_text(&mut self, text: &str) -> Result<()> {
        self.validate_value_position()?;
        self.before_value()?;
        self.push(text.as_bytes())?;
        self.complete_value(TokenType::Number);
        Ok(())
    }

    /// Writes a date-time as a round-trippable ISO-8601 string with its
    /// offset (`Z` for UTC).
    pub fn write_datetime(&mut self, value: &DateTime<FixedOffset>) -> Result<()> {
        self.write_string(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    /// Writes a GUID as 32 hex digits with dashes, no braces.
    pub fn write_uuid(&mut self, value: Uuid) -> Result<()> {
        let mut scratch = Uuid::encode_buffer();
        let text = value.hyphenated().encode_lower(&mut scratch);
        self.write_string(text)
    }

    /// Writes binary data as a base64 string value. Base64 output contains
    /// no escapable characters under either policy, so it streams straight
    /// into the sink.
    pub fn write_base64_string(&mut self, data: &[u8]) -> Result<()> {
        use base64::Engine as _;
        self.validate_value_position()?;
        self.before_value()?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(data);
        self.push(b"\"")?;
        self.push(encoded.as_bytes())?;
        self.push(b"\"")?;
        self.complete_value(TokenType::String);
        Ok(())
    }

    /// Writes caller-supplied bytes as one value. The payload is trusted to
    /// be well-formed JSON; only its structural position is validated.
    pub fn write_raw_value(&mut self, raw: &[u8]) -> Result<()> {
        if raw.is_empty() {
            return Err(Error::detached(UsageError::ValueExpected));
        }
        self.validate_value_position()?;
        self.before_value()?;
        self.push(raw)?;
        self.complete_value(TokenType::String);
        Ok(())
    }

    // -- internals -----------------------------------------------------------

    fn validate_value_position(&self) -> Result<()> {
        if self.st.options.skip_validation {
            return Ok(());
        }
        match self.st.bits.peek() {
            // Inside an object a value is only legal after its name.
            Some(true) if !self.st.pending_name => Err(Error::detached(UsageError::NameExpected)),
            None if self.st.prev != TokenType::None => {
                Err(Error::detached(UsageError::SecondRootValue))
            }
            _ => Ok(()),
        }
    }

    /// Separator and indentation owed before a value token.
    fn before_value(&mut self) -> Result<()> {
        if self.st.pending_name {
            return Ok(());
        }
        if self.st.need_separator {
            self.push(b",")?;
        }
        if self.st.options.indented && !self.st.bits.is_empty() {
            self.newline_indent()?;
        }
        Ok(())
    }

    /// Separator and indentation owed before a property name.
    fn before_name(&mut self) -> Result<()> {
        if self.st.need_separator {
            self.push(b",")?;
        }
        if self.st.options.indented {
            self.newline_indent()?;
        }
        Ok(())
    }

    fn complete_value(&mut self, token: TokenType) {
        self.st.prev = token;
        self.st.pending_name = false;
        self.st.need_separator = true;
    }

    fn newline_indent(&mut self) -> Result<()> {
        const SPACES: &[u8] = &[b' '; 64];
        self.push(b"\n")?;
        let mut remaining = self.st.bits.len() * 2;
        while remaining > 0 {
            let take = remaining.min(SPACES.len());
            self.push(&SPACES[..take])?;
            remaining -= take;
        }
        Ok(())
    }

    fn push_quoted(&mut self, text: &str) -> Result<()> {
        self.push(b"\"")?;
        if escape::needs_escaping(text.as_bytes(), self.st.options.escaper).is_none() {
            self.push(text.as_bytes())?;
        } else {
            let mut scratch = Vec::with_capacity(text.len() + 8);
            escape::escape_into(text, self.st.options.escaper, &mut scratch);
            self.push(&scratch)?;
        }
        self.push(b"\"")
    }

    fn push(&mut self, bytes: &[u8]) -> Result<()> {
        self.sink
            .request(bytes.len())
            .map_err(Error::detached)?;
        self.sink.push_bytes(bytes);
        self.st.written += bytes.len() as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
