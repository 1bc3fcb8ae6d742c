//! The pull-based UTF-8 JSON reader.
//!
//! [`JsonReader`] tokenizes one input span at a time. `read()` surfaces the
//! next token and returns `Ok(false)` when the span ends before the token
//! does; the caller then extracts the [`ReaderState`] with
//! [`JsonReader::into_state`], obtains more input, and constructs a new
//! reader over a buffer that begins at [`JsonReader::bytes_consumed`]. Token
//! values are unowned slices into the input; nothing is copied or allocated
//! until a typed accessor asks for it.
//!
//! # Examples
//!
//! ```
//! use jsonspan::reader::{JsonReader, ReaderOptions, ReaderState, TokenType};
//!
//! let state = ReaderState::new(ReaderOptions::default());
//! let mut reader = JsonReader::new(b"[1,2]", true, state);
//! assert!(reader.read().unwrap());
//! assert_eq!(reader.token_type(), TokenType::StartArray);
//! assert!(reader.read().unwrap());
//! assert_eq!(reader.try_get_i32().unwrap(), 1);
//! ```

use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

use crate::{
    bitstack::BitStack,
    error::{ConversionError, Error, Result, StructuralError, UsageError},
    escape,
    scan::{self, Scan},
};

/// How the reader treats `//` and `/* */` comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentHandling {
    /// A comment is a structural error.
    #[default]
    Disallow,
    /// Comments are consumed silently.
    Skip,
    /// Comments surface as [`TokenType::Comment`] tokens.
    Allow,
}

/// Reader configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Maximum container nesting depth. Inputs nested deeper fail with a
    /// structural error before the over-deep token is produced.
    pub max_depth: usize,
    /// Permits `[1,]` and `{"a":1,}`.
    pub allow_trailing_commas: bool,
    /// Comment policy.
    pub comment_handling: CommentHandling,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            max_depth: 64,
            allow_trailing_commas: false,
            comment_handling: CommentHandling::Disallow,
        }
    }
}

/// The kind of the current token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenType {
    /// No token has been produced yet.
    #[default]
    None,
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    PropertyName,
    Comment,
    String,
    Number,
    True,
    False,
    Null,
}

impl TokenType {
    /// True for tokens that complete a JSON value at their nesting level.
    pub(crate) fn closes_value(self) -> bool {
        matches!(
            self,
            Self::EndObject
                | Self::EndArray
                | Self::String
                | Self::Number
                | Self::True
                | Self::False
                | Self::Null
        )
    }
}

/// What the grammar expects next. The explicit expectation state is what
/// makes resumption and comment interleaving tractable: a comment token can
/// surface from any state without disturbing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Expect {
    #[default]
    RootValue,
    /// Property name or `}` (after `{`, or after `,` with trailing commas
    /// permitted).
    NameOrClose,
    /// Property name only (after `,` in strict mode; `}` here is a trailing
    /// comma error).
    Name,
    /// `:` after a property name.
    Colon,
    /// The value of the pending property.
    MemberValue,
    /// Element or `]`.
    ElementOrClose,
    /// Element only (after `,` in strict mode).
    ElementValue,
    /// `,` or the container close.
    CommaOrClose,
    /// The root value is complete; only trailing whitespace may follow.
    Done,
}

/// Resumable reader state, carried between input spans.
///
/// The state is deliberately small and cheap to clone: the nesting bitmap,
/// the grammar expectation, position counters, and the options.
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderState {
    bits: BitStack,
    expect: Expect,
    prev: TokenType,
    line: usize,
    byte_in_line: usize,
    total_consumed: u64,
    bom_checked: bool,
    paused_in_value: bool,
    skip_target: Option<usize>,
    options: ReaderOptions,
}

impl ReaderState {
    /// Fresh state for the start of a document.
    #[must_use]
    pub fn new(options: ReaderOptions) -> Self {
        Self {
            bits: BitStack::default(),
            expect: Expect::RootValue,
            prev: TokenType::None,
            line: 0,
            byte_in_line: 0,
            total_consumed: 0,
            bom_checked: false,
            paused_in_value: false,
            skip_target: None,
            options,
        }
    }

    /// The options this state was created with.
    #[must_use]
    pub fn options(&self) -> ReaderOptions {
        self.options
    }

    /// Total bytes consumed across every span read so far.
    #[must_use]
    pub fn total_consumed(&self) -> u64 {
        self.total_consumed
    }

    /// True once the root value has been fully tokenized.
    #[must_use]
    pub fn root_complete(&self) -> bool {
        self.expect == Expect::Done
    }
}

/// Pull parser over one UTF-8 input span.
#[derive(Debug, Clone)]
pub struct JsonReader<'a> {
    buf: &'a [u8],
    is_final: bool,
    /// Cursor within `buf`; runs ahead of `consumed` only inside `read`.
    pos: usize,
    /// Committed token boundary. Rolled back to on `NeedMoreData`.
    consumed: usize,
    token: TokenType,
    value: (usize, usize),
    value_escaped: bool,
    st: ReaderState,
}

/// Checkpoint for rolling back to the last token boundary. Covers the
/// cursor, the position counters, and the grammar expectation (a pause can
/// land after `:` or `,` was consumed, and those bytes will be re-scanned).
#[derive(Clone, Copy)]
struct Checkpoint {
    pos: usize,
    line: usize,
    byte_in_line: usize,
    expect: Expect,
}

impl<'a> JsonReader<'a> {
    /// Creates a reader over `buf`.
    ///
    /// `is_final` declares that no further input exists beyond this span.
    /// When resuming, `buf` must begin at the previous reader's
    /// [`bytes_consumed`](Self::bytes_consumed) offset.
    #[must_use]
    pub fn new(buf: &'a [u8], is_final: bool, state: ReaderState) -> Self {
        Self {
            buf,
            is_final,
            pos: 0,
            consumed: 0,
            token: TokenType::None,
            value: (0, 0),
            value_escaped: false,
            st: state,
        }
    }

    /// The kind of the current token.
    #[must_use]
    pub fn token_type(&self) -> TokenType {
        self.token
    }

    /// The raw bytes of the current token value (string content without
    /// quotes and before unescaping, number digits, literal text, comment
    /// interior). Empty for structural tokens.
    #[must_use]
    pub fn value_span(&self) -> &'a [u8] {
        &self.buf[self.value.0..self.value.1]
    }

    /// True when the current string token still contains backslash escapes.
    #[must_use]
    pub fn value_is_escaped(&self) -> bool {
        self.value_escaped
    }

    /// True when the reader had to pause inside a string or number because
    /// the span ended. Cleared once the token completes after resumption.
    #[must_use]
    pub fn has_value_sequence(&self) -> bool {
        self.st.paused_in_value
    }

    /// Number of containers currently open.
    #[must_use]
    pub fn current_depth(&self) -> usize {
        self.st.bits.len()
    }

    /// Bytes of this span consumed through the last complete token. The next
    /// span presented after a pause must begin here.
    #[must_use]
    pub fn bytes_consumed(&self) -> usize {
        self.consumed
    }

    /// Consumes the reader and returns the state to carry to the next span.
    #[must_use]
    pub fn into_state(mut self) -> ReaderState {
        self.st.total_consumed += self.consumed as u64;
        self.st.prev = self.token;
        self.st
    }

    /// Advances to the next token.
    ///
    /// Returns `Ok(true)` when a token was produced, `Ok(false)` when the
    /// span ended first (or, on a final span, when the document is already
    /// complete and only whitespace remains).
    pub fn read(&mut self) -> Result<bool> {
        if self.skip_bom() == Scan::NeedMoreData {
            return Ok(false);
        }
        self.consumed = self.pos;
        let entry = self.checkpoint();
        match self.read_inner() {
            Ok(true) => {
                self.consumed = self.pos;
                Ok(true)
            }
            Ok(false) => {
                self.rollback(entry);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn read_inner(&mut self) -> Result<bool> {
        loop {
            self.skip_ws();
            let Some(&b) = self.buf.get(self.pos) else {
                return self.at_end_of_span();
            };
            if b == b'/' {
                match self.handle_comment()? {
                    CommentStep::Token => return Ok(true),
                    CommentStep::Skipped => continue,
                    CommentStep::NeedMore => return Ok(false),
                }
            }
            return match self.st.expect {
                Expect::RootValue | Expect::MemberValue => self.parse_value(b),
                Expect::ElementValue => {
                    if b == b']' {
                        Err(self.err(StructuralError::TrailingComma))
                    } else {
                        self.parse_value(b)
                    }
                }
                Expect::ElementOrClose => {
                    if b == b']' {
                        self.close_container(b)
                    } else {
                        self.parse_value(b)
                    }
                }
                Expect::NameOrClose => {
                    if b == b'}' {
                        self.close_container(b)
                    } else {
                        self.parse_name(b)
                    }
                }
                Expect::Name => {
                    if b == b'}' {
                        Err(self.err(StructuralError::TrailingComma))
                    } else {
                        self.parse_name(b)
                    }
                }
                Expect::Colon => {
                    if b == b':' {
                        self.bump(1);
                        self.st.expect = Expect::MemberValue;
                        continue;
                    }
                    Err(self.err(StructuralError::ExpectedColon))
                }
                Expect::CommaOrClose => match b {
                    b',' => {
                        self.bump(1);
                        let in_object = self.st.bits.peek() == Some(true);
                        self.st.expect = match (in_object, self.st.options.allow_trailing_commas) {
                            (true, true) => Expect::NameOrClose,
                            (true, false) => Expect::Name,
                            (false, true) => Expect::ElementOrClose,
                            (false, false) => Expect::ElementValue,
                        };
                        continue;
                    }
                    b'}' | b']' => self.close_container(b),
                    _ => Err(self.err(StructuralError::ExpectedCommaOrEnd)),
                },
                Expect::Done => Err(self.err(StructuralError::UnexpectedByte(b))),
            };
        }
    }

    fn at_end_of_span(&mut self) -> Result<bool> {
        if !self.is_final {
            return Ok(false);
        }
        match self.st.expect {
            Expect::Done => Ok(false),
            _ => Err(self.err(StructuralError::UnexpectedEndOfData)),
        }
    }

    /// Handles a `/` at the cursor under the configured comment policy.
    fn handle_comment(&mut self) -> Result<CommentStep> {
        if self.st.options.comment_handling == CommentHandling::Disallow {
            return Err(self.err(StructuralError::CommentNotAllowed));
        }
        match scan::scan_comment(self.buf, self.pos, self.is_final) {
            Ok(Scan::Complete((start, end, after))) => {
                let span = &self.buf[self.pos..after];
                self.advance_over(span.len(), span);
                if self.st.options.comment_handling == CommentHandling::Allow {
                    self.token = TokenType::Comment;
                    self.value = (start, end);
                    self.value_escaped = false;
                    Ok(CommentStep::Token)
                } else {
                    Ok(CommentStep::Skipped)
                }
            }
            Ok(Scan::NeedMoreData) => Ok(CommentStep::NeedMore),
            Err(e) => Err(self.err(e)),
        }
    }

    fn parse_name(&mut self, b: u8) -> Result<bool> {
        if b != b'"' {
            return Err(self.err(StructuralError::ExpectedPropertyName));
        }
        match scan::scan_string(self.buf, self.pos).map_err(|e| self.err(e))? {
            Scan::Complete(s) => {
                self.finish_token(
                    TokenType::PropertyName,
                    (self.pos + 1, s.end - 1),
                    s.needs_unescape,
                    s.end - self.pos,
                );
                self.st.expect = Expect::Colon;
                Ok(true)
            }
            Scan::NeedMoreData => self.pause_in_value(),
        }
    }

    /// Parses a value whose first byte is `b`.
    fn parse_value(&mut self, b: u8) -> Result<bool> {
        match b {
            b'{' => self.open_container(true),
            b'[' => self.open_container(false),
            b'"' => match scan::scan_string(self.buf, self.pos).map_err(|e| self.err(e))? {
                Scan::Complete(s) => {
                    self.finish_token(
                        TokenType::String,
                        (self.pos + 1, s.end - 1),
                        s.needs_unescape,
                        s.end - self.pos,
                    );
                    self.after_scalar();
                    Ok(true)
                }
                Scan::NeedMoreData => self.pause_in_value(),
            },
            b'-' | b'0'..=b'9' => {
                match scan::scan_number(self.buf, self.pos, self.is_final)
                    .map_err(|e| self.err(e))?
                {
                    Scan::Complete(end) => {
                        self.finish_token(
                            TokenType::Number,
                            (self.pos, end),
                            false,
                            end - self.pos,
                        );
                        self.after_scalar();
                        Ok(true)
                    }
                    Scan::NeedMoreData => self.pause_in_value(),
                }
            }
            b't' => self.parse_literal(b"true", TokenType::True),
            b'f' => self.parse_literal(b"false", TokenType::False),
            b'n' => self.parse_literal(b"null", TokenType::Null),
            b'}' | b']' => {
                // A close bracket where a value is required: distinguish the
                // wrong bracket for the open container from a premature
                // close of the right one.
                let closing_object = b == b'}';
                match self.st.bits.peek() {
                    Some(top) if top != closing_object => {
                        Err(self.err(StructuralError::MismatchedBracket))
                    }
                    Some(_) => Err(self.err(StructuralError::ExpectedValue)),
                    None => Err(self.err(StructuralError::UnexpectedByte(b))),
                }
            }
            _ => Err(self.err(StructuralError::ExpectedValue)),
        }
    }

    fn parse_literal(&mut self, literal: &'static [u8], token: TokenType) -> Result<bool> {
        match scan::scan_literal(self.buf, self.pos, literal, self.is_final)
            .map_err(|e| self.err(e))?
        {
            Scan::Complete(end) => {
                self.finish_token(token, (self.pos, end), false, end - self.pos);
                self.after_scalar();
                Ok(true)
            }
            Scan::NeedMoreData => Ok(false),
        }
    }

    fn open_container(&mut self, is_object: bool) -> Result<bool> {
        if self.st.bits.len() >= self.st.options.max_depth {
            return Err(self.err(StructuralError::DepthExceeded(self.st.options.max_depth)));
        }
        self.st.bits.push(is_object);
        let token = if is_object {
            TokenType::StartObject
        } else {
            TokenType::StartArray
        };
        self.finish_token(token, (self.pos, self.pos), false, 1);
        self.st.expect = if is_object {
            Expect::NameOrClose
        } else {
            Expect::ElementOrClose
        };
        Ok(true)
    }

    fn close_container(&mut self, b: u8) -> Result<bool> {
        let closing_object = b == b'}';
        match self.st.bits.peek() {
            Some(is_object) if is_object == closing_object => {}
            Some(_) => return Err(self.err(StructuralError::MismatchedBracket)),
            None => return Err(self.err(StructuralError::UnexpectedByte(b))),
        }
        self.st.bits.pop();
        let token = if closing_object {
            TokenType::EndObject
        } else {
            TokenType::EndArray
        };
        self.finish_token(token, (self.pos, self.pos), false, 1);
        self.after_scalar();
        Ok(true)
    }

    /// Sets the expectation that follows any completed value.
    fn after_scalar(&mut self) {
        self.st.expect = if self.st.bits.is_empty() {
            Expect::Done
        } else {
            Expect::CommaOrClose
        };
    }

    fn finish_token(
        &mut self,
        token: TokenType,
        value: (usize, usize),
        escaped: bool,
        raw_len: usize,
    ) {
        self.bump(raw_len);
        self.token = token;
        self.st.prev = token;
        self.value = value;
        self.value_escaped = escaped;
        self.st.paused_in_value = false;
    }

    fn pause_in_value(&mut self) -> Result<bool> {
        self.st.paused_in_value = true;
        Ok(false)
    }

    // -- position bookkeeping ------------------------------------------------

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            line: self.st.line,
            byte_in_line: self.st.byte_in_line,
            expect: self.st.expect,
        }
    }

    fn rollback(&mut self, c: Checkpoint) {
        self.pos = c.pos;
        self.st.line = c.line;
        self.st.byte_in_line = c.byte_in_line;
        self.st.expect = c.expect;
    }

    fn skip_bom(&mut self) -> Scan<()> {
        if self.st.bom_checked {
            return Scan::Complete(());
        }
        if self.st.total_consumed == 0 && self.pos == 0 {
            if self.buf.len() < 3
                && !self.is_final
                && !self.buf.is_empty()
                && self.buf == &[0xEF, 0xBB][..self.buf.len()]
            {
                // Possible BOM prefix; decide once more bytes arrive.
                return Scan::NeedMoreData;
            }
            if self.buf.starts_with(&[0xEF, 0xBB, 0xBF]) {
                self.pos = 3;
                self.st.byte_in_line = 3;
            }
        }
        self.st.bom_checked = true;
        Scan::Complete(())
    }

    fn skip_ws(&mut self) {
        let (next, lines, since_newline) = scan::skip_whitespace(self.buf, self.pos);
        if lines > 0 {
            self.st.line += lines;
            self.st.byte_in_line = since_newline;
        } else {
            self.st.byte_in_line += next - self.pos;
        }
        self.pos = next;
    }

    /// Advances the cursor over `len` bytes whose content (`span`) may
    /// contain newlines (comments do; tokens never).
    fn advance_over(&mut self, len: usize, span: &[u8]) {
        let newlines = span.iter().filter(|&&b| b == b'\n').count();
        if newlines > 0 {
            self.st.line += newlines;
            let last = span.iter().rposition(|&b| b == b'\n').unwrap_or(0);
            self.st.byte_in_line = len - last - 1;
        } else {
            self.st.byte_in_line += len;
        }
        self.pos += len;
    }

    fn bump(&mut self, len: usize) {
        self.pos += len;
        self.st.byte_in_line += len;
    }

    pub(crate) fn err(&self, kind: impl Into<crate::error::ErrorKind>) -> Error {
        Error::new(kind, self.st.line, self.st.byte_in_line)
    }

    // -- skipping ------------------------------------------------------------

    /// Skips the value at the current position: the children of a start
    /// token, or the value of the current property name. Resumable; when it
    /// returns `Ok(false)` the skip target is carried in the state and a
    /// later call continues where it stopped.
    pub fn try_skip(&mut self) -> Result<bool> {
        if self.st.skip_target.is_none() {
            let target = match self.token {
                TokenType::PropertyName => self.current_depth(),
                TokenType::StartObject | TokenType::StartArray => self.current_depth() - 1,
                _ => return Ok(true),
            };
            self.st.skip_target = Some(target);
        }
        self.continue_skip()
    }

    fn continue_skip(&mut self) -> Result<bool> {
        let target = self.st.skip_target.unwrap_or_default();
        loop {
            if !self.read()? {
                return Ok(false);
            }
            if self.current_depth() <= target && self.token.closes_value() {
                self.st.skip_target = None;
                return Ok(true);
            }
        }
    }

    // -- typed accessors -----------------------------------------------------

    /// Decodes the current string or property-name token into an owned
    /// `String`, unescaping if needed.
    pub fn get_string(&self) -> Result<String> {
        if !matches!(self.token, TokenType::String | TokenType::PropertyName) {
            return Err(self.err(UsageError::WrongTokenAccessor));
        }
        let span = self.value_span();
        if self.value_escaped {
            escape::unescape_to_string(span).map_err(|e| self.err(e))
        } else {
            core::str::from_utf8(span)
                .map(str::to_owned)
                .map_err(|_| self.err(StructuralError::InvalidUtf8))
        }
    }

    /// The current boolean token's value.
    pub fn try_get_bool(&self) -> Result<bool> {
        match self.token {
            TokenType::True => Ok(true),
            TokenType::False => Ok(false),
            _ => Err(self.err(UsageError::WrongTokenAccessor)),
        }
    }

    /// Parses the current number token as `i32`.
    pub fn try_get_i32(&self) -> Result<i32> {
        let wide = self.try_get_i64()?;
        i32::try_from(wide)
            .map_err(|_| self.err(ConversionError::IntegerOverflow { target: "i32" }))
    }

    /// Parses the current number token as `i64`. Fails with a conversion
    /// error when the token carries a fraction or exponent.
    pub fn try_get_i64(&self) -> Result<i64> {
        let text = self.number_text()?;
        if !is_integer_form(text) {
            return Err(self.err(ConversionError::NotAnInteger));
        }
        text.parse()
            .map_err(|_| self.err(ConversionError::IntegerOverflow { target: "i64" }))
    }

    /// Parses the current number token as `u64`.
    pub fn try_get_u64(&self) -> Result<u64> {
        let text = self.number_text()?;
        if !is_integer_form(text) {
            return Err(self.err(ConversionError::NotAnInteger));
        }
        text.parse()
            .map_err(|_| self.err(ConversionError::IntegerOverflow { target: "u64" }))
    }

    /// Parses the current number token as `f64`.
    pub fn try_get_f64(&self) -> Result<f64> {
        let text = self.number_text()?;
        text.parse()
            .map_err(|_| self.err(ConversionError::InvalidNumber { target: "f64" }))
    }

    /// Parses the current string token as an ISO-8601 date-time with offset.
    pub fn try_get_datetime(&self) -> Result<DateTime<FixedOffset>> {
        let text = self.get_string()?;
        DateTime::parse_from_rfc3339(&text).map_err(|_| self.err(ConversionError::InvalidDateTime))
    }

    /// Parses the current string token as a hyphenated GUID.
    pub fn try_get_uuid(&self) -> Result<Uuid> {
        let text = self.get_string()?;
        if text.len() != 36 {
            return Err(self.err(ConversionError::InvalidGuid));
        }
        Uuid::parse_str(&text).map_err(|_| self.err(ConversionError::InvalidGuid))
    }

    /// Decodes the current string token as base64.
    pub fn try_get_base64(&self) -> Result<Vec<u8>> {
        use base64::Engine as _;
        let text = self.get_string()?;
        base64::engine::general_purpose::STANDARD
            .decode(text)
            .map_err(|_| self.err(ConversionError::InvalidBase64))
    }

    /// The interior text of the current comment token.
    pub fn get_comment(&self) -> Result<&'a str> {
        if self.token != TokenType::Comment {
            return Err(self.err(UsageError::WrongTokenAccessor));
        }
        core::str::from_utf8(self.value_span()).map_err(|_| self.err(StructuralError::InvalidUtf8))
    }

    fn number_text(&self) -> Result<&'a str> {
        if self.token != TokenType::Number {
            return Err(self.err(UsageError::WrongTokenAccessor));
        }
        core::str::from_utf8(self.value_span()).map_err(|_| self.err(StructuralError::InvalidUtf8))
    }
}

enum CommentStep {
    Token,
    Skipped,
    NeedMore,
}

fn is_integer_form(text: &str) -> bool {
    !text.contains(['.', 'e', 'E'])
}
