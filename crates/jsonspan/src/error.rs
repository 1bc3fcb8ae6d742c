//! Error types for reading, writing, and mapping JSON.
//!
//! Every fallible operation in this crate returns [`Error`]. An error carries
//! a classification ([`ErrorKind`]), the 0-based line and the byte offset
//! within that line where the input became invalid, and, when the mapping
//! engine was involved, a JSON-Path-like location string such as
//! `$.orders[3].id`.
//!
//! Running out of input is *not* an error: the reader and the mapping engine
//! signal it in-band by returning `Ok(false)` (or a suspend outcome) so the
//! caller can supply the next chunk and re-enter.

use thiserror::Error;

/// Alias for results produced by this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// An error raised while reading, writing, or mapping JSON.
#[derive(Debug, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    path: Option<String>,
    line: usize,
    byte_in_line: usize,
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(path) = &self.path {
            write!(f, " at {path}")?;
        }
        write!(f, " (line {}, byte {})", self.line, self.byte_in_line)
    }
}

impl Error {
    pub(crate) fn new(kind: impl Into<ErrorKind>, line: usize, byte_in_line: usize) -> Self {
        Self {
            kind: kind.into(),
            path: None,
            line,
            byte_in_line,
        }
    }

    /// Builds an error with no input position, for failures that are not tied
    /// to a place in the document (configuration, usage).
    pub(crate) fn detached(kind: impl Into<ErrorKind>) -> Self {
        Self::new(kind, 0, 0)
    }

    /// Attaches a location path unless one is already present.
    #[must_use]
    pub(crate) fn with_path(mut self, path: String) -> Self {
        self.path.get_or_insert(path);
        self
    }

    /// The error classification.
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// JSON-Path-like location of the failure, when the mapping engine was
    /// driving the document.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// 0-based line number of the failure in the input.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Byte offset of the failure within its line.
    #[must_use]
    pub fn byte_in_line(&self) -> usize {
        self.byte_in_line
    }
}

/// Top-level error classification.
#[derive(Debug, Error, PartialEq)]
pub enum ErrorKind {
    /// The input is not well-formed JSON.
    #[error("syntax error: {0}")]
    Structural(#[from] StructuralError),
    /// The JSON is well-formed but a value cannot be represented in the
    /// target type.
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),
    /// The options, converters, or descriptors are inconsistent.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    /// An output buffer could not be grown.
    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),
    /// The API was called in a way its contract forbids.
    #[error("invalid usage: {0}")]
    Usage(#[from] UsageError),
}

/// Well-formedness violations found while scanning or tokenizing input.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum StructuralError {
    #[error("unexpected byte 0x{0:02x}")]
    UnexpectedByte(u8),
    #[error("unexpected token {0:?}")]
    UnexpectedToken(crate::reader::TokenType),
    #[error("unexpected end of data")]
    UnexpectedEndOfData,
    #[error("nesting depth exceeds the configured maximum of {0}")]
    DepthExceeded(usize),
    #[error("close token does not match the open container")]
    MismatchedBracket,
    #[error("invalid escape sequence")]
    InvalidEscape,
    #[error("unpaired surrogate \\u{0:04X}")]
    LoneSurrogate(u32),
    #[error("invalid UTF-8 sequence in string")]
    InvalidUtf8,
    #[error("invalid number")]
    InvalidNumber,
    #[error("invalid literal")]
    InvalidLiteral,
    #[error("control character must be escaped in string")]
    UnescapedControl(u8),
    #[error("trailing comma is not allowed")]
    TrailingComma,
    #[error("comments are not allowed")]
    CommentNotAllowed,
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("expected a property name")]
    ExpectedPropertyName,
    #[error("expected ':' after property name")]
    ExpectedColon,
    #[error("expected ',' or the container end")]
    ExpectedCommaOrEnd,
    #[error("expected a value")]
    ExpectedValue,
}

/// A well-formed value could not be converted to or from the target type.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConversionError {
    #[error("number does not fit in {target}")]
    IntegerOverflow { target: &'static str },
    #[error("number is not an integer")]
    NotAnInteger,
    #[error("number is not representable as {target}")]
    InvalidNumber { target: &'static str },
    #[error("invalid ISO-8601 date-time")]
    InvalidDateTime,
    #[error("invalid GUID")]
    InvalidGuid,
    #[error("invalid base64 payload")]
    InvalidBase64,
    #[error("{0:?} is not a recognized enum name")]
    UnknownEnumName(String),
    #[error("non-finite floating point values cannot be written")]
    NonFiniteFloat,
    #[error("JSON null cannot populate non-nullable type {target}")]
    NullForNonNullable { target: &'static str },
    #[error("token {token:?} cannot populate {target}")]
    TokenMismatch {
        token: crate::reader::TokenType,
        target: &'static str,
    },
    #[error("{0:?} is not a member of the key/value pair form")]
    UnknownPairMember(String),
    #[error("key/value pair object is missing a member")]
    IncompletePair,
}

/// Options, converter, or descriptor inconsistencies.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigurationError {
    #[error("options are frozen after first use and can no longer change")]
    OptionsFrozen,
    #[error("converter for {converts} is not compatible with requested type {requested}")]
    ConverterTypeMismatch {
        converts: &'static str,
        requested: &'static str,
    },
    #[error("no converter available for type {0}")]
    NoConverter(&'static str),
    #[error("type {0} has no descriptor registered")]
    MissingDescriptor(&'static str),
    #[error("type {0} has no constructor and cannot be deserialized")]
    MissingConstructor(&'static str),
    #[error("type {0} declares more than one extension-data member")]
    DuplicateExtensionMember(&'static str),
}

/// Output-buffer failures.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum ResourceError {
    #[error("output sink refused to grow by {0} bytes")]
    GrowthRefused(usize),
}

/// Contract violations by the caller.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum UsageError {
    #[error("a property name is not valid here")]
    NameNotAllowed,
    #[error("a value must follow the pending property name")]
    ValueExpected,
    #[error("a property name must precede a value inside an object")]
    NameExpected,
    #[error("no container is open")]
    NothingToClose,
    #[error("close call does not match the open container")]
    MismatchedClose,
    #[error("a second root value is not valid")]
    SecondRootValue,
    #[error("accessor does not match the current token type")]
    WrongTokenAccessor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_position() {
        let err = Error::new(StructuralError::UnexpectedByte(b'x'), 2, 7);
        assert_eq!(err.to_string(), "syntax error: unexpected byte 0x78 (line 2, byte 7)");
    }

    #[test]
    fn display_includes_path_when_attached() {
        let err = Error::new(StructuralError::TrailingComma, 0, 3).with_path("$[1]".to_string());
        assert_eq!(
            err.to_string(),
            "syntax error: trailing comma is not allowed at $[1] (line 0, byte 3)"
        );
    }

    #[test]
    fn with_path_keeps_the_first_path() {
        let err = Error::detached(UsageError::NameExpected)
            .with_path("$.a".to_string())
            .with_path("$.b".to_string());
        assert_eq!(err.path(), Some("$.a"));
    }
}
