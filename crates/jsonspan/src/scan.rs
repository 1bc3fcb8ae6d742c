//! Byte-level scanners for whitespace, comments, strings, numbers, and
//! literals.
//!
//! Scanners operate directly on `&[u8]` input and never allocate. Each one
//! reports how far it got; running off the end of the buffer is surfaced as
//! the in-band [`Scan::NeedMoreData`] outcome rather than an error, so a
//! caller holding a partial document can fetch the next chunk and rescan from
//! the token start.

use crate::error::StructuralError;

/// Outcome of a scanner over a possibly incomplete buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scan<T> {
    /// The token is complete; the payload describes it.
    Complete(T),
    /// The buffer ended inside the token. Rescan with more input.
    NeedMoreData,
}

/// Result of scanning a string token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StringScan {
    /// Index one past the closing quote.
    pub end: usize,
    /// The content contains at least one backslash escape.
    pub needs_unescape: bool,
}

/// Advances past JSON whitespace (space, tab, CR, LF) starting at `pos`.
///
/// Returns the first non-whitespace index (possibly `buf.len()`) along with
/// the number of newlines crossed and the byte offset since the last newline,
/// which the reader folds into its line/column bookkeeping.
pub(crate) fn skip_whitespace(buf: &[u8], mut pos: usize) -> (usize, usize, usize) {
    let mut lines = 0;
    let mut line_start = None;
    while let Some(&b) = buf.get(pos) {
        match b {
            b'\n' => {
                lines += 1;
                line_start = Some(pos + 1);
                pos += 1;
            }
            b' ' | b'\t' | b'\r' => pos += 1,
            _ => break,
        }
    }
    let since_newline = line_start.map(|s| pos - s);
    (pos, lines, since_newline.unwrap_or(usize::MAX))
}

/// Scans a `//` or `/* */` comment whose first byte (`/`) sits at `pos`.
///
/// On success the payload is `(content_start, content_end, end)`: the span of
/// the comment interior and the index one past the whole comment. A `//`
/// comment is terminated by a newline or by the end of a final block; a block
/// comment must find its closing `*/`.
pub(crate) fn scan_comment(
    buf: &[u8],
    pos: usize,
    is_final: bool,
) -> Result<Scan<(usize, usize, usize)>, StructuralError> {
    debug_assert_eq!(buf[pos], b'/');
    let Some(&marker) = buf.get(pos + 1) else {
        return if is_final {
            Err(StructuralError::UnexpectedByte(b'/'))
        } else {
            Ok(Scan::NeedMoreData)
        };
    };
    match marker {
        b'/' => {
            let start = pos + 2;
            let mut i = start;
            while let Some(&b) = buf.get(i) {
                if b == b'\n' || b == b'\r' {
                    return Ok(Scan::Complete((start, i, i)));
                }
                i += 1;
            }
            if is_final {
                Ok(Scan::Complete((start, i, i)))
            } else {
                Ok(Scan::NeedMoreData)
            }
        }
        b'*' => {
            let start = pos + 2;
            let mut i = start;
            while i + 1 < buf.len() {
                if buf[i] == b'*' && buf[i + 1] == b'/' {
                    return Ok(Scan::Complete((start, i, i + 2)));
                }
                i += 1;
            }
            if is_final {
                Err(StructuralError::UnterminatedComment)
            } else {
                Ok(Scan::NeedMoreData)
            }
        }
        other => Err(StructuralError::UnexpectedByte(other)),
    }
}

/// Scans a string token whose opening quote sits at `pos`.
///
/// Validates escapes (including surrogate pairing for `\u`), rejects raw
/// control bytes, and checks UTF-8 well-formedness of unescaped content. The
/// scan does not produce the decoded text; see [`crate::escape::unescape`].
pub(crate) fn scan_string(buf: &[u8], pos: usize) -> Result<Scan<StringScan>, StructuralError> {
    debug_assert_eq!(buf[pos], b'"');
    let mut i = pos + 1;
    let mut needs_unescape = false;
    loop {
        let Some(&b) = buf.get(i) else {
            return Ok(Scan::NeedMoreData);
        };
        match b {
            b'"' => {
                return Ok(Scan::Complete(StringScan {
                    end: i + 1,
                    needs_unescape,
                }));
            }
            b'\\' => {
                needs_unescape = true;
                match scan_escape(buf, i)? {
                    Scan::Complete(next) => i = next,
                    Scan::NeedMoreData => return Ok(Scan::NeedMoreData),
                }
            }
            0x00..=0x1F => return Err(StructuralError::UnescapedControl(b)),
            0x20..=0x7F => i += 1,
            _ => match scan_utf8_sequence(buf, i)? {
                Scan::Complete(next) => i = next,
                Scan::NeedMoreData => return Ok(Scan::NeedMoreData),
            },
        }
    }
}

/// Validates one escape sequence whose backslash sits at `pos`; returns the
/// index after it. `\u` escapes that name a high surrogate must be followed
/// by a `\u` low surrogate.
fn scan_escape(buf: &[u8], pos: usize) -> Result<Scan<usize>, StructuralError> {
    let Some(&b) = buf.get(pos + 1) else {
        return Ok(Scan::NeedMoreData);
    };
    match b {
        b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't' => Ok(Scan::Complete(pos + 2)),
        b'u' => {
            let Some(first) = scan_hex4(buf, pos + 2)? else {
                return Ok(Scan::NeedMoreData);
            };
            match first {
                0xDC00..=0xDFFF => Err(StructuralError::LoneSurrogate(first)),
                0xD800..=0xDBFF => {
                    // A high surrogate must pair with an immediately
                    // following \uDC00..=\uDFFF escape.
                    let tail = pos + 6;
                    match (buf.get(tail), buf.get(tail + 1)) {
                        (Some(b'\\'), Some(b'u')) => {
                            let Some(second) = scan_hex4(buf, tail + 2)? else {
                                return Ok(Scan::NeedMoreData);
                            };
                            if (0xDC00..=0xDFFF).contains(&second) {
                                Ok(Scan::Complete(tail + 6))
                            } else {
                                Err(StructuralError::LoneSurrogate(first))
                            }
                        }
                        (None, _) | (Some(b'\\'), None) => Ok(Scan::NeedMoreData),
                        _ => Err(StructuralError::LoneSurrogate(first)),
                    }
                }
                _ => Ok(Scan::Complete(pos + 6)),
            }
        }
        _ => Err(StructuralError::InvalidEscape),
    }
}

/// Reads four hex digits at `pos`. `Ok(None)` means the buffer ended first.
fn scan_hex4(buf: &[u8], pos: usize) -> Result<Option<u32>, StructuralError> {
    let mut acc = 0u32;
    for i in 0..4 {
        let Some(&b) = buf.get(pos + i) else {
            return Ok(None);
        };
        let digit = match b {
            b'0'..=b'9' => u32::from(b - b'0'),
            b'a'..=b'f' => u32::from(b - b'a') + 10,
            b'A'..=b'F' => u32::from(b - b'A') + 10,
            _ => return Err(StructuralError::InvalidEscape),
        };
        acc = (acc << 4) | digit;
    }
    Ok(Some(acc))
}

/// Validates a multi-byte UTF-8 sequence starting at `pos`, returning the
/// index after it.
fn scan_utf8_sequence(buf: &[u8], pos: usize) -> Result<Scan<usize>, StructuralError> {
    let lead = buf[pos];
    let len = match lead {
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => return Err(StructuralError::InvalidUtf8),
    };
    if pos + len > buf.len() {
        // Continuation bytes may still arrive; make sure what we have so far
        // is plausible before asking for more.
        for &b in &buf[pos + 1..] {
            if b & 0xC0 != 0x80 {
                return Err(StructuralError::InvalidUtf8);
            }
        }
        return Ok(Scan::NeedMoreData);
    }
    let seq = &buf[pos..pos + len];
    if core::str::from_utf8(seq).is_err() {
        return Err(StructuralError::InvalidUtf8);
    }
    Ok(Scan::Complete(pos + len))
}

/// Scans a number token starting at `pos`.
///
/// Grammar: `-? (0 | [1-9][0-9]*) ('.' [0-9]+)? ([eE] [+-]? [0-9]+)?`.
/// Digits are not converted here; typed accessors parse lazily so the raw
/// bytes can round-trip. A number that reaches the end of a non-final buffer
/// could still continue, so it reports [`Scan::NeedMoreData`].
pub(crate) fn scan_number(
    buf: &[u8],
    pos: usize,
    is_final: bool,
) -> Result<Scan<usize>, StructuralError> {
    let mut i = pos;
    if buf.get(i) == Some(&b'-') {
        i += 1;
    }
    // Integer part: a lone 0, or a nonzero digit run. Leading zeros reject.
    match buf.get(i) {
        Some(b'0') => {
            i += 1;
            if matches!(buf.get(i), Some(b'0'..=b'9')) {
                return Err(StructuralError::InvalidNumber);
            }
        }
        Some(b'1'..=b'9') => {
            while matches!(buf.get(i), Some(b'0'..=b'9')) {
                i += 1;
            }
        }
        Some(_) => return Err(StructuralError::InvalidNumber),
        None => return need_more_or(is_final, Err(StructuralError::InvalidNumber)),
    }
    if i == buf.len() && !is_final {
        return Ok(Scan::NeedMoreData);
    }
    if buf.get(i) == Some(&b'.') {
        i += 1;
        if !matches!(buf.get(i), Some(b'0'..=b'9')) {
            return need_more_at_end(buf, i, is_final);
        }
        while matches!(buf.get(i), Some(b'0'..=b'9')) {
            i += 1;
        }
        if i == buf.len() && !is_final {
            return Ok(Scan::NeedMoreData);
        }
    }
    if matches!(buf.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(buf.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        if !matches!(buf.get(i), Some(b'0'..=b'9')) {
            return need_more_at_end(buf, i, is_final);
        }
        while matches!(buf.get(i), Some(b'0'..=b'9')) {
            i += 1;
        }
        if i == buf.len() && !is_final {
            return Ok(Scan::NeedMoreData);
        }
    }
    Ok(Scan::Complete(i))
}

fn need_more_or(
    is_final: bool,
    err: Result<Scan<usize>, StructuralError>,
) -> Result<Scan<usize>, StructuralError> {
    if is_final {
        err
    } else {
        Ok(Scan::NeedMoreData)
    }
}

fn need_more_at_end(
    buf: &[u8],
    i: usize,
    is_final: bool,
) -> Result<Scan<usize>, StructuralError> {
    if i >= buf.len() && !is_final {
        Ok(Scan::NeedMoreData)
    } else {
        Err(StructuralError::InvalidNumber)
    }
}

/// Scans the literal `true`, `false`, or `null` starting at `pos`, returning
/// the index after it.
pub(crate) fn scan_literal(
    buf: &[u8],
    pos: usize,
    literal: &'static [u8],
    is_final: bool,
) -> Result<Scan<usize>, StructuralError> {
    let available = &buf[pos..(pos + literal.len()).min(buf.len())];
    if available == &literal[..available.len()] {
        if available.len() == literal.len() {
            Ok(Scan::Complete(pos + literal.len()))
        } else if is_final {
            Err(StructuralError::InvalidLiteral)
        } else {
            Ok(Scan::NeedMoreData)
        }
    } else {
        Err(StructuralError::InvalidLiteral)
    }
}
