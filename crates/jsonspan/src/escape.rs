//! String escape analysis and transcoding.
//!
//! The writer escapes outgoing text according to an [`Escaper`] policy, and
//! the reader unescapes incoming string content that the scanner flagged.
//! Both directions work on raw UTF-8 bytes; `\uXXXX` escapes are decoded with
//! surrogate pairing and re-encoded as UTF-8.

use crate::error::StructuralError;

/// Selects which characters the writer escapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Escaper {
    /// Escapes `"` `\` `<` `>` `&` `'` `+`, every control byte, and every
    /// non-ASCII scalar. The output is safe to embed in ASCII-only
    /// transports and HTML-adjacent contexts.
    #[default]
    AsciiSafe,
    /// Escapes only `"` `\` and control bytes, passing UTF-8 through.
    Relaxed,
}

impl Escaper {
    fn must_escape_ascii(self, b: u8) -> bool {
        match self {
            Self::AsciiSafe => {
                b < 0x20 || matches!(b, b'"' | b'\\' | b'<' | b'>' | b'&' | b'\'' | b'+')
            }
            Self::Relaxed => b < 0x20 || matches!(b, b'"' | b'\\'),
        }
    }

    fn escapes_non_ascii(self) -> bool {
        matches!(self, Self::AsciiSafe)
    }
}

/// Returns the index of the first byte that requires escaping under the
/// policy, or `None` when the text can be emitted verbatim.
///
/// The input must be valid UTF-8.
pub(crate) fn needs_escaping(bytes: &[u8], escaper: Escaper) -> Option<usize> {
    bytes.iter().position(|&b| {
        if b < 0x80 {
            escaper.must_escape_ascii(b)
        } else {
            escaper.escapes_non_ascii()
        }
    })
}

/// Appends the escaped form of `text` to `out` (without surrounding quotes).
pub(crate) fn escape_into(text: &str, escaper: Escaper, out: &mut Vec<u8>) {
    let bytes = text.as_bytes();
    let mut plain_start = 0;
    let mut iter = text.char_indices();
    while let Some((i, ch)) = iter.next() {
        let escaped: Option<EscapeForm> = if (ch as u32) < 0x80 {
            let b = ch as u8;
            if escaper.must_escape_ascii(b) {
                Some(short_escape(b).map_or_else(|| EscapeForm::Unicode(ch), EscapeForm::Short))
            } else {
                None
            }
        } else if escaper.escapes_non_ascii() {
            Some(EscapeForm::Unicode(ch))
        } else {
            None
        };
        let Some(form) = escaped else { continue };
        out.extend_from_slice(&bytes[plain_start..i]);
        match form {
            EscapeForm::Short(pair) => out.extend_from_slice(&pair),
            EscapeForm::Unicode(ch) => push_unicode_escape(ch, out),
        }
        plain_start = i + ch.len_utf8();
    }
    out.extend_from_slice(&bytes[plain_start..]);
}

enum EscapeForm {
    Short([u8; 2]),
    Unicode(char),
}

fn short_escape(b: u8) -> Option<[u8; 2]> {
    let second = match b {
        b'"' => b'"',
        b'\\' => b'\\',
        0x08 => b'b',
        0x0C => b'f',
        b'\n' => b'n',
        b'\r' => b'r',
        b'\t' => b't',
        _ => return None,
    };
    Some([b'\\', second])
}

/// Emits `\uXXXX`, using a surrogate pair for astral-plane scalars.
fn push_unicode_escape(ch: char, out: &mut Vec<u8>) {
    let code = ch as u32;
    if code >= 0x1_0000 {
        let reduced = code - 0x1_0000;
        push_hex4(0xD800 + (reduced >> 10), out);
        push_hex4(0xDC00 + (reduced & 0x3FF), out);
    } else {
        push_hex4(code, out);
    }
}

fn push_hex4(code: u32, out: &mut Vec<u8>) {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    out.extend_from_slice(&[
        b'\\',
        b'u',
        HEX[(code >> 12) as usize & 0xF],
        HEX[(code >> 8) as usize & 0xF],
        HEX[(code >> 4) as usize & 0xF],
        HEX[code as usize & 0xF],
    ]);
}

/// Decodes the escaped interior of a string token into `out`, returning the
/// number of bytes written.
///
/// `src` is the raw content between the quotes. The scanner has already
/// validated the escapes, but decoding revalidates surrogate pairing so this
/// function is safe to call on any input.
pub(crate) fn unescape(src: &[u8], out: &mut Vec<u8>) -> Result<usize, StructuralError> {
    let start_len = out.len();
    let mut i = 0;
    while i < src.len() {
        let b = src[i];
        if b != b'\\' {
            // Copy the maximal escape-free run in one shot.
            let run_end = src[i..]
                .iter()
                .position(|&c| c == b'\\')
                .map_or(src.len(), |p| i + p);
            out.extend_from_slice(&src[i..run_end]);
            i = run_end;
            continue;
        }
        let esc = *src.get(i + 1).ok_or(StructuralError::InvalidEscape)?;
        match esc {
            b'"' => out.push(b'"'),
            b'\\' => out.push(b'\\'),
            b'/' => out.push(b'/'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'u' => {
                let first = read_hex4(src, i + 2)?;
                let scalar = match first {
                    0xDC00..=0xDFFF => return Err(StructuralError::LoneSurrogate(first)),
                    0xD800..=0xDBFF => {
                        if src.get(i + 6) != Some(&b'\\') || src.get(i + 7) != Some(&b'u') {
                            return Err(StructuralError::LoneSurrogate(first));
                        }
                        let second = read_hex4(src, i + 8)?;
                        if !(0xDC00..=0xDFFF).contains(&second) {
                            return Err(StructuralError::LoneSurrogate(first));
                        }
                        i += 6;
                        0x1_0000 + ((first - 0xD800) << 10) + (second - 0xDC00)
                    }
                    code => code,
                };
                let ch = char::from_u32(scalar).ok_or(StructuralError::InvalidEscape)?;
                let mut utf8 = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
                i += 4;
            }
            _ => return Err(StructuralError::InvalidEscape),
        }
        i += 2;
    }
    Ok(out.len() - start_len)
}

fn read_hex4(src: &[u8], pos: usize) -> Result<u32, StructuralError> {
    let mut acc = 0u32;
    for offset in 0..4 {
        let b = *src.get(pos + offset).ok_or(StructuralError::InvalidEscape)?;
        let digit = match b {
            b'0'..=b'9' => u32::from(b - b'0'),
            b'a'..=b'f' => u32::from(b - b'a') + 10,
            b'A'..=b'F' => u32::from(b - b'A') + 10,
            _ => return Err(StructuralError::InvalidEscape),
        };
        acc = (acc << 4) | digit;
    }
    Ok(acc)
}

/// Decodes a string token interior straight into an owned `String`.
pub(crate) fn unescape_to_string(src: &[u8]) -> Result<String, StructuralError> {
    let mut out = Vec::with_capacity(src.len());
    unescape(src, &mut out)?;
    String::from_utf8(out).map_err(|_| StructuralError::InvalidUtf8)
}
