//! Percent-encoding of GTF column and attribute text.
//!
//! GTF reserves a handful of characters (tabs, newlines, and in the attribute
//! column also `;`, `,`, `=` and `&`). These, along with `%` itself, control
//! characters and every byte `>= 0x7F`, are written as `%XX` with uppercase,
//! zero-padded hex. Escaping works over the UTF-8 bytes of a string, so a
//! multi-byte character becomes several `%XX` groups and decodes back to the
//! same character.

use std::borrow::Cow;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Bytes that must be escaped in any column.
fn is_reserved_in_column(byte: u8) -> bool {
    byte == b'%' || byte < 0x20 || byte >= 0x7F
}

/// Bytes that must be escaped in an attribute key or value.
fn is_reserved_in_attribute(byte: u8) -> bool {
    is_reserved_in_column(byte) || matches!(byte, b';' | b'=' | b'&' | b',')
}

fn escape_with(value: &str, reserved: fn(u8) -> bool) -> Cow<'_, str> {
    if !value.bytes().any(reserved) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 8);
    for byte in value.bytes() {
        if reserved(byte) {
            escaped.push('%');
            escaped.push(HEX_DIGITS[(byte >> 4) as usize] as char);
            escaped.push(HEX_DIGITS[(byte & 0x0F) as usize] as char);
        } else {
            escaped.push(byte as char);
        }
    }
    Cow::Owned(escaped)
}

/// Escape a value for use as an attribute key or value.
pub fn escape(value: &str) -> Cow<'_, str> {
    escape_with(value, is_reserved_in_attribute)
}

/// Escape a value for use in one of the eight fixed columns, which
/// do not need `;` or `,` escaping.
pub fn escape_column(value: &str) -> Cow<'_, str> {
    escape_with(value, is_reserved_in_column)
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Decode `%XX` sequences back to their bytes. A `%` that is not
/// followed by two hex digits is kept as is.
pub fn unescape(value: &str) -> Cow<'_, str> {
    if !value.contains('%') {
        return Cow::Borrowed(value);
    }
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                decoded.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    match String::from_utf8(decoded) {
        Ok(s) => Cow::Owned(s),
        Err(e) => Cow::Owned(String::from_utf8_lossy(e.as_bytes()).into_owned()),
    }
}

/// Null-transparent [`unescape()`]: an absent column stays absent,
/// which keeps it distinct from an empty one.
pub fn unescape_optional(value: Option<&str>) -> Option<String> {
    value.map(|s| unescape(s).into_owned())
}
