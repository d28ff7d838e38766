use std::fmt;

use bytes::{Buf, BufMut};

use crate::common::{DEFAULT_STRING_LEN, INT_SIZE, STRING_LEN_PREFIX};

use super::Field;

/// Represents the field types supported by the storage engine.
/// Every type has a fixed on-disk width, so a record's packed size is a
/// function of its schema alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// 32-bit signed integer: 4 bytes, big-endian
    Int,

    /// String of at most n bytes.
    /// Stored as: length (4 bytes, big-endian) + n bytes, zero-padded
    Str(u16),
}

impl FieldType {
    /// String type with the default maximum length.
    pub fn string() -> Self {
        FieldType::Str(DEFAULT_STRING_LEN)
    }

    /// Returns the number of bytes a field of this type occupies on disk.
    pub fn len(&self) -> usize {
        match self {
            FieldType::Int => INT_SIZE,
            FieldType::Str(n) => STRING_LEN_PREFIX + *n as usize,
        }
    }

    /// Returns the value a freshly constructed record holds for this type.
    pub fn default_field(&self) -> Field {
        match self {
            FieldType::Int => Field::Int(0),
            FieldType::Str(_) => Field::Str(String::new()),
        }
    }

    /// Reads one packed field of this type, consuming exactly `self.len()` bytes.
    /// The buffer must hold at least that many bytes.
    pub fn parse(&self, buf: &mut impl Buf) -> Field {
        match self {
            FieldType::Int => Field::Int(buf.get_i32()),
            FieldType::Str(n) => {
                let max = *n as usize;
                let len = (buf.get_u32() as usize).min(max);
                let mut raw = vec![0u8; max];
                buf.copy_to_slice(&mut raw);
                raw.truncate(len);
                Field::Str(String::from_utf8_lossy(&raw).into_owned())
            }
        }
    }

    /// Writes `field` packed as this type, producing exactly `self.len()` bytes.
    /// Strings longer than the maximum length are truncated.
    pub fn pack(&self, field: &Field, buf: &mut impl BufMut) {
        match (self, field) {
            (FieldType::Int, Field::Int(v)) => buf.put_i32(*v),
            (FieldType::Str(n), Field::Str(s)) => {
                let max = *n as usize;
                let bytes = truncate_str(s, max).as_bytes();
                buf.put_u32(bytes.len() as u32);
                buf.put_slice(bytes);
                buf.put_bytes(0, max - bytes.len());
            }
            // Mismatches are rejected when a field is assigned to a record
            (ty, _) => buf.put_bytes(0, ty.len()),
        }
    }
}

/// Cuts `s` to at most `max` bytes without splitting a character.
pub(crate) fn truncate_str(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int => write!(f, "INT"),
            FieldType::Str(n) => write!(f, "STRING({})", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widths() {
        assert_eq!(FieldType::Int.len(), 4);
        assert_eq!(FieldType::Str(10).len(), 14);
        assert_eq!(FieldType::string().len(), 4 + DEFAULT_STRING_LEN as usize);
    }

    #[test]
    fn test_int_packing_is_big_endian() {
        let mut buf = Vec::new();
        FieldType::Int.pack(&Field::Int(0x0102_0304), &mut buf);
        assert_eq!(buf, vec![1, 2, 3, 4]);
        assert_eq!(FieldType::Int.parse(&mut &buf[..]), Field::Int(0x0102_0304));
    }

    #[test]
    fn test_string_padding() {
        let ty = FieldType::Str(8);
        let mut buf = Vec::new();
        ty.pack(&Field::from("abc"), &mut buf);
        assert_eq!(buf.len(), ty.len());
        assert_eq!(&buf[..4], &[0, 0, 0, 3]);
        assert_eq!(&buf[4..7], b"abc");
        assert!(buf[7..].iter().all(|&b| b == 0));
        assert_eq!(ty.parse(&mut &buf[..]), Field::from("abc"));
    }

    #[test]
    fn test_string_truncation() {
        let ty = FieldType::Str(4);
        let mut buf = Vec::new();
        ty.pack(&Field::from("abcdefgh"), &mut buf);
        assert_eq!(buf.len(), 8);
        assert_eq!(ty.parse(&mut &buf[..]), Field::from("abcd"));
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        // 'é' is two bytes; cutting at 2 would split it
        assert_eq!(truncate_str("aé", 2), "a");
        assert_eq!(truncate_str("aé", 3), "aé");
    }

    #[test]
    fn test_display() {
        assert_eq!(FieldType::Int.to_string(), "INT");
        assert_eq!(FieldType::Str(16).to_string(), "STRING(16)");
    }
}
