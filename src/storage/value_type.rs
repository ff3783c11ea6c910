//! Declared value types and their stored widths
//!
//! Every table holds values of a single declared type. Fixed-width
//! numeric types are parsed from their textual form and stored as
//! little-endian bytes of their natural width; strings are stored as-is
//! with a trailing NUL terminator.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Value type of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ValueType {
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    #[default]
    String,
}

/// A raw argument that does not parse as the declared type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {ty} value: {text:?}")]
pub struct ParseValueError {
    pub ty: ValueType,
    pub text: String,
}

impl ValueType {
    /// All variants, in declaration order
    pub const ALL: [ValueType; 6] = [
        ValueType::Int16,
        ValueType::Int32,
        ValueType::Int64,
        ValueType::Float,
        ValueType::Double,
        ValueType::String,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Int16 => "int16",
            ValueType::Int32 => "int32",
            ValueType::Int64 => "int64",
            ValueType::Float => "float",
            ValueType::Double => "double",
            ValueType::String => "string",
        }
    }

    /// Natural width of fixed-width types, `None` for strings
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            ValueType::Int16 => Some(2),
            ValueType::Int32 | ValueType::Float => Some(4),
            ValueType::Int64 | ValueType::Double => Some(8),
            ValueType::String => None,
        }
    }

    /// Number of bytes stored for `raw`
    pub fn width(self, raw: &[u8]) -> usize {
        self.fixed_width().unwrap_or(raw.len() + 1)
    }

    /// Convert a raw argument into its stored representation
    pub fn encode(self, raw: &[u8]) -> std::result::Result<Vec<u8>, ParseValueError> {
        if self == ValueType::String {
            let mut out = Vec::with_capacity(raw.len() + 1);
            out.extend_from_slice(raw);
            out.push(0);
            return Ok(out);
        }

        let invalid = || ParseValueError {
            ty: self,
            text: String::from_utf8_lossy(raw).into_owned(),
        };
        let text = std::str::from_utf8(raw).map_err(|_| invalid())?.trim();

        let encoded = match self {
            ValueType::Int16 => text.parse::<i16>().map(|v| v.to_le_bytes().to_vec()),
            ValueType::Int32 => text.parse::<i32>().map(|v| v.to_le_bytes().to_vec()),
            ValueType::Int64 => text.parse::<i64>().map(|v| v.to_le_bytes().to_vec()),
            ValueType::Float => {
                return text
                    .parse::<f32>()
                    .map(|v| v.to_le_bytes().to_vec())
                    .map_err(|_| invalid())
            }
            ValueType::Double => {
                return text
                    .parse::<f64>()
                    .map(|v| v.to_le_bytes().to_vec())
                    .map_err(|_| invalid())
            }
            ValueType::String => unreachable!("handled above"),
        };
        encoded.map_err(|_| invalid())
    }

    /// Render stored bytes back to the text sent to clients
    pub fn decode(self, stored: &[u8]) -> Vec<u8> {
        fn arr<const N: usize>(stored: &[u8]) -> [u8; N] {
            let mut buf = [0u8; N];
            let n = stored.len().min(N);
            buf[..n].copy_from_slice(&stored[..n]);
            buf
        }

        match self {
            ValueType::Int16 => i16::from_le_bytes(arr(stored)).to_string().into_bytes(),
            ValueType::Int32 => i32::from_le_bytes(arr(stored)).to_string().into_bytes(),
            ValueType::Int64 => i64::from_le_bytes(arr(stored)).to_string().into_bytes(),
            ValueType::Float => f32::from_le_bytes(arr(stored)).to_string().into_bytes(),
            ValueType::Double => f64::from_le_bytes(arr(stored)).to_string().into_bytes(),
            ValueType::String => match stored.split_last() {
                Some((0, rest)) => rest.to_vec(),
                _ => stored.to_vec(),
            },
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ValueType::ALL
            .into_iter()
            .find(|ty| ty.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidConfig(format!("unknown value type: {}", s)))
    }
}

impl TryFrom<String> for ValueType {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ValueType> for String {
    fn from(ty: ValueType) -> Self {
        ty.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_widths_ignore_input_length() {
        assert_eq!(ValueType::Int16.width(b"1"), 2);
        assert_eq!(ValueType::Int32.width(b"123456"), 4);
        assert_eq!(ValueType::Int64.width(b"1"), 8);
        assert_eq!(ValueType::Float.width(b"1.5"), 4);
        assert_eq!(ValueType::Double.width(b"1.25"), 8);
    }

    #[test]
    fn test_string_width_counts_terminator() {
        assert_eq!(ValueType::String.width(b"hello"), 6);
        assert_eq!(ValueType::String.width(b""), 1);
    }

    #[test]
    fn test_encode_matches_width() {
        for ty in ValueType::ALL {
            let raw: &[u8] = b"42";
            let encoded = ty.encode(raw).unwrap();
            assert_eq!(encoded.len(), ty.width(raw), "{}", ty);
        }
    }

    #[test]
    fn test_decode_renders_text() {
        let stored = ValueType::Int32.encode(b"-700").unwrap();
        assert_eq!(ValueType::Int32.decode(&stored), b"-700");

        let stored = ValueType::Double.encode(b"2.5").unwrap();
        assert_eq!(ValueType::Double.decode(&stored), b"2.5");

        let stored = ValueType::String.encode(b"bar").unwrap();
        assert_eq!(stored, b"bar\0");
        assert_eq!(ValueType::String.decode(&stored), b"bar");
    }

    #[test]
    fn test_encode_rejects_garbage() {
        let err = ValueType::Int16.encode(b"70000").unwrap_err();
        assert_eq!(err.ty, ValueType::Int16);
        assert!(ValueType::Int64.encode(b"abc").is_err());
        assert!(ValueType::Float.encode(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("INT64".parse::<ValueType>().unwrap(), ValueType::Int64);
        assert_eq!("string".parse::<ValueType>().unwrap(), ValueType::String);
        let err = "uint8".parse::<ValueType>().unwrap_err();
        assert!(err.is_fatal());
    }
}
