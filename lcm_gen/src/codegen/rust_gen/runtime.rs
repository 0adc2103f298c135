/* Shared runtime unit emitted once next to the generated types.
   Holds the big-endian read/write helpers and the error type every generated
   codec returns. */

use std::fmt::Write;

const RUNTIME_SOURCE: &str = r##"/// Errors returned by generated codecs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    TooShort { needed: usize, available: usize },
    FingerprintMismatch { expected: u64, actual: u64 },
    InvalidStringLength { length: u32 },
    InvalidUtf8,
    MissingTerminator,
    ImplausibleCount { count: usize, remaining: usize },
    NegativeLength { member: &'static str, value: i64 },
    SizeMismatch { expected: usize, actual: usize },
    DerivedSizeMismatch {
        member: &'static str,
        authoritative: &'static str,
        array: &'static str,
        expected: usize,
        actual: usize,
    },
    LengthOverflow { member: &'static str, length: usize },
    StringTooLong { length: usize },
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::TooShort { needed, available } => {
                write!(f, "buffer too short: need {needed} bytes, have {available}")
            }
            CodecError::FingerprintMismatch { expected, actual } => {
                write!(f, "fingerprint mismatch: expected {expected:#018x}, got {actual:#018x}")
            }
            CodecError::InvalidStringLength { length } => {
                write!(f, "invalid string length prefix {length}")
            }
            CodecError::InvalidUtf8 => f.write_str("string is not valid UTF-8"),
            CodecError::MissingTerminator => f.write_str("string does not end with a NUL terminator"),
            CodecError::ImplausibleCount { count, remaining } => {
                write!(f, "{count} empty elements claimed with only {remaining} bytes left")
            }
            CodecError::NegativeLength { member, value } => {
                write!(f, "size member '{member}' decoded as negative value {value}")
            }
            CodecError::SizeMismatch { expected, actual } => {
                write!(f, "payload is {actual} bytes but the decoded value needs {expected}")
            }
            CodecError::DerivedSizeMismatch { member, authoritative, array, expected, actual } => write!(
                f,
                "array '{array}' has length {actual} but '{member}' is {expected} (from '{authoritative}')"
            ),
            CodecError::LengthOverflow { member, length } => {
                write!(f, "length {length} does not fit size member '{member}'")
            }
            CodecError::StringTooLong { length } => {
                write!(f, "string of {length} bytes does not fit a u32 length prefix")
            }
        }
    }
}

impl std::error::Error for CodecError {}

/// Cursor over a payload.
pub struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Rejects a decoded element count the rest of the buffer cannot hold.
    /// Elements of `min_width` 0 are capped at one per remaining byte.
    pub fn check_count(&self, count: usize, min_width: usize) -> Result<(), CodecError> {
        let remaining = self.remaining();
        if min_width == 0 {
            if count > remaining {
                return Err(CodecError::ImplausibleCount { count, remaining });
            }
            return Ok(());
        }
        let needed = count.saturating_mul(min_width);
        if needed > remaining {
            return Err(CodecError::TooShort {
                needed: self.offset.saturating_add(needed),
                available: self.data.len(),
            });
        }
        Ok(())
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let bytes = self.take_slice(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn take_slice(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < len {
            return Err(CodecError::TooShort { needed: self.offset + len, available: self.data.len() });
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.take::<1>()?[0] != 0)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, CodecError> {
        Ok(i8::from_be_bytes(self.take()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, CodecError> {
        Ok(i16::from_be_bytes(self.take()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        Ok(i32::from_be_bytes(self.take()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, CodecError> {
        Ok(i64::from_be_bytes(self.take()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_be_bytes(self.take()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, CodecError> {
        Ok(f32::from_bits(u32::from_be_bytes(self.take()?)))
    }

    pub fn read_f64(&mut self) -> Result<f64, CodecError> {
        Ok(f64::from_bits(u64::from_be_bytes(self.take()?)))
    }

    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let length = u32::from_be_bytes(self.take()?);
        if length < 1 {
            return Err(CodecError::InvalidStringLength { length });
        }
        let bytes = self.take_slice(length as usize)?;
        let (content, terminator) = bytes.split_at(bytes.len() - 1);
        if terminator != [0] {
            return Err(CodecError::MissingTerminator);
        }
        String::from_utf8(content.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }
}

pub fn write_bool(out: &mut Vec<u8>, value: bool) {
    out.push(u8::from(value));
}

pub fn write_u8(out: &mut Vec<u8>, value: u8) {
    out.push(value);
}

pub fn write_i8(out: &mut Vec<u8>, value: i8) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn write_i16(out: &mut Vec<u8>, value: i16) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn write_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn write_i64(out: &mut Vec<u8>, value: i64) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn write_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn write_f32(out: &mut Vec<u8>, value: f32) {
    out.extend_from_slice(&value.to_bits().to_be_bytes());
}

pub fn write_f64(out: &mut Vec<u8>, value: f64) {
    out.extend_from_slice(&value.to_bits().to_be_bytes());
}

pub fn write_string(out: &mut Vec<u8>, value: &str) -> Result<(), CodecError> {
    let length = u32::try_from(value.len() + 1)
        .map_err(|_| CodecError::StringTooLong { length: value.len() })?;
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(value.as_bytes());
    out.push(0);
    Ok(())
}

/// Encoded size of a string: length prefix, content, terminator.
pub fn string_size(value: &str) -> usize {
    4 + value.len() + 1
}

/// Records the length of one governed array level. The first observation is
/// authoritative, later ones must match it.
pub fn observe_len(
    slot: &mut Option<(usize, &'static str)>,
    member: &'static str,
    array: &'static str,
    actual: usize,
) -> Result<(), CodecError> {
    match *slot {
        None => {
            *slot = Some((actual, array));
            Ok(())
        }
        Some((expected, authoritative)) if expected != actual => Err(CodecError::DerivedSizeMismatch {
            member,
            authoritative,
            array,
            expected,
            actual,
        }),
        Some(_) => Ok(()),
    }
}

/// Converts an observed length into the size member's integer type.
pub fn size_value<T: TryFrom<usize>>(member: &'static str, length: usize) -> Result<T, CodecError> {
    T::try_from(length).map_err(|_| CodecError::LengthOverflow { member, length })
}

/// Converts a decoded size member into a length.
pub fn checked_len(member: &'static str, value: i64) -> Result<usize, CodecError> {
    usize::try_from(value).map_err(|_| CodecError::NegativeLength { member, value })
}

/// Turns a vector filled by a constant-extent loop into an array.
pub fn into_array<T, const N: usize>(items: Vec<T>) -> Result<[T; N], CodecError> {
    let actual = items.len();
    items
        .try_into()
        .map_err(|_| CodecError::SizeMismatch { expected: N, actual })
}

/// Reads and checks the fingerprint header of an encoded message.
pub fn check_fingerprint(data: &[u8], expected: u64) -> Result<(), CodecError> {
    let mut reader = Reader::new(data);
    let actual = reader.read_u64()?;
    if actual != expected {
        return Err(CodecError::FingerprintMismatch { expected, actual });
    }
    Ok(())
}
"##;

/* Emit the runtime unit. The header names the module the types unit imports. */
pub fn emit_runtime(module: &str, emit_comments: bool) -> Result<String, std::fmt::Error> {
  let mut out = String::new();
  if emit_comments {
    writeln!(out, "//! `{}`: wire helpers for generated LCM codecs.", module)?;
    writeln!(out, "//! Generated code, do not edit.")?;
    writeln!(out)?;
  }
  out.push_str(RUNTIME_SOURCE);
  Ok(out)
}
