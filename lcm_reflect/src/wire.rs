/* Big-endian primitive encoding shared by every codec operation */

use crate::errors::{DecodeError, DecodeResult, EncodeError, EncodeResult, ShapeError};
use crate::value::Value;
use lcm_types::PrimitiveType;

/// Bytes a primitive value occupies on the wire.
pub fn primitive_size(prim: PrimitiveType, value: &Value, path: &str) -> EncodeResult<usize> {
    match (prim, value) {
        (PrimitiveType::String, Value::String(text)) => Ok(4 + text.len() + 1),
        (prim, value) => {
            expect_primitive(prim, value, path)?;
            Ok(prim.fixed_width().unwrap_or_default() as usize)
        }
    }
}

fn expect_primitive(prim: PrimitiveType, value: &Value, path: &str) -> Result<(), ShapeError> {
    if value.primitive_type() == Some(prim) {
        Ok(())
    } else {
        Err(ShapeError::TypeMismatch {
            path: path.to_string(),
            expected: prim.to_string(),
            found: value.kind_name(),
        })
    }
}

/// Append-only payload buffer.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_primitive(&mut self, prim: PrimitiveType, value: &Value, path: &str) -> EncodeResult<()> {
        match (prim, value) {
            (PrimitiveType::Boolean, Value::Boolean(v)) => self.buf.push(u8::from(*v)),
            (PrimitiveType::Byte, Value::Byte(v)) => self.buf.push(*v),
            (PrimitiveType::Int8, Value::Int8(v)) => self.buf.extend_from_slice(&v.to_be_bytes()),
            (PrimitiveType::Int16, Value::Int16(v)) => self.buf.extend_from_slice(&v.to_be_bytes()),
            (PrimitiveType::Int32, Value::Int32(v)) => self.buf.extend_from_slice(&v.to_be_bytes()),
            (PrimitiveType::Int64, Value::Int64(v)) => self.buf.extend_from_slice(&v.to_be_bytes()),
            (PrimitiveType::Float, Value::Float(v)) => {
                self.buf.extend_from_slice(&v.to_bits().to_be_bytes())
            }
            (PrimitiveType::Double, Value::Double(v)) => {
                self.buf.extend_from_slice(&v.to_bits().to_be_bytes())
            }
            (PrimitiveType::String, Value::String(text)) => {
                let length = u32::try_from(text.len() + 1).map_err(|_| EncodeError::StringTooLong {
                    path: path.to_string(),
                    length: text.len(),
                })?;
                self.buf.extend_from_slice(&length.to_be_bytes());
                self.buf.extend_from_slice(text.as_bytes());
                self.buf.push(0);
            }
            (prim, value) => expect_primitive(prim, value, path)?,
        }
        Ok(())
    }
}

/// Cursor over an encoded payload.
#[derive(Debug)]
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
    pub fn check_count(&self, count: usize, min_width: usize, path: &str) -> DecodeResult<()> {
        let remaining = self.remaining();
        if min_width == 0 {
            if count > remaining {
                return Err(DecodeError::ImplausibleCount {
                    path: path.to_string(),
                    count,
                    remaining,
                });
            }
            return Ok(());
        }
        let needed = count.saturating_mul(min_width);
        if needed > remaining {
            return Err(DecodeError::TooShort {
                needed: self.offset.saturating_add(needed),
                available: self.data.len(),
            });
        }
        Ok(())
    }

    fn take(&mut self, len: usize) -> DecodeResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(DecodeError::TooShort {
                needed: self.offset + len,
                available: self.data.len(),
            });
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u64(&mut self) -> DecodeResult<u64> {
        Ok(u64::from_be_bytes(self.take_array()?))
    }

    pub fn read_primitive(&mut self, prim: PrimitiveType, path: &str) -> DecodeResult<Value> {
        let value = match prim {
            PrimitiveType::Boolean => Value::Boolean(self.take_array::<1>()?[0] != 0),
            PrimitiveType::Byte => Value::Byte(self.take_array::<1>()?[0]),
            PrimitiveType::Int8 => Value::Int8(i8::from_be_bytes(self.take_array()?)),
            PrimitiveType::Int16 => Value::Int16(i16::from_be_bytes(self.take_array()?)),
            PrimitiveType::Int32 => Value::Int32(i32::from_be_bytes(self.take_array()?)),
            PrimitiveType::Int64 => Value::Int64(i64::from_be_bytes(self.take_array()?)),
            PrimitiveType::Float => Value::Float(f32::from_bits(u32::from_be_bytes(self.take_array()?))),
            PrimitiveType::Double => {
                Value::Double(f64::from_bits(u64::from_be_bytes(self.take_array()?)))
            }
            PrimitiveType::String => Value::String(self.read_string(path)?),
        };
        Ok(value)
    }

    /* u32 length (content + terminator), content, terminator */
    fn read_string(&mut self, path: &str) -> DecodeResult<String> {
        let length = u32::from_be_bytes(self.take_array()?);
        if length < 1 {
            return Err(DecodeError::InvalidStringLength {
                path: path.to_string(),
                length,
            });
        }
        let bytes = self.take(length as usize)?;
        let (content, terminator) = bytes.split_at(bytes.len() - 1);
        if terminator != [0] {
            return Err(DecodeError::MissingTerminator {
                path: path.to_string(),
            });
        }
        String::from_utf8(content.to_vec()).map_err(|_| DecodeError::InvalidUtf8 {
            path: path.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_big_endian_twos_complement() {
        let mut writer = Writer::default();
        writer.write_primitive(PrimitiveType::Int32, &Value::Int32(-4), "v").unwrap();
        writer.write_primitive(PrimitiveType::Int16, &Value::Int16(0x0102), "v").unwrap();
        assert_eq!(writer.into_bytes(), vec![0xFF, 0xFF, 0xFF, 0xFC, 0x01, 0x02]);
    }

    #[test]
    fn floats_use_ieee_bit_patterns() {
        let mut writer = Writer::default();
        writer.write_primitive(PrimitiveType::Float, &Value::Float(1.0), "f").unwrap();
        writer.write_primitive(PrimitiveType::Double, &Value::Double(-2.0), "d").unwrap();
        assert_eq!(
            writer.into_bytes(),
            vec![0x3F, 0x80, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn strings_carry_length_and_terminator() {
        let mut writer = Writer::default();
        writer.write_primitive(PrimitiveType::String, &Value::from("hi"), "s").unwrap();
        let bytes = writer.into_bytes();
        assert_eq!(bytes, vec![0, 0, 0, 3, b'h', b'i', 0]);
        assert_eq!(primitive_size(PrimitiveType::String, &Value::from("hi"), "s").unwrap(), 7);

        let mut reader = Reader::new(&bytes);
        assert_eq!(reader.read_primitive(PrimitiveType::String, "s").unwrap(), Value::from("hi"));
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn empty_string_is_length_one() {
        let mut writer = Writer::default();
        writer.write_primitive(PrimitiveType::String, &Value::from(""), "s").unwrap();
        assert_eq!(writer.into_bytes(), vec![0, 0, 0, 1, 0]);
    }

    #[test]
    fn booleans_decode_any_nonzero_as_true() {
        let mut reader = Reader::new(&[0x00, 0x01, 0x7F]);
        assert_eq!(reader.read_primitive(PrimitiveType::Boolean, "b").unwrap(), Value::Boolean(false));
        assert_eq!(reader.read_primitive(PrimitiveType::Boolean, "b").unwrap(), Value::Boolean(true));
        assert_eq!(reader.read_primitive(PrimitiveType::Boolean, "b").unwrap(), Value::Boolean(true));
    }

    #[test]
    fn rejects_zero_string_length() {
        let mut reader = Reader::new(&[0, 0, 0, 0]);
        assert_eq!(
            reader.read_primitive(PrimitiveType::String, "name"),
            Err(DecodeError::InvalidStringLength {
                path: "name".into(),
                length: 0
            })
        );
    }

    #[test]
    fn reports_short_reads() {
        let mut reader = Reader::new(&[0, 1]);
        assert_eq!(
            reader.read_primitive(PrimitiveType::Int32, "v"),
            Err(DecodeError::TooShort {
                needed: 4,
                available: 2
            })
        );
    }

    #[test]
    fn rejects_mismatched_value_kind() {
        let mut writer = Writer::default();
        let err = writer
            .write_primitive(PrimitiveType::Int64, &Value::Int32(1), "p.x")
            .unwrap_err();
        assert!(matches!(err, EncodeError::Shape(ShapeError::TypeMismatch { path, .. }) if path == "p.x"));
        assert!(writer.is_empty());
    }

    #[test]
    fn rejects_missing_string_terminator() {
        let mut reader = Reader::new(&[0, 0, 0, 3, b'h', b'i', b'!']);
        assert_eq!(
            reader.read_primitive(PrimitiveType::String, "s"),
            Err(DecodeError::MissingTerminator { path: "s".into() })
        );
    }

    #[test]
    fn counts_are_bounded_by_remaining_bytes() {
        let reader = Reader::new(&[0; 6]);
        assert!(reader.check_count(3, 2, "a").is_ok());
        assert_eq!(
            reader.check_count(4, 2, "a"),
            Err(DecodeError::TooShort {
                needed: 8,
                available: 6
            })
        );
        assert!(reader.check_count(6, 0, "e").is_ok());
        assert_eq!(
            reader.check_count(usize::MAX, 0, "e"),
            Err(DecodeError::ImplausibleCount {
                path: "e".into(),
                count: usize::MAX,
                remaining: 6
            })
        );
    }
}
