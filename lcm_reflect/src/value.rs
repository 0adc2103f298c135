/* Dynamic values the reflective codec reads and writes */

use lcm_types::PrimitiveType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum Value {
    Boolean(bool),
    Byte(u8),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    String(String),
    /* One level of an array; multi-dimensional arrays nest */
    Array(Vec<Value>),
    Struct(StructValue),
}

impl Value {
    /// Short name used in shape errors.
    pub fn kind_name(&self) -> String {
        match self {
            Value::Boolean(_) => "boolean".into(),
            Value::Byte(_) => "byte".into(),
            Value::Int8(_) => "int8_t".into(),
            Value::Int16(_) => "int16_t".into(),
            Value::Int32(_) => "int32_t".into(),
            Value::Int64(_) => "int64_t".into(),
            Value::Float(_) => "float".into(),
            Value::Double(_) => "double".into(),
            Value::String(_) => "string".into(),
            Value::Array(items) => format!("array of {}", items.len()),
            Value::Struct(value) => format!("struct {}", value.type_name),
        }
    }

    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        match self {
            Value::Boolean(_) => Some(PrimitiveType::Boolean),
            Value::Byte(_) => Some(PrimitiveType::Byte),
            Value::Int8(_) => Some(PrimitiveType::Int8),
            Value::Int16(_) => Some(PrimitiveType::Int16),
            Value::Int32(_) => Some(PrimitiveType::Int32),
            Value::Int64(_) => Some(PrimitiveType::Int64),
            Value::Float(_) => Some(PrimitiveType::Float),
            Value::Double(_) => Some(PrimitiveType::Double),
            Value::String(_) => Some(PrimitiveType::String),
            Value::Array(_) | Value::Struct(_) => None,
        }
    }

    /// Integer content widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(i64::from(*v)),
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_struct_mut(&mut self) -> Option<&mut StructValue> {
        match self {
            Value::Struct(value) => Some(value),
            _ => None,
        }
    }

    /// Size member value for `length`, `None` when it does not fit `prim`.
    pub fn from_length(prim: PrimitiveType, length: usize) -> Option<Value> {
        match prim {
            PrimitiveType::Int8 => i8::try_from(length).ok().map(Value::Int8),
            PrimitiveType::Int16 => i16::try_from(length).ok().map(Value::Int16),
            PrimitiveType::Int32 => i32::try_from(length).ok().map(Value::Int32),
            PrimitiveType::Int64 => i64::try_from(length).ok().map(Value::Int64),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    };
}

value_from! {
    bool => Boolean,
    u8 => Byte,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float,
    f64 => Double,
    String => String,
    StructValue => Struct,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

/* Struct instance: members in declaration order */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructValue {
    pub type_name: String,
    #[serde(default)]
    pub fields: Vec<(String, Value)>,
}

impl StructValue {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Builder form of [`Self::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Replaces the member if present, appends it otherwise.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.get_mut(&name) {
            Some(slot) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_existing_member() {
        let mut point = StructValue::new("Point").with("x", 1i32).with("y", 2i32);
        point.set("x", 5i32);
        assert_eq!(point.get("x"), Some(&Value::Int32(5)));
        assert_eq!(point.fields.len(), 2);
    }

    #[test]
    fn nested_vectors_become_arrays() {
        let value = Value::from(vec![vec![1i16, 2], vec![3, 4]]);
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], Value::Array(vec![Value::Int16(3), Value::Int16(4)]));
    }

    #[test]
    fn lengths_respect_size_type_range() {
        assert_eq!(Value::from_length(PrimitiveType::Int8, 127), Some(Value::Int8(127)));
        assert_eq!(Value::from_length(PrimitiveType::Int8, 128), None);
        assert_eq!(Value::from_length(PrimitiveType::Double, 1), None);
    }

    #[test]
    fn serializes_with_kind_tags() {
        let json = serde_json::to_string(&Value::Int32(-4)).unwrap();
        assert_eq!(json, r#"{"kind":"int32","value":-4}"#);
    }
}
