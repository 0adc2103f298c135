use serde_derive::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub enum PrimitiveType {
    #[serde(rename = "boolean", alias = "bool")]
    Boolean,
    #[serde(rename = "byte")]
    Byte,
    #[serde(rename = "int8_t", alias = "int8")]
    Int8,
    #[serde(rename = "int16_t", alias = "int16")]
    Int16,
    #[serde(rename = "int32_t", alias = "int32")]
    Int32,
    #[serde(rename = "int64_t", alias = "int64")]
    Int64,
    #[serde(rename = "float", alias = "float32")]
    Float,
    #[serde(rename = "double", alias = "float64")]
    Double,
    #[serde(rename = "string")]
    String,
}

impl PrimitiveType {
    /// Encoded width in bytes, `None` for strings.
    pub fn fixed_width(self) -> Option<u64> {
        match self {
            PrimitiveType::Boolean | PrimitiveType::Byte | PrimitiveType::Int8 => Some(1),
            PrimitiveType::Int16 => Some(2),
            PrimitiveType::Int32 | PrimitiveType::Float => Some(4),
            PrimitiveType::Int64 | PrimitiveType::Double => Some(8),
            PrimitiveType::String => None,
        }
    }

    /// Signed integer types, the only ones allowed to carry an array length.
    pub fn is_size_type(self) -> bool {
        matches!(
            self,
            PrimitiveType::Int8 | PrimitiveType::Int16 | PrimitiveType::Int32 | PrimitiveType::Int64
        )
    }

    /// Largest array length representable by a size member of this type.
    pub fn max_length(self) -> Option<u64> {
        match self {
            PrimitiveType::Int8 => Some(i8::MAX as u64),
            PrimitiveType::Int16 => Some(i16::MAX as u64),
            PrimitiveType::Int32 => Some(i32::MAX as u64),
            PrimitiveType::Int64 => Some(i64::MAX as u64),
            _ => None,
        }
    }

    pub fn schema_name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Int8 => "int8_t",
            PrimitiveType::Int16 => "int16_t",
            PrimitiveType::Int32 => "int32_t",
            PrimitiveType::Int64 => "int64_t",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::String => "string",
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.schema_name())
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Hash)]
#[serde(rename_all = "kebab-case")]
pub struct StructRefType {
    #[serde(rename = "struct")]
    pub name: String,
}

/// Type of a member: either a primitive or a reference to another struct by name.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Hash)]
#[serde(untagged)]
#[serde(expecting = "expected a primitive type name or a `struct:` reference")]
pub enum SchemaType {
    Primitive(PrimitiveType),
    StructRef(StructRefType),
}

impl SchemaType {
    pub fn struct_ref(name: impl Into<String>) -> Self {
        SchemaType::StructRef(StructRefType { name: name.into() })
    }

    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self {
            SchemaType::Primitive(prim) => Some(*prim),
            SchemaType::StructRef(_) => None,
        }
    }

    pub fn struct_name(&self) -> Option<&str> {
        match self {
            SchemaType::Primitive(_) => None,
            SchemaType::StructRef(type_ref) => Some(type_ref.name.as_str()),
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaType::Primitive(prim) => write!(f, "{prim}"),
            SchemaType::StructRef(type_ref) => f.write_str(&type_ref.name),
        }
    }
}

/// One array dimension: a compile-time extent or the name of a sibling size member.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Hash)]
#[serde(untagged)]
#[serde(expecting = "expected a constant extent or a size member name")]
pub enum Dimension {
    Constant(u64),
    FieldRef(String),
}

impl Dimension {
    pub fn field_ref(&self) -> Option<&str> {
        match self {
            Dimension::Constant(_) => None,
            Dimension::FieldRef(name) => Some(name.as_str()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Member {
    pub name: String,
    #[serde(rename = "type")]
    pub member_type: SchemaType,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    /// Set on integer members that carry the length of a variable array. Their
    /// value is recomputed from the array on encode, never set independently.
    #[serde(default)]
    pub derived_size: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

impl Member {
    pub fn scalar(name: impl Into<String>, member_type: SchemaType) -> Self {
        Self {
            name: name.into(),
            member_type,
            dimensions: Vec::new(),
            derived_size: false,
            comment: None,
        }
    }

    pub fn primitive(name: impl Into<String>, prim: PrimitiveType) -> Self {
        Self::scalar(name, SchemaType::Primitive(prim))
    }

    pub fn array(name: impl Into<String>, member_type: SchemaType, dimensions: Vec<Dimension>) -> Self {
        Self {
            dimensions,
            ..Self::scalar(name, member_type)
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn is_array(&self) -> bool {
        !self.dimensions.is_empty()
    }

    /// True when any dimension of this member refers to `size_member`.
    pub fn references(&self, size_member: &str) -> bool {
        self.dimensions
            .iter()
            .any(|dim| dim.field_ref() == Some(size_member))
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Constant {
    pub name: String,
    #[serde(rename = "type")]
    pub primitive: PrimitiveType,
    /// Literal as written in the schema source.
    pub value: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct StructDef {
    pub name: String,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub constants: Vec<Constant>,
    /// Hash folded from the raw struct text by the front end.
    pub base_hash: u64,
    #[serde(default)]
    pub comment: Option<String>,
}

impl StructDef {
    pub fn new(name: impl Into<String>, base_hash: u64, members: Vec<Member>) -> Self {
        Self {
            name: name.into(),
            members,
            constants: Vec::new(),
            base_hash,
            comment: None,
        }
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.name == name)
    }

    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|member| member.name == name)
    }

    /// Tags every member named by a `FieldRef` dimension as a derived size.
    pub fn with_derived_sizes(mut self) -> Self {
        let referenced: Vec<String> = self
            .members
            .iter()
            .flat_map(|member| member.dimensions.iter())
            .filter_map(|dim| dim.field_ref().map(str::to_string))
            .collect();
        for member in &mut self.members {
            if referenced.contains(&member.name) {
                member.derived_size = true;
            }
        }
        self
    }
}
