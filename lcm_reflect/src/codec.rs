/* High-level codec API over a codec plan */

use crate::errors::{DecodeError, DecodeResult, EncodeResult, ShapeError};
use crate::interpreter::Interpreter;
use crate::value::{StructValue, Value};
use crate::wire::{Reader, Writer};
use lcm_gen::codegen::shared::plan::CodecPlan;
use lcm_gen::{PlanBuilder, SchemaError, StructRegistry};
use lcm_types::SchemaFile;
use std::collections::BTreeMap;
use tracing::debug;

/* Encodes, decodes and copies dynamic values of any struct in a plan */
pub struct Codec {
    plan: CodecPlan,
    /* Name -> index mapping for quick plan lookups */
    index: BTreeMap<String, usize>,
}

impl Codec {
    pub fn new(plan: CodecPlan) -> Self {
        let index = plan
            .index()
            .into_iter()
            .map(|(name, idx)| (name.to_string(), idx))
            .collect();
        Self { plan, index }
    }

    /* Validate a type graph and plan every struct in it */
    pub fn from_schema(schema: &SchemaFile) -> Result<Self, SchemaError> {
        let registry = StructRegistry::from_schema(schema)?;
        let plan = PlanBuilder::new(&registry).build_all()?;
        debug!(structs = plan.structs.len(), "codec ready");
        Ok(Self::new(plan))
    }

    pub fn plan(&self) -> &CodecPlan {
        &self.plan
    }

    fn interpreter(&self) -> Interpreter<'_> {
        Interpreter::new(&self.plan, &self.index)
    }

    /// Schema fingerprint of `type_name`, `None` if the plan lacks it.
    pub fn fingerprint(&self, type_name: &str) -> Option<u64> {
        self.plan.get(type_name).map(|plan| plan.fingerprint.value)
    }

    /// Payload size of `value`, derived size members recomputed.
    pub fn size_of(&self, value: &Value) -> EncodeResult<usize> {
        let value = root_struct(value)?;
        self.interpreter().size_of(&value.type_name, value)
    }

    /// Payload bytes only, without the fingerprint prefix.
    pub fn marshal(&self, value: &Value) -> EncodeResult<Vec<u8>> {
        let value = root_struct(value)?;
        let interpreter = self.interpreter();
        let size = interpreter.size_of(&value.type_name, value)?;
        let mut writer = Writer::with_capacity(size);
        interpreter.write_struct(&value.type_name, value, &mut writer)?;
        Ok(writer.into_bytes())
    }

    /// Full message: big-endian fingerprint followed by the payload.
    pub fn encode(&self, value: &Value) -> EncodeResult<Vec<u8>> {
        let root = root_struct(value)?;
        let fingerprint = self.fingerprint(&root.type_name).ok_or_else(|| ShapeError::UnknownStruct {
            type_name: root.type_name.clone(),
        })?;
        let interpreter = self.interpreter();
        let size = interpreter.size_of(&root.type_name, root)?;
        let mut writer = Writer::with_capacity(8 + size);
        writer.write_u64(fingerprint);
        interpreter.write_struct(&root.type_name, root, &mut writer)?;
        debug!(type_name = %root.type_name, bytes = writer.len(), "encoded message");
        Ok(writer.into_bytes())
    }

    /// Decodes a payload, returning the value and the bytes consumed.
    pub fn unmarshal(&self, type_name: &str, data: &[u8]) -> DecodeResult<(Value, usize)> {
        let mut reader = Reader::new(data);
        let value = self.interpreter().read_struct(type_name, &mut reader)?;
        Ok((Value::Struct(value), reader.offset()))
    }

    /// Decodes a full message. The buffer must hold exactly one value.
    pub fn decode(&self, type_name: &str, data: &[u8]) -> DecodeResult<Value> {
        let expected = self.fingerprint(type_name).ok_or_else(|| DecodeError::UnknownType {
            type_name: type_name.to_string(),
        })?;
        if data.len() < 8 {
            return Err(DecodeError::TooShort {
                needed: 8,
                available: data.len(),
            });
        }
        let actual = Reader::new(data).read_u64()?;
        if actual != expected {
            return Err(DecodeError::FingerprintMismatch { expected, actual });
        }

        let payload = &data[8..];
        let (value, _) = self.unmarshal(type_name, payload)?;
        let size = self.size_of(&value)?;
        if size != payload.len() {
            return Err(DecodeError::SizeMismatch {
                expected: size,
                actual: payload.len(),
            });
        }
        Ok(value)
    }

    /// Deep copy that shares no storage with `value`.
    pub fn copy(&self, value: &Value) -> Result<Value, ShapeError> {
        let root = root_struct(value)?;
        Ok(Value::Struct(self.interpreter().copy_struct(&root.type_name, root)?))
    }

    /// Writes recomputed size members back into `value` and its nested structs.
    pub fn sync_derived(&self, value: &mut Value) -> EncodeResult<()> {
        let found = value.kind_name();
        let root = value.as_struct_mut().ok_or(ShapeError::TypeMismatch {
            path: String::new(),
            expected: "struct".to_string(),
            found,
        })?;
        self.interpreter().sync_struct(root)
    }
}

fn root_struct(value: &Value) -> Result<&StructValue, ShapeError> {
    value.as_struct().ok_or_else(|| ShapeError::TypeMismatch {
        path: String::new(),
        expected: "struct".to_string(),
        found: value.kind_name(),
    })
}
