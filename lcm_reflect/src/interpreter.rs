use crate::errors::{DecodeError, DecodeResult, EncodeError, EncodeResult, ShapeError};
use crate::value::{StructValue, Value};
use crate::wire::{primitive_size, Reader, Writer};
use lcm_gen::codegen::shared::plan::{CodecPlan, DeriveSizeNode, LoopNode, PlanOp, StructPlan};
use lcm_gen::layout::LoopBound;
use std::collections::BTreeMap;
use tracing::trace;

/// Lengths recomputed (size, encode) or read back (decode) for one struct
/// instance, keyed by size member.
type Lengths = BTreeMap<String, usize>;

/// Executes the op sequences of a codec plan against dynamic values.
pub struct Interpreter<'a> {
    plan: &'a CodecPlan,
    index: &'a BTreeMap<String, usize>,
}

impl<'a> Interpreter<'a> {
    pub fn new(plan: &'a CodecPlan, index: &'a BTreeMap<String, usize>) -> Self {
        Self { plan, index }
    }

    fn lookup(&self, type_name: &str) -> Option<&'a StructPlan> {
        self.index
            .get(type_name)
            .and_then(|idx| self.plan.structs.get(*idx))
    }

    fn struct_plan_for(&self, expected: &str, value: &StructValue) -> Result<&'a StructPlan, ShapeError> {
        if value.type_name != expected {
            return Err(ShapeError::WrongStruct {
                expected: expected.to_string(),
                found: value.type_name.clone(),
            });
        }
        self.lookup(expected).ok_or_else(|| ShapeError::UnknownStruct {
            type_name: expected.to_string(),
        })
    }

    /* ---- size ---- */

    pub fn size_of(&self, type_name: &str, value: &StructValue) -> EncodeResult<usize> {
        let plan = self.struct_plan_for(type_name, value)?;
        let mut lengths = Lengths::new();
        let mut size = 0usize;
        for op in &plan.size {
            match op {
                PlanOp::DeriveSize(node) => {
                    let length = self.derive(plan, value, node)?;
                    lengths.insert(node.member.clone(), length);
                }
                PlanOp::Primitive(node) if node.derived => {
                    size += node.width.unwrap_or_default() as usize;
                }
                _ => {
                    let (member, path) = member_of(plan, value, op)?;
                    size += self.size_op(op, member, &lengths, &path)?;
                }
            }
        }
        Ok(size)
    }

    fn size_op(&self, op: &PlanOp, value: &Value, lengths: &Lengths, path: &str) -> EncodeResult<usize> {
        match op {
            PlanOp::Primitive(node) => primitive_size(node.primitive, value, path),
            PlanOp::Nested(node) => {
                let nested = expect_struct(value, &node.type_name, path)?;
                self.size_of(&node.type_name, nested)
            }
            PlanOp::Loop(node) => {
                let items = checked_items(node, value, lengths, path)?;
                let mut total = 0usize;
                for (idx, item) in items.iter().enumerate() {
                    let item_path = format!("{path}[{idx}]");
                    for inner in &node.body {
                        total += self.size_op(inner, item, lengths, &item_path)?;
                    }
                }
                Ok(total)
            }
            PlanOp::DeriveSize(_) => Ok(0),
        }
    }

    /* ---- derived sizes ---- */

    /// Recomputes a size member from the arrays it governs. The first
    /// observed length is authoritative; any other one must match it.
    pub fn derive(&self, plan: &StructPlan, value: &StructValue, node: &DeriveSizeNode) -> EncodeResult<usize> {
        let mut observed: Option<(usize, &str)> = None;
        for source in &node.sources {
            let member = value.get(&source.member).ok_or_else(|| ShapeError::MissingMember {
                type_name: plan.type_name.clone(),
                member: source.member.clone(),
            })?;
            let path = format!("{}.{}", plan.type_name, source.member);
            let mut lengths = Vec::new();
            collect_lengths(member, source.dimension, &path, &mut lengths)?;
            for actual in lengths {
                match observed {
                    None => observed = Some((actual, source.member.as_str())),
                    Some((expected, authoritative)) if expected != actual => {
                        return Err(EncodeError::DerivedSizeMismatch {
                            type_name: plan.type_name.clone(),
                            size_member: node.member.clone(),
                            authoritative: authoritative.to_string(),
                            array: source.member.clone(),
                            expected,
                            actual,
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        let length = observed.map_or(0, |(length, _)| length);
        if Value::from_length(node.primitive, length).is_none() {
            return Err(EncodeError::LengthOverflow {
                type_name: plan.type_name.clone(),
                size_member: node.member.clone(),
                primitive: node.primitive,
                length,
            });
        }
        trace!(struct_name = %plan.type_name, member = %node.member, length, "derived size");
        Ok(length)
    }

    /* ---- encode ---- */

    pub fn write_struct(&self, type_name: &str, value: &StructValue, out: &mut Writer) -> EncodeResult<()> {
        let plan = self.struct_plan_for(type_name, value)?;
        let mut lengths = Lengths::new();
        for op in &plan.encode {
            match op {
                PlanOp::DeriveSize(node) => {
                    let length = self.derive(plan, value, node)?;
                    lengths.insert(node.member.clone(), length);
                }
                PlanOp::Primitive(node) if node.derived => {
                    let member = &node.access.member;
                    let length = lengths.get(member).copied().unwrap_or_default();
                    let derived = Value::from_length(node.primitive, length).ok_or_else(|| {
                        EncodeError::LengthOverflow {
                            type_name: plan.type_name.clone(),
                            size_member: member.clone(),
                            primitive: node.primitive,
                            length,
                        }
                    })?;
                    let path = format!("{}.{}", plan.type_name, member);
                    out.write_primitive(node.primitive, &derived, &path)?;
                }
                _ => {
                    let (member, path) = member_of(plan, value, op)?;
                    self.write_op(op, member, &lengths, &path, out)?;
                }
            }
        }
        Ok(())
    }

    fn write_op(
        &self,
        op: &PlanOp,
        value: &Value,
        lengths: &Lengths,
        path: &str,
        out: &mut Writer,
    ) -> EncodeResult<()> {
        match op {
            PlanOp::Primitive(node) => out.write_primitive(node.primitive, value, path),
            PlanOp::Nested(node) => {
                let nested = expect_struct(value, &node.type_name, path)?;
                self.write_struct(&node.type_name, nested, out)
            }
            PlanOp::Loop(node) => {
                let items = checked_items(node, value, lengths, path)?;
                for (idx, item) in items.iter().enumerate() {
                    let item_path = format!("{path}[{idx}]");
                    for inner in &node.body {
                        self.write_op(inner, item, lengths, &item_path, out)?;
                    }
                }
                Ok(())
            }
            PlanOp::DeriveSize(_) => Ok(()),
        }
    }

    /* ---- decode ---- */

    pub fn read_struct(&self, type_name: &str, reader: &mut Reader<'_>) -> DecodeResult<StructValue> {
        let plan = self.lookup(type_name).ok_or_else(|| DecodeError::UnknownType {
            type_name: type_name.to_string(),
        })?;
        let mut result = StructValue::new(type_name);
        let mut lengths = Lengths::new();
        for op in &plan.decode {
            let Some(member) = op.member() else {
                continue;
            };
            let path = format!("{}.{}", plan.type_name, member);
            match op {
                PlanOp::Primitive(node) if node.derived => {
                    let value = reader.read_primitive(node.primitive, &path)?;
                    let raw = value.as_i64().unwrap_or_default();
                    let length = usize::try_from(raw).map_err(|_| DecodeError::NegativeLength {
                        type_name: plan.type_name.clone(),
                        size_member: member.to_string(),
                        value: raw,
                    })?;
                    lengths.insert(member.to_string(), length);
                    result.fields.push((member.to_string(), value));
                }
                PlanOp::DeriveSize(_) => {}
                _ => {
                    let value = self.read_op(op, &lengths, &path, reader)?;
                    result.fields.push((member.to_string(), value));
                }
            }
        }
        Ok(result)
    }

    fn read_op(&self, op: &PlanOp, lengths: &Lengths, path: &str, reader: &mut Reader<'_>) -> DecodeResult<Value> {
        match op {
            PlanOp::Primitive(node) => reader.read_primitive(node.primitive, path),
            PlanOp::Nested(node) => Ok(Value::Struct(self.read_struct(&node.type_name, reader)?)),
            PlanOp::Loop(node) => {
                let count = match &node.bound {
                    LoopBound::Constant { extent } => *extent as usize,
                    LoopBound::Field { member, .. } => {
                        let count = lengths.get(member).copied().unwrap_or_default();
                        let width = usize::try_from(self.plan.min_element_width(node)).unwrap_or(usize::MAX);
                        reader.check_count(count, width, path)?;
                        count
                    }
                };
                let mut items = Vec::with_capacity(count.min(reader.remaining()));
                for idx in 0..count {
                    let item_path = format!("{path}[{idx}]");
                    for inner in &node.body {
                        items.push(self.read_op(inner, lengths, &item_path, reader)?);
                    }
                }
                Ok(Value::Array(items))
            }
            PlanOp::DeriveSize(_) => Ok(Value::Array(Vec::new())),
        }
    }

    /* ---- copy ---- */

    pub fn copy_struct(&self, type_name: &str, value: &StructValue) -> Result<StructValue, ShapeError> {
        let plan = self.struct_plan_for(type_name, value)?;
        let mut result = StructValue::new(type_name);
        for op in &plan.copy {
            let Some(member) = op.member() else {
                continue;
            };
            if let PlanOp::Primitive(node) = op {
                if node.derived {
                    // Derived members are optional in dynamic values.
                    if let Some(stored) = value.get(member) {
                        result.fields.push((member.to_string(), stored.clone()));
                    }
                    continue;
                }
            }
            let (source, path) = member_of(plan, value, op)?;
            result.fields.push((member.to_string(), self.copy_op(op, source, &path)?));
        }
        Ok(result)
    }

    fn copy_op(&self, op: &PlanOp, value: &Value, path: &str) -> Result<Value, ShapeError> {
        match op {
            PlanOp::Primitive(node) => {
                if value.primitive_type() != Some(node.primitive) {
                    return Err(ShapeError::TypeMismatch {
                        path: path.to_string(),
                        expected: node.primitive.to_string(),
                        found: value.kind_name(),
                    });
                }
                Ok(value.clone())
            }
            PlanOp::Nested(node) => {
                let nested = expect_struct(value, &node.type_name, path)?;
                Ok(Value::Struct(self.copy_struct(&node.type_name, nested)?))
            }
            PlanOp::Loop(node) => {
                let items = expect_array(value, path)?;
                let mut copied = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    let item_path = format!("{path}[{idx}]");
                    for inner in &node.body {
                        copied.push(self.copy_op(inner, item, &item_path)?);
                    }
                }
                Ok(Value::Array(copied))
            }
            PlanOp::DeriveSize(_) => Ok(Value::Array(Vec::new())),
        }
    }

    /* ---- derived write-back ---- */

    /// Stores recomputed size members into `value` and every nested struct.
    pub fn sync_struct(&self, value: &mut StructValue) -> EncodeResult<()> {
        let type_name = value.type_name.clone();
        let plan = self.struct_plan_for(&type_name, value)?;
        for op in &plan.encode {
            match op {
                PlanOp::DeriveSize(node) => {
                    let length = self.derive(plan, value, node)?;
                    if let Some(derived) = Value::from_length(node.primitive, length) {
                        value.set(node.member.clone(), derived);
                    }
                }
                PlanOp::Nested(_) | PlanOp::Loop(_) => {
                    let Some(member) = op.member() else {
                        continue;
                    };
                    if let Some(slot) = value.get_mut(member) {
                        self.sync_nested(op, slot)?;
                    }
                }
                PlanOp::Primitive(_) => {}
            }
        }
        Ok(())
    }

    fn sync_nested(&self, op: &PlanOp, value: &mut Value) -> EncodeResult<()> {
        match (op, value) {
            (PlanOp::Nested(_), Value::Struct(nested)) => self.sync_struct(nested),
            (PlanOp::Loop(node), Value::Array(items)) => {
                for item in items.iter_mut() {
                    for inner in &node.body {
                        self.sync_nested(inner, item)?;
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/* The stored value of the member an op reads, with its error path */
fn member_of<'v>(plan: &StructPlan, value: &'v StructValue, op: &PlanOp) -> Result<(&'v Value, String), ShapeError> {
    let member = op.member().unwrap_or_default();
    let stored = value.get(member).ok_or_else(|| ShapeError::MissingMember {
        type_name: plan.type_name.clone(),
        member: member.to_string(),
    })?;
    Ok((stored, format!("{}.{}", plan.type_name, member)))
}

fn expect_struct<'v>(value: &'v Value, type_name: &str, path: &str) -> Result<&'v StructValue, ShapeError> {
    match value {
        Value::Struct(nested) if nested.type_name == type_name => Ok(nested),
        other => Err(ShapeError::TypeMismatch {
            path: path.to_string(),
            expected: format!("struct {type_name}"),
            found: other.kind_name(),
        }),
    }
}

fn expect_array<'v>(value: &'v Value, path: &str) -> Result<&'v [Value], ShapeError> {
    value.as_array().ok_or_else(|| ShapeError::TypeMismatch {
        path: path.to_string(),
        expected: "array".to_string(),
        found: value.kind_name(),
    })
}

/* Array elements of one loop level, checked against the loop bound */
fn checked_items<'v>(node: &LoopNode, value: &'v Value, lengths: &Lengths, path: &str) -> EncodeResult<&'v [Value]> {
    let items = expect_array(value, path)?;
    let expected = match &node.bound {
        LoopBound::Constant { extent } => *extent as usize,
        LoopBound::Field { member, .. } => lengths.get(member).copied().unwrap_or_default(),
    };
    if items.len() != expected {
        return Err(EncodeError::ArrayLengthMismatch {
            path: path.to_string(),
            expected,
            actual: items.len(),
        });
    }
    Ok(items)
}

/* Lengths of every sub-array `dimension` levels below `value` */
fn collect_lengths(value: &Value, dimension: usize, path: &str, out: &mut Vec<usize>) -> Result<(), ShapeError> {
    let items = expect_array(value, path)?;
    if dimension == 0 {
        out.push(items.len());
        return Ok(());
    }
    for (idx, item) in items.iter().enumerate() {
        collect_lengths(item, dimension - 1, &format!("{path}[{idx}]"), out)?;
    }
    Ok(())
}
