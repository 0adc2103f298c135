/* Codec method generation for Rust types.
   Every method body is produced by walking one op sequence of the struct plan,
   so the emitted code follows the same member order and loop nest as the
   reflective runtime. */

use super::helpers::{
  decoded_local, derived_local, escape_rust_keyword, indexed_access, length_local, pad,
  self_access, wire_suffix,
};
use crate::codegen::shared::plan::{
  CodecPlan, DeriveSizeNode, ElementAccess, LoopNode, PlanOp, PrimitiveNode, StructPlan,
};
use crate::layout::{LoopBound, SizeGroup};
use crate::schema::types::PrimitiveType;
use std::fmt::Write;

/* Method names the generated impl block already uses */
const RESERVED_METHODS: &[&str] = &[
  "size", "encode", "decode", "marshal_binary", "unmarshal_binary", "write_payload",
  "read_payload", "deep_copy", "fingerprint", "fingerprint_with_path",
];

/* Name of the accessor exposing a derived size member */
pub fn accessor_name(member: &str) -> String {
  if RESERVED_METHODS.contains(&member) {
    format!("{}_value", member)
  } else {
    escape_rust_keyword(member)
  }
}

/* `codec` supplies nested struct plans for decode bounds checks */
pub fn emit_functions(
  codec: &CodecPlan,
  plan: &StructPlan,
  emit_comments: bool,
) -> Result<String, std::fmt::Error> {
  let emitter = FunctionEmitter { codec, plan, emit_comments };
  let mut out = String::new();
  writeln!(out, "impl {} {{", plan.type_name)?;
  emitter.emit_fingerprint(&mut out)?;
  for group in plan.layout.size_groups.values() {
    writeln!(out)?;
    emitter.emit_derived_accessor(&mut out, group)?;
  }
  writeln!(out)?;
  emitter.emit_size(&mut out)?;
  writeln!(out)?;
  emitter.emit_encode(&mut out)?;
  writeln!(out)?;
  emitter.emit_decode(&mut out)?;
  writeln!(out)?;
  emitter.emit_copy(&mut out)?;
  writeln!(out, "}}")?;
  Ok(out)
}

struct FunctionEmitter<'a> {
  codec: &'a CodecPlan,
  plan: &'a StructPlan,
  emit_comments: bool,
}

impl<'a> FunctionEmitter<'a> {
  fn doc(&self, out: &mut String, text: &str) -> std::fmt::Result {
    if self.emit_comments {
      writeln!(out, "    /// {}", text)?;
    }
    Ok(())
  }

  fn emit_fingerprint(&self, out: &mut String) -> std::fmt::Result {
    let fingerprint = &self.plan.fingerprint;
    writeln!(out, "    pub const BASE_HASH: u64 = {:#018x};", fingerprint.base_hash)?;
    writeln!(out, "    pub const FINGERPRINT: u64 = {:#018x};", fingerprint.value)?;
    writeln!(out)?;

    self.doc(out, "Fingerprint with the structs already on `path` contributing 0.")?;
    writeln!(out, "    pub fn fingerprint_with_path(path: &mut Vec<u64>) -> u64 {{")?;
    writeln!(out, "        if path.contains(&Self::BASE_HASH) {{")?;
    writeln!(out, "            return 0;")?;
    writeln!(out, "        }}")?;
    writeln!(out, "        path.push(Self::BASE_HASH);")?;
    if fingerprint.nested.is_empty() {
      writeln!(out, "        let hash = Self::BASE_HASH;")?;
    } else {
      writeln!(out, "        let mut hash = Self::BASE_HASH;")?;
      for nested in &fingerprint.nested {
        writeln!(out, "        hash = hash.wrapping_add({}::fingerprint_with_path(path));", nested)?;
      }
    }
    writeln!(out, "        path.pop();")?;
    writeln!(out, "        hash.rotate_left(1)")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(out, "    pub fn fingerprint() -> u64 {{")?;
    writeln!(out, "        Self::fingerprint_with_path(&mut Vec::new())")?;
    writeln!(out, "    }}")?;
    Ok(())
  }

  /* The first governed array is authoritative, every other one must agree */
  fn emit_derived_accessor(&self, out: &mut String, group: &SizeGroup) -> std::fmt::Result {
    let rust_type = super::helpers::primitive_to_rust_type(group.primitive);
    self.doc(
      out,
      &format!(
        "Value of `{}`, computed from the arrays it sizes and checked across all of them.",
        group.size_member
      ),
    )?;
    writeln!(
      out,
      "    pub fn {}(&self) -> Result<{}, CodecError> {{",
      accessor_name(&group.size_member),
      rust_type
    )?;
    writeln!(out, "        let mut observed: Option<(usize, &'static str)> = None;")?;
    for source in &group.sources {
      let receiver = format!("self.{}", escape_rust_keyword(&source.member));
      let mut current = receiver;
      for level in 0..source.dimension {
        writeln!(out, "{}for a{} in {}.iter() {{", pad(2 + level), level, current)?;
        current = format!("a{}", level);
      }
      writeln!(
        out,
        "{}observe_len(&mut observed, {:?}, {:?}, {}.len())?;",
        pad(2 + source.dimension),
        group.size_member,
        source.member,
        current
      )?;
      for level in (0..source.dimension).rev() {
        writeln!(out, "{}}}", pad(2 + level))?;
      }
    }
    writeln!(
      out,
      "        size_value({:?}, observed.map_or(0, |(len, _)| len))",
      group.size_member
    )?;
    writeln!(out, "    }}")?;
    Ok(())
  }

  fn emit_size(&self, out: &mut String) -> std::fmt::Result {
    self.doc(out, "Encoded payload size in bytes, without the fingerprint header.")?;
    writeln!(out, "    pub fn size(&self) -> Result<usize, CodecError> {{")?;
    if self.plan.size.is_empty() {
      writeln!(out, "        Ok(0)")?;
    } else {
      writeln!(out, "        let mut size = 0usize;")?;
      for op in &self.plan.size {
        self.size_op(out, op, 2)?;
      }
      writeln!(out, "        Ok(size)")?;
    }
    writeln!(out, "    }}")?;
    Ok(())
  }

  fn size_op(&self, out: &mut String, op: &PlanOp, level: usize) -> std::fmt::Result {
    match op {
      PlanOp::DeriveSize(node) => self.derive_stmt(out, node, level),
      PlanOp::Primitive(node) => match node.width {
        Some(width) => writeln!(out, "{}size += {};", pad(level), width),
        None => writeln!(out, "{}size += string_size(&{});", pad(level), self_access(&node.access)),
      },
      PlanOp::Nested(node) => {
        writeln!(out, "{}size += {}.size()?;", pad(level), self_access(&node.access))
      }
      PlanOp::Loop(node) => {
        let index = if size_uses_index(&node.body) { node.index.as_str() } else { "_" };
        writeln!(out, "{}for {} in 0..{} {{", pad(level), index, encode_bound(&node.bound))?;
        for inner in &node.body {
          self.size_op(out, inner, level + 1)?;
        }
        writeln!(out, "{}}}", pad(level))
      }
    }
  }

  fn derive_stmt(&self, out: &mut String, node: &DeriveSizeNode, level: usize) -> std::fmt::Result {
    writeln!(
      out,
      "{}let {} = self.{}()?;",
      pad(level),
      derived_local(&node.member),
      accessor_name(&node.member)
    )
  }

  fn emit_encode(&self, out: &mut String) -> std::fmt::Result {
    self.doc(out, "Fingerprint header followed by the payload.")?;
    writeln!(out, "    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {{")?;
    writeln!(out, "        let mut out = Vec::with_capacity(8 + self.size()?);")?;
    writeln!(out, "        write_u64(&mut out, Self::FINGERPRINT);")?;
    writeln!(out, "        self.write_payload(&mut out)?;")?;
    writeln!(out, "        Ok(out)")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    self.doc(out, "Payload only, as embedded in enclosing structs.")?;
    writeln!(out, "    pub fn marshal_binary(&self) -> Result<Vec<u8>, CodecError> {{")?;
    writeln!(out, "        let mut out = Vec::with_capacity(self.size()?);")?;
    writeln!(out, "        self.write_payload(&mut out)?;")?;
    writeln!(out, "        Ok(out)")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;

    let out_param = if self.plan.encode.is_empty() { "_out" } else { "out" };
    writeln!(
      out,
      "    pub fn write_payload(&self, {}: &mut Vec<u8>) -> Result<(), CodecError> {{",
      out_param
    )?;
    for op in &self.plan.encode {
      self.encode_op(out, op, 2)?;
    }
    writeln!(out, "        Ok(())")?;
    writeln!(out, "    }}")?;
    Ok(())
  }

  fn encode_op(&self, out: &mut String, op: &PlanOp, level: usize) -> std::fmt::Result {
    match op {
      PlanOp::DeriveSize(node) => self.derive_stmt(out, node, level),
      PlanOp::Primitive(node) => self.write_primitive(out, node, level),
      PlanOp::Nested(node) => {
        writeln!(out, "{}{}.write_payload(out)?;", pad(level), self_access(&node.access))
      }
      PlanOp::Loop(node) => {
        writeln!(out, "{}for {} in 0..{} {{", pad(level), node.index, encode_bound(&node.bound))?;
        for inner in &node.body {
          self.encode_op(out, inner, level + 1)?;
        }
        writeln!(out, "{}}}", pad(level))
      }
    }
  }

  fn write_primitive(&self, out: &mut String, node: &PrimitiveNode, level: usize) -> std::fmt::Result {
    let value = if node.derived {
      derived_local(&node.access.member)
    } else {
      self_access(&node.access)
    };
    match node.primitive {
      PrimitiveType::String => writeln!(out, "{}write_string(out, &{})?;", pad(level), value),
      prim => writeln!(out, "{}write_{}(out, {});", pad(level), wire_suffix(prim), value),
    }
  }

  fn emit_decode(&self, out: &mut String) -> std::fmt::Result {
    self.doc(out, "Checks the fingerprint header, then decodes the payload and its length.")?;
    writeln!(out, "    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {{")?;
    writeln!(out, "        check_fingerprint(data, Self::FINGERPRINT)?;")?;
    writeln!(out, "        let payload = &data[8..];")?;
    writeln!(out, "        let value = Self::unmarshal_binary(payload)?;")?;
    writeln!(out, "        let size = value.size()?;")?;
    writeln!(out, "        if size != payload.len() {{")?;
    writeln!(
      out,
      "            return Err(CodecError::SizeMismatch {{ expected: size, actual: payload.len() }});"
    )?;
    writeln!(out, "        }}")?;
    writeln!(out, "        Ok(value)")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(out, "    pub fn unmarshal_binary(data: &[u8]) -> Result<Self, CodecError> {{")?;
    writeln!(out, "        let mut reader = Reader::new(data);")?;
    writeln!(out, "        Self::read_payload(&mut reader)")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;

    let reader_param = if self.plan.decode.is_empty() { "_reader" } else { "reader" };
    writeln!(
      out,
      "    pub fn read_payload({}: &mut Reader<'_>) -> Result<Self, CodecError> {{",
      reader_param
    )?;
    let mut fields = Vec::new();
    for op in &self.plan.decode {
      self.decode_member(out, op, &mut fields)?;
    }
    if fields.is_empty() {
      writeln!(out, "        Ok(Self {{}})")?;
    } else {
      writeln!(out, "        Ok(Self {{")?;
      for (field, local) in fields {
        writeln!(out, "            {}: {},", field, local)?;
      }
      writeln!(out, "        }})")?;
    }
    writeln!(out, "    }}")?;
    Ok(())
  }

  /* One top-level decode op reads one member */
  fn decode_member(
    &self,
    out: &mut String,
    op: &PlanOp,
    fields: &mut Vec<(String, String)>,
  ) -> std::fmt::Result {
    match op {
      PlanOp::Primitive(node) if node.derived => writeln!(
        out,
        "        let {} = checked_len({:?}, i64::from(reader.read_{}()?))?;",
        length_local(&node.access.member),
        node.access.member,
        wire_suffix(node.primitive)
      ),
      PlanOp::Primitive(node) => {
        let local = decoded_local(&node.access.member);
        writeln!(out, "        let {} = {};", local, read_primitive_expr(node.primitive))?;
        fields.push((escape_rust_keyword(&node.access.member), local));
        Ok(())
      }
      PlanOp::Nested(node) => {
        let local = decoded_local(&node.access.member);
        writeln!(out, "        let {} = {}::read_payload(reader)?;", local, node.type_name)?;
        fields.push((escape_rust_keyword(&node.access.member), local));
        Ok(())
      }
      PlanOp::Loop(node) => {
        let Some(access) = innermost_access(op) else {
          return Ok(());
        };
        let member = access.member.clone();
        let local = decoded_local(&member);
        self.decode_loop(out, node, 0, 2)?;
        writeln!(out, "        let {} = {};", local, finish_level(&node.bound, 0))?;
        fields.push((escape_rust_keyword(&member), local));
        Ok(())
      }
      PlanOp::DeriveSize(_) => Ok(()),
    }
  }

  /* Fills `v{depth}` with the elements of one loop level */
  fn decode_loop(&self, out: &mut String, node: &LoopNode, depth: usize, level: usize) -> std::fmt::Result {
    let (capacity, bound) = match &node.bound {
      LoopBound::Constant { extent } => (extent.to_string(), extent.to_string()),
      LoopBound::Field { member, .. } => {
        let len = length_local(member);
        writeln!(
          out,
          "{}reader.check_count({}, {})?;",
          pad(level),
          len,
          self.codec.min_element_width(node)
        )?;
        (format!("{}.min(reader.remaining())", len), len)
      }
    };
    writeln!(out, "{}let mut v{} = Vec::with_capacity({});", pad(level), depth, capacity)?;
    writeln!(out, "{}for _ in 0..{} {{", pad(level), bound)?;
    for inner in &node.body {
      match inner {
        PlanOp::Loop(child) => {
          self.decode_loop(out, child, depth + 1, level + 1)?;
          writeln!(out, "{}v{}.push({});", pad(level + 1), depth, finish_level(&child.bound, depth + 1))?;
        }
        PlanOp::Primitive(prim) => {
          writeln!(out, "{}v{}.push({});", pad(level + 1), depth, read_primitive_expr(prim.primitive))?;
        }
        PlanOp::Nested(nested) => {
          writeln!(out, "{}v{}.push({}::read_payload(reader)?);", pad(level + 1), depth, nested.type_name)?;
        }
        PlanOp::DeriveSize(_) => {}
      }
    }
    writeln!(out, "{}}}", pad(level))
  }

  fn emit_copy(&self, out: &mut String) -> std::fmt::Result {
    self.doc(out, "Deep copy; array storage is never shared with `self`.")?;
    writeln!(out, "    pub fn deep_copy(&self) -> Self {{")?;
    let fields: Vec<(String, String)> = self
      .plan
      .copy
      .iter()
      .filter(|op| !matches!(op, PlanOp::Primitive(node) if node.derived))
      .filter_map(|op| {
        innermost_access(op).map(|access| (escape_rust_keyword(&access.member), copy_expr(op)))
      })
      .collect();
    if fields.is_empty() {
      writeln!(out, "        Self {{}}")?;
    } else {
      writeln!(out, "        Self {{")?;
      for (field, expr) in fields {
        writeln!(out, "            {}: {},", field, expr)?;
      }
      writeln!(out, "        }}")?;
    }
    writeln!(out, "    }}")?;
    Ok(())
  }
}

fn encode_bound(bound: &LoopBound) -> String {
  match bound {
    LoopBound::Constant { extent } => extent.to_string(),
    LoopBound::Field { member, .. } => format!("{} as usize", derived_local(member)),
  }
}

/* Fixed-width primitives do not need the index to be counted */
fn size_uses_index(body: &[PlanOp]) -> bool {
  body.iter().any(|op| match op {
    PlanOp::Primitive(node) => node.width.is_none(),
    PlanOp::Nested(_) => true,
    PlanOp::Loop(node) => size_uses_index(&node.body),
    PlanOp::DeriveSize(_) => false,
  })
}

fn read_primitive_expr(prim: PrimitiveType) -> String {
  format!("reader.read_{}()?", wire_suffix(prim))
}

fn finish_level(bound: &LoopBound, depth: usize) -> String {
  match bound {
    LoopBound::Constant { extent } => format!("into_array::<_, {}>(v{})?", extent, depth),
    LoopBound::Field { .. } => format!("v{}", depth),
  }
}

fn innermost_access(op: &PlanOp) -> Option<&ElementAccess> {
  match op {
    PlanOp::Loop(node) => node.body.iter().find_map(innermost_access),
    PlanOp::Primitive(node) => Some(&node.access),
    PlanOp::Nested(node) => Some(&node.access),
    PlanOp::DeriveSize(_) => None,
  }
}

fn copy_expr(op: &PlanOp) -> String {
  match op {
    PlanOp::Primitive(node) => match node.primitive {
      PrimitiveType::String => format!("{}.clone()", self_access(&node.access)),
      _ => self_access(&node.access),
    },
    PlanOp::Nested(node) => format!("{}.deep_copy()", self_access(&node.access)),
    PlanOp::Loop(node) => {
      let inner = node
        .body
        .first()
        .map(copy_expr)
        .unwrap_or_default();
      match &node.bound {
        LoopBound::Constant { .. } => format!("std::array::from_fn(|{}| {})", node.index, inner),
        LoopBound::Field { .. } => {
          let source = innermost_access(op)
            .map(|access| {
              let depth = access
                .indices
                .iter()
                .position(|index| *index == node.index)
                .unwrap_or(0);
              indexed_access("self", access, depth)
            })
            .unwrap_or_default();
          format!("(0..{}.len()).map(|{}| {}).collect::<Vec<_>>()", source, node.index, inner)
        }
      }
    }
    PlanOp::DeriveSize(_) => String::new(),
  }
}
