/* Helper utilities for Rust code generation */

use crate::codegen::shared::plan::ElementAccess;
use crate::layout::{LoopBound, LoopDescriptor};
use crate::schema::types::{PrimitiveType, SchemaType};

/* Rust reserved keywords that need to be escaped with r# */
const RUST_KEYWORDS: &[&str] = &[
  "as", "break", "const", "continue", "crate", "else", "enum", "extern",
  "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod",
  "move", "mut", "pub", "ref", "return", "self", "Self", "static", "struct",
  "super", "trait", "true", "type", "unsafe", "use", "where", "while",
  "async", "await", "dyn", "abstract", "become", "box", "do", "final",
  "macro", "override", "priv", "typeof", "unsized", "virtual", "yield", "try",
];

/* Escape Rust keywords to valid identifiers */
pub fn escape_rust_keyword(name: &str) -> String {
  if RUST_KEYWORDS.contains(&name) {
    format!("r#{}", name)
  } else {
    name.to_string()
  }
}

/* Convert primitive type to Rust type string */
pub fn primitive_to_rust_type(prim: PrimitiveType) -> &'static str {
  match prim {
    PrimitiveType::Boolean => "bool",
    PrimitiveType::Byte => "u8",
    PrimitiveType::Int8 => "i8",
    PrimitiveType::Int16 => "i16",
    PrimitiveType::Int32 => "i32",
    PrimitiveType::Int64 => "i64",
    PrimitiveType::Float => "f32",
    PrimitiveType::Double => "f64",
    PrimitiveType::String => "String",
  }
}

/* Runtime helper suffix, e.g. `read_i32` / `write_i32` */
pub fn wire_suffix(prim: PrimitiveType) -> &'static str {
  match prim {
    PrimitiveType::Boolean => "bool",
    PrimitiveType::Byte => "u8",
    PrimitiveType::Int8 => "i8",
    PrimitiveType::Int16 => "i16",
    PrimitiveType::Int32 => "i32",
    PrimitiveType::Int64 => "i64",
    PrimitiveType::Float => "f32",
    PrimitiveType::Double => "f64",
    PrimitiveType::String => "string",
  }
}

pub fn element_type_to_rust(member_type: &SchemaType) -> String {
  match member_type {
    SchemaType::Primitive(prim) => primitive_to_rust_type(*prim).to_string(),
    SchemaType::StructRef(type_ref) => type_ref.name.clone(),
  }
}

/* Wrap the element type with one array layer per loop, innermost last */
pub fn member_type_to_rust(member_type: &SchemaType, loops: &[LoopDescriptor]) -> String {
  loops
    .iter()
    .rev()
    .fold(element_type_to_rust(member_type), |inner, descriptor| match &descriptor.bound {
      LoopBound::Constant { extent } => format!("[{}; {}]", inner, extent),
      LoopBound::Field { .. } => format!("Vec<{}>", inner),
    })
}

/* `self.cells[i0][i1]` */
pub fn self_access(access: &ElementAccess) -> String {
  indexed_access("self", access, access.indices.len())
}

/* Access through the first `depth` index variables only */
pub fn indexed_access(receiver: &str, access: &ElementAccess, depth: usize) -> String {
  let mut out = format!("{}.{}", receiver, escape_rust_keyword(&access.member));
  for index in access.indices.iter().take(depth) {
    out.push_str(&format!("[{}]", index));
  }
  out
}

/* Local holding the recomputed value of a derived size member */
pub fn derived_local(member: &str) -> String {
  format!("derived_{}", member)
}

/* Local holding a decoded size member converted to a length */
pub fn length_local(member: &str) -> String {
  format!("len_{}", member)
}

/* Local holding a decoded member value */
pub fn decoded_local(member: &str) -> String {
  format!("m_{}", member)
}

/* Indentation for generated code, four spaces per level */
pub fn pad(level: usize) -> String {
  "    ".repeat(level)
}

/* Schema literals are written as-is, except floats need a decimal point */
pub fn constant_literal(prim: PrimitiveType, value: &str) -> String {
  match prim {
    PrimitiveType::Float | PrimitiveType::Double => {
      let trimmed = value.trim();
      if trimmed.contains(['.', 'e', 'E']) || trimmed.contains("inf") || trimmed.contains("nan") {
        trimmed.to_string()
      } else {
        format!("{}.0", trimmed)
      }
    }
    PrimitiveType::String => format!("{:?}", value),
    _ => value.trim().to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn nests_array_types_outermost_first() {
    let loops = vec![
      LoopDescriptor { depth: 0, bound: LoopBound::Constant { extent: 2 } },
      LoopDescriptor {
        depth: 1,
        bound: LoopBound::Field { member: "n".into(), primitive: PrimitiveType::Int32 },
      },
      LoopDescriptor { depth: 2, bound: LoopBound::Constant { extent: 3 } },
    ];
    assert_eq!(
      member_type_to_rust(&SchemaType::Primitive(PrimitiveType::Double), &loops),
      "[Vec<[f64; 3]>; 2]"
    );
    assert_eq!(member_type_to_rust(&SchemaType::struct_ref("Point"), &[]), "Point");
  }

  #[test]
  fn accesses_escape_keywords() {
    let access = ElementAccess::indexed("type", vec!["i0".into(), "i1".into()]);
    assert_eq!(self_access(&access), "self.r#type[i0][i1]");
    assert_eq!(indexed_access("self", &access, 1), "self.r#type[i0]");
  }

  #[test]
  fn float_constants_get_a_decimal_point() {
    assert_eq!(constant_literal(PrimitiveType::Double, "1"), "1.0");
    assert_eq!(constant_literal(PrimitiveType::Float, "2.5"), "2.5");
    assert_eq!(constant_literal(PrimitiveType::Double, "1e-3"), "1e-3");
    assert_eq!(constant_literal(PrimitiveType::Int32, " 7 "), "7");
  }
}
