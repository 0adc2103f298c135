/* Struct definitions and constant blocks for generated Rust types */

use super::helpers::{constant_literal, escape_rust_keyword, member_type_to_rust, primitive_to_rust_type};
use crate::codegen::shared::plan::StructPlan;
use std::fmt::Write;

/* Emit the struct definition. Derived size members are not stored; they are
   exposed through accessors computed from the arrays they govern. */
pub fn emit_type(plan: &StructPlan, emit_comments: bool) -> Result<String, std::fmt::Error> {
  let mut out = String::new();

  if emit_comments {
    if let Some(comment) = &plan.comment {
      for line in comment.lines() {
        writeln!(out, "/// {}", line.trim_end())?;
      }
    }
  }
  writeln!(out, "#[derive(Debug, Clone, PartialEq)]")?;

  let stored: Vec<_> = plan.layout.members.iter().filter(|m| !m.derived).collect();
  if stored.is_empty() {
    writeln!(out, "pub struct {};", plan.type_name)?;
    return Ok(out);
  }

  writeln!(out, "pub struct {} {{", plan.type_name)?;
  for member in stored {
    if emit_comments {
      if let Some(comment) = &member.comment {
        for line in comment.lines() {
          writeln!(out, "    /// {}", line.trim_end())?;
        }
      }
    }
    writeln!(
      out,
      "    pub {}: {},",
      escape_rust_keyword(&member.name),
      member_type_to_rust(&member.member_type, &member.loops)
    )?;
  }
  writeln!(out, "}}")?;
  Ok(out)
}

/* Emit schema constants as associated consts */
pub fn emit_constants(plan: &StructPlan, emit_comments: bool) -> Result<String, std::fmt::Error> {
  let mut out = String::new();
  if plan.constants.is_empty() {
    return Ok(out);
  }

  writeln!(out, "impl {} {{", plan.type_name)?;
  for constant in &plan.constants {
    if emit_comments {
      if let Some(comment) = &constant.comment {
        writeln!(out, "    /// {}", comment.trim())?;
      }
    }
    let rust_type = match constant.primitive {
      crate::schema::types::PrimitiveType::String => "&str",
      other => primitive_to_rust_type(other),
    };
    writeln!(
      out,
      "    pub const {}: {} = {};",
      constant.name,
      rust_type,
      constant_literal(constant.primitive, &constant.value)
    )?;
  }
  writeln!(out, "}}")?;
  Ok(out)
}
