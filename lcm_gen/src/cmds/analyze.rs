/* Analyze command - human readable summary of the planned layout */

use super::common::build_registry;
use crate::codegen::shared::builder::PlanBuilder;
use crate::layout::LoopBound;
use crate::schema::struct_graph::StructGraph;
use crate::schema::types::SchemaFile;
use anyhow::Context;
use std::fmt::Write;

/* Produce the analysis report for a type graph */
pub fn report(schema: &SchemaFile) -> anyhow::Result<String> {
  let registry = build_registry(schema)?;
  let order = StructGraph::build(&registry)
    .topo_order()
    .context("dependency analysis failed")?;
  let plan = PlanBuilder::new(&registry)
    .build_all()
    .context("failed to build codec plan")?;

  let mut out = String::new();
  writeln!(out, "LCM Generator - Type Analysis")?;
  writeln!(out, "=============================")?;
  writeln!(out, "[~] {} struct(s), planned in order: {}", plan.structs.len(), order.join(", "))?;

  for struct_plan in &plan.structs {
    let layout = &struct_plan.layout;
    writeln!(out)?;
    writeln!(out, "struct {}", struct_plan.type_name)?;
    writeln!(out, "  fingerprint: {:#018x}", struct_plan.fingerprint.value)?;
    match layout.fixed_size {
      Some(size) => writeln!(out, "  payload size: {} bytes (fixed)", size)?,
      None => writeln!(out, "  payload size: variable")?,
    }

    for member in &layout.members {
      let mut dims = String::new();
      for descriptor in &member.loops {
        match &descriptor.bound {
          LoopBound::Constant { extent } => write!(dims, "[{}]", extent)?,
          LoopBound::Field { member, .. } => write!(dims, "[{}]", member)?,
        }
      }
      let marker = if member.derived { " (derived)" } else { "" };
      writeln!(out, "  - {}: {}{}{}", member.name, member.member_type, dims, marker)?;
    }

    for group in layout.size_groups.values() {
      let sources: Vec<String> = group
        .sources
        .iter()
        .map(|source| format!("{}[dim {}]", source.member, source.dimension))
        .collect();
      writeln!(out, "  size group {}: {}", group.size_member, sources.join(", "))?;
    }
  }

  Ok(out)
}
