use crate::codegen::renderer::{Language, RenderError, RenderedUnit, Renderer};
use crate::codegen::rust_gen::{emit_constants, emit_functions, emit_runtime, emit_type};
use crate::codegen::shared::plan::CodecPlan;
use tracing::debug;

pub struct RustRenderer {
  options: RustRendererOptions,
}

pub struct RustRendererOptions {
  /* Module name of the runtime unit, imported by the types unit via `super::` */
  pub runtime_module: String,
  pub emit_comments: bool,
}

impl Default for RustRendererOptions {
  fn default() -> Self {
    Self {
      runtime_module: "lcm_runtime".to_string(),
      emit_comments: true,
    }
  }
}

impl RustRenderer {
  pub fn new(options: RustRendererOptions) -> Self {
    Self { options }
  }

  /* Struct definitions and impl blocks for every plan, dependencies first */
  pub fn emit_types(&self, plan: &CodecPlan) -> Result<String, RenderError> {
    let mut output = String::new();
    if self.options.emit_comments {
      output.push_str("//! Generated LCM types, do not edit.\n\n");
    }
    output.push_str(&format!("use super::{}::*;\n", self.options.runtime_module));

    for struct_plan in &plan.structs {
      output.push('\n');
      output.push_str(&emit_type(struct_plan, self.options.emit_comments)?);
      let constants = emit_constants(struct_plan, self.options.emit_comments)?;
      if !constants.is_empty() {
        output.push('\n');
        output.push_str(&constants);
      }
      output.push('\n');
      output.push_str(&emit_functions(plan, struct_plan, self.options.emit_comments)?);
      debug!(struct_name = %struct_plan.type_name, "rendered rust type");
    }

    Ok(output)
  }
}

impl Renderer for RustRenderer {
  fn language(&self) -> Language {
    Language::Rust
  }

  fn render(&self, plan: &CodecPlan) -> Result<Vec<RenderedUnit>, RenderError> {
    let runtime = RenderedUnit {
      name: self.options.runtime_module.clone(),
      language: Language::Rust,
      source: emit_runtime(&self.options.runtime_module, self.options.emit_comments)?,
    };
    let types = RenderedUnit {
      name: "types".to_string(),
      language: Language::Rust,
      source: self.emit_types(plan)?,
    };
    Ok(vec![runtime, types])
  }
}
