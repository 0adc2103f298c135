/* Generate command - plan every struct and run the configured renderers */

use super::common::{build_registry, load_config, load_schema};
use crate::codegen::renderer::{RenderedUnit, renderers_for};
use crate::codegen::shared::builder::PlanBuilder;
use crate::codegen::shared::plan::CodecPlan;
use crate::config::GeneratorConfig;
use crate::schema::types::SchemaFile;
use anyhow::Context;
use std::path::Path;
use tracing::info;

pub struct GenerationOutput {
  pub plan: CodecPlan,
  pub units: Vec<RenderedUnit>,
}

/* Execute the generate command */
pub fn run(schema_path: &Path, config_path: Option<&Path>) -> anyhow::Result<GenerationOutput> {
  let schema = load_schema(schema_path)?;
  let config = load_config(config_path)?;
  generate(&schema, &config)
}

pub fn generate(schema: &SchemaFile, config: &GeneratorConfig) -> anyhow::Result<GenerationOutput> {
  let registry = build_registry(schema)?;
  let plan = PlanBuilder::new(&registry)
    .build_all()
    .context("failed to build codec plan")?;

  let mut units = Vec::new();
  for renderer in renderers_for(config) {
    let language = renderer.language();
    let rendered = renderer
      .render(&plan)
      .with_context(|| format!("{} renderer failed", language))?;
    info!(%language, units = rendered.len(), "rendered");
    units.extend(rendered);
  }

  Ok(GenerationOutput { plan, units })
}
