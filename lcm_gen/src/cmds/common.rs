/* Common utilities shared between the generate and analyze commands */

use crate::config::GeneratorConfig;
use crate::schema::registry::StructRegistry;
use crate::schema::types::SchemaFile;
use anyhow::Context;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/* Load a YAML type graph produced by the schema front end */
pub fn load_schema(path: &Path) -> anyhow::Result<SchemaFile> {
  let text = fs::read_to_string(path)
    .with_context(|| format!("failed to read schema file {}", path.display()))?;
  let schema = SchemaFile::from_yaml_str(&text)
    .with_context(|| format!("failed to parse schema file {}", path.display()))?;
  info!(path = %path.display(), structs = schema.structs.len(), "loaded schema");
  Ok(schema)
}

/* Load generator settings, falling back to defaults when no file is given */
pub fn load_config(path: Option<&Path>) -> anyhow::Result<GeneratorConfig> {
  let Some(path) = path else {
    debug!("no generator config given, using defaults");
    return Ok(GeneratorConfig::default());
  };
  let text = fs::read_to_string(path)
    .with_context(|| format!("failed to read generator config {}", path.display()))?;
  GeneratorConfig::from_yaml_str(&text)
    .with_context(|| format!("failed to parse generator config {}", path.display()))
}

/* Validate the type graph into a registry */
pub fn build_registry(schema: &SchemaFile) -> anyhow::Result<StructRegistry> {
  StructRegistry::from_schema(schema).context("schema validation failed")
}
