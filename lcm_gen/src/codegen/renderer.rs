//! Renderer seam: one codec plan, any number of target renderers.

use crate::codegen::plan_json::PlanJsonRenderer;
use crate::codegen::rust::{RustRenderer, RustRendererOptions};
use crate::codegen::shared::plan::CodecPlan;
use crate::codegen::shared::serialization::PlanSerializationError;
use crate::config::GeneratorConfig;
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Language {
    Rust,
    PlanJson,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Rust => f.write_str("rust"),
            Language::PlanJson => f.write_str("plan-json"),
        }
    }
}

/// Source text for one logical unit. Where it is written is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedUnit {
    pub name: String,
    pub language: Language,
    pub source: String,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to format generated source: {0}")]
    Format(#[from] fmt::Error),
    #[error(transparent)]
    Serialization(#[from] PlanSerializationError),
}

pub trait Renderer {
    fn language(&self) -> Language;

    fn render(&self, plan: &CodecPlan) -> Result<Vec<RenderedUnit>, RenderError>;
}

/// Instantiates the renderers named by the configuration, in order.
pub fn renderers_for(config: &GeneratorConfig) -> Vec<Box<dyn Renderer>> {
    config
        .renderers
        .iter()
        .map(|language| -> Box<dyn Renderer> {
            match language {
                Language::Rust => Box::new(RustRenderer::new(RustRendererOptions {
                    runtime_module: config.runtime_module.clone(),
                    emit_comments: config.emit_comments,
                })),
                Language::PlanJson => Box::new(PlanJsonRenderer),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_renderers_from_config() {
        let config = GeneratorConfig {
            renderers: vec![Language::PlanJson, Language::Rust],
            ..GeneratorConfig::default()
        };
        let languages: Vec<_> = renderers_for(&config).iter().map(|r| r.language()).collect();
        assert_eq!(languages, vec![Language::PlanJson, Language::Rust]);
    }

    #[test]
    fn empty_plan_renders_runtime_only() {
        let renderers = renderers_for(&GeneratorConfig::default());
        let units = renderers[0].render(&CodecPlan::new(vec![])).unwrap();
        let names: Vec<_> = units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["lcm_runtime", "types"]);
    }
}
