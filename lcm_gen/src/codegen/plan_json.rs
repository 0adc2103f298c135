use crate::codegen::renderer::{Language, RenderError, RenderedUnit, Renderer};
use crate::codegen::shared::plan::CodecPlan;
use crate::codegen::shared::serialization::plan_to_json;

/// Emits the plan itself so out-of-process renderers can consume it.
pub struct PlanJsonRenderer;

impl Renderer for PlanJsonRenderer {
    fn language(&self) -> Language {
        Language::PlanJson
    }

    fn render(&self, plan: &CodecPlan) -> Result<Vec<RenderedUnit>, RenderError> {
        Ok(vec![RenderedUnit {
            name: "codec_plan".to_string(),
            language: Language::PlanJson,
            source: plan_to_json(plan)?,
        }])
    }
}
