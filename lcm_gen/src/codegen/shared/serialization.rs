use super::plan::{CodecPlan, PLAN_SCHEMA_VERSION};
use thiserror::Error;

/// Serialize the codec plan into pretty JSON.
pub fn plan_to_json(plan: &CodecPlan) -> Result<String, PlanSerializationError> {
    serde_json::to_string_pretty(plan).map_err(PlanSerializationError::from)
}

/// Serialize the codec plan into YAML.
pub fn plan_to_yaml(plan: &CodecPlan) -> Result<String, PlanSerializationError> {
    serde_yml::to_string(plan).map_err(PlanSerializationError::from)
}

/// Parse a JSON plan, rejecting versions this crate does not understand.
pub fn plan_from_json(text: &str) -> Result<CodecPlan, PlanSerializationError> {
    let plan: CodecPlan = serde_json::from_str(text)?;
    if plan.version != PLAN_SCHEMA_VERSION {
        return Err(PlanSerializationError::UnsupportedVersion {
            found: plan.version,
            expected: PLAN_SCHEMA_VERSION,
        });
    }
    Ok(plan)
}

#[derive(Debug, Error)]
pub enum PlanSerializationError {
    #[error("failed to encode plan as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to encode plan as YAML: {0}")]
    Yaml(#[from] serde_yml::Error),
    #[error("unsupported plan version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::shared::builder::PlanBuilder;
    use crate::schema::registry::StructRegistry;
    use crate::schema::types::{Dimension, Member, PrimitiveType, SchemaType, StructDef};

    fn sample_plan() -> CodecPlan {
        let samples = StructDef::new(
            "Samples",
            77,
            vec![
                Member::primitive("count", PrimitiveType::Int16),
                Member::array(
                    "values",
                    SchemaType::Primitive(PrimitiveType::Double),
                    vec![Dimension::FieldRef("count".into())],
                ),
                Member::primitive("label", PrimitiveType::String),
            ],
        )
        .with_derived_sizes();
        let registry = StructRegistry::build(vec![samples]).unwrap();
        PlanBuilder::new(&registry).build_all().unwrap()
    }

    #[test]
    fn json_export_tags_ops() {
        let json = plan_to_json(&sample_plan()).unwrap();
        assert!(json.contains("\"version\": 1"));
        assert!(json.contains("\"op\": \"derive-size\""));
        assert!(json.contains("\"op\": \"loop\""));
        assert!(json.contains("\"kind\": \"field\""));
        assert!(json.contains("\"primitive\": \"int16_t\""));
    }

    #[test]
    fn json_export_reads_back() {
        let plan = sample_plan();
        let parsed = plan_from_json(&plan_to_json(&plan).unwrap()).unwrap();
        assert_eq!(parsed, plan);
    }

    #[test]
    fn rejects_unknown_version() {
        let mut plan = sample_plan();
        plan.version = 99;
        let json = plan_to_json(&plan).unwrap();
        assert!(matches!(
            plan_from_json(&json),
            Err(PlanSerializationError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn yaml_export_lists_structs() {
        let yaml = plan_to_yaml(&sample_plan()).unwrap();
        assert!(yaml.contains("type_name: Samples"));
        assert!(yaml.contains("op: primitive"));
    }
}
