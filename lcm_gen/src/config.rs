use crate::codegen::renderer::Language;
use serde_derive::{Deserialize, Serialize};

/// Generation settings, usually loaded from YAML.
///
/// ```yaml
/// renderers: [rust, plan-json]
/// runtime-module: lcm_runtime
/// emit-comments: true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GeneratorConfig {
    pub renderers: Vec<Language>,
    pub runtime_module: String,
    pub emit_comments: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            renderers: vec![Language::Rust],
            runtime_module: "lcm_runtime".to_string(),
            emit_comments: true,
        }
    }
}

impl GeneratorConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config = GeneratorConfig::from_yaml_str(
            "renderers: [rust, plan-json]\nruntime-module: wire\nemit-comments: false\n",
        )
        .unwrap();
        assert_eq!(config.renderers, vec![Language::Rust, Language::PlanJson]);
        assert_eq!(config.runtime_module, "wire");
        assert!(!config.emit_comments);
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = GeneratorConfig::from_yaml_str("emit-comments: false\n").unwrap();
        assert_eq!(config.renderers, vec![Language::Rust]);
        assert_eq!(config.runtime_module, "lcm_runtime");
    }

    #[test]
    fn rejects_unknown_renderer() {
        assert!(GeneratorConfig::from_yaml_str("renderers: [cobol]\n").is_err());
    }
}
