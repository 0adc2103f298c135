use crate::types::StructDef;
use serde_derive::{Deserialize, Serialize};

/* A serialized type graph: every struct produced by the schema front end */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct SchemaFile {
    #[serde(default)]
    pub package: Option<String>,

    #[serde(default)]
    pub structs: Vec<StructDef>,
}

impl SchemaFile {
    pub fn new(structs: Vec<StructDef>) -> Self {
        Self {
            package: None,
            structs,
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(yaml)
    }

    pub fn to_yaml_string(&self) -> Result<String, serde_yml::Error> {
        serde_yml::to_string(self)
    }

    pub fn get_struct(&self, name: &str) -> Option<&StructDef> {
        self.structs.iter().find(|def| def.name == name)
    }
}
