use crate::schema::error::SchemaError;
use crate::schema::types::{SchemaFile, StructDef};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Index of a struct inside a [`StructRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StructId(usize);

impl StructId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Immutable lookup table over every struct of a type graph.
///
/// Structs live in an arena addressed by [`StructId`]; names resolve through a
/// sorted index. Building the registry checks that names are unique and that
/// every struct reference resolves, so later phases can look structs up
/// without failing.
#[derive(Debug, Clone)]
pub struct StructRegistry {
    structs: Vec<StructDef>,
    index: BTreeMap<String, StructId>,
}

impl StructRegistry {
    pub fn build(structs: impl IntoIterator<Item = StructDef>) -> Result<Self, SchemaError> {
        let structs: Vec<StructDef> = structs.into_iter().collect();
        let mut index = BTreeMap::new();

        for (idx, def) in structs.iter().enumerate() {
            if index.insert(def.name.clone(), StructId(idx)).is_some() {
                return Err(SchemaError::DuplicateStruct {
                    name: def.name.clone(),
                });
            }
        }

        let registry = Self { structs, index };
        for def in &registry.structs {
            registry.validate_members(def)?;
        }

        debug!(structs = registry.structs.len(), "struct registry built");
        Ok(registry)
    }

    pub fn from_schema(file: &SchemaFile) -> Result<Self, SchemaError> {
        Self::build(file.structs.iter().cloned())
    }

    fn validate_members(&self, def: &StructDef) -> Result<(), SchemaError> {
        let mut seen = BTreeSet::new();
        for member in &def.members {
            if !seen.insert(member.name.as_str()) {
                return Err(SchemaError::DuplicateMember {
                    struct_name: def.name.clone(),
                    member: member.name.clone(),
                });
            }
            if let Some(type_name) = member.member_type.struct_name() {
                if !self.index.contains_key(type_name) {
                    return Err(SchemaError::UnknownStruct {
                        struct_name: def.name.clone(),
                        member: member.name.clone(),
                        type_name: type_name.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn id_of(&self, name: &str) -> Option<StructId> {
        self.index.get(name).copied()
    }

    /// Like [`Self::id_of`] but reports a missing name as a schema error.
    pub fn require(&self, name: &str) -> Result<StructId, SchemaError> {
        self.id_of(name).ok_or_else(|| SchemaError::MissingStruct {
            name: name.to_string(),
        })
    }

    pub fn get(&self, id: StructId) -> &StructDef {
        &self.structs[id.0]
    }

    pub fn lookup(&self, name: &str) -> Option<&StructDef> {
        self.id_of(name).map(|id| self.get(id))
    }

    /// Struct ids referenced by `id`'s members, in declaration order. A struct
    /// used by several members appears once per member.
    pub fn nested_ids(&self, id: StructId) -> Vec<StructId> {
        self.get(id)
            .members
            .iter()
            .filter_map(|member| member.member_type.struct_name())
            .filter_map(|name| self.id_of(name))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StructId, &StructDef)> {
        self.structs
            .iter()
            .enumerate()
            .map(|(idx, def)| (StructId(idx), def))
    }

    pub fn len(&self) -> usize {
        self.structs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{Member, PrimitiveType, SchemaType};

    fn point() -> StructDef {
        StructDef::new(
            "Point",
            1,
            vec![
                Member::primitive("x", PrimitiveType::Int32),
                Member::primitive("y", PrimitiveType::Int32),
            ],
        )
    }

    #[test]
    fn resolves_names_to_ids() {
        let line = StructDef::new(
            "Line",
            2,
            vec![
                Member::scalar("a", SchemaType::struct_ref("Point")),
                Member::scalar("b", SchemaType::struct_ref("Point")),
            ],
        );
        let registry = StructRegistry::build(vec![point(), line]).unwrap();

        let line_id = registry.id_of("Line").unwrap();
        let point_id = registry.id_of("Point").unwrap();
        assert_eq!(registry.get(line_id).name, "Line");
        assert_eq!(registry.nested_ids(line_id), vec![point_id, point_id]);
        assert!(registry.nested_ids(point_id).is_empty());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn rejects_duplicate_struct_names() {
        let err = StructRegistry::build(vec![point(), point()]).unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateStruct {
                name: "Point".into()
            }
        );
    }

    #[test]
    fn rejects_duplicate_member_names() {
        let def = StructDef::new(
            "Twice",
            3,
            vec![
                Member::primitive("v", PrimitiveType::Byte),
                Member::primitive("v", PrimitiveType::Int8),
            ],
        );
        let err = StructRegistry::build(vec![def]).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateMember { member, .. } if member == "v"));
    }

    #[test]
    fn rejects_unknown_struct_reference() {
        let def = StructDef::new(
            "Holder",
            4,
            vec![Member::scalar("inner", SchemaType::struct_ref("Missing"))],
        );
        let err = StructRegistry::build(vec![def]).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownStruct { type_name, .. } if type_name == "Missing"));
    }

    #[test]
    fn require_reports_missing_struct() {
        let registry = StructRegistry::build(vec![point()]).unwrap();
        assert!(registry.require("Point").is_ok());
        assert_eq!(
            registry.require("Nope").unwrap_err(),
            SchemaError::MissingStruct {
                name: "Nope".into()
            }
        );
    }
}
