//! Layout planning: loop nesting, size-member resolution and derived members.

use crate::schema::error::SchemaError;
use crate::schema::registry::{StructId, StructRegistry};
use crate::schema::types::{Dimension, Member, PrimitiveType, SchemaType, StructDef};
use indexmap::IndexMap;
use serde_derive::{Deserialize, Serialize};
use tracing::debug;

/// Upper bound of one loop level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LoopBound {
    /// `for i in 0..extent`
    Constant { extent: u64 },
    /// `for i in 0..<value of member>`
    Field {
        member: String,
        primitive: PrimitiveType,
    },
}

/// One level of the loop nest wrapping an array member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopDescriptor {
    pub depth: usize,
    pub bound: LoopBound,
}

impl LoopDescriptor {
    /// Name of the index variable for this level (`i0`, `i1`, ...).
    pub fn index_var(&self) -> String {
        format!("i{}", self.depth)
    }

    pub fn is_variable(&self) -> bool {
        matches!(self.bound, LoopBound::Field { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberLayout {
    pub name: String,
    pub member_type: SchemaType,
    #[serde(default)]
    pub loops: Vec<LoopDescriptor>,
    /// Value is recomputed from the governed arrays, never stored independently.
    #[serde(default)]
    pub derived: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

impl MemberLayout {
    pub fn is_array(&self) -> bool {
        !self.loops.is_empty()
    }
}

/// An array dimension whose extent is carried by a size member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeSource {
    pub member: String,
    /// Position of the governed dimension in the member's dimension list.
    pub dimension: usize,
}

/// All dimensions governed by one derived size member, in declaration order.
/// The first source is authoritative; the rest must agree with it on encode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeGroup {
    pub size_member: String,
    pub primitive: PrimitiveType,
    pub sources: Vec<SizeSource>,
}

impl SizeGroup {
    pub fn authoritative(&self) -> Option<&SizeSource> {
        self.sources.first()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructLayout {
    pub name: String,
    pub members: Vec<MemberLayout>,
    /// Keyed by size member name, in the order the size members are declared.
    #[serde(default)]
    pub size_groups: IndexMap<String, SizeGroup>,
    /// Payload size when it does not depend on the instance.
    #[serde(default)]
    pub fixed_size: Option<u64>,
}

impl StructLayout {
    pub fn member(&self, name: &str) -> Option<&MemberLayout> {
        self.members.iter().find(|member| member.name == name)
    }

    pub fn size_group(&self, size_member: &str) -> Option<&SizeGroup> {
        self.size_groups.get(size_member)
    }
}

pub struct LayoutPlanner<'a> {
    registry: &'a StructRegistry,
}

impl<'a> LayoutPlanner<'a> {
    pub fn new(registry: &'a StructRegistry) -> Self {
        Self { registry }
    }

    pub fn plan(&self, id: StructId) -> Result<StructLayout, SchemaError> {
        let def = self.registry.get(id);
        let mut size_groups: IndexMap<String, SizeGroup> = IndexMap::new();

        // Seed groups in size-member declaration order so the map iterates the
        // same way renderers emit the accessors.
        for member in &def.members {
            let referenced = def.members.iter().any(|m| m.references(&member.name));
            if referenced {
                if let Some(prim) = member.member_type.as_primitive() {
                    size_groups.insert(
                        member.name.clone(),
                        SizeGroup {
                            size_member: member.name.clone(),
                            primitive: prim,
                            sources: Vec::new(),
                        },
                    );
                }
            }
        }

        let mut members = Vec::with_capacity(def.members.len());
        for (position, member) in def.members.iter().enumerate() {
            let loops = self.plan_loops(def, position, member)?;
            for (dimension, dim) in member.dimensions.iter().enumerate() {
                if let Dimension::FieldRef(size_member) = dim {
                    if let Some(group) = size_groups.get_mut(size_member) {
                        group.sources.push(SizeSource {
                            member: member.name.clone(),
                            dimension,
                        });
                    }
                }
            }
            members.push(MemberLayout {
                name: member.name.clone(),
                member_type: member.member_type.clone(),
                loops,
                derived: false,
                comment: member.comment.clone(),
            });
        }

        for (member, layout) in def.members.iter().zip(members.iter_mut()) {
            layout.derived = size_groups.contains_key(&member.name);
            if member.derived_size && !layout.derived {
                return Err(SchemaError::OrphanDerivedSize {
                    struct_name: def.name.clone(),
                    member: member.name.clone(),
                });
            }
        }

        let fixed_size = self.static_size(id, &mut Vec::new());
        debug!(
            struct_name = %def.name,
            size_groups = size_groups.len(),
            fixed_size = ?fixed_size,
            "planned struct layout"
        );

        Ok(StructLayout {
            name: def.name.clone(),
            members,
            size_groups,
            fixed_size,
        })
    }

    fn plan_loops(
        &self,
        def: &StructDef,
        position: usize,
        member: &Member,
    ) -> Result<Vec<LoopDescriptor>, SchemaError> {
        member
            .dimensions
            .iter()
            .enumerate()
            .map(|(depth, dim)| {
                let bound = match dim {
                    Dimension::Constant(extent) => LoopBound::Constant { extent: *extent },
                    Dimension::FieldRef(size_member) => {
                        let primitive = self.resolve_size_member(def, position, member, size_member)?;
                        LoopBound::Field {
                            member: size_member.clone(),
                            primitive,
                        }
                    }
                };
                Ok(LoopDescriptor { depth, bound })
            })
            .collect()
    }

    fn resolve_size_member(
        &self,
        def: &StructDef,
        position: usize,
        member: &Member,
        size_member: &str,
    ) -> Result<PrimitiveType, SchemaError> {
        if size_member == member.name {
            return Err(SchemaError::SelfReferentialSize {
                struct_name: def.name.clone(),
                member: member.name.clone(),
            });
        }

        let size_position =
            def.member_index(size_member)
                .ok_or_else(|| SchemaError::UnknownSizeMember {
                    struct_name: def.name.clone(),
                    member: member.name.clone(),
                    size_member: size_member.to_string(),
                })?;
        let target = &def.members[size_position];

        let primitive = match target.member_type.as_primitive() {
            Some(prim) if prim.is_size_type() => prim,
            _ => {
                return Err(SchemaError::NonIntegerSize {
                    struct_name: def.name.clone(),
                    member: member.name.clone(),
                    size_member: size_member.to_string(),
                    found: target.member_type.to_string(),
                });
            }
        };

        if target.is_array() {
            return Err(SchemaError::NonScalarSize {
                struct_name: def.name.clone(),
                member: member.name.clone(),
                size_member: size_member.to_string(),
                dimensions: target.dimensions.len(),
            });
        }

        if size_position > position {
            return Err(SchemaError::SizeDeclaredAfterArray {
                struct_name: def.name.clone(),
                member: member.name.clone(),
                size_member: size_member.to_string(),
                size_position,
                member_position: position,
            });
        }

        Ok(primitive)
    }

    /// Payload size when every member has a statically known encoding.
    fn static_size(&self, id: StructId, visiting: &mut Vec<StructId>) -> Option<u64> {
        if visiting.contains(&id) {
            return None;
        }
        visiting.push(id);
        let def = self.registry.get(id);
        let mut total: u64 = 0;
        let mut result = Some(());
        for member in &def.members {
            let element = match &member.member_type {
                SchemaType::Primitive(prim) => prim.fixed_width(),
                SchemaType::StructRef(type_ref) => self
                    .registry
                    .id_of(&type_ref.name)
                    .and_then(|nested| self.static_size(nested, visiting)),
            };
            let count = member.dimensions.iter().try_fold(1u64, |acc, dim| match dim {
                Dimension::Constant(extent) => acc.checked_mul(*extent),
                Dimension::FieldRef(_) => None,
            });
            match element
                .zip(count)
                .and_then(|(width, count)| width.checked_mul(count))
                .and_then(|bytes| total.checked_add(bytes))
            {
                Some(next) => total = next,
                None => {
                    result = None;
                    break;
                }
            }
        }
        visiting.pop();
        result.map(|_| total)
    }
}
