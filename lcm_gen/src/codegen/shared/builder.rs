use super::plan::*;
use crate::fingerprint::FingerprintEngine;
use crate::layout::{LayoutPlanner, MemberLayout, StructLayout};
use crate::schema::error::SchemaError;
use crate::schema::registry::{StructId, StructRegistry};
use crate::schema::struct_graph::StructGraph;
use crate::schema::types::SchemaType;
use tracing::{debug, info};

/// Builds codec plans from a validated struct registry.
pub struct PlanBuilder<'a> {
    registry: &'a StructRegistry,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(registry: &'a StructRegistry) -> Self {
        Self { registry }
    }

    /// Builds plans for every struct, dependencies first.
    pub fn build_all(&self) -> Result<CodecPlan, SchemaError> {
        let order = StructGraph::build(self.registry).topo_order()?;
        let mut structs = Vec::with_capacity(order.len());
        for name in order {
            let id = self.registry.require(&name)?;
            structs.push(self.build_id(id)?);
        }
        info!(structs = structs.len(), "codec plan built");
        Ok(CodecPlan::new(structs))
    }

    /// Builds the plan of a single struct. Composition cycles anywhere in the
    /// registry are rejected here as well.
    pub fn build_struct(&self, name: &str) -> Result<StructPlan, SchemaError> {
        StructGraph::build(self.registry).topo_order()?;
        let id = self.registry.require(name)?;
        self.build_id(id)
    }

    fn build_id(&self, id: StructId) -> Result<StructPlan, SchemaError> {
        let def = self.registry.get(id);
        let layout = LayoutPlanner::new(self.registry).plan(id)?;
        let fingerprint = FingerprintEngine::new(self.registry).plan(id);

        let mut size = Vec::new();
        let mut encode = Vec::new();
        let mut decode = Vec::new();
        let mut copy = Vec::new();
        for member in &layout.members {
            let stored = Self::member_op(member);
            if member.derived {
                let derive = Self::derive_op(&layout, member)?;
                size.push(derive.clone());
                encode.push(derive);
            }
            size.push(stored.clone());
            encode.push(stored.clone());
            decode.push(stored.clone());
            copy.push(stored);
        }

        debug!(
            struct_name = %def.name,
            fingerprint = format_args!("{:#018x}", fingerprint.value),
            ops = size.len(),
            "built struct plan"
        );

        Ok(StructPlan {
            type_name: def.name.clone(),
            comment: def.comment.clone(),
            constants: def.constants.clone(),
            fingerprint,
            layout,
            size,
            encode,
            decode,
            copy,
        })
    }

    /// Element op for one member, wrapped in its loop nest (outermost first).
    fn member_op(member: &MemberLayout) -> PlanOp {
        let indices: Vec<String> = member.loops.iter().map(|l| l.index_var()).collect();
        let access = ElementAccess::indexed(member.name.clone(), indices);
        let element = match &member.member_type {
            SchemaType::Primitive(prim) => PlanOp::Primitive(PrimitiveNode {
                access,
                primitive: *prim,
                width: prim.fixed_width(),
                derived: member.derived,
            }),
            SchemaType::StructRef(type_ref) => PlanOp::Nested(NestedNode {
                access,
                type_name: type_ref.name.clone(),
            }),
        };

        member.loops.iter().rev().fold(element, |body, descriptor| {
            PlanOp::Loop(LoopNode {
                index: descriptor.index_var(),
                bound: descriptor.bound.clone(),
                body: vec![body],
            })
        })
    }

    fn derive_op(layout: &StructLayout, member: &MemberLayout) -> Result<PlanOp, SchemaError> {
        let group = layout
            .size_group(&member.name)
            .ok_or_else(|| SchemaError::OrphanDerivedSize {
                struct_name: layout.name.clone(),
                member: member.name.clone(),
            })?;
        Ok(PlanOp::DeriveSize(DeriveSizeNode {
            member: group.size_member.clone(),
            primitive: group.primitive,
            sources: group.sources.clone(),
        }))
    }
}
