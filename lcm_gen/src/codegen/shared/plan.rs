//! Codec plan definitions shared by every renderer and by the reflective runtime.
//!
//! A plan carries, per struct, four op sequences (size, encode, decode, copy)
//! built from the same loop descriptors, together with the fingerprint
//! expression and the resolved layout. Renderers walk the sequences directly or
//! consume them after serialization.
//!
//! # Example
//! ```
//! use lcm_gen::codegen::shared::plan::*;
//! use lcm_gen::schema::types::PrimitiveType;
//!
//! let op = PlanOp::Primitive(PrimitiveNode {
//!     access: ElementAccess::member("x"),
//!     primitive: PrimitiveType::Int32,
//!     width: Some(4),
//!     derived: false,
//! });
//! assert_eq!(op.member(), Some("x"));
//! assert_eq!(CodecPlan::new(vec![]).version, PLAN_SCHEMA_VERSION);
//! ```

use crate::layout::{LoopBound, SizeSource, StructLayout};
use crate::schema::types::{Constant, PrimitiveType};
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema version stamped on every serialized plan.
pub const PLAN_SCHEMA_VERSION: u32 = 1;

/// Plans for every struct of a type graph, dependencies first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecPlan {
    /// Mirrors `PLAN_SCHEMA_VERSION`.
    pub version: u32,
    pub structs: Vec<StructPlan>,
}

impl CodecPlan {
    pub fn new(structs: Vec<StructPlan>) -> Self {
        Self {
            version: PLAN_SCHEMA_VERSION,
            structs,
        }
    }

    pub fn get(&self, type_name: &str) -> Option<&StructPlan> {
        self.structs.iter().find(|plan| plan.type_name == type_name)
    }

    /// Name to position lookup, for callers doing many queries.
    pub fn index(&self) -> BTreeMap<&str, usize> {
        self.structs
            .iter()
            .enumerate()
            .map(|(idx, plan)| (plan.type_name.as_str(), idx))
            .collect()
    }

    /// Fewest payload bytes any value of `type_name` encodes to. Variable
    /// loops count as empty and strings as their 5-byte empty form.
    pub fn min_size(&self, type_name: &str) -> u64 {
        self.min_size_on_path(type_name, &mut Vec::new())
    }

    /// Fewest bytes one iteration of `node` consumes on decode. Zero means
    /// a decoded count cannot be bounded by the bytes left in the buffer.
    pub fn min_element_width(&self, node: &LoopNode) -> u64 {
        self.min_body_width(&node.body, &mut Vec::new())
    }

    fn min_size_on_path<'p>(&'p self, type_name: &'p str, path: &mut Vec<&'p str>) -> u64 {
        // Cyclic plans never come out of the builder; count a repeat as empty.
        if path.contains(&type_name) {
            return 0;
        }
        let Some(plan) = self.get(type_name) else {
            return 0;
        };
        path.push(type_name);
        let size = self.min_body_width(&plan.decode, path);
        path.pop();
        size
    }

    fn min_body_width<'p>(&'p self, ops: &'p [PlanOp], path: &mut Vec<&'p str>) -> u64 {
        ops.iter()
            .fold(0u64, |acc, op| acc.saturating_add(self.min_op_width(op, path)))
    }

    fn min_op_width<'p>(&'p self, op: &'p PlanOp, path: &mut Vec<&'p str>) -> u64 {
        match op {
            PlanOp::Primitive(node) => node.width.unwrap_or(STRING_MIN_WIDTH),
            PlanOp::Nested(node) => self.min_size_on_path(&node.type_name, path),
            PlanOp::Loop(node) => match &node.bound {
                LoopBound::Constant { extent } => {
                    extent.saturating_mul(self.min_body_width(&node.body, path))
                }
                LoopBound::Field { .. } => 0,
            },
            PlanOp::DeriveSize(_) => 0,
        }
    }
}

/// Length prefix plus terminator of an empty string.
const STRING_MIN_WIDTH: u64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructPlan {
    pub type_name: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub constants: Vec<Constant>,
    pub fingerprint: FingerprintPlan,
    pub layout: StructLayout,
    pub size: Vec<PlanOp>,
    pub encode: Vec<PlanOp>,
    pub decode: Vec<PlanOp>,
    pub copy: Vec<PlanOp>,
}

impl StructPlan {
    pub fn sequence(&self, kind: SequenceKind) -> &[PlanOp] {
        match kind {
            SequenceKind::Size => &self.size,
            SequenceKind::Encode => &self.encode,
            SequenceKind::Decode => &self.decode,
            SequenceKind::Copy => &self.copy,
        }
    }

    /// True when the struct has at least one derived size member.
    pub fn has_derived(&self) -> bool {
        !self.layout.size_groups.is_empty()
    }
}

/// Which of the four sequences an op list implements.
///
/// * `Size` adds each primitive's encoded width (strings: 4 + bytes + 1) and
///   recurses into nested structs.
/// * `Encode` writes big-endian values at an advancing offset.
/// * `Decode` reads them back in the same order; a `Field` loop bound reads
///   the size member decoded earlier in the same payload.
/// * `Copy` deep-clones; its loops iterate over the source's own lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SequenceKind {
    Size,
    Encode,
    Decode,
    Copy,
}

impl SequenceKind {
    pub const ALL: [SequenceKind; 4] = [
        SequenceKind::Size,
        SequenceKind::Encode,
        SequenceKind::Decode,
        SequenceKind::Copy,
    ];
}

/// `rotl(base_hash + sum(fingerprint(nested)), 1)` plus its evaluated value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintPlan {
    pub base_hash: u64,
    /// Struct names, one per struct-typed member, in declaration order.
    #[serde(default)]
    pub nested: Vec<String>,
    pub value: u64,
}

/// A member element addressed by the loop index variables around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementAccess {
    pub member: String,
    #[serde(default)]
    pub indices: Vec<String>,
}

impl ElementAccess {
    pub fn member(name: impl Into<String>) -> Self {
        Self {
            member: name.into(),
            indices: Vec::new(),
        }
    }

    pub fn indexed(name: impl Into<String>, indices: Vec<String>) -> Self {
        Self {
            member: name.into(),
            indices,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum PlanOp {
    /// Runs `body` once per index value in `0..bound`.
    Loop(LoopNode),
    /// One primitive value.
    Primitive(PrimitiveNode),
    /// One nested struct payload.
    Nested(NestedNode),
    /// Recomputes a derived size member from its arrays and cross-checks them.
    DeriveSize(DeriveSizeNode),
}

impl PlanOp {
    /// Member touched by this op (the innermost one for loops).
    pub fn member(&self) -> Option<&str> {
        match self {
            PlanOp::Loop(node) => node.body.iter().find_map(PlanOp::member),
            PlanOp::Primitive(node) => Some(node.access.member.as_str()),
            PlanOp::Nested(node) => Some(node.access.member.as_str()),
            PlanOp::DeriveSize(node) => Some(node.member.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopNode {
    /// Index variable bound by this loop.
    pub index: String,
    pub bound: LoopBound,
    pub body: Vec<PlanOp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveNode {
    pub access: ElementAccess,
    pub primitive: PrimitiveType,
    /// Encoded width, `None` for strings.
    #[serde(default)]
    pub width: Option<u64>,
    /// Derived size member. Size and encode take its value from the
    /// preceding `DeriveSize` op, decode and copy treat it as stored.
    #[serde(default)]
    pub derived: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedNode {
    pub access: ElementAccess,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeriveSizeNode {
    pub member: String,
    pub primitive: PrimitiveType,
    /// Authoritative source first.
    pub sources: Vec<SizeSource>,
}
