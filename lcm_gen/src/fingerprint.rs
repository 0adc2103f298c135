//! Schema fingerprints.
//!
//! A fingerprint is the struct's base hash plus the fingerprints of every
//! struct it embeds (one term per member), rotated left by one bit. Nested
//! terms are summed with wrapping addition, so the value does not depend on
//! member order. A struct already on the current path contributes 0, which
//! keeps the computation total on accidentally cyclic graphs.

use crate::codegen::shared::plan::FingerprintPlan;
use crate::schema::registry::{StructId, StructRegistry};
use tracing::trace;

pub struct FingerprintEngine<'a> {
    registry: &'a StructRegistry,
}

impl<'a> FingerprintEngine<'a> {
    pub fn new(registry: &'a StructRegistry) -> Self {
        Self { registry }
    }

    pub fn fingerprint(&self, id: StructId) -> u64 {
        let mut path = Vec::new();
        self.compute(id, &mut path)
    }

    pub fn fingerprint_of(&self, name: &str) -> Option<u64> {
        self.registry.id_of(name).map(|id| self.fingerprint(id))
    }

    /// `path` holds the base hashes of the structs currently being expanded.
    fn compute(&self, id: StructId, path: &mut Vec<u64>) -> u64 {
        let def = self.registry.get(id);
        if path.contains(&def.base_hash) {
            trace!(struct_name = %def.name, "fingerprint cycle, contributing 0");
            return 0;
        }

        path.push(def.base_hash);
        let mut acc = def.base_hash;
        for nested in self.registry.nested_ids(id) {
            acc = acc.wrapping_add(self.compute(nested, path));
        }
        path.pop();

        acc.rotate_left(1)
    }

    /// Fingerprint expression handed to renderers alongside its value.
    pub fn plan(&self, id: StructId) -> FingerprintPlan {
        let def = self.registry.get(id);
        FingerprintPlan {
            base_hash: def.base_hash,
            nested: def
                .members
                .iter()
                .filter_map(|member| member.member_type.struct_name())
                .map(str::to_string)
                .collect(),
            value: self.fingerprint(id),
        }
    }
}
