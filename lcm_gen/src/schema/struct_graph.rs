use crate::schema::error::SchemaError;
use crate::schema::registry::StructRegistry;
use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "struct_graph_trace")]
fn trace_log(msg: impl AsRef<str>) {
    tracing::trace!(target: "struct_graph", "{}", msg.as_ref());
}

#[cfg(not(feature = "struct_graph_trace"))]
fn trace_log(_msg: impl AsRef<str>) {}

/// Struct name to the struct names it embeds, so plans can be built in
/// dependency order.
#[derive(Debug)]
pub struct StructGraph {
    deps: BTreeMap<String, BTreeSet<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnPath,
    Placed,
}

impl StructGraph {
    pub fn build(registry: &StructRegistry) -> Self {
        let deps = registry
            .iter()
            .map(|(_, def)| {
                // Self references are kept: a struct containing itself is a cycle.
                let embedded = def
                    .members
                    .iter()
                    .filter_map(|member| member.member_type.struct_name())
                    .map(str::to_string)
                    .collect();
                (def.name.clone(), embedded)
            })
            .collect();
        Self { deps }
    }

    /// Depth-first post-order over names in sorted order, so embedded
    /// structs always precede their holders and the result is stable.
    pub fn topo_order(&self) -> Result<Vec<String>, SchemaError> {
        let mut marks = BTreeMap::new();
        let mut path = Vec::new();
        let mut order = Vec::with_capacity(self.deps.len());
        for name in self.deps.keys() {
            self.place(name, &mut marks, &mut path, &mut order)?;
        }
        Ok(order)
    }

    fn place<'g>(
        &'g self,
        name: &'g str,
        marks: &mut BTreeMap<&'g str, Mark>,
        path: &mut Vec<&'g str>,
        order: &mut Vec<String>,
    ) -> Result<(), SchemaError> {
        match marks.get(name) {
            Some(Mark::Placed) => return Ok(()),
            Some(Mark::OnPath) => {
                let start = path.iter().position(|entry| *entry == name).unwrap_or(0);
                let cycle = path[start..].iter().map(|entry| entry.to_string()).collect();
                return Err(SchemaError::CircularComposition { cycle });
            }
            None => {}
        }
        // Unknown names are reported by registry validation.
        let Some(embedded) = self.deps.get(name) else {
            return Ok(());
        };

        marks.insert(name, Mark::OnPath);
        path.push(name);
        for dep in embedded {
            self.place(dep, marks, path, order)?;
        }
        path.pop();
        marks.insert(name, Mark::Placed);

        trace_log(format!("placed {name}"));
        order.push(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{Member, PrimitiveType, SchemaType, StructDef};

    fn holder(name: &str, hash: u64, refs: &[&str]) -> StructDef {
        let mut members = vec![Member::primitive("tag", PrimitiveType::Int8)];
        for (idx, target) in refs.iter().enumerate() {
            members.push(Member::scalar(format!("f{idx}"), SchemaType::struct_ref(*target)));
        }
        StructDef::new(name, hash, members)
    }

    #[test]
    fn struct_graph_topological_order() {
        let registry =
            StructRegistry::build(vec![holder("A", 1, &["B"]), holder("B", 2, &[])]).unwrap();
        let order = StructGraph::build(&registry).topo_order().unwrap();
        assert_eq!(order, vec!["B".to_string(), "A".to_string()]);
    }

    #[test]
    fn deterministic_order_with_multiple_roots() {
        let registry = StructRegistry::build(vec![
            holder("C", 1, &[]),
            holder("A", 2, &[]),
            holder("B", 3, &[]),
        ])
        .unwrap();
        let order = StructGraph::build(&registry).topo_order().unwrap();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn detects_mutual_composition_cycle() {
        let registry =
            StructRegistry::build(vec![holder("X", 1, &["Y"]), holder("Y", 2, &["X"])]).unwrap();
        let err = StructGraph::build(&registry).topo_order().unwrap_err();
        assert_eq!(
            err,
            SchemaError::CircularComposition {
                cycle: vec!["X".to_string(), "Y".to_string()]
            }
        );
    }

    #[test]
    fn detects_self_composition() {
        let registry = StructRegistry::build(vec![holder("Node", 1, &["Node"])]).unwrap();
        let err = StructGraph::build(&registry).topo_order().unwrap_err();
        assert_eq!(
            err,
            SchemaError::CircularComposition {
                cycle: vec!["Node".to_string()]
            }
        );
    }

    #[test]
    fn diamond_dependencies_appear_once() {
        let registry = StructRegistry::build(vec![
            holder("Top", 1, &["Left", "Right"]),
            holder("Left", 2, &["Leaf"]),
            holder("Right", 3, &["Leaf"]),
            holder("Leaf", 4, &[]),
        ])
        .unwrap();
        let order = StructGraph::build(&registry).topo_order().unwrap();
        assert_eq!(order, vec!["Leaf", "Left", "Right", "Top"]);
    }
}
