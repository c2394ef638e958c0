//! An order-independent structural view of a finalized graph.
//!
//! Two graphs with the same snapshot have the same entities, canonical IDs,
//! references and block sequences, regardless of arena order. The codec's
//! round-trip guarantee is stated in these terms.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::EntityBody;
use crate::error::{ModelError, Result, StructuralIssue};
use crate::graph::AdmGraph;
use crate::id::Kind;
use crate::tree::TreeNode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub kind: Kind,
    pub name: Option<String>,
    /// Canonical IDs of referenced entities, grouped by kind and sorted.
    pub refs: BTreeMap<Kind, Vec<String>>,
    pub body: EntityBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Entities keyed by canonical ID.
    pub entities: BTreeMap<String, NodeSnapshot>,
    pub extras: Vec<TreeNode>,
}

impl GraphSnapshot {
    /// Capture `graph`. Fails with [`ModelError::TemporaryId`] if any entity
    /// or block still has a temporary ID.
    pub fn capture(graph: &AdmGraph) -> Result<Self> {
        let mut entities = BTreeMap::new();
        for (_, entity) in graph.iter() {
            let id = entity
                .id()
                .canonical()
                .ok_or_else(|| ModelError::TemporaryId(entity.label()))?;
            if let Some(channel) = entity.as_channel() {
                if let Some(block) = channel.blocks.iter().find(|b| b.id().is_temporary()) {
                    return Err(ModelError::TemporaryId(format!(
                        "block at {} in {}",
                        block.start,
                        entity.label()
                    )));
                }
            }

            let mut refs: BTreeMap<Kind, Vec<String>> = BTreeMap::new();
            for target in entity.refs() {
                let target = graph.get(*target)?;
                refs.entry(target.kind())
                    .or_default()
                    .push(target.id().to_string());
            }
            for ids in refs.values_mut() {
                ids.sort();
            }

            let node = NodeSnapshot {
                kind: entity.kind(),
                name: entity.name().map(str::to_string),
                refs,
                body: entity.body().clone(),
            };
            if entities.insert(id.to_string(), node).is_some() {
                return Err(ModelError::Structural(vec![StructuralIssue::DuplicateId {
                    id: id.to_string(),
                }]));
            }
        }
        Ok(Self {
            entities,
            extras: graph.extras().to_vec(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl AdmGraph {
    pub fn snapshot(&self) -> Result<GraphSnapshot> {
        GraphSnapshot::capture(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockFormat, BlockParams};
    use crate::factory::ObjectNames;

    fn build(first: &str, second: &str) -> AdmGraph {
        let mut graph = AdmGraph::new();
        for name in [first, second] {
            let names = ObjectNames {
                programme: Some("P".into()),
                content: Some("C".into()),
                object: Some(name.into()),
                track: Some(if name == "A" { 0 } else { 1 }),
                ..ObjectNames::default()
            }
            .with_formats(name);
            graph.create_objects(&names).unwrap();
            let channel = graph.find_by_name(Kind::ChannelFormat, name).unwrap();
            graph
                .create_block_format(channel, BlockFormat::new(0, 10, BlockParams::default()))
                .unwrap();
        }
        graph.finalize().unwrap();
        graph
    }

    #[test]
    fn test_snapshot_ignores_arena_order() {
        assert_eq!(build("A", "B").snapshot().unwrap(), build("B", "A").snapshot().unwrap());
    }

    #[test]
    fn test_snapshot_rejects_temporary_ids() {
        let mut graph = AdmGraph::new();
        graph.get_or_create(Kind::Programme, "P").unwrap();
        assert!(matches!(graph.snapshot(), Err(ModelError::TemporaryId(_))));
    }

    #[test]
    fn test_snapshot_rejects_unnumbered_block() {
        let mut graph = build("A", "B");
        let channel = graph.find_by_name(Kind::ChannelFormat, "A").unwrap();
        graph
            .create_block_format(channel, BlockFormat::new(10, 10, BlockParams::default()))
            .unwrap();
        assert!(matches!(graph.snapshot(), Err(ModelError::TemporaryId(_))));
    }

    #[test]
    fn test_snapshot_groups_refs_by_kind() {
        let graph = build("A", "B");
        let snapshot = graph.snapshot().unwrap();
        let content = &snapshot.entities["ACO_1001"];
        assert_eq!(content.refs[&Kind::Object], vec!["AO_1001", "AO_1002"]);
        assert!(snapshot.to_json().unwrap().contains("APR_1001"));
    }
}
