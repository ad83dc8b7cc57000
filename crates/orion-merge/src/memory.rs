use crate::error::MergeError;
use crate::key::{edge_key, node_key};
use crate::merge::merge_entities;
use crate::GraphMerger;
use orion_common::model::Entity;
use std::collections::HashMap;

/// Entirely in-process merger: every distinct node/edge id is kept as a
/// live `Entity` in a hash map until [`MemoryMerger::finish_nodes`] /
/// [`finish_edges`](MemoryMerger::finish_edges) drains it, per
/// `orion/merging.py`'s `MemoryGraphMerger`.
#[derive(Default)]
pub struct MemoryMerger {
    nodes: HashMap<String, Entity>,
    edges: HashMap<String, Entity>,
    merged_node_count: usize,
    merged_edge_count: usize,
    add_edge_id: bool,
}

impl MemoryMerger {
    pub fn new() -> Self {
        MemoryMerger::default()
    }

    /// When set, every merged edge is assigned an `id` property equal to its
    /// edge key (matching `add_edge_id` in `spec.md` §6's GraphSpec).
    pub fn with_edge_id_addition(mut self, add_edge_id: bool) -> Self {
        self.add_edge_id = add_edge_id;
        self
    }

    /// Drains and returns the merged nodes. Takes `&mut self` rather than
    /// consuming, so a caller can drain nodes and edges from the same
    /// instance (a `GraphBuilder` needs both output streams from one merge
    /// pass).
    pub fn finish_nodes(&mut self) -> impl Iterator<Item = Entity> {
        std::mem::take(&mut self.nodes).into_values()
    }

    pub fn finish_edges(&mut self) -> impl Iterator<Item = Entity> {
        std::mem::take(&mut self.edges).into_values()
    }
}

impl GraphMerger for MemoryMerger {
    fn merge_node(&mut self, node: Entity) -> Result<(), MergeError> {
        let key = node_key(&node);
        match self.nodes.remove(&key) {
            Some(existing) => {
                self.merged_node_count += 1;
                self.nodes.insert(key, merge_entities(existing, node));
            }
            None => {
                self.nodes.insert(key, node);
            }
        }
        Ok(())
    }

    fn merge_edge(&mut self, mut edge: Entity, custom_key_attributes: &[String]) -> Result<(), MergeError> {
        let key = edge_key(&edge, custom_key_attributes);
        match self.edges.remove(&key) {
            Some(existing) => {
                self.merged_edge_count += 1;
                let mut merged = merge_entities(existing, edge);
                if self.add_edge_id {
                    merged.insert("id".to_string(), serde_json::Value::String(key.clone()));
                }
                self.edges.insert(key, merged);
            }
            None => {
                if self.add_edge_id {
                    edge.insert("id".to_string(), serde_json::Value::String(key.clone()));
                }
                self.edges.insert(key, edge);
            }
        }
        Ok(())
    }

    fn merged_node_count(&self) -> usize {
        self.merged_node_count
    }

    fn merged_edge_count(&self) -> usize {
        self.merged_edge_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(v: serde_json::Value) -> Entity {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn duplicate_nodes_merge_and_count() {
        let mut merger = MemoryMerger::new();
        merger.merge_node(entity(json!({"id": "MONDO:1", "xrefs": ["A"]}))).unwrap();
        merger.merge_node(entity(json!({"id": "MONDO:1", "xrefs": ["B"]}))).unwrap();
        merger.merge_node(entity(json!({"id": "MONDO:2"}))).unwrap();

        assert_eq!(merger.merged_node_count(), 1);
        let nodes: Vec<_> = merger.finish_nodes().collect();
        assert_eq!(nodes.len(), 2);
        let mondo1 = nodes.iter().find(|n| n["id"] == "MONDO:1").unwrap();
        assert_eq!(mondo1["xrefs"], json!(["A", "B"]));
    }

    #[test]
    fn duplicate_edges_merge_and_optionally_get_ids() {
        let mut merger = MemoryMerger::new().with_edge_id_addition(true);
        let edge = |src: &str| {
            entity(json!({
                "subject": src, "predicate": "biolink:affects", "object": "MONDO:2",
                "primary_knowledge_source": "infores:test"
            }))
        };
        merger.merge_edge(edge("MONDO:1"), &[]).unwrap();
        merger.merge_edge(edge("MONDO:1"), &[]).unwrap();

        assert_eq!(merger.merged_edge_count(), 1);
        let edges: Vec<_> = merger.finish_edges().collect();
        assert_eq!(edges.len(), 1);
        assert!(edges[0].get("id").is_some());
    }
}
