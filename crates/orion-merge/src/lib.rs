pub mod disk;
pub mod error;
pub mod key;
pub mod memory;
pub mod merge;

pub use disk::DiskMerger;
pub use error::MergeError;
pub use key::{edge_key, node_key};
pub use memory::MemoryMerger;
pub use merge::merge_entities;

use orion_common::model::Entity;

/// Deduplicates and merges a stream of nodes or edges, per `spec.md` §4.7.
/// Two implementations are provided: [`MemoryMerger`] (unbounded in-process
/// hash map, fast for small/medium sources) and [`DiskMerger`] (external
/// k-way merge via sorted spill files, for sources too large to hold
/// entirely in memory).
pub trait GraphMerger {
    fn merge_node(&mut self, node: Entity) -> Result<(), MergeError>;

    fn merge_nodes(&mut self, nodes: impl IntoIterator<Item = Entity>) -> Result<usize, MergeError> {
        let mut count = 0;
        for node in nodes {
            self.merge_node(node)?;
            count += 1;
        }
        Ok(count)
    }

    fn merge_edge(&mut self, edge: Entity, custom_key_attributes: &[String]) -> Result<(), MergeError>;

    fn merge_edges(
        &mut self,
        edges: impl IntoIterator<Item = Entity>,
        custom_key_attributes: &[String],
    ) -> Result<usize, MergeError> {
        let mut count = 0;
        for edge in edges {
            self.merge_edge(edge, custom_key_attributes)?;
            count += 1;
        }
        Ok(count)
    }

    /// Number of node merges that actually combined two distinct inputs
    /// (as opposed to a first sighting of a new id).
    fn merged_node_count(&self) -> usize;

    /// Number of edge merges that actually combined two distinct inputs.
    fn merged_edge_count(&self) -> usize;
}
