use orion_common::model::Entity;
use orion_merge::{DiskMerger, GraphMerger, MemoryMerger, MergeError};
use std::path::Path;

/// Selects between the two [`GraphMerger`] implementations at build time,
/// per `spec.md` §4.7's selection rule: `DiskMerger` when any contributing
/// source is flagged `resource_hog` or the graph sets `save_memory`,
/// `MemoryMerger` otherwise. Kept as an enum rather than a trait object
/// because `MemoryMerger::finish_nodes`/`DiskMerger::finish_nodes` return
/// different concrete iterator types that the shared `GraphMerger` trait
/// does not unify.
pub enum AnyMerger {
    Memory(MemoryMerger),
    Disk(DiskMerger),
}

impl AnyMerger {
    pub fn select(
        use_disk: bool,
        spill_dir: &Path,
        edge_merging_attributes: Vec<String>,
        add_edge_id: bool,
    ) -> Self {
        if use_disk {
            tracing::info!(spill_dir = %spill_dir.display(), "selecting DiskMerger for this build");
            AnyMerger::Disk(
                DiskMerger::new(spill_dir)
                    .with_edge_merging_attributes(edge_merging_attributes)
                    .with_edge_id_addition(add_edge_id),
            )
        } else {
            tracing::debug!("selecting MemoryMerger for this build");
            AnyMerger::Memory(MemoryMerger::new().with_edge_id_addition(add_edge_id))
        }
    }

    pub fn merge_node(&mut self, node: Entity) -> Result<(), MergeError> {
        match self {
            AnyMerger::Memory(m) => m.merge_node(node),
            AnyMerger::Disk(m) => m.merge_node(node),
        }
    }

    pub fn merge_edge(&mut self, edge: Entity, custom_key_attributes: &[String]) -> Result<(), MergeError> {
        match self {
            AnyMerger::Memory(m) => m.merge_edge(edge, custom_key_attributes),
            AnyMerger::Disk(m) => m.merge_edge(edge, custom_key_attributes),
        }
    }

    /// No-op for `MemoryMerger`; spills any buffered residual for `DiskMerger`.
    pub fn flush(&mut self) -> Result<(), MergeError> {
        match self {
            AnyMerger::Memory(_) => Ok(()),
            AnyMerger::Disk(m) => m.flush(),
        }
    }

    pub fn drain_nodes(&mut self) -> Result<Box<dyn Iterator<Item = Result<Entity, MergeError>> + '_>, MergeError> {
        match self {
            AnyMerger::Memory(m) => Ok(Box::new(m.finish_nodes().map(Ok))),
            AnyMerger::Disk(m) => Ok(Box::new(m.finish_nodes()?)),
        }
    }

    pub fn drain_edges(&mut self) -> Result<Box<dyn Iterator<Item = Result<Entity, MergeError>> + '_>, MergeError> {
        match self {
            AnyMerger::Memory(m) => Ok(Box::new(m.finish_edges().map(Ok))),
            AnyMerger::Disk(m) => Ok(Box::new(m.finish_edges()?)),
        }
    }

    pub fn merged_node_count(&self) -> usize {
        match self {
            AnyMerger::Memory(m) => m.merged_node_count(),
            AnyMerger::Disk(m) => m.merged_node_count(),
        }
    }

    pub fn merged_edge_count(&self) -> usize {
        match self {
            AnyMerger::Memory(m) => m.merged_edge_count(),
            AnyMerger::Disk(m) => m.merged_edge_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(id: &str) -> Entity {
        json!({"id": id}).as_object().unwrap().clone()
    }

    #[test]
    fn memory_variant_merges_duplicate_nodes() {
        let mut merger = AnyMerger::select(false, Path::new("."), Vec::new(), false);
        merger.merge_node(node("X:1")).unwrap();
        merger.merge_node(node("X:1")).unwrap();
        let drained: Vec<_> = merger.drain_nodes().unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(drained.len(), 1);
        assert_eq!(merger.merged_node_count(), 1);
    }

    #[test]
    fn disk_variant_merges_duplicate_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let mut merger = AnyMerger::select(true, dir.path(), Vec::new(), false);
        merger.merge_node(node("X:1")).unwrap();
        merger.merge_node(node("X:1")).unwrap();
        let drained: Vec<_> = merger.drain_nodes().unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(drained.len(), 1);
        assert_eq!(merger.merged_node_count(), 1);
    }
}
