use crate::error::MergeError;
use crate::key::{edge_key, node_key};
use crate::merge::merge_entities;
use crate::GraphMerger;
use orion_common::model::Entity;
use orion_stream::jsonl::{JsonlReader, JsonlWriter};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::path::{Path, PathBuf};

const DEFAULT_CHUNK_SIZE: usize = 10_000_000;

#[derive(Clone, Copy)]
enum EntityKind {
    Node,
    Edge,
}

/// External k-way-merge `GraphMerger`, for sources too large to dedup
/// entirely in memory, per `orion/merging.py`'s `DiskGraphMerger`: entities
/// are buffered, sorted and spilled to temp files in `chunk_size`-sized
/// runs, then merged by a single streaming pass over all runs sorted by key.
pub struct DiskMerger {
    temp_dir: PathBuf,
    chunk_size: usize,
    spill_token: String,
    node_buffer: Vec<Entity>,
    edge_buffer: Vec<Entity>,
    node_spill_paths: Vec<PathBuf>,
    edge_spill_paths: Vec<PathBuf>,
    custom_key_attributes: Vec<String>,
    add_edge_id: bool,
    merged_node_count: usize,
    merged_edge_count: usize,
    next_spill_id: u64,
}

impl DiskMerger {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        DiskMerger {
            temp_dir: temp_dir.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            spill_token: orion_common::hash::stable_hash_hex(&format!("{:?}", std::time::SystemTime::now())),
            node_buffer: Vec::new(),
            edge_buffer: Vec::new(),
            node_spill_paths: Vec::new(),
            edge_spill_paths: Vec::new(),
            custom_key_attributes: Vec::new(),
            add_edge_id: false,
            merged_node_count: 0,
            merged_edge_count: 0,
            next_spill_id: 0,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk_size must be nonzero");
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_edge_merging_attributes(mut self, attrs: Vec<String>) -> Self {
        self.custom_key_attributes = attrs;
        self
    }

    pub fn with_edge_id_addition(mut self, add_edge_id: bool) -> Self {
        self.add_edge_id = add_edge_id;
        self
    }

    fn spill_path(&mut self, kind: EntityKind) -> PathBuf {
        self.next_spill_id += 1;
        let prefix = match kind {
            EntityKind::Node => "node",
            EntityKind::Edge => "edge",
        };
        self.temp_dir
            .join(format!("{prefix}_{}_{}.temp", self.spill_token, self.next_spill_id))
    }

    fn flush_node_buffer(&mut self) -> Result<(), MergeError> {
        if self.node_buffer.is_empty() {
            return Ok(());
        }
        let mut entities = std::mem::take(&mut self.node_buffer);
        entities.sort_by_key(node_key);
        let path = self.spill_path(EntityKind::Node);
        write_spill(&path, &entities)?;
        self.node_spill_paths.push(path);
        Ok(())
    }

    fn flush_edge_buffer(&mut self) -> Result<(), MergeError> {
        if self.edge_buffer.is_empty() {
            return Ok(());
        }
        let mut entities = std::mem::take(&mut self.edge_buffer);
        let custom = self.custom_key_attributes.clone();
        entities.sort_by_key(|e| edge_key(e, &custom));
        let path = self.spill_path(EntityKind::Edge);
        write_spill(&path, &entities)?;
        self.edge_spill_paths.push(path);
        Ok(())
    }

    /// Flushes any buffered, not-yet-spilled entities. Call once all inputs
    /// have been fed in, before [`finish_nodes`](Self::finish_nodes) /
    /// [`finish_edges`](Self::finish_edges).
    pub fn flush(&mut self) -> Result<(), MergeError> {
        self.flush_node_buffer()?;
        self.flush_edge_buffer()
    }

    pub fn finish_nodes(&mut self) -> Result<MergedEntities<'_>, MergeError> {
        self.flush_node_buffer()?;
        MergedEntities::new(
            &self.node_spill_paths,
            EntityKind::Node,
            Vec::new(),
            false,
            &mut self.merged_node_count,
        )
    }

    pub fn finish_edges(&mut self) -> Result<MergedEntities<'_>, MergeError> {
        self.flush_edge_buffer()?;
        MergedEntities::new(
            &self.edge_spill_paths,
            EntityKind::Edge,
            self.custom_key_attributes.clone(),
            self.add_edge_id,
            &mut self.merged_edge_count,
        )
    }
}

impl Drop for DiskMerger {
    fn drop(&mut self) {
        for path in self.node_spill_paths.iter().chain(self.edge_spill_paths.iter()) {
            let _ = std::fs::remove_file(path);
        }
    }
}

fn write_spill(path: &Path, entities: &[Entity]) -> Result<(), MergeError> {
    let mut writer = JsonlWriter::create(path).map_err(|source| MergeError::Spill {
        path: path.display().to_string(),
        source,
    })?;
    for entity in entities {
        writer.write(entity).map_err(|source| MergeError::Spill {
            path: path.display().to_string(),
            source,
        })?;
    }
    writer.flush().map_err(|source| MergeError::Spill {
        path: path.display().to_string(),
        source,
    })
}

impl GraphMerger for DiskMerger {
    fn merge_node(&mut self, node: Entity) -> Result<(), MergeError> {
        self.node_buffer.push(node);
        if self.node_buffer.len() >= self.chunk_size {
            self.flush_node_buffer()?;
        }
        Ok(())
    }

    fn merge_edge(&mut self, edge: Entity, custom_key_attributes: &[String]) -> Result<(), MergeError> {
        if self.custom_key_attributes.is_empty() && !custom_key_attributes.is_empty() {
            self.custom_key_attributes = custom_key_attributes.to_vec();
        }
        self.edge_buffer.push(edge);
        if self.edge_buffer.len() >= self.chunk_size {
            self.flush_edge_buffer()?;
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

struct SpillReader {
    reader: JsonlReader,
    path: String,
    next: Option<(String, Entity)>,
}

impl SpillReader {
    fn open(path: &Path, kind: EntityKind, custom_key_attributes: &[String]) -> Result<Self, MergeError> {
        let reader = JsonlReader::open(path).map_err(|source| MergeError::Spill {
            path: path.display().to_string(),
            source,
        })?;
        let mut spill = SpillReader {
            reader,
            path: path.display().to_string(),
            next: None,
        };
        spill.advance(kind, custom_key_attributes)?;
        Ok(spill)
    }

    fn advance(&mut self, kind: EntityKind, custom_key_attributes: &[String]) -> Result<(), MergeError> {
        self.next = match self.reader.next() {
            Some(Ok(entity)) => {
                let key = match kind {
                    EntityKind::Node => node_key(&entity),
                    EntityKind::Edge => edge_key(&entity, custom_key_attributes),
                };
                Some((key, entity))
            }
            Some(Err(source)) => {
                return Err(MergeError::Spill { path: self.path.clone(), source });
            }
            None => None,
        };
        Ok(())
    }
}

/// Streaming k-way merge over a set of sorted spill files, yielding exactly
/// one merged entity per distinct key, in ascending key order, matching
/// `orion/merging.py`'s `get_merged_entities` generator (implemented with a
/// binary heap rather than the original's per-round linear scan).
pub struct MergedEntities<'a> {
    kind: EntityKind,
    custom_key_attributes: Vec<String>,
    add_edge_id: bool,
    readers: Vec<SpillReader>,
    heap: BinaryHeap<Reverse<(String, usize)>>,
    merged_count: &'a mut usize,
}

impl<'a> MergedEntities<'a> {
    fn new(
        paths: &[PathBuf],
        kind: EntityKind,
        custom_key_attributes: Vec<String>,
        add_edge_id: bool,
        merged_count: &'a mut usize,
    ) -> Result<Self, MergeError> {
        let mut readers = Vec::with_capacity(paths.len());
        let mut heap = BinaryHeap::with_capacity(paths.len());
        for (idx, path) in paths.iter().enumerate() {
            let reader = SpillReader::open(path, kind, &custom_key_attributes)?;
            if let Some((key, _)) = &reader.next {
                heap.push(Reverse((key.clone(), idx)));
            }
            readers.push(reader);
        }
        Ok(MergedEntities {
            kind,
            custom_key_attributes,
            add_edge_id,
            readers,
            heap,
            merged_count,
        })
    }
}

impl<'a> Iterator for MergedEntities<'a> {
    type Item = Result<Entity, MergeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let Reverse((min_key, _)) = self.heap.peek()?.clone();

        let mut merged: Option<Entity> = None;
        loop {
            match self.heap.peek() {
                Some(top) if top.0 .0 == min_key => {}
                _ => break,
            }
            let Reverse((_, idx)) = self.heap.pop().unwrap();
            let (_, entity) = self.readers[idx].next.take().unwrap();
            merged = Some(match merged {
                Some(existing) => {
                    *self.merged_count += 1;
                    merge_entities(existing, entity)
                }
                None => entity,
            });
            if let Err(e) = self.readers[idx].advance(self.kind, &self.custom_key_attributes) {
                return Some(Err(e));
            }
            if let Some((next_key, _)) = &self.readers[idx].next {
                self.heap.push(Reverse((next_key.clone(), idx)));
            }
        }

        let mut merged = merged?;
        if matches!(self.kind, EntityKind::Edge) && self.add_edge_id {
            merged.insert("id".to_string(), serde_json::Value::String(min_key));
        }
        Some(Ok(merged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(id: &str, extra: serde_json::Value) -> Entity {
        let mut v = json!({"id": id});
        v.as_object_mut().unwrap().extend(extra.as_object().unwrap().clone());
        v.as_object().unwrap().clone()
    }

    #[test]
    fn merges_across_multiple_spill_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let mut merger = DiskMerger::new(dir.path()).with_chunk_size(2);

        merger.merge_node(node("MONDO:2", json!({}))).unwrap();
        merger.merge_node(node("MONDO:1", json!({"xrefs": ["A"]}))).unwrap();
        // second chunk triggers a spill of the first two
        merger.merge_node(node("MONDO:1", json!({"xrefs": ["B"]}))).unwrap();
        merger.merge_node(node("MONDO:3", json!({}))).unwrap();

        let merged: Vec<Entity> = merger.finish_nodes().unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(merged.len(), 3);
        let mondo1 = merged.iter().find(|n| n["id"] == "MONDO:1").unwrap();
        assert_eq!(mondo1["xrefs"], json!(["A", "B"]));
        assert_eq!(merger.merged_node_count(), 1);
    }

    #[test]
    fn single_spill_file_passes_through_unmerged() {
        let dir = tempfile::tempdir().unwrap();
        let mut merger = DiskMerger::new(dir.path());
        merger.merge_node(node("MONDO:1", json!({}))).unwrap();
        merger.merge_node(node("MONDO:2", json!({}))).unwrap();

        let merged: Vec<Entity> = merger.finish_nodes().unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merger.merged_node_count(), 0);
    }
}
