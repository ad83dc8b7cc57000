use crate::jsonl::{JsonlWriter, StreamError};
use orion_common::{props, Entity};
use std::collections::HashSet;
use std::path::Path;

/// Writes a KGX node file (and, when given edges too, an edge file)
/// alongside it. Guaranteed to flush on every exit path via `Drop`, mirroring
/// the teacher's "must be scoped" RAII writers (`doc::combine::SpillWriter`).
///
/// `write_node` deduplicates by `id` when `dedupe_nodes` is set (the default):
/// a node whose id has already been written in this scope is dropped and
/// counted in `repeat_node_count`, instead of being emitted twice. `write_edge`
/// never deduplicates — duplicate detection across edges happens in
/// [`orion_merge`], not at write time, per `spec.md` §4.2.
pub struct KgxWriter {
    nodes: JsonlWriter,
    edges: Option<JsonlWriter>,
    dedupe_nodes: bool,
    seen_node_ids: HashSet<String>,
    pub repeat_node_count: u64,
    flushed: bool,
}

impl KgxWriter {
    pub fn nodes_only(nodes_path: impl AsRef<Path>) -> Result<Self, StreamError> {
        Ok(KgxWriter {
            nodes: JsonlWriter::create(nodes_path)?,
            edges: None,
            dedupe_nodes: true,
            seen_node_ids: HashSet::new(),
            repeat_node_count: 0,
            flushed: false,
        })
    }

    pub fn nodes_and_edges(
        nodes_path: impl AsRef<Path>,
        edges_path: impl AsRef<Path>,
    ) -> Result<Self, StreamError> {
        Ok(KgxWriter {
            nodes: JsonlWriter::create(nodes_path)?,
            edges: Some(JsonlWriter::create(edges_path)?),
            dedupe_nodes: true,
            seen_node_ids: HashSet::new(),
            repeat_node_count: 0,
            flushed: false,
        })
    }

    pub fn without_node_dedupe(mut self) -> Self {
        self.dedupe_nodes = false;
        self
    }

    /// Writes `node`, applying id-based dedupe unless disabled. Returns
    /// `true` if the node was written, `false` if it was a dropped duplicate.
    pub fn write_node(&mut self, node: &Entity) -> Result<bool, StreamError> {
        if self.dedupe_nodes {
            let id = orion_common::model::get_str(node, props::ID)
                .unwrap_or_default()
                .to_string();
            if !self.seen_node_ids.insert(id) {
                self.repeat_node_count += 1;
                return Ok(false);
            }
        }
        self.nodes.write(node)?;
        Ok(true)
    }

    pub fn write_nodes<'a, I: IntoIterator<Item = &'a Entity>>(
        &mut self,
        nodes: I,
    ) -> Result<(), StreamError> {
        for node in nodes {
            self.write_node(node)?;
        }
        Ok(())
    }

    pub fn write_edge(&mut self, edge: &Entity) -> Result<(), StreamError> {
        let edges = self
            .edges
            .as_mut()
            .expect("write_edge called on a nodes-only KgxWriter");
        edges.write(edge)
    }

    pub fn flush(&mut self) -> Result<(), StreamError> {
        self.nodes.flush()?;
        if let Some(edges) = self.edges.as_mut() {
            edges.flush()?;
        }
        self.flushed = true;
        Ok(())
    }
}

impl Drop for KgxWriter {
    fn drop(&mut self) {
        if !self.flushed {
            if let Err(err) = self.flush() {
                tracing::warn!(error = %err, "failed to flush KgxWriter on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonl::read_jsonl;
    use serde_json::json;

    #[test]
    fn write_node_dedupes_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.jsonl");
        {
            let mut w = KgxWriter::nodes_only(&path).unwrap();
            assert!(w
                .write_node(json!({"id": "X:1"}).as_object().unwrap())
                .unwrap());
            assert!(!w
                .write_node(json!({"id": "X:1"}).as_object().unwrap())
                .unwrap());
            assert_eq!(w.repeat_node_count, 1);
        }
        let nodes = read_jsonl(&path).unwrap();
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn flushes_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.jsonl");
        {
            let mut w = KgxWriter::nodes_only(&path).unwrap();
            w.write_node(json!({"id": "X:1"}).as_object().unwrap())
                .unwrap();
            // no explicit flush() call
        }
        let nodes = read_jsonl(&path).unwrap();
        assert_eq!(nodes.len(), 1);
    }
}
