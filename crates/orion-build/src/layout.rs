use std::path::{Path, PathBuf};

/// On-disk layout for one graph build's output, per `spec.md` §6:
///
/// ```text
/// <graphs>/<graph_id>/<graph_version>/
///   <graph_id>.meta.json
///   nodes.jsonl
///   edges.jsonl
///   qc_results.json
/// ```
///
/// The `<graph_id>.meta.json` written here is a point-in-time snapshot of
/// the build; the authoritative, continuously-updated document (tracking
/// every build version's status, per [`orion_metadata::GraphMetadata`])
/// lives one level up at `<graphs>/<graph_id>.meta.json`, the same
/// "one stage-tracking document per entity id" convention
/// `orion_metadata::SourceMetadata` uses for sources.
#[derive(Debug, Clone)]
pub struct GraphLayout {
    build_dir: PathBuf,
    graph_id: String,
}

impl GraphLayout {
    pub fn new(graphs_root: &Path, graph_id: &str, graph_version: &str) -> Self {
        GraphLayout {
            build_dir: graphs_root.join(graph_id).join(graph_version),
            graph_id: graph_id.to_string(),
        }
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn nodes_path(&self) -> PathBuf {
        self.build_dir.join("nodes.jsonl")
    }

    pub fn edges_path(&self) -> PathBuf {
        self.build_dir.join("edges.jsonl")
    }

    pub fn qc_results_path(&self) -> PathBuf {
        self.build_dir.join("qc_results.json")
    }

    pub fn meta_snapshot_path(&self) -> PathBuf {
        self.build_dir.join(format!("{}.meta.json", self.graph_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lays_out_paths_under_graph_id_and_version() {
        let root = Path::new("/data/graphs");
        let layout = GraphLayout::new(root, "robokop", "v1");
        assert_eq!(layout.nodes_path(), root.join("robokop/v1/nodes.jsonl"));
        assert_eq!(layout.edges_path(), root.join("robokop/v1/edges.jsonl"));
        assert_eq!(layout.qc_results_path(), root.join("robokop/v1/qc_results.json"));
        assert_eq!(layout.meta_snapshot_path(), root.join("robokop/v1/robokop.meta.json"));
    }
}
