use crate::status::StageStatus;
use crate::store::{self, MetadataError};
use orion_common::hash::stable_hash_hex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GraphBuildMetadata {
    pub build_status: StageStatus,
    pub build_time: Option<String>,
    pub build_error: Option<String>,
    /// One entry per source the graph draws from, keyed by source_id, naming
    /// the exact release_version consumed for that source in this build.
    pub source_releases: BTreeMap<String, String>,
    /// Node/edge counts and QC summary produced by the validator, per
    /// `spec.md` §4.9.
    pub build_info: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphMetadataDoc {
    pub graph_id: String,
    pub graph_spec_hash: String,
    pub builds: BTreeMap<String, GraphBuildMetadata>,
}

impl GraphMetadataDoc {
    fn new(graph_id: &str, graph_spec_hash: &str) -> Self {
        GraphMetadataDoc {
            graph_id: graph_id.to_string(),
            graph_spec_hash: graph_spec_hash.to_string(),
            builds: BTreeMap::new(),
        }
    }
}

/// Durable per-graph state, analogous to [`crate::source::SourceMetadata`]
/// but scoped to a single named output graph (`spec.md` §4.8).
pub struct GraphMetadata {
    path: PathBuf,
    doc: GraphMetadataDoc,
}

impl GraphMetadata {
    /// `storage_dir` is `<storage>/graphs/`.
    pub fn load_or_init(
        storage_dir: &Path,
        graph_id: &str,
        graph_spec_hash: &str,
    ) -> Result<Self, MetadataError> {
        let path = storage_dir.join(format!("{graph_id}.meta.json"));
        let doc = store::load_or_init(&path, || GraphMetadataDoc::new(graph_id, graph_spec_hash))?;
        Ok(GraphMetadata { path, doc })
    }

    fn save(&self) -> Result<(), MetadataError> {
        store::save(&self.path, &self.doc)
    }

    pub fn doc(&self) -> &GraphMetadataDoc {
        &self.doc
    }

    /// A build version is derived from the graph spec's hash plus the
    /// releases of every contributing source, so that any change to either
    /// the spec or an upstream source produces a new, distinct build.
    pub fn build_version(graph_spec_hash: &str, source_releases: &BTreeMap<String, String>) -> String {
        let mut buf = graph_spec_hash.to_string();
        for (source_id, release_version) in source_releases {
            buf.push_str(source_id);
            buf.push_str(release_version);
        }
        stable_hash_hex(&buf)
    }

    pub fn build_status(&self, build_version: &str) -> StageStatus {
        self.doc
            .builds
            .get(build_version)
            .map(|b| b.build_status)
            .unwrap_or(StageStatus::NotStarted)
    }

    pub fn update_build<F>(&mut self, build_version: &str, f: F) -> Result<(), MetadataError>
    where
        F: FnOnce(&mut GraphBuildMetadata),
    {
        let entry = self
            .doc
            .builds
            .entry(build_version.to_string())
            .or_default();
        f(entry);
        self.save()
    }

    pub fn build_info(&self, build_version: &str) -> Option<&GraphBuildMetadata> {
        self.doc.builds.get(build_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_version_changes_with_source_release() {
        let mut releases = BTreeMap::new();
        releases.insert("CTD".to_string(), "r1".to_string());
        let v1 = GraphMetadata::build_version("spec-hash", &releases);
        releases.insert("CTD".to_string(), "r2".to_string());
        let v2 = GraphMetadata::build_version("spec-hash", &releases);
        assert_ne!(v1, v2);
    }

    #[test]
    fn unknown_build_is_not_started() {
        let dir = tempfile::tempdir().unwrap();
        let meta = GraphMetadata::load_or_init(dir.path(), "my-graph", "hash1").unwrap();
        assert_eq!(meta.build_status("build-v1"), StageStatus::NotStarted);
    }

    #[test]
    fn build_transitions_persist() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut meta = GraphMetadata::load_or_init(dir.path(), "my-graph", "hash1").unwrap();
            meta.update_build("build-v1", |b| {
                b.build_status = StageStatus::Stable;
                b.source_releases.insert("CTD".to_string(), "r1".to_string());
            })
            .unwrap();
        }
        let meta = GraphMetadata::load_or_init(dir.path(), "my-graph", "hash1").unwrap();
        assert_eq!(meta.build_status("build-v1"), StageStatus::Stable);
        assert_eq!(
            meta.build_info("build-v1").unwrap().source_releases.get("CTD"),
            Some(&"r1".to_string())
        );
    }
}
