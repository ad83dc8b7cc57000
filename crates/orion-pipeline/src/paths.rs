use std::path::{Path, PathBuf};

/// On-disk storage layout for one source, per `spec.md` §6:
///
/// ```text
/// <storage>/<source_id>/
///   <source_id>.meta.json
///   <source_version>/
///     source/
///     parsed_<parsing_version>/
///       source_nodes.jsonl
///       source_edges.jsonl
///       normalized_<composite_norm_version>/
///         normalized_nodes.jsonl
///         normalized_edges.jsonl
///         norm_node_map.json
///         norm_node_failures.log
///         norm_predicate_map.json
///         supplemental_<supp_version>/
///           supp_nodes.jsonl
///           supp_edges.jsonl
///           supp_norm_nodes.jsonl
///           supp_norm_edges.jsonl
/// ```
#[derive(Debug, Clone)]
pub struct SourceLayout {
    source_dir: PathBuf,
    source_id: String,
    source_version: String,
}

impl SourceLayout {
    pub fn new(storage_root: &Path, source_id: &str, source_version: &str) -> Self {
        SourceLayout {
            source_dir: storage_root.join(source_id),
            source_id: source_id.to_string(),
            source_version: source_version.to_string(),
        }
    }

    /// `<storage>/<source_id>/`, where the source's metadata document lives.
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    fn version_dir(&self) -> PathBuf {
        self.source_dir.join(&self.source_version)
    }

    /// Raw files as written by the downloader; owned entirely by the parser.
    pub fn raw_dir(&self) -> PathBuf {
        self.version_dir().join("source")
    }

    fn parsed_dir(&self, parsing_version: &str) -> PathBuf {
        self.version_dir().join(format!("parsed_{parsing_version}"))
    }

    pub fn parsed_nodes(&self, parsing_version: &str) -> PathBuf {
        self.parsed_dir(parsing_version).join("source_nodes.jsonl")
    }

    pub fn parsed_edges(&self, parsing_version: &str) -> PathBuf {
        self.parsed_dir(parsing_version).join("source_edges.jsonl")
    }

    fn normalized_dir(&self, parsing_version: &str, composite_norm_version: &str) -> PathBuf {
        self.parsed_dir(parsing_version)
            .join(format!("normalized_{composite_norm_version}"))
    }

    pub fn normalized_nodes(&self, parsing_version: &str, composite_norm_version: &str) -> PathBuf {
        self.normalized_dir(parsing_version, composite_norm_version)
            .join("normalized_nodes.jsonl")
    }

    pub fn normalized_edges(&self, parsing_version: &str, composite_norm_version: &str) -> PathBuf {
        self.normalized_dir(parsing_version, composite_norm_version)
            .join("normalized_edges.jsonl")
    }

    pub fn norm_node_map(&self, parsing_version: &str, composite_norm_version: &str) -> PathBuf {
        self.normalized_dir(parsing_version, composite_norm_version)
            .join("norm_node_map.json")
    }

    pub fn norm_node_failures(&self, parsing_version: &str, composite_norm_version: &str) -> PathBuf {
        self.normalized_dir(parsing_version, composite_norm_version)
            .join("norm_node_failures.log")
    }

    pub fn norm_predicate_map(&self, parsing_version: &str, composite_norm_version: &str) -> PathBuf {
        self.normalized_dir(parsing_version, composite_norm_version)
            .join("norm_predicate_map.json")
    }

    fn supplemental_dir(
        &self,
        parsing_version: &str,
        composite_norm_version: &str,
        supplementation_version: &str,
    ) -> PathBuf {
        self.normalized_dir(parsing_version, composite_norm_version)
            .join(format!("supplemental_{supplementation_version}"))
    }

    pub fn supp_nodes(&self, parsing_version: &str, composite_norm_version: &str, supplementation_version: &str) -> PathBuf {
        self.supplemental_dir(parsing_version, composite_norm_version, supplementation_version)
            .join("supp_nodes.jsonl")
    }

    pub fn supp_edges(&self, parsing_version: &str, composite_norm_version: &str, supplementation_version: &str) -> PathBuf {
        self.supplemental_dir(parsing_version, composite_norm_version, supplementation_version)
            .join("supp_edges.jsonl")
    }

    pub fn supp_norm_nodes(
        &self,
        parsing_version: &str,
        composite_norm_version: &str,
        supplementation_version: &str,
    ) -> PathBuf {
        self.supplemental_dir(parsing_version, composite_norm_version, supplementation_version)
            .join("supp_norm_nodes.jsonl")
    }

    pub fn supp_norm_edges(
        &self,
        parsing_version: &str,
        composite_norm_version: &str,
        supplementation_version: &str,
    ) -> PathBuf {
        self.supplemental_dir(parsing_version, composite_norm_version, supplementation_version)
            .join("supp_norm_edges.jsonl")
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn source_version(&self) -> &str {
        &self.source_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lays_out_paths_under_the_declared_roots() {
        let root = Path::new("/data/storage");
        let layout = SourceLayout::new(root, "CTD", "2024-01-01");
        assert_eq!(layout.raw_dir(), root.join("CTD/2024-01-01/source"));
        assert_eq!(
            layout.parsed_nodes("p1"),
            root.join("CTD/2024-01-01/parsed_p1/source_nodes.jsonl")
        );
        assert_eq!(
            layout.normalized_nodes("p1", "n1"),
            root.join("CTD/2024-01-01/parsed_p1/normalized_n1/normalized_nodes.jsonl")
        );
        assert_eq!(
            layout.supp_nodes("p1", "n1", "s1"),
            root.join("CTD/2024-01-01/parsed_p1/normalized_n1/supplemental_s1/supp_nodes.jsonl")
        );
    }
}
