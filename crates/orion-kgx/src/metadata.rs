use serde::Serialize;

/// Counters accumulated while normalizing one source's node and edge files,
/// mirroring the dictionary `KGXFileNormalizer.normalization_metadata`
/// accumulates in the original implementation. Serialized verbatim into
/// `orion-metadata`'s `normalization_info` field.
#[derive(Debug, Default, Serialize)]
pub struct NormalizationCounters {
    pub strict: bool,
    pub conflation: bool,
    pub node_norm_version: Option<String>,

    pub node_count_pre_normalization: u64,
    pub node_count_post_normalization: u64,
    pub node_normalization_failures: u64,

    pub variant_nodes_pre_norm: u64,
    pub variant_node_norm_failures: u64,
    pub variant_nodes_split_count: u64,
    pub variant_nodes_post_norm: u64,
    pub all_nodes_post_norm: u64,

    pub discarded_duplicate_node_count: u64,
    pub final_normalized_nodes: u64,

    pub biolink_version: String,
    pub source_edges: u64,
    pub edges_failed_due_to_nodes: u64,
    pub edge_splits: u64,
    pub subclass_loops_removed: u64,
    pub final_normalized_edges: u64,

    pub unconnected_nodes_removed: u64,
}
