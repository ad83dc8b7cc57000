use orion_common::hash::stable_hash_hex;

/// One resolved contributor's identity for `graph_version` hashing: its
/// resolved version string plus its merge strategy (if any), in declaration
/// order. Shared shape for both `DataSource` and `SubGraphSource` entries,
/// per `spec.md` §4.8 step 1.
#[derive(Debug, Clone)]
pub struct VersionToken {
    pub version: String,
    pub merge_strategy: Option<String>,
}

impl VersionToken {
    pub fn new(version: impl Into<String>, merge_strategy: Option<String>) -> Self {
        VersionToken {
            version: version.into(),
            merge_strategy,
        }
    }
}

/// Computes a graph's `graph_version`: a 64-bit hash of the concatenation of
/// each source's `(version [+ '_' + merge_strategy])` in declaration order,
/// followed by each subgraph's equivalent, per `spec.md` §4.8 step 1. This is
/// the directory name under `<graphs>/<graph_id>/` and is stable across
/// reruns as long as no contributing version or merge strategy changes.
pub fn compute_graph_version(sources: &[VersionToken], subgraphs: &[VersionToken]) -> String {
    let mut buf = String::new();
    for token in sources.iter().chain(subgraphs) {
        buf.push_str(&token.version);
        if let Some(strategy) = &token.merge_strategy {
            buf.push('_');
            buf.push_str(strategy);
        }
    }
    stable_hash_hex(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_for_identical_inputs() {
        let sources = vec![VersionToken::new("2024-01-01", None)];
        let a = compute_graph_version(&sources, &[]);
        let b = compute_graph_version(&sources, &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn changes_when_a_source_version_changes() {
        let v1 = compute_graph_version(&[VersionToken::new("2024-01-01", None)], &[]);
        let v2 = compute_graph_version(&[VersionToken::new("2024-02-01", None)], &[]);
        assert_ne!(v1, v2);
    }

    #[test]
    fn changes_when_merge_strategy_changes() {
        let v1 = compute_graph_version(&[VersionToken::new("v1", None)], &[]);
        let v2 = compute_graph_version(&[VersionToken::new("v1", Some("connected_edge_subset".to_string()))], &[]);
        assert_ne!(v1, v2);
    }

    #[test]
    fn subgraph_tokens_are_appended_after_source_tokens() {
        let sources = vec![VersionToken::new("a", None)];
        let subgraphs = vec![VersionToken::new("b", None)];
        let combined = compute_graph_version(&sources, &subgraphs);
        let reordered = compute_graph_version(&[VersionToken::new("a", None), VersionToken::new("b", None)], &[]);
        assert_eq!(combined, reordered);
    }
}
