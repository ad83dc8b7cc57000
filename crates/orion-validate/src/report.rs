use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One QC concern surfaced about a specific node or edge. Warnings never
/// fail a build (`spec.md` §7): they are collected and handed back to the
/// operator in the QC report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub node_or_edge_id: String,
    pub warning_kind: String,
    pub detail: String,
}

impl Warning {
    pub fn new(node_or_edge_id: impl Into<String>, warning_kind: &'static str, detail: impl Into<String>) -> Self {
        Warning {
            node_or_edge_id: node_or_edge_id.into(),
            warning_kind: warning_kind.to_string(),
            detail: detail.into(),
        }
    }
}

/// The QC report produced by one streaming pass of [`crate::Validator`]
/// over a graph's merged node/edge files, per `spec.md` §4.9 and SPEC_FULL.md
/// §4.9: totals, top-20 distributions, per-category prefix breakdowns, and a
/// warnings list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QcReport {
    pub node_count: u64,
    pub edge_count: u64,
    pub category_counts: BTreeMap<String, u64>,
    pub predicate_counts: BTreeMap<String, u64>,
    pub prefix_counts: BTreeMap<String, u64>,
    /// prefix distribution, broken down per leaf category.
    pub category_prefix_counts: BTreeMap<String, BTreeMap<String, u64>>,
    pub top_categories: Vec<(String, u64)>,
    pub top_predicates: Vec<(String, u64)>,
    pub warnings: Vec<Warning>,
}

/// The `n` highest-count entries of `counts`, ties broken by key for
/// determinism.
pub(crate) fn top_n(counts: &BTreeMap<String, u64>, n: usize) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> = counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(n);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_n_orders_by_count_descending_then_key() {
        let mut counts = BTreeMap::new();
        counts.insert("b".to_string(), 2);
        counts.insert("a".to_string(), 2);
        counts.insert("c".to_string(), 5);
        let top = top_n(&counts, 2);
        assert_eq!(top, vec![("c".to_string(), 5), ("a".to_string(), 2)]);
    }
}
