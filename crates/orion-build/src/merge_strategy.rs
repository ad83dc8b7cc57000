/// A source's role in the three-tier merge ordering `spec.md` §4.7 requires:
/// all `Primary` sources first, then all `ConnectedEdgeSubset` sources (in
/// declaration order), then all `DontMergeEdges` sources. Parsed from the
/// `merge_strategy` string on `orion_spec::DataSource`/`SubGraphSource`,
/// where `null`/absent means `Primary` and the literal `"none"` (the string
/// `orion_spec::model::GraphEntry::apply_overrides` already treats
/// specially) means `DontMergeEdges`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MergeStrategy {
    Primary,
    ConnectedEdgeSubset,
    DontMergeEdges,
}

impl MergeStrategy {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None => MergeStrategy::Primary,
            Some("connected_edge_subset") => MergeStrategy::ConnectedEdgeSubset,
            Some("none") | Some("dont_merge_edges") => MergeStrategy::DontMergeEdges,
            Some(_) => MergeStrategy::Primary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_primary() {
        assert_eq!(MergeStrategy::parse(None), MergeStrategy::Primary);
    }

    #[test]
    fn none_literal_is_dont_merge_edges() {
        assert_eq!(MergeStrategy::parse(Some("none")), MergeStrategy::DontMergeEdges);
    }

    #[test]
    fn connected_edge_subset_is_recognized() {
        assert_eq!(
            MergeStrategy::parse(Some("connected_edge_subset")),
            MergeStrategy::ConnectedEdgeSubset
        );
    }

    #[test]
    fn ordering_places_primary_before_subset_before_dont_merge() {
        let mut strategies = vec![
            MergeStrategy::DontMergeEdges,
            MergeStrategy::Primary,
            MergeStrategy::ConnectedEdgeSubset,
        ];
        strategies.sort();
        assert_eq!(
            strategies,
            vec![MergeStrategy::Primary, MergeStrategy::ConnectedEdgeSubset, MergeStrategy::DontMergeEdges]
        );
    }
}
