use orion_common::props::NAMED_THING;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap, HashSet};

const EMBEDDED_MODEL: &str = include_str!("../assets/model.json");

#[derive(Debug, Deserialize)]
struct RawModel {
    categories: HashMap<String, RawCategory>,
    predicates: HashMap<String, RawPredicate>,
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    parents: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawPredicate {
    inverse: Option<String>,
    symmetric: bool,
}

/// An immutable, pre-initialized view of the biolink model: category
/// ancestry, predicate inversion/symmetry, and category/predicate validity.
///
/// Mirrors the role of `bmt.Toolkit` in `Common/biolink_utils.py`, but is
/// embedded rather than fetched from GitHub at a pinned version, since the
/// full model schema is an external collaborator per `spec.md` §1. Built
/// once and shared behind an `Arc` rather than kept as module-global state,
/// per the Design Note in `spec.md` §9.
#[derive(Debug)]
pub struct BiolinkModel {
    /// category -> full set of ancestors (not including itself)
    ancestors: HashMap<String, BTreeSet<String>>,
    predicates: HashMap<String, RawPredicate>,
}

#[derive(Debug, thiserror::Error)]
pub enum BiolinkModelError {
    #[error("embedded biolink model asset is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl BiolinkModel {
    /// Loads the embedded, pinned biolink model snapshot.
    pub fn load() -> Result<Self, BiolinkModelError> {
        let raw: RawModel = serde_json::from_str(EMBEDDED_MODEL)?;

        let mut ancestors = HashMap::new();
        for category in raw.categories.keys() {
            let mut seen = BTreeSet::new();
            let mut frontier = vec![category.clone()];
            while let Some(current) = frontier.pop() {
                if let Some(cat) = raw.categories.get(&current) {
                    for parent in &cat.parents {
                        if seen.insert(parent.clone()) {
                            frontier.push(parent.clone());
                        }
                    }
                }
            }
            ancestors.insert(category.clone(), seen);
        }

        Ok(BiolinkModel {
            ancestors,
            predicates: raw.predicates,
        })
    }

    pub fn is_valid_category(&self, category: &str) -> bool {
        self.ancestors.contains_key(category)
    }

    pub fn is_valid_predicate(&self, predicate: &str) -> bool {
        self.predicates.contains_key(predicate)
    }

    /// The inverse of `predicate`, or `None` if it has none (or is unknown).
    /// Symmetric predicates are their own inverse.
    pub fn invert_predicate(&self, predicate: &str) -> Option<String> {
        let entry = self.predicates.get(predicate)?;
        if entry.symmetric {
            Some(predicate.to_string())
        } else {
            entry.inverse.clone()
        }
    }

    /// Given a node's category list, removes any category that is an
    /// ancestor of another present category, per `spec.md` §4.9. Unknown
    /// categories are treated as leaves (they have no known ancestors).
    pub fn leaf_categories<'a>(&self, categories: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let present: HashSet<&str> = categories.into_iter().collect();
        let mut ancestor_of_something = HashSet::new();
        for &category in &present {
            if let Some(ancestors) = self.ancestors.get(category) {
                for ancestor in ancestors {
                    ancestor_of_something.insert(ancestor.as_str());
                }
            }
        }
        present
            .into_iter()
            .filter(|c| !ancestor_of_something.contains(c))
            .map(|c| c.to_string())
            .collect()
    }

    /// Sanitizes a node's category list against the model: unknown
    /// categories are removed (the caller is expected to move them to
    /// `custom_node_types`), and `NamedThing` is always present.
    pub fn sanitize_categories(&self, categories: &[String]) -> (Vec<String>, Vec<String>) {
        let mut valid = Vec::new();
        let mut invalid = Vec::new();
        for category in categories {
            if self.is_valid_category(category) {
                if !valid.contains(category) {
                    valid.push(category.clone());
                }
            } else if !invalid.contains(category) {
                invalid.push(category.clone());
            }
        }
        if !valid.iter().any(|c| c == NAMED_THING) {
            valid.push(NAMED_THING.to_string());
        }
        (valid, invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_categories_drops_ancestors() {
        let model = BiolinkModel::load().unwrap();
        let leaves = model.leaf_categories(["NamedThing", "BiologicalEntity", "Gene"]);
        assert_eq!(leaves, vec!["Gene".to_string()]);
    }

    #[test]
    fn sanitize_moves_invalid_categories_and_keeps_named_thing() {
        let model = BiolinkModel::load().unwrap();
        let (valid, invalid) = model.sanitize_categories(&[
            "Gene".to_string(),
            "TotallyMadeUp".to_string(),
        ]);
        assert!(valid.contains(&"Gene".to_string()));
        assert!(valid.contains(&NAMED_THING.to_string()));
        assert_eq!(invalid, vec!["TotallyMadeUp".to_string()]);
    }

    #[test]
    fn symmetric_predicate_is_its_own_inverse() {
        let model = BiolinkModel::load().unwrap();
        assert_eq!(
            model.invert_predicate("related_to"),
            Some("related_to".to_string())
        );
    }

    #[test]
    fn asymmetric_predicate_inverts() {
        let model = BiolinkModel::load().unwrap();
        assert_eq!(model.invert_predicate("treats"), Some("treated_by".to_string()));
    }

    #[test]
    fn unknown_predicate_has_no_inverse() {
        let model = BiolinkModel::load().unwrap();
        assert_eq!(model.invert_predicate("not_a_real_predicate"), None);
    }
}
