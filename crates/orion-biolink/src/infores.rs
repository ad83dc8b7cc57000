use std::collections::HashMap;

/// Status of an infores (information resource) identifier, as looked up in
/// the biolink information-resource registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InforesStatus {
    Valid,
    Deprecated,
    Invalid,
}

/// Looks up the status of knowledge-source identifiers (e.g.
/// `infores:ctd`). The catalog itself is fetched once by the CLI layer
/// (metadata-catalog fetching is out of scope per `spec.md` §1) and handed
/// to the [`crate::validate`]-side consumer as a trait object, so Validator
/// stays pure and injectable rather than reaching for a global client.
pub trait InfoResourceCatalog: Send + Sync {
    fn status(&self, infores_id: &str) -> InforesStatus;
}

/// An in-memory catalog, built from a fetched `infores_catalog.yaml`-style
/// document (`{id: status}`), matching `BiolinkInformationResources` in
/// `Common/biolink_utils.py`.
#[derive(Debug, Default)]
pub struct StaticInfoResourceCatalog {
    statuses: HashMap<String, InforesStatus>,
}

impl StaticInfoResourceCatalog {
    pub fn new(statuses: HashMap<String, InforesStatus>) -> Self {
        StaticInfoResourceCatalog { statuses }
    }

    pub fn empty() -> Self {
        StaticInfoResourceCatalog {
            statuses: HashMap::new(),
        }
    }
}

impl InfoResourceCatalog for StaticInfoResourceCatalog {
    fn status(&self, infores_id: &str) -> InforesStatus {
        self.statuses
            .get(infores_id)
            .copied()
            .unwrap_or(InforesStatus::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_id_is_invalid() {
        let catalog = StaticInfoResourceCatalog::empty();
        assert_eq!(catalog.status("infores:nonexistent"), InforesStatus::Invalid);
    }

    #[test]
    fn known_id_reports_its_status() {
        let mut statuses = HashMap::new();
        statuses.insert("infores:ctd".to_string(), InforesStatus::Valid);
        statuses.insert("infores:old-thing".to_string(), InforesStatus::Deprecated);
        let catalog = StaticInfoResourceCatalog::new(statuses);
        assert_eq!(catalog.status("infores:ctd"), InforesStatus::Valid);
        assert_eq!(catalog.status("infores:old-thing"), InforesStatus::Deprecated);
    }
}
