use serde::{Deserialize, Serialize};

pub const NORMALIZATION_CODE_VERSION: &str = "1.4";
pub const FALLBACK_EDGE_PREDICATE: &str = "biolink:related_to";
pub const CUSTOM_NODE_TYPES: &str = "custom_node_types";

/// The set of normalization parameters a source (or a whole graph) is built
/// against, per `spec.md` §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationScheme {
    #[serde(default = "default_latest")]
    pub node_normalization_version: String,
    #[serde(default = "default_latest")]
    pub edge_normalization_version: String,
    #[serde(default = "default_code_version")]
    pub normalization_code_version: String,
    #[serde(default = "default_true")]
    pub strict: bool,
    #[serde(default)]
    pub conflation: bool,
}

fn default_latest() -> String {
    "latest".to_string()
}

fn default_code_version() -> String {
    NORMALIZATION_CODE_VERSION.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for NormalizationScheme {
    fn default() -> Self {
        NormalizationScheme {
            node_normalization_version: default_latest(),
            edge_normalization_version: default_latest(),
            normalization_code_version: default_code_version(),
            strict: true,
            conflation: false,
        }
    }
}

impl NormalizationScheme {
    /// A deterministic directory-name-safe string identifying this scheme,
    /// used as part of a source release's on-disk path and version hash.
    pub fn composite_version(&self) -> String {
        let mut v = format!(
            "{}_{}_{}",
            self.node_normalization_version,
            self.edge_normalization_version,
            self.normalization_code_version
        );
        if self.conflation {
            v.push_str("_conflated");
        }
        if self.strict {
            v.push_str("_strict");
        }
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_version_reflects_flags() {
        let plain = NormalizationScheme {
            strict: false,
            conflation: false,
            ..Default::default()
        };
        assert_eq!(plain.composite_version(), "latest_latest_1.4");

        let both = NormalizationScheme {
            strict: true,
            conflation: true,
            ..Default::default()
        };
        assert_eq!(both.composite_version(), "latest_latest_1.4_conflated_strict");
    }
}
