use crate::status::StageStatus;
use crate::store::{self, MetadataError};
use orion_common::hash::stable_hash_hex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SupplementationMetadata {
    pub supplementation_status: StageStatus,
    pub supplementation_time: Option<String>,
    pub supplementation_error: Option<String>,
    pub supplementation_info: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NormalizationMetadata {
    pub normalization_status: StageStatus,
    pub normalization_time: Option<String>,
    pub normalization_error: Option<String>,
    pub node_normalization_version: Option<String>,
    pub edge_normalization_version: Option<String>,
    pub strict_normalization: Option<bool>,
    pub conflation: Option<bool>,
    /// Counters produced by FileNormalizer: node/edge pre/post counts,
    /// variant split counts, subclass-loop removals, and so on (`spec.md`
    /// §4.5, expanded in SPEC_FULL.md §4.1).
    pub normalization_info: Option<serde_json::Value>,
    pub supplementations: BTreeMap<String, SupplementationMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ParsingMetadata {
    pub parsing_status: StageStatus,
    pub parsing_time: Option<String>,
    pub parsing_error: Option<String>,
    pub has_sequence_variants: Option<bool>,
    pub normalizations: BTreeMap<String, NormalizationMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub source_version: String,
    pub parsing_version: String,
    pub normalization_version: String,
    pub supplementation_version: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadataDoc {
    pub source_id: String,
    pub source_version: String,
    pub fetch_status: StageStatus,
    pub fetch_error: Option<String>,
    pub parsings: BTreeMap<String, ParsingMetadata>,
    pub releases: BTreeMap<String, ReleaseInfo>,
}

impl SourceMetadataDoc {
    fn new(source_id: &str, source_version: &str) -> Self {
        SourceMetadataDoc {
            source_id: source_id.to_string(),
            source_version: source_version.to_string(),
            fetch_status: StageStatus::NotStarted,
            fetch_error: None,
            parsings: BTreeMap::new(),
            releases: BTreeMap::new(),
        }
    }
}

/// Durable per-`(source_id, source_version)` state, per `spec.md` §3 and §4.1.
///
/// Created on first access, mutated only by the owning stage, and persisted
/// synchronously at every transition via write-temp-then-rename.
pub struct SourceMetadata {
    path: PathBuf,
    doc: SourceMetadataDoc,
}

impl SourceMetadata {
    /// `storage_dir` is `<storage>/<source_id>/`.
    pub fn load_or_init(
        storage_dir: &Path,
        source_id: &str,
        source_version: &str,
    ) -> Result<Self, MetadataError> {
        let path = storage_dir.join(format!("{source_id}.meta.json"));
        let doc = store::load_or_init(&path, || SourceMetadataDoc::new(source_id, source_version))?;
        Ok(SourceMetadata { path, doc })
    }

    fn save(&self) -> Result<(), MetadataError> {
        store::save(&self.path, &self.doc)
    }

    pub fn doc(&self) -> &SourceMetadataDoc {
        &self.doc
    }

    pub fn source_version(&self) -> &str {
        &self.doc.source_version
    }

    pub fn fetch_status(&self) -> StageStatus {
        self.doc.fetch_status
    }

    pub fn set_fetch_status(&mut self, status: StageStatus) -> Result<(), MetadataError> {
        self.doc.fetch_status = status;
        self.save()
    }

    pub fn set_fetch_error(&mut self, error: impl Into<String>) -> Result<(), MetadataError> {
        self.doc.fetch_error = Some(error.into());
        self.save()
    }

    pub fn parsing_status(&self, parsing_version: &str) -> StageStatus {
        self.doc
            .parsings
            .get(parsing_version)
            .map(|p| p.parsing_status)
            .unwrap_or(StageStatus::NotStarted)
    }

    pub fn has_sequence_variants(&self, parsing_version: &str) -> bool {
        self.doc
            .parsings
            .get(parsing_version)
            .and_then(|p| p.has_sequence_variants)
            .unwrap_or(false)
    }

    pub fn update_parsing<F>(&mut self, parsing_version: &str, f: F) -> Result<(), MetadataError>
    where
        F: FnOnce(&mut ParsingMetadata),
    {
        let entry = self
            .doc
            .parsings
            .entry(parsing_version.to_string())
            .or_default();
        f(entry);
        self.save()
    }

    /// Resets fetch/parsing/normalization state to unvisited, preserving the
    /// `releases` history, so a `-f/--fresh` run redoes every stage without
    /// losing the record of releases it already produced. Per SPEC_FULL.md
    /// §4.6's `--fresh` flag.
    pub fn clear(&mut self) -> Result<(), MetadataError> {
        self.doc.fetch_status = StageStatus::NotStarted;
        self.doc.fetch_error = None;
        self.doc.parsings.clear();
        self.save()
    }

    pub fn reset_parsing(&mut self, parsing_version: &str) -> Result<(), MetadataError> {
        self.doc.parsings.insert(
            parsing_version.to_string(),
            ParsingMetadata::default(),
        );
        self.save()
    }

    pub fn normalization_status(
        &self,
        parsing_version: &str,
        normalization_version: &str,
    ) -> StageStatus {
        self.doc
            .parsings
            .get(parsing_version)
            .and_then(|p| p.normalizations.get(normalization_version))
            .map(|n| n.normalization_status)
            .unwrap_or(StageStatus::NotStarted)
    }

    pub fn update_normalization<F>(
        &mut self,
        parsing_version: &str,
        normalization_version: &str,
        f: F,
    ) -> Result<(), MetadataError>
    where
        F: FnOnce(&mut NormalizationMetadata),
    {
        let parsing = self
            .doc
            .parsings
            .entry(parsing_version.to_string())
            .or_default();
        let entry = parsing
            .normalizations
            .entry(normalization_version.to_string())
            .or_default();
        f(entry);
        self.save()
    }

    pub fn supplementation_status(
        &self,
        parsing_version: &str,
        normalization_version: &str,
        supplementation_version: &str,
    ) -> StageStatus {
        self.doc
            .parsings
            .get(parsing_version)
            .and_then(|p| p.normalizations.get(normalization_version))
            .and_then(|n| n.supplementations.get(supplementation_version))
            .map(|s| s.supplementation_status)
            .unwrap_or(StageStatus::NotStarted)
    }

    pub fn update_supplementation<F>(
        &mut self,
        parsing_version: &str,
        normalization_version: &str,
        supplementation_version: &str,
        f: F,
    ) -> Result<(), MetadataError>
    where
        F: FnOnce(&mut SupplementationMetadata),
    {
        let parsing = self
            .doc
            .parsings
            .entry(parsing_version.to_string())
            .or_default();
        let normalization = parsing
            .normalizations
            .entry(normalization_version.to_string())
            .or_default();
        let entry = normalization
            .supplementations
            .entry(supplementation_version.to_string())
            .or_default();
        f(entry);
        self.save()
    }

    /// Deterministic release version: a hash of the tuple naming exactly the
    /// (source_version, parsing_version, normalization_version,
    /// supplementation_version) combination this release is built from.
    pub fn release_version(
        source_id: &str,
        source_version: &str,
        parsing_version: &str,
        normalization_version: &str,
        supplementation_version: &str,
    ) -> String {
        stable_hash_hex(&format!(
            "{source_id}{source_version}{parsing_version}{normalization_version}{supplementation_version}"
        ))
    }

    pub fn generate_release(
        &mut self,
        parsing_version: &str,
        normalization_version: &str,
        supplementation_version: &str,
        extra: serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, MetadataError> {
        let release_version = Self::release_version(
            &self.doc.source_id,
            &self.doc.source_version,
            parsing_version,
            normalization_version,
            supplementation_version,
        );
        let info = self
            .doc
            .releases
            .entry(release_version.clone())
            .or_insert_with(|| ReleaseInfo {
                source_version: self.doc.source_version.clone(),
                parsing_version: parsing_version.to_string(),
                normalization_version: normalization_version.to_string(),
                supplementation_version: supplementation_version.to_string(),
                extra: serde_json::Map::new(),
            });
        info.extra.extend(extra);
        self.save()?;
        Ok(release_version)
    }

    pub fn release_info(&self, release_version: &str) -> Option<&ReleaseInfo> {
        self.doc.releases.get(release_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unvisited_stages_report_not_started() {
        let dir = tempfile::tempdir().unwrap();
        let meta = SourceMetadata::load_or_init(dir.path(), "CTD", "v1").unwrap();
        assert_eq!(meta.fetch_status(), StageStatus::NotStarted);
        assert_eq!(meta.parsing_status("p1"), StageStatus::NotStarted);
        assert_eq!(meta.normalization_status("p1", "n1"), StageStatus::NotStarted);
    }

    #[test]
    fn transitions_persist_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut meta = SourceMetadata::load_or_init(dir.path(), "CTD", "v1").unwrap();
            meta.set_fetch_status(StageStatus::Stable).unwrap();
            meta.update_parsing("p1", |p| {
                p.parsing_status = StageStatus::Stable;
                p.has_sequence_variants = Some(true);
            })
            .unwrap();
        }
        let meta = SourceMetadata::load_or_init(dir.path(), "CTD", "v1").unwrap();
        assert_eq!(meta.fetch_status(), StageStatus::Stable);
        assert_eq!(meta.parsing_status("p1"), StageStatus::Stable);
        assert!(meta.has_sequence_variants("p1"));
    }

    #[test]
    fn release_version_is_deterministic() {
        let v1 = SourceMetadata::release_version("CTD", "v1", "p1", "n1", "s1");
        let v2 = SourceMetadata::release_version("CTD", "v1", "p1", "n1", "s1");
        let v3 = SourceMetadata::release_version("CTD", "v1", "p1", "n1", "s2");
        assert_eq!(v1, v2);
        assert_ne!(v1, v3);
    }
}
