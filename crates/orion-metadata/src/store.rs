use crate::status::{StageGate, StageStatus};
use orion_common::OrionError;
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("failed to read metadata file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse metadata file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to persist metadata file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Loads `path` as JSON if it exists, or returns `default()`'s result
/// otherwise — the `load_or_init` half of `spec.md` §4.1's MetadataStore.
pub fn load_or_init<T, F>(path: &Path, default: F) -> Result<T, MetadataError>
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    if !path.is_file() {
        return Ok(default());
    }
    let contents = std::fs::read_to_string(path).map_err(|source| MetadataError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| MetadataError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Atomically persists `value` to `path`: write to a sibling temp file, then
/// rename over the destination, so a crash mid-write never leaves a
/// truncated metadata document behind.
pub fn save<T: Serialize>(path: &Path, value: &T) -> Result<(), MetadataError> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        std::fs::create_dir_all(dir).map_err(|source| MetadataError::Write {
            path: path.display().to_string(),
            source,
        })?;
    }

    let mut tmp = if let Some(dir) = dir {
        tempfile::NamedTempFile::new_in(dir)
    } else {
        tempfile::NamedTempFile::new()
    }
    .map_err(|source| MetadataError::Write {
        path: path.display().to_string(),
        source,
    })?;

    serde_json::to_writer_pretty(&mut tmp, value).map_err(|source| MetadataError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    tmp.persist(path)
        .map_err(|e| MetadataError::Write {
            path: path.display().to_string(),
            source: e.error,
        })?;
    Ok(())
}

/// Checks a stage's persisted status and decides what the caller should do
/// next, per the transition table in `spec.md` §4.1:
///
/// - `stable` -> [`StageGate::Skip`]
/// - `in_progress` -> error (concurrent or crashed run; operator must clear it)
/// - `broken` -> error (permanent; do not retry automatically)
/// - `not_started` / `failed` -> [`StageGate::Proceed`]
///
/// The caller is responsible for persisting the `in_progress` transition
/// (via the metadata document's own setter) before doing the stage's work.
pub fn begin_stage(
    entity: &str,
    stage: &str,
    status: StageStatus,
) -> Result<StageGate, OrionError> {
    match status {
        StageStatus::Stable => Ok(StageGate::Skip),
        StageStatus::InProgress => Err(OrionError::StageInProgress {
            entity: entity.to_string(),
            stage: stage.to_string(),
        }),
        StageStatus::Broken => Err(OrionError::StageBroken {
            entity: entity.to_string(),
            stage: stage.to_string(),
        }),
        StageStatus::NotStarted | StageStatus::Failed => Ok(StageGate::Proceed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Doc {
        value: u32,
    }

    #[test]
    fn load_or_init_returns_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let doc: Doc = load_or_init(&path, || Doc { value: 42 }).unwrap();
        assert_eq!(doc, Doc { value: 42 });
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        save(&path, &Doc { value: 7 }).unwrap();
        let doc: Doc = load_or_init(&path, || Doc { value: 0 }).unwrap();
        assert_eq!(doc, Doc { value: 7 });
    }

    #[test]
    fn begin_stage_skips_stable() {
        assert_eq!(
            begin_stage("s", "fetch", StageStatus::Stable).unwrap(),
            StageGate::Skip
        );
    }

    #[test]
    fn begin_stage_rejects_in_progress() {
        assert!(begin_stage("s", "fetch", StageStatus::InProgress).is_err());
    }

    #[test]
    fn begin_stage_rejects_broken() {
        assert!(begin_stage("s", "fetch", StageStatus::Broken).is_err());
    }

    #[test]
    fn begin_stage_proceeds_on_failed_or_not_started() {
        assert_eq!(
            begin_stage("s", "fetch", StageStatus::Failed).unwrap(),
            StageGate::Proceed
        );
        assert_eq!(
            begin_stage("s", "fetch", StageStatus::NotStarted).unwrap(),
            StageGate::Proceed
        );
    }
}
