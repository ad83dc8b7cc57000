use std::fmt;

/// Error taxonomy shared by every stage of the build pipeline.
///
/// Each variant corresponds 1:1 to a kind named in the orchestration design:
/// it is what gets persisted into [`crate::props`]-shaped metadata documents
/// and what the CLI prints when a graph or source build does not reach
/// `stable`.
#[derive(thiserror::Error, Debug)]
pub enum OrionError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("could not determine latest version for source '{source_id}': {reason}")]
    DataVersion { source_id: String, reason: String },

    #[error("fetch failed for source '{source_id}': {reason}")]
    GetDataPull { source_id: String, reason: String },

    #[error("parser reported source '{source_id}' as permanently broken: {reason}")]
    ParserBroken { source_id: String, reason: String },

    #[error("parser failed for source '{source_id}': {reason}")]
    ParserFailed { source_id: String, reason: String },

    #[error("normalization failed: {0}")]
    NormalizationFailed(String),

    #[error("supplementation failed: {0}")]
    SupplementationFailed(String),

    #[error("merge error: {0}")]
    Merge(String),

    #[error("stage '{stage}' for '{entity}' is already in_progress (concurrent or crashed run)")]
    StageInProgress { entity: String, stage: String },

    #[error("stage '{stage}' for '{entity}' is permanently broken and will not be retried")]
    StageBroken { entity: String, stage: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// A stage-boundary failure kind, as recorded into persisted metadata.
///
/// `Failed` is transient/retryable by a subsequent invocation; `Broken` is
/// permanent and the pipeline will refuse to retry it automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Failed,
    Broken,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Failed => write!(f, "failed"),
            FailureKind::Broken => write!(f, "broken"),
        }
    }
}

pub type OrionResult<T> = Result<T, OrionError>;
