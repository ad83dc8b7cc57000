#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Orion(#[from] orion_common::OrionError),

    #[error(transparent)]
    Metadata(#[from] orion_metadata::MetadataError),

    #[error(transparent)]
    Normalize(#[from] orion_kgx::FileNormalizeError),

    #[error(transparent)]
    Validate(#[from] orion_validate::ValidateError),

    #[error("source '{source_id}' has no registered fetcher/parser; parsers are external collaborators and must be supplied by the caller")]
    UnregisteredSource { source_id: String },
}
