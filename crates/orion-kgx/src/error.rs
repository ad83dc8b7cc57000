#[derive(Debug, thiserror::Error)]
pub enum FileNormalizeError {
    #[error("failed to read or write {path}: {source}")]
    Stream {
        path: String,
        #[source]
        source: orion_stream::jsonl::StreamError,
    },

    #[error(transparent)]
    Normalize(#[from] orion_normalize::NormalizeError),

    /// Edge normalization reported success but the predicate lookup has no
    /// entry for a predicate the service was just asked to resolve.
    #[error("edge normalization lookup missing entry for predicate {predicate}")]
    MissingPredicateLookup { predicate: String },
}
