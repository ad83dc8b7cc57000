#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("failed to read or write merge spill file {path}: {source}")]
    Spill {
        path: String,
        #[source]
        source: orion_stream::jsonl::StreamError,
    },
}
