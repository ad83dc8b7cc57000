#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    #[error("failed to read or write {path}: {source}")]
    Stream {
        path: String,
        #[source]
        source: orion_stream::jsonl::StreamError,
    },
}
