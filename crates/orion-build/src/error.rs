#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Orion(#[from] orion_common::OrionError),

    #[error(transparent)]
    Metadata(#[from] orion_metadata::MetadataError),

    #[error(transparent)]
    GraphSpec(#[from] orion_spec::GraphSpecError),

    #[error(transparent)]
    Pipeline(#[from] orion_pipeline::PipelineError),

    #[error(transparent)]
    Validate(#[from] orion_validate::ValidateError),

    #[error(transparent)]
    Merge(#[from] orion_merge::MergeError),

    #[error("failed to read or write {path}: {source}")]
    Stream {
        path: String,
        #[source]
        source: orion_stream::jsonl::StreamError,
    },

    #[error("graph '{0}' has no entry in the loaded graph spec set")]
    UnknownGraph(String),

    #[error("source '{0}' has no registered fetcher/parser in this build's SourceRegistry")]
    UnregisteredSource(String),

    #[error("subgraph '{subgraph_id}' (depended on by '{graph_id}') has not been built at version '{expected_version}'; found '{found_version}'")]
    SubgraphVersionMismatch {
        graph_id: String,
        subgraph_id: String,
        expected_version: String,
        found_version: String,
    },
}
