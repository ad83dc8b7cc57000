use async_trait::async_trait;
use orion_common::OrionResult;
use std::path::Path;

/// Downloads a source's raw data, per `spec.md` §4.2. Concrete fetchers
/// (HTTP, FTP, database dump) are external collaborators supplied by the
/// caller; `spec.md` §1 explicitly scopes them out of this crate.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Resolves what "latest" currently means for this source, used when no
    /// explicit `source_version` was pinned in the graph spec.
    async fn latest_version(&self) -> OrionResult<String>;

    /// Downloads `source_version`'s raw files into `raw_dir`, which already
    /// exists.
    async fn fetch(&self, source_version: &str, raw_dir: &Path) -> OrionResult<()>;
}

/// What a [`SourceParser`] reports about the nodes/edges it just wrote.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOutcome {
    pub has_sequence_variants: bool,
}

/// Turns a source's raw files into KGX-shaped `source_nodes.jsonl` /
/// `source_edges.jsonl`, per `spec.md` §4.2's Parser contract. One
/// implementation per supported source; `spec.md` §1 scopes concrete parsers
/// out of this crate.
#[async_trait]
pub trait SourceParser: Send + Sync {
    async fn parse(&self, raw_dir: &Path, nodes_out: &Path, edges_out: &Path) -> OrionResult<ParseOutcome>;
}

/// Annotates normalized `SequenceVariant` nodes with extra data the base
/// normalization pass doesn't produce (e.g. genomic coordinates), per
/// `spec.md` §4.6. Only invoked for sources whose parser reported
/// `has_sequence_variants`.
#[async_trait]
pub trait VariantSupplementer: Send + Sync {
    async fn supplement(
        &self,
        normalized_nodes: &Path,
        normalized_edges: &Path,
        supp_nodes_out: &Path,
        supp_edges_out: &Path,
    ) -> OrionResult<()>;
}
