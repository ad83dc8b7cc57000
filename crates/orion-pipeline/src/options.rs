/// Flags threaded through a [`crate::SourcePipeline`] run, gathered from the
/// CLI's `source` subcommand flags in SPEC_FULL.md §4.6 (`-t/-f/-l`) plus the
/// normalization knobs carried on `NormalizationScheme`.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// `-l/--lenient`: keep nodes that failed node normalization instead of
    /// dropping them.
    pub lenient: bool,
    /// `-f/--fresh`: ignore and clear prior stage status before running.
    pub fresh: bool,
    /// `-t/--test`: use local fixtures in place of live normalization
    /// services (`ORION_TEST_MODE`).
    pub test_mode: bool,
    /// Keep nodes untouched by any edge instead of dropping them after
    /// normalization.
    pub preserve_unconnected_nodes: bool,
    /// Ask the node normalizer to include taxon equivalences.
    pub include_taxa: bool,
    pub node_batch_size: usize,
    pub edge_block_size: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            lenient: false,
            fresh: false,
            test_mode: false,
            preserve_unconnected_nodes: false,
            include_taxa: false,
            node_batch_size: 1000,
            edge_block_size: 100,
        }
    }
}
