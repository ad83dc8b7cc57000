//! Graph-level orchestration: dependency resolution between graphs and their
//! subgraphs, the three-tier merge-strategy ordering, and graph metadata.
//!
//! Grounded on `spec.md` §4.7/§4.8's `GraphBuilder`: everything upstream of
//! this crate (fetch/parse/normalize/supplement/QC) is per-source, driven by
//! `orion_pipeline::SourcePipeline`; this crate is what assembles one or more
//! of those per-source outputs, plus any subgraph outputs, into a single
//! named graph's `nodes.jsonl`/`edges.jsonl`.

mod builder;
mod error;
mod graph_version;
mod layout;
mod merge_strategy;
mod merger;
mod source_registry;

pub use builder::{GraphBuildResult, GraphBuilder};
pub use error::BuildError;
pub use graph_version::{compute_graph_version, VersionToken};
pub use layout::GraphLayout;
pub use merge_strategy::MergeStrategy;
pub use source_registry::{SourceRegistration, SourceRegistry, StaticSourceRegistry};
