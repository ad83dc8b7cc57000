//! Per-source orchestration: fetch, parse, normalize, supplement, QC/release.
//!
//! Grounded on `spec.md` §4.1/§4.2's stage pipeline: every stage gates on its
//! persisted [`orion_metadata::StageStatus`] so a rerun resumes exactly where
//! a prior run left off, and concrete fetchers/parsers/supplementers are
//! injected as trait objects since `spec.md` §1 scopes them out of this crate.

mod collaborators;
mod error;
mod options;
mod paths;
mod pipeline;

pub use collaborators::{ParseOutcome, SourceFetcher, SourceParser, VariantSupplementer};
pub use error::PipelineError;
pub use options::PipelineOptions;
pub use paths::SourceLayout;
pub use pipeline::{PipelineRelease, SourcePipeline};
