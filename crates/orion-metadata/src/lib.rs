pub mod graph;
pub mod source;
pub mod status;
pub mod store;

pub use graph::{GraphBuildMetadata, GraphMetadata, GraphMetadataDoc};
pub use source::{
    NormalizationMetadata, ParsingMetadata, ReleaseInfo, SourceMetadata, SourceMetadataDoc,
    SupplementationMetadata,
};
pub use status::{StageGate, StageStatus};
pub use store::{begin_stage, MetadataError};
