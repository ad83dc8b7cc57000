pub mod edge_file;
pub mod error;
pub mod invert;
pub mod metadata;
pub mod node_file;
pub mod normalizer;
pub mod variant;

pub use error::FileNormalizeError;
pub use invert::invert_edge;
pub use metadata::NormalizationCounters;
pub use normalizer::{FileNormalizer, FileNormalizerOptions, FileNormalizerPaths};
pub use variant::{IdentityVariantNormalizer, SequenceVariantNormalizer, VariantNormalization};
