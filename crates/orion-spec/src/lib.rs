pub mod model;
pub mod scheme;

pub use model::{DataSource, GraphEntry, GraphSpecError, GraphSpecSet, SubGraphSource};
pub use scheme::{NormalizationScheme, CUSTOM_NODE_TYPES, FALLBACK_EDGE_PREDICATE, NORMALIZATION_CODE_VERSION};
