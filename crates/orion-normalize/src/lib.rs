pub mod edge;
pub mod error;
pub mod node;
pub mod retry;

pub use edge::{EdgeNormalizationResult, EdgeNormalizer, DEFAULT_EDGE_NORM_ENDPOINT};
pub use error::NormalizeError;
pub use node::{get_current_node_norm_version, NodeNormalizationOutcome, NodeNormalizer, DEFAULT_NODE_NORM_ENDPOINT};
pub use retry::RetryPolicy;
