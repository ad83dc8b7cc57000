//! Shared error taxonomy, configuration, property-name constants, and other
//! small utilities used across every `orion-*` crate.

pub mod config;
pub mod curie;
pub mod error;
pub mod hash;
pub mod logging;
pub mod model;
pub mod props;

pub use config::Config;
pub use error::{FailureKind, OrionError, OrionResult};
pub use model::Entity;
