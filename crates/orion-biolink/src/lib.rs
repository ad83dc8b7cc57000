//! An embedded, pre-initialized biolink-model toolkit: category ancestry,
//! predicate inversion/symmetry, and the information-resource registry used
//! to flag deprecated knowledge sources during QC.

pub mod infores;
pub mod model;

pub use infores::{InforesStatus, InfoResourceCatalog, StaticInfoResourceCatalog};
pub use model::{BiolinkModel, BiolinkModelError};
