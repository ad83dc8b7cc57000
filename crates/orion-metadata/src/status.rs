use serde::{Deserialize, Serialize};

/// The status machine shared by every stage (fetch, parse, normalize,
/// supplement, build), per `spec.md` §4.1:
///
/// ```text
/// not_started -> in_progress -> stable
///                            -> failed   (may be retried externally)
///                            -> broken   (permanent; never retried automatically)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    NotStarted,
    InProgress,
    Stable,
    Failed,
    Broken,
}

impl Default for StageStatus {
    fn default() -> Self {
        StageStatus::NotStarted
    }
}

impl StageStatus {
    pub fn is_stable(self) -> bool {
        matches!(self, StageStatus::Stable)
    }
}

/// What a caller should do having observed a stage's persisted status,
/// returned by [`crate::store::begin_stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageGate {
    /// The stage is already `stable`; skip running it again.
    Skip,
    /// The stage was `not_started` or `failed`; it has now been marked
    /// `in_progress` and the caller should run it.
    Proceed,
}
