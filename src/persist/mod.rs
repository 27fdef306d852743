//! Storage backends for the judging state and the fight schedule.

pub mod json;
pub mod memory;

use thiserror::Error;

use crate::{judging::model::JudgingState, schedule::card::ScheduledCard};

/// Failure reading or writing a backend.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Content could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Backend-specific failure.
    #[error("{0}")]
    Message(String),
}

/// Result of a backend operation.
pub type PersistResult<T> = Result<T, PersistError>;

/// Storage for the shared judging state.
///
/// `save` must replace the stored state atomically: a concurrent `load` sees
/// either the old or the new state, never a partial write.
pub trait StateBackend: Send + Sync {
    /// Name of the stored resource; the state lock is keyed by it.
    fn resource_name(&self) -> &str;
    /// Stored state, or the default when nothing is stored yet.
    fn load(&self) -> PersistResult<JudgingState>;
    /// Replaces the stored state.
    fn save(&self, state: &JudgingState) -> PersistResult<()>;
}

/// Storage for the externally-owned fight schedule.
pub trait ScheduleBackend: Send + Sync {
    /// Remaining cards, head first.
    fn load_schedule(&self) -> PersistResult<Vec<ScheduledCard>>;
    /// Replaces the whole schedule.
    fn save_schedule(&self, cards: &[ScheduledCard]) -> PersistResult<()>;
}
