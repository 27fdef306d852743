//! In-process backends holding serialized JSON, for tests and embedding.

use std::sync::{Mutex, PoisonError};

use uuid::Uuid;

use crate::{judging::model::JudgingState, schedule::card::ScheduledCard};

use super::{PersistResult, ScheduleBackend, StateBackend};

/// State kept as a JSON string so loads always return a fresh copy.
#[derive(Debug)]
pub struct MemoryStateBackend {
    resource: String,
    stored: Mutex<Option<String>>,
}

impl MemoryStateBackend {
    /// Empty backend with a unique resource name.
    pub fn new() -> Self {
        Self::named(format!("memory:{}", Uuid::new_v4().simple()))
    }

    /// Empty backend sharing its lock with every other backend of this name.
    pub fn named(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            stored: Mutex::new(None),
        }
    }
}

impl Default for MemoryStateBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StateBackend for MemoryStateBackend {
    fn resource_name(&self) -> &str {
        &self.resource
    }

    fn load(&self) -> PersistResult<JudgingState> {
        let stored = self.stored.lock().unwrap_or_else(PoisonError::into_inner);
        match stored.as_deref() {
            Some(raw) => Ok(serde_json::from_str(raw)?),
            None => Ok(JudgingState::default()),
        }
    }

    fn save(&self, state: &JudgingState) -> PersistResult<()> {
        let raw = serde_json::to_string(state)?;
        *self.stored.lock().unwrap_or_else(PoisonError::into_inner) = Some(raw);
        Ok(())
    }
}

/// Schedule held in memory.
#[derive(Debug, Default)]
pub struct MemoryScheduleBackend {
    cards: Mutex<Vec<ScheduledCard>>,
}

impl MemoryScheduleBackend {
    /// Backend seeded with `cards`.
    pub fn with_cards(cards: Vec<ScheduledCard>) -> Self {
        Self {
            cards: Mutex::new(cards),
        }
    }
}

impl ScheduleBackend for MemoryScheduleBackend {
    fn load_schedule(&self) -> PersistResult<Vec<ScheduledCard>> {
        Ok(self.cards.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save_schedule(&self, cards: &[ScheduledCard]) -> PersistResult<()> {
        *self.cards.lock().unwrap_or_else(PoisonError::into_inner) = cards.to_vec();
        Ok(())
    }
}
