//! Versioned read-modify-write over a [`StateBackend`].

use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};

use hashbrown::HashMap;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    judging::model::{JudgingState, StateMeta},
    persist::{PersistError, StateBackend},
    types::now_secs,
};

/// Failure inside [`AtomicStateStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not load or save.
    #[error("persistence failed: {0}")]
    Persist(#[from] PersistError),
    /// The state could not be converted for comparison.
    #[error("state snapshot failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}

type ResourceLock = Arc<Mutex<()>>;

type LockRegistry = Mutex<HashMap<String, Weak<Mutex<()>>>>;

fn registry() -> &'static LockRegistry {
    static LOCKS: OnceLock<LockRegistry> = OnceLock::new();
    LOCKS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// One lock per resource name, shared by every live store in the process.
/// Entries whose stores are all dropped are pruned when a new lock is made.
fn resource_lock(name: &str) -> ResourceLock {
    let mut locks = registry().lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(lock) = locks.get(name).and_then(Weak::upgrade) {
        return lock;
    }
    locks.retain(|_, lock| lock.strong_count() > 0);
    let lock = ResourceLock::default();
    locks.insert(name.to_string(), Arc::downgrade(&lock));
    lock
}

/// Content of a state with store metadata removed. Map equality on the
/// resulting value does not depend on key order.
pub fn content_snapshot(state: &JudgingState) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(state)?;
    if let Value::Object(map) = &mut value {
        map.remove("_meta");
    }
    Ok(value)
}

/// Sole writer gate for the persisted judging state.
pub struct AtomicStateStore {
    backend: Box<dyn StateBackend>,
    lock: ResourceLock,
}

impl std::fmt::Debug for AtomicStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicStateStore")
            .field("resource", &self.backend.resource_name())
            .finish()
    }
}

impl AtomicStateStore {
    /// Store over `backend`, locked together with every other store on the
    /// same resource name.
    pub fn new(backend: Box<dyn StateBackend>) -> Self {
        let lock = resource_lock(backend.resource_name());
        Self { backend, lock }
    }

    /// Resource name of the backend.
    pub fn resource_name(&self) -> &str {
        self.backend.resource_name()
    }

    /// Reads the persisted state without taking the lock.
    pub fn load(&self) -> Result<JudgingState, StoreError> {
        Ok(self.backend.load()?)
    }

    /// Runs `mutator` on the freshest persisted state while holding the
    /// resource lock.
    ///
    /// The result is persisted only when its content differs from what was
    /// loaded, or when the stored state has no metadata yet. Each persisted
    /// content change bumps `meta.version` by exactly one. A mutator error is
    /// returned as-is and nothing is written.
    pub fn update<F, E>(&self, mutator: F) -> Result<JudgingState, E>
    where
        F: FnOnce(JudgingState) -> Result<JudgingState, E>,
        E: From<StoreError>,
    {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let original = self.backend.load().map_err(StoreError::from)?;
        let before = content_snapshot(&original).map_err(StoreError::from)?;
        let original_meta = original.meta;

        let mut next = mutator(original)?;
        let after = content_snapshot(&next).map_err(StoreError::from)?;
        let content_changed = before != after;

        let meta = match original_meta {
            Some(meta) if !content_changed => {
                debug!(resource = self.resource_name(), version = meta.version, "state unchanged");
                next.meta = Some(meta);
                return Ok(next);
            }
            Some(meta) => StateMeta {
                version: meta.version + 1,
                updated_at: Some(now_secs()),
            },
            None => StateMeta {
                version: u64::from(content_changed),
                updated_at: Some(now_secs()),
            },
        };

        next.meta = Some(meta);
        self.backend.save(&next).map_err(StoreError::from)?;
        info!(resource = self.resource_name(), version = meta.version, "state persisted");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::memory::MemoryStateBackend;

    #[test]
    fn same_resource_name_shares_one_lock() {
        let a = resource_lock("judging.json");
        let b = resource_lock("judging.json");
        let c = resource_lock("other.json");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn dropped_stores_release_their_registry_entry() {
        let store = AtomicStateStore::new(Box::new(MemoryStateBackend::new()));
        let name = store.resource_name().to_string();
        let registered = |name: &str| {
            registry()
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains_key(name)
        };
        assert!(registered(&name));

        drop(store);
        // Any new lock prunes dead entries.
        let _other = resource_lock("prune-trigger");
        assert!(!registered(&name));
    }

    #[test]
    fn snapshot_ignores_meta() {
        let mut state = JudgingState::default();
        let bare = content_snapshot(&state).expect("snapshot");
        state.meta = Some(StateMeta {
            version: 9,
            updated_at: Some(1),
        });
        assert_eq!(content_snapshot(&state).expect("snapshot"), bare);
    }

    #[test]
    fn first_noop_only_initializes_meta() {
        let store = AtomicStateStore::new(Box::new(MemoryStateBackend::new()));
        let state = store
            .update(|s| Ok::<_, StoreError>(s))
            .expect("update");
        assert_eq!(state.meta.map(|m| m.version), Some(0));
        assert_eq!(store.load().expect("load").version(), 0);
    }
}
