use std::{
    sync::{Arc, Barrier},
    thread,
};

use tempfile::tempdir;

use matchcard::{
    AtomicStateStore, JsonStateFile, StateBackend,
    config::JudgingConfig,
    core::store::StoreError,
    judging::{
        model::JudgingState,
        score::RawSliders,
        submit::{JudgeSubmission, SubmitError},
    },
    persist::{PersistError, PersistResult, json::read_json_or_default, memory::MemoryStateBackend},
    reconcile,
    schedule::card::ScheduledCard,
    submit_judge_score,
};

fn card() -> Vec<ScheduledCard> {
    vec![ScheduledCard::new("Featherweights", "Shunt", "Matilda")]
}

fn activate(state: JudgingState) -> Result<JudgingState, StoreError> {
    Ok(reconcile(&JudgingConfig::default(), state, &card(), 1).0)
}

#[test]
fn versions_bump_only_on_content_change() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("judging.json");
    let store = AtomicStateStore::new(Box::new(JsonStateFile::new(&path)));

    let first = store.update(activate).expect("activate");
    assert_eq!(first.version(), 1);

    let same = store.update(activate).expect("noop");
    assert_eq!(same.version(), 1);
    assert_eq!(store.load().expect("load").version(), 1);

    let cleared = store
        .update(|mut s| {
            s.current = None;
            Ok::<_, StoreError>(s)
        })
        .expect("clear");
    assert_eq!(cleared.version(), 2);

    let on_disk: JudgingState = read_json_or_default(&path).expect("read");
    assert_eq!(on_disk, cleared);
}

#[test]
fn mutator_error_writes_nothing() {
    let backend = MemoryStateBackend::new();
    let store = AtomicStateStore::new(Box::new(backend));
    store.update(activate).expect("activate");
    let before = store.load().expect("load");

    let err = store
        .update(|state| {
            submit_judge_score(
                &JudgingConfig::default(),
                state,
                &card(),
                &JudgeSubmission {
                    judge_id: 1,
                    sliders: RawSliders::new(),
                    judge_name: "Ada".to_string(),
                    expected_match_id: Some("stale".to_string()),
                },
                2,
            )
        })
        .expect_err("conflict");
    assert!(matches!(err, SubmitError::Conflict { .. }));
    assert_eq!(store.load().expect("load"), before);
}

#[test]
fn corrupt_file_is_set_aside_and_replaced() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("judging.json");
    std::fs::write(&path, b"{ not json").expect("seed corrupt file");

    let store = AtomicStateStore::new(Box::new(JsonStateFile::new(&path)));
    assert_eq!(store.load().expect("load"), JudgingState::default());

    let backups: Vec<_> = std::fs::read_dir(dir.path())
        .expect("read dir")
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with("judging.json.corrupt_"))
        .collect();
    assert_eq!(backups.len(), 1);
    assert_eq!(std::fs::read(backups[0].path()).expect("backup"), b"{ not json");

    let state = store.update(activate).expect("activate");
    assert_eq!(state.version(), 1);
    assert!(store.load().expect("reload").current.is_some());
}

#[test]
fn concurrent_writers_never_lose_a_version() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("judging.json");
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                // Separate store instances share the lock through the path.
                let store = AtomicStateStore::new(Box::new(JsonStateFile::new(path)));
                barrier.wait();
                store
                    .update(|mut state| {
                        let card = ScheduledCard::new("Antweights", &format!("bot-{i}"), "house");
                        let (next, _) = reconcile(&JudgingConfig::default(), state.clone(), &[card], 1);
                        state.history.push(next.current.expect("created"));
                        Ok::<_, StoreError>(state)
                    })
                    .expect("update");
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("join");
    }

    let store = AtomicStateStore::new(Box::new(JsonStateFile::new(&path)));
    let state = store.load().expect("load");
    assert_eq!(state.history.len(), threads);
    assert_eq!(state.version(), threads as u64);
}

#[test]
fn differently_spelled_paths_share_the_lock() {
    let dir = tempdir().expect("tempdir");
    let plain = dir.path().join("judging.json");
    let dotted = dir.path().join(".").join("judging.json");
    let threads = 8;
    let rounds = 10;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let path = if i % 2 == 0 { plain.clone() } else { dotted.clone() };
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let store = AtomicStateStore::new(Box::new(JsonStateFile::new(path)));
                barrier.wait();
                for round in 0..rounds {
                    store
                        .update(|mut state| {
                            let card = ScheduledCard::new("Antweights", &format!("bot-{i}-{round}"), "house");
                            let (next, _) = reconcile(&JudgingConfig::default(), state.clone(), &[card], 1);
                            state.history.push(next.current.expect("created"));
                            Ok::<_, StoreError>(state)
                        })
                        .expect("update");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("join");
    }

    let state = AtomicStateStore::new(Box::new(JsonStateFile::new(&plain)))
        .load()
        .expect("load");
    assert_eq!(state.history.len(), threads * rounds);
    assert_eq!(state.version(), (threads * rounds) as u64);
}

struct FailingBackend;

impl StateBackend for FailingBackend {
    fn resource_name(&self) -> &str {
        "failing"
    }

    fn load(&self) -> PersistResult<JudgingState> {
        Ok(JudgingState::default())
    }

    fn save(&self, _state: &JudgingState) -> PersistResult<()> {
        Err(PersistError::Message("disk full".to_string()))
    }
}

#[test]
fn save_failure_propagates() {
    let store = AtomicStateStore::new(Box::new(FailingBackend));
    let err = store.update(activate).expect_err("save fails");
    assert!(matches!(err, StoreError::Persist(PersistError::Message(_))));
}
