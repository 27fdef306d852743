//! Command loop that serializes judging operations for async callers.
//!
//! Store and schedule I/O runs on the blocking pool; state changes are
//! broadcast as [`JudgingEvent`]s.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};

use crate::{
    config::{Config, JudgingConfig, SchedulerConfig},
    core::store::{AtomicStateStore, StoreError},
    dataset::DatasetByClass,
    judging::{
        model::{JudgingState, MatchRecord},
        score::RawSliders,
        submit::{JudgeSubmission, SubmitError, amend_history_score, submit_judge_score},
        sync::{finalize_current, reconcile},
    },
    persist::{PersistError, ScheduleBackend},
    schedule::{card::ScheduledCard, search::PairingScheduler},
    types::{JudgeId, MatchId, now_secs},
};

use super::events::JudgingEvent;

/// Failure of a runtime command.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The judging operation was rejected.
    #[error(transparent)]
    Submit(#[from] SubmitError),
    /// The state store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The schedule backend failed.
    #[error(transparent)]
    Persist(#[from] PersistError),
    /// The command loop is no longer running.
    #[error("judging runtime has stopped")]
    ChannelClosed,
    /// A blocking task panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Join(String),
}

/// Settings for [`spawn_judging`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Scoring categories and panel.
    pub judging: JudgingConfig,
    /// Pairing search settings.
    pub scheduler: SchedulerConfig,
    /// Pending commands before callers wait.
    pub command_queue_bound: usize,
    /// Events a slow subscriber may fall behind by.
    pub event_capacity: usize,
    /// Archive a match as soon as its last scorecard arrives.
    pub auto_finalize: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            judging: JudgingConfig::default(),
            scheduler: SchedulerConfig::default(),
            command_queue_bound: 64,
            event_capacity: 256,
            auto_finalize: true,
        }
    }
}

impl From<Config> for RuntimeConfig {
    fn from(config: Config) -> Self {
        Self {
            judging: config.judging,
            scheduler: config.scheduler,
            ..Self::default()
        }
    }
}

/// Cloneable handle to a running judging loop.
#[derive(Clone)]
pub struct JudgingHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<JudgingEvent>,
}

type Reply<T> = oneshot::Sender<Result<T, RuntimeError>>;

enum Command {
    State {
        resp: Reply<JudgingState>,
    },
    Schedule {
        resp: Reply<Vec<ScheduledCard>>,
    },
    SetSchedule {
        cards: Vec<ScheduledCard>,
        resp: Reply<JudgingState>,
    },
    Generate {
        desired_per_robot: u32,
        dataset: DatasetByClass,
        seed: Option<u64>,
        resp: Reply<Vec<ScheduledCard>>,
    },
    Submit {
        submission: JudgeSubmission,
        resp: Reply<JudgingState>,
    },
    Amend {
        match_id: MatchId,
        judge_id: JudgeId,
        sliders: RawSliders,
        judge_name: String,
        resp: Reply<JudgingState>,
    },
    Finalize {
        resp: Reply<Option<MatchRecord>>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

/// Blocking collaborators shared with `spawn_blocking` tasks.
struct Shared {
    store: AtomicStateStore,
    schedule: Box<dyn ScheduleBackend>,
    scheduler: PairingScheduler,
    judging: JudgingConfig,
    auto_finalize: bool,
}

struct Submitted {
    match_id: MatchId,
    state: JudgingState,
    archived: Option<MatchRecord>,
}

impl Shared {
    /// Commits the reconciled state before the new schedule is saved, so a
    /// failed state write leaves the old schedule in place.
    fn replace_schedule(&self, cards: &[ScheduledCard]) -> Result<JudgingState, RuntimeError> {
        let state = self
            .store
            .update(|state| Ok::<_, StoreError>(reconcile(&self.judging, state, cards, now_secs()).0))?;
        self.schedule.save_schedule(cards)?;
        Ok(state)
    }

    fn submit(&self, submission: &JudgeSubmission) -> Result<Submitted, RuntimeError> {
        let schedule = self.schedule.load_schedule()?;
        let state = self
            .store
            .update(|state| submit_judge_score(&self.judging, state, &schedule, submission, now_secs()))?;

        let Some(current) = state.current.as_ref() else {
            return Err(SubmitError::NoActiveMatch.into());
        };
        let match_id = current.match_id.clone();
        if !(self.auto_finalize && current.is_complete()) {
            return Ok(Submitted {
                match_id,
                state,
                archived: None,
            });
        }

        let (state, archived) = self.finalize(Some(&match_id))?;
        Ok(Submitted {
            match_id,
            state,
            archived,
        })
    }

    /// Archives the current match. With `only`, nothing happens unless that
    /// match is still current and complete.
    ///
    /// The archived state is committed first and the shortened schedule is
    /// saved after it. If that second write fails the error is returned, but
    /// the history entry is already durable.
    fn finalize(&self, only: Option<&str>) -> Result<(JudgingState, Option<MatchRecord>), RuntimeError> {
        let mut schedule = self.schedule.load_schedule()?;
        let mut archived = None;
        let state = self.store.update(|state| {
            if let Some(id) = only {
                let ready = state
                    .current
                    .as_ref()
                    .is_some_and(|cur| cur.match_id == id && cur.is_complete());
                if !ready {
                    return Ok::<_, StoreError>(state);
                }
            }
            let (state, done) = finalize_current(&self.judging, state, &mut schedule, now_secs());
            archived = done;
            Ok(state)
        })?;
        if archived.is_some() {
            self.schedule.save_schedule(&schedule)?;
        }
        Ok((state, archived))
    }
}

async fn blocking<T, F>(shared: &Arc<Shared>, work: F) -> Result<T, RuntimeError>
where
    T: Send + 'static,
    F: FnOnce(&Shared) -> Result<T, RuntimeError> + Send + 'static,
{
    let shared = Arc::clone(shared);
    tokio::task::spawn_blocking(move || work(&shared))
        .await
        .map_err(|e| RuntimeError::Join(e.to_string()))?
}

/// Last match id and version announced on the event stream.
#[derive(Default)]
struct Announced {
    match_id: Option<MatchId>,
    version: Option<u64>,
}

impl Announced {
    fn observe(&mut self, state: &JudgingState, events_tx: &broadcast::Sender<JudgingEvent>) {
        let current = state.current.as_ref().map(|m| m.match_id.clone());
        if let Some(match_id) = current.as_ref().filter(|id| self.match_id.as_ref() != Some(*id)) {
            let _ = events_tx.send(JudgingEvent::MatchActivated {
                match_id: match_id.clone(),
            });
        }
        self.match_id = current;

        let version = state.version();
        if self.version != Some(version) {
            let _ = events_tx.send(JudgingEvent::StateVersion { version });
            self.version = Some(version);
        }
    }
}

fn announce_archived(archived: Option<&MatchRecord>, events_tx: &broadcast::Sender<JudgingEvent>) {
    if let Some(done) = archived {
        let headline = done.summary.as_ref().map(|s| s.headline.clone()).unwrap_or_default();
        let _ = events_tx.send(JudgingEvent::MatchCompleted {
            match_id: done.match_id.clone(),
            headline,
        });
    }
}

/// Starts the judging command loop on the current tokio runtime.
pub fn spawn_judging(
    store: AtomicStateStore,
    schedule: Box<dyn ScheduleBackend>,
    config: RuntimeConfig,
) -> JudgingHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound.max(1));
    let (events_tx, _) = broadcast::channel::<JudgingEvent>(config.event_capacity.max(1));

    let shared = Arc::new(Shared {
        store,
        schedule,
        scheduler: PairingScheduler::new(config.scheduler),
        judging: config.judging,
        auto_finalize: config.auto_finalize,
    });
    let events_tx_loop = events_tx.clone();

    tokio::spawn(async move {
        let mut announced = Announced::default();
        while let Some(cmd) = cmd_rx.recv().await {
            if handle_command(cmd, &shared, &events_tx_loop, &mut announced).await {
                break;
            }
        }
        debug!("judging loop stopped");
    });

    JudgingHandle { cmd_tx, events_tx }
}

impl JudgingHandle {
    /// Receiver for events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<JudgingEvent> {
        self.events_tx.subscribe()
    }

    async fn call<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Latest persisted state, read without the store lock.
    pub async fn state(&self) -> Result<JudgingState, RuntimeError> {
        self.call(|resp| Command::State { resp }).await
    }

    /// Remaining fight schedule.
    pub async fn schedule(&self) -> Result<Vec<ScheduledCard>, RuntimeError> {
        self.call(|resp| Command::Schedule { resp }).await
    }

    /// Replaces the schedule and reconciles the judging slot against it.
    pub async fn set_schedule(&self, cards: Vec<ScheduledCard>) -> Result<JudgingState, RuntimeError> {
        self.call(|resp| Command::SetSchedule { cards, resp }).await
    }

    /// Generates a schedule from `dataset` and installs it as with
    /// [`JudgingHandle::set_schedule`].
    pub async fn generate_schedule(
        &self,
        desired_per_robot: u32,
        dataset: DatasetByClass,
        seed: Option<u64>,
    ) -> Result<Vec<ScheduledCard>, RuntimeError> {
        self.call(|resp| Command::Generate {
            desired_per_robot,
            dataset,
            seed,
            resp,
        })
        .await
    }

    /// Records a scorecard. Returns the state after any automatic finalization.
    pub async fn submit(&self, submission: JudgeSubmission) -> Result<JudgingState, RuntimeError> {
        self.call(|resp| Command::Submit { submission, resp }).await
    }

    /// Rescores one judge on an archived match.
    pub async fn amend(
        &self,
        match_id: impl Into<MatchId>,
        judge_id: JudgeId,
        sliders: RawSliders,
        judge_name: impl Into<String>,
    ) -> Result<JudgingState, RuntimeError> {
        let match_id = match_id.into();
        let judge_name = judge_name.into();
        self.call(|resp| Command::Amend {
            match_id,
            judge_id,
            sliders,
            judge_name,
            resp,
        })
        .await
    }

    /// Archives the current match, complete or not.
    pub async fn finalize(&self) -> Result<Option<MatchRecord>, RuntimeError> {
        self.call(|resp| Command::Finalize { resp }).await
    }

    /// Stops the loop after commands already queued.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Shutdown { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }
}

async fn handle_command(
    cmd: Command,
    shared: &Arc<Shared>,
    events_tx: &broadcast::Sender<JudgingEvent>,
    announced: &mut Announced,
) -> bool {
    match cmd {
        Command::State { resp } => {
            let res = blocking(shared, |s| Ok(s.store.load()?)).await;
            let _ = resp.send(res);
        }
        Command::Schedule { resp } => {
            let res = blocking(shared, |s| Ok(s.schedule.load_schedule()?)).await;
            let _ = resp.send(res);
        }
        Command::SetSchedule { cards, resp } => {
            let count = cards.len();
            let res = blocking(shared, move |s| s.replace_schedule(&cards)).await;
            if let Ok(state) = &res {
                let _ = events_tx.send(JudgingEvent::ScheduleReplaced { cards: count });
                announced.observe(state, events_tx);
            }
            let _ = resp.send(res);
        }
        Command::Generate {
            desired_per_robot,
            dataset,
            seed,
            resp,
        } => {
            let res = blocking(shared, move |s| {
                let cards = s.scheduler.generate(desired_per_robot, &dataset, seed);
                let state = s.replace_schedule(&cards)?;
                Ok((cards, state))
            })
            .await;
            let res = res.map(|(cards, state)| {
                info!(cards = cards.len(), "generated schedule installed");
                let _ = events_tx.send(JudgingEvent::ScheduleReplaced { cards: cards.len() });
                announced.observe(&state, events_tx);
                cards
            });
            let _ = resp.send(res);
        }
        Command::Submit { submission, resp } => {
            let judge_id = submission.judge_id;
            let res = blocking(shared, move |s| s.submit(&submission)).await;
            let res = res.map(|done| {
                let _ = events_tx.send(JudgingEvent::ScoreRecorded {
                    match_id: done.match_id,
                    judge_id,
                });
                announce_archived(done.archived.as_ref(), events_tx);
                announced.observe(&done.state, events_tx);
                done.state
            });
            let _ = resp.send(res);
        }
        Command::Amend {
            match_id,
            judge_id,
            sliders,
            judge_name,
            resp,
        } => {
            let scored = match_id.clone();
            let res = blocking(shared, move |s| {
                let state = s.store.update(|state| {
                    amend_history_score(&s.judging, state, &match_id, judge_id, &sliders, &judge_name, now_secs())
                })?;
                Ok(state)
            })
            .await;
            if let Ok(state) = &res {
                let _ = events_tx.send(JudgingEvent::ScoreRecorded {
                    match_id: scored,
                    judge_id,
                });
                announced.observe(state, events_tx);
            }
            let _ = resp.send(res);
        }
        Command::Finalize { resp } => {
            let res = blocking(shared, |s| s.finalize(None)).await;
            let res = res.map(|(state, archived)| {
                announce_archived(archived.as_ref(), events_tx);
                announced.observe(&state, events_tx);
                archived
            });
            let _ = resp.send(res);
        }
        Command::Shutdown { resp } => {
            let _ = resp.send(());
            return true;
        }
    }

    false
}
