//! State mutators for judge submissions. Run them inside
//! [`crate::core::store::AtomicStateStore::update`] so checks and writes
//! happen under the state lock.

use thiserror::Error;

use crate::{
    config::JudgingConfig,
    core::store::StoreError,
    schedule::card::ScheduledCard,
    types::{JudgeId, MatchId, UnixSecs},
};

use super::{
    model::JudgingState,
    score::{RawSliders, score_judge},
    sync::{normalize_match, reconcile},
};

/// Reasons a submission was not applied.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The judging slot is empty.
    #[error("no active match")]
    NoActiveMatch,
    /// The submission targeted a match that is no longer current.
    #[error("match has changed: expected {expected}, current is {current}")]
    Conflict {
        /// Match id the judge was scoring.
        expected: MatchId,
        /// Match id actually current.
        current: MatchId,
    },
    /// Judge id outside the configured panel.
    #[error("unknown judge {0}")]
    UnknownJudge(JudgeId),
    /// Blank judge name.
    #[error("judge name required")]
    MissingJudgeName,
    /// No archived match carries this id.
    #[error("match {0} not found in history")]
    MatchNotFound(MatchId),
    /// Loading or persisting the state failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A judge's scorecard submission for the current match.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeSubmission {
    /// Judge slot.
    pub judge_id: JudgeId,
    /// Raw slider values.
    pub sliders: RawSliders,
    /// Judge's typed name.
    pub judge_name: String,
    /// Match the judge was looking at, if known.
    pub expected_match_id: Option<MatchId>,
}

fn check_judge(config: &JudgingConfig, judge_id: JudgeId, judge_name: &str) -> Result<(), SubmitError> {
    if !config.is_judge(judge_id) {
        return Err(SubmitError::UnknownJudge(judge_id));
    }
    if judge_name.trim().is_empty() {
        return Err(SubmitError::MissingJudgeName);
    }
    Ok(())
}

/// Reconciles against `schedule`, then stores the scorecard on the current match.
pub fn submit_judge_score(
    config: &JudgingConfig,
    state: JudgingState,
    schedule: &[ScheduledCard],
    submission: &JudgeSubmission,
    now: UnixSecs,
) -> Result<JudgingState, SubmitError> {
    check_judge(config, submission.judge_id, &submission.judge_name)?;

    let (mut state, _) = reconcile(config, state, schedule, now);
    let current = state.current.take().ok_or(SubmitError::NoActiveMatch)?;

    if let Some(expected) = &submission.expected_match_id {
        if !expected.is_empty() && *expected != current.match_id {
            return Err(SubmitError::Conflict {
                expected: expected.clone(),
                current: current.match_id,
            });
        }
    }

    let mut current = current;
    let card = score_judge(
        config,
        submission.judge_id,
        &submission.sliders,
        &submission.judge_name,
        now,
    );
    current.judges.insert(submission.judge_id, card);
    let (current, _) = normalize_match(config, current);
    state.current = Some(current);
    Ok(state)
}

/// Overwrites one judge slot on an archived match.
pub fn amend_history_score(
    config: &JudgingConfig,
    mut state: JudgingState,
    match_id: &str,
    judge_id: JudgeId,
    sliders: &RawSliders,
    judge_name: &str,
    now: UnixSecs,
) -> Result<JudgingState, SubmitError> {
    if !config.is_judge(judge_id) {
        return Err(SubmitError::UnknownJudge(judge_id));
    }
    let entry = state
        .history_entry_mut(match_id)
        .ok_or_else(|| SubmitError::MatchNotFound(match_id.to_string()))?;

    entry
        .judges
        .insert(judge_id, score_judge(config, judge_id, sliders, judge_name, now));
    let (normalized, _) = normalize_match(config, entry.clone());
    *entry = normalized;
    Ok(state)
}
