//! Keeps the current match in step with the head of the schedule.

use std::collections::BTreeMap;

use tracing::info;
use uuid::Uuid;

use crate::{
    config::JudgingConfig,
    schedule::card::ScheduledCard,
    types::{MatchId, UnixSecs},
};

use super::{
    model::{JudgingState, MatchRecord},
    score::{rescore, summarize},
};

/// Fresh opaque match id.
pub fn new_match_id() -> MatchId {
    Uuid::new_v4().simple().to_string()
}

/// Builds an unscored match record for a card.
pub fn create_match_record(config: &JudgingConfig, card: &ScheduledCard, now: UnixSecs) -> MatchRecord {
    let mut record = MatchRecord::new(new_match_id(), &card.weight_class, &card.red, &card.white, now);
    record.summary = Some(summarize(config, &record));
    record
}

/// True when `record` is the fight described by `card`.
pub fn matches_card(record: &MatchRecord, card: &ScheduledCard) -> bool {
    card.same_fight(&record.weight_class, &record.red, &record.white)
}

/// Fills a missing id, re-derives every scorecard and recomputes the summary.
/// Returns the record and whether anything differed.
pub fn normalize_match(config: &JudgingConfig, record: MatchRecord) -> (MatchRecord, bool) {
    let mut next = record.clone();
    if next.match_id.trim().is_empty() {
        next.match_id = new_match_id();
    }

    next.judges = record
        .judges
        .iter()
        .map(|(&slot, card)| (slot, rescore(config, card, slot)))
        .collect::<BTreeMap<_, _>>();
    next.summary = Some(summarize(config, &next));

    let changed = next != record;
    (next, changed)
}

/// Normalizes history and points `current` at the schedule head.
///
/// Calling this twice with the same schedule reports `changed == false` the
/// second time.
pub fn reconcile(
    config: &JudgingConfig,
    state: JudgingState,
    schedule: &[ScheduledCard],
    now: UnixSecs,
) -> (JudgingState, bool) {
    let mut changed = false;
    let JudgingState { current, history, meta } = state;

    let history = history
        .into_iter()
        .map(|entry| {
            let (entry, entry_changed) = normalize_match(config, entry);
            changed |= entry_changed;
            entry
        })
        .collect();

    let current = match (schedule.first(), current) {
        (Some(head), Some(cur)) if matches_card(&cur, head) => {
            let (cur, cur_changed) = normalize_match(config, cur);
            changed |= cur_changed;
            Some(cur)
        }
        (Some(head), _) => {
            changed = true;
            Some(create_match_record(config, head, now))
        }
        (None, cur) => {
            changed |= cur.is_some();
            None
        }
    };

    (JudgingState { current, history, meta }, changed)
}

/// Archives the current match at the front of history, drops its card from
/// `schedule` and activates the next head.
///
/// Returns the archived record, or `None` when nothing was active.
pub fn finalize_current(
    config: &JudgingConfig,
    state: JudgingState,
    schedule: &mut Vec<ScheduledCard>,
    now: UnixSecs,
) -> (JudgingState, Option<MatchRecord>) {
    let JudgingState { current, mut history, meta } = state;
    let Some(mut done) = current else {
        return (JudgingState { current: None, history, meta }, None);
    };

    done.completed_at = Some(now);
    let (done, _) = normalize_match(config, done);

    if let Some(idx) = schedule.iter().position(|card| matches_card(&done, card)) {
        schedule.remove(idx);
    }

    info!(
        match_id = %done.match_id,
        headline = done.summary.as_ref().map_or("", |s| s.headline.as_str()),
        "match archived"
    );
    history.insert(0, done.clone());

    let (state, _) = reconcile(config, JudgingState { current: None, history, meta }, schedule, now);
    (state, Some(done))
}
