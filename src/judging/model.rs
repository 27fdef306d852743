//! Typed judging records, persisted as JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{JudgeId, MatchId, Side, UnixSecs};

/// Points one judge gave each corner in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScore {
    /// Category label at scoring time.
    pub label: String,
    /// Category maximum at scoring time.
    pub max: u32,
    /// Red corner points.
    pub red: u32,
    /// White corner points.
    pub white: u32,
}

/// Per-corner point totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Totals {
    /// Red corner total.
    pub red: u32,
    /// White corner total.
    pub white: u32,
}

/// One judge's scorecard. Derived fields are recomputed from `sliders`
/// whenever a record is normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeRecord {
    /// Judge slot.
    pub judge_id: JudgeId,
    /// Name typed by the judge.
    #[serde(default)]
    pub judge_name: String,
    /// Submission time.
    #[serde(default)]
    pub submitted_at: UnixSecs,
    /// Sanitized slider values; the red share of each category.
    #[serde(default)]
    pub sliders: BTreeMap<String, u32>,
    /// Per-category point split.
    #[serde(default)]
    pub scores: BTreeMap<String, CategoryScore>,
    /// Summed points.
    #[serde(default)]
    pub totals: Totals,
    /// Side with more points.
    #[serde(default)]
    pub winner: Side,
    /// `"<red>-<white>"`.
    #[serde(default)]
    pub scoreline: String,
    /// `"Damage 5-3 · Aggression ..."`.
    #[serde(default)]
    pub breakdown: String,
}

/// How the judges agreed on the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Decision {
    /// Every judge picked the winner.
    #[serde(rename = "unanimous decision")]
    Unanimous,
    /// Winner plus drawing judges account for the whole panel.
    #[serde(rename = "majority decision")]
    Majority,
    /// Complete panel without unanimity or majority.
    #[serde(rename = "split decision")]
    Split,
    /// Leader exists but not every judge has scored.
    #[serde(rename = "decision")]
    Pending,
    /// Tied judge tally.
    #[default]
    #[serde(rename = "draw")]
    Draw,
}

impl Decision {
    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Unanimous => "unanimous decision",
            Decision::Majority => "majority decision",
            Decision::Split => "split decision",
            Decision::Pending => "decision",
            Decision::Draw => "draw",
        }
    }
}

/// Tally of judge-level winners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WinnerCounts {
    /// Judges scoring red ahead.
    pub red: u32,
    /// Judges scoring white ahead.
    pub white: u32,
    /// Judges scoring even.
    pub draw: u32,
}

impl WinnerCounts {
    /// Count for one side.
    pub fn of(&self, side: Side) -> u32 {
        match side {
            Side::Red => self.red,
            Side::White => self.white,
            Side::Draw => self.draw,
        }
    }

    pub(crate) fn add(&mut self, side: Side) {
        match side {
            Side::Red => self.red += 1,
            Side::White => self.white += 1,
            Side::Draw => self.draw += 1,
        }
    }
}

/// Derived outcome of a match; never edited by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MatchSummary {
    /// Judge winner tally.
    pub counts: WinnerCounts,
    /// Overall winner by judge count.
    pub winner: Side,
    /// Winning contestant, if any.
    pub winner_name: Option<String>,
    /// Agreement label.
    pub decision: Decision,
    /// `"Judge 1: Red 10-9 White"` per submitted judge.
    pub scorecard_strings: Vec<String>,
    /// Judge slots still missing.
    pub pending_judges: Vec<JudgeId>,
    /// All judge slots filled.
    pub is_complete: bool,
    /// Human-readable composite line.
    pub headline: String,
}

/// One match, active or archived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Opaque unique id; filled in on normalization when missing.
    #[serde(default)]
    pub match_id: MatchId,
    /// Weight class of the fight.
    #[serde(default)]
    pub weight_class: String,
    /// Red corner contestant.
    #[serde(default)]
    pub red: String,
    /// White corner contestant.
    #[serde(default)]
    pub white: String,
    /// Time the record became current.
    #[serde(default)]
    pub created_at: UnixSecs,
    /// Time the record was archived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<UnixSecs>,
    /// Scorecards by judge slot.
    #[serde(default)]
    pub judges: BTreeMap<JudgeId, JudgeRecord>,
    /// Derived summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<MatchSummary>,
}

impl MatchRecord {
    /// Fresh record for a fight with no scores yet.
    pub fn new(match_id: MatchId, weight_class: &str, red: &str, white: &str, created_at: UnixSecs) -> Self {
        Self {
            match_id,
            weight_class: weight_class.to_string(),
            red: red.to_string(),
            white: white.to_string(),
            created_at,
            completed_at: None,
            judges: BTreeMap::new(),
            summary: None,
        }
    }

    /// True when the stored summary says every judge has scored.
    pub fn is_complete(&self) -> bool {
        self.summary.as_ref().is_some_and(|s| s.is_complete)
    }
}

/// Version metadata maintained by the state store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StateMeta {
    /// Bumped once per persisted content change.
    pub version: u64,
    /// Time of the last persisted change.
    pub updated_at: Option<UnixSecs>,
}

/// The shared judging record: at most one current match plus history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct JudgingState {
    /// Match receiving scores.
    #[serde(default)]
    pub current: Option<MatchRecord>,
    /// Archived matches, newest first.
    #[serde(default)]
    pub history: Vec<MatchRecord>,
    /// Store-managed metadata; absent until first persisted.
    #[serde(default, rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<StateMeta>,
}

impl JudgingState {
    /// Version seen by readers; 0 before anything was persisted.
    pub fn version(&self) -> u64 {
        self.meta.map_or(0, |m| m.version)
    }

    /// Finds an archived match.
    pub fn history_entry_mut(&mut self, match_id: &str) -> Option<&mut MatchRecord> {
        self.history.iter_mut().find(|m| m.match_id == match_id)
    }
}
