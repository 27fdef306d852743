//! Runtime event stream payloads.

use crate::types::{JudgeId, MatchId};

/// Events emitted from the judging command loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JudgingEvent {
    /// The fight schedule was replaced.
    ScheduleReplaced {
        /// Number of cards now scheduled.
        cards: usize,
    },
    /// A new match occupies the judging slot.
    MatchActivated {
        /// Newly active match id.
        match_id: MatchId,
    },
    /// A judge's scorecard was stored.
    ScoreRecorded {
        /// Scored match id.
        match_id: MatchId,
        /// Judge slot that submitted.
        judge_id: JudgeId,
    },
    /// A match was archived to history.
    MatchCompleted {
        /// Archived match id.
        match_id: MatchId,
        /// Final headline of the match.
        headline: String,
    },
    /// The persisted state reached this version.
    StateVersion {
        /// Current `meta.version`.
        version: u64,
    },
}
