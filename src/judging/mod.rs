//! Judging session: records, scoring, schedule sync and submissions.

/// Typed match, scorecard and state records.
pub mod model;
/// Slider sanitizing, scorecards and summaries.
pub mod score;
/// Judge submission mutators.
pub mod submit;
/// Schedule reconciliation and finalization.
pub mod sync;
