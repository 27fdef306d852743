//! Fight-card types and the pairing scheduler.

/// Scheduled card and persisted schedule document.
pub mod card;
/// Backtracking pairing search.
pub mod search;
