//! Shared primitive IDs and small enums.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Weight class name; scheduling and history are scoped to one class.
pub type WeightClass = String;
/// Judge slot identifier, `1..=judge_count`.
pub type JudgeId = u32;
/// Caller-opaque match identifier.
pub type MatchId = String;
/// Seconds since the Unix epoch.
pub type UnixSecs = u64;

/// Corner of the arena, or a draw when used as an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Red corner.
    Red,
    /// White corner.
    White,
    /// Neither side ahead.
    #[default]
    Draw,
}

impl Side {
    /// Compares two point totals.
    pub fn from_totals(red: u32, white: u32) -> Self {
        match red.cmp(&white) {
            std::cmp::Ordering::Greater => Side::Red,
            std::cmp::Ordering::Less => Side::White,
            std::cmp::Ordering::Equal => Side::Draw,
        }
    }
}

pub(crate) fn now_secs() -> UnixSecs {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
