//! Per-weight-class roster and match history supplied by the caller.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::WeightClass;

/// Rating assumed for roster entries that carry none.
pub const DEFAULT_RATING: f64 = 1000.0;

fn default_rating() -> f64 {
    DEFAULT_RATING
}

/// Roster entry for one contestant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotInfo {
    /// Marked present for tonight's event.
    #[serde(default)]
    pub present: bool,
    /// Current rating, only used by the optional rating tie-break.
    #[serde(default = "default_rating")]
    pub rating: f64,
}

impl Default for RobotInfo {
    fn default() -> Self {
        Self {
            present: false,
            rating: DEFAULT_RATING,
        }
    }
}

impl RobotInfo {
    /// Present contestant at the default rating.
    pub fn present() -> Self {
        Self {
            present: true,
            ..Self::default()
        }
    }
}

/// One completed historical match, names as they were recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HistoryEntry {
    /// Recorded red corner name.
    #[serde(default)]
    pub red_corner: String,
    /// Recorded white corner name.
    #[serde(default)]
    pub white_corner: String,
}

impl HistoryEntry {
    /// Builds an entry from two corner names.
    pub fn new(red: &str, white: &str) -> Self {
        Self {
            red_corner: red.to_string(),
            white_corner: white.to_string(),
        }
    }
}

/// Roster plus history of one weight class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClassDataset {
    /// Contestants keyed by their canonical name.
    #[serde(default)]
    pub robots: BTreeMap<String, RobotInfo>,
    /// Completed matches, oldest first.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl ClassDataset {
    /// Adds or replaces a roster entry.
    pub fn with_robot(mut self, name: &str, info: RobotInfo) -> Self {
        self.robots.insert(name.to_string(), info);
        self
    }

    /// Appends a history entry.
    pub fn with_history(mut self, red: &str, white: &str) -> Self {
        self.history.push(HistoryEntry::new(red, white));
        self
    }

    /// Names flagged present, in sorted order.
    pub fn present_names(&self) -> Vec<String> {
        self.robots
            .iter()
            .filter(|(_, info)| info.present)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Scheduling input keyed by weight class.
pub type DatasetByClass = BTreeMap<WeightClass, ClassDataset>;
