use serde::{Deserialize, Serialize};

use crate::{core::indices::PairKey, types::WeightClass};

/// One scheduled pairing with corners assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduledCard {
    /// Weight class of both contestants.
    pub weight_class: WeightClass,
    /// Red corner contestant.
    pub red: String,
    /// White corner contestant.
    pub white: String,
}

impl ScheduledCard {
    /// Builds a card.
    pub fn new(weight_class: &str, red: &str, white: &str) -> Self {
        Self {
            weight_class: weight_class.to_string(),
            red: red.to_string(),
            white: white.to_string(),
        }
    }

    /// Corner-independent pair key.
    pub fn pair_key(&self) -> PairKey {
        PairKey::new(&self.weight_class, &self.red, &self.white)
    }

    /// Loose identity used to line matches up with cards: trimmed and case-insensitive.
    pub fn same_fight(&self, weight_class: &str, red: &str, white: &str) -> bool {
        loose_eq(&self.weight_class, weight_class) && loose_eq(&self.red, red) && loose_eq(&self.white, white)
    }
}

fn loose_eq(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Persisted schedule document, `{"list": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ScheduleDocument {
    /// Cards in fight order; the head is the next fight.
    #[serde(default)]
    pub list: Vec<ScheduledCard>,
}

impl From<Vec<ScheduledCard>> for ScheduleDocument {
    fn from(list: Vec<ScheduledCard>) -> Self {
        Self { list }
    }
}
