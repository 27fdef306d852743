//! Lookup tables the pairing search builds once per dataset.

use std::collections::BTreeMap;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::{
    core::canon::NameCanonicalizer,
    dataset::DatasetByClass,
    types::WeightClass,
};

/// Classes with fewer present contestants than this are not schedulable.
pub const MIN_PRESENT: usize = 2;

/// Unordered contestant pair within one weight class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    /// Class both contestants fight in.
    pub weight_class: WeightClass,
    /// Lexically smaller name.
    pub low: String,
    /// Lexically larger name.
    pub high: String,
}

impl PairKey {
    /// Key for `a` and `b` in either order.
    pub fn new(weight_class: &str, a: &str, b: &str) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self {
            weight_class: weight_class.to_string(),
            low: low.to_string(),
            high: high.to_string(),
        }
    }
}

/// Present contestants per schedulable weight class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceIndex {
    by_class: BTreeMap<WeightClass, Vec<String>>,
}

impl PresenceIndex {
    /// Keeps classes with at least [`MIN_PRESENT`] present contestants.
    pub fn from_dataset(dataset: &DatasetByClass) -> Self {
        let by_class = dataset
            .iter()
            .filter_map(|(wc, class)| {
                let present = class.present_names();
                (present.len() >= MIN_PRESENT).then(|| (wc.clone(), present))
            })
            .collect();
        Self { by_class }
    }

    /// True when no class can be scheduled.
    pub fn is_empty(&self) -> bool {
        self.by_class.is_empty()
    }

    /// Schedulable classes in name order.
    pub fn classes(&self) -> impl Iterator<Item = (&WeightClass, &Vec<String>)> {
        self.by_class.iter()
    }

    /// Present contestants of `weight_class`; empty if it is not schedulable.
    pub fn present(&self, weight_class: &str) -> &[String] {
        self.by_class
            .get(weight_class)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Count of completed meetings per canonical pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryPairIndex {
    counts: HashMap<PairKey, u32>,
}

impl HistoryPairIndex {
    /// Canonicalizes both corners of every history entry against its class roster.
    pub fn from_dataset(dataset: &DatasetByClass) -> Self {
        let mut counts: HashMap<PairKey, u32> = HashMap::new();
        for (wc, class) in dataset {
            let canon = NameCanonicalizer::new(class.robots.keys());
            for entry in &class.history {
                let red = canon.canonicalize(&entry.red_corner);
                let white = canon.canonicalize(&entry.white_corner);
                if red.is_empty() || white.is_empty() {
                    continue;
                }
                *counts.entry(PairKey::new(wc, &red, &white)).or_insert(0) += 1;
            }
        }
        Self { counts }
    }

    /// Number of recorded meetings for `key`.
    pub fn count(&self, key: &PairKey) -> u32 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Whether `a` and `b` have already fought in `weight_class`.
    pub fn has_met(&self, weight_class: &str, a: &str, b: &str) -> bool {
        self.count(&PairKey::new(weight_class, a, b)) > 0
    }

    /// Number of distinct pairs that have met.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// True when no pair has met.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
