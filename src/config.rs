//! Judging and scheduler configuration, loadable from TOML.

use std::path::Path;

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::JudgeId;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    /// Config file is not valid TOML for [`Config`].
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Parsed values violate a constraint.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// One scoring category shared by the slider sanitizer and the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySpec {
    /// Key used in slider submissions.
    pub key: String,
    /// Human-readable label for breakdown text.
    pub label: String,
    /// Points available in this category.
    pub max: u32,
}

impl CategorySpec {
    /// Builds a category spec.
    pub fn new(key: &str, label: &str, max: u32) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            max,
        }
    }

    /// Value used when a slider is missing or unreadable.
    pub fn midpoint(&self) -> u32 {
        self.max / 2
    }
}

/// Judge panel shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgingConfig {
    /// Number of judge slots; a match is complete when all are filled.
    pub judge_count: u32,
    /// Ordered scoring categories.
    pub categories: Vec<CategorySpec>,
}

impl Default for JudgingConfig {
    fn default() -> Self {
        Self {
            judge_count: 3,
            categories: vec![
                CategorySpec::new("damage", "Damage", 8),
                CategorySpec::new("aggression", "Aggression", 5),
                CategorySpec::new("control", "Control", 6),
            ],
        }
    }
}

impl JudgingConfig {
    /// Judge slot ids in order.
    pub fn judge_ids(&self) -> impl Iterator<Item = JudgeId> + use<> {
        1..=self.judge_count
    }

    /// True when `judge_id` names a configured slot.
    pub fn is_judge(&self, judge_id: JudgeId) -> bool {
        (1..=self.judge_count).contains(&judge_id)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.judge_count == 0 {
            return Err(ConfigError::Invalid("judge_count must be at least 1".to_string()));
        }
        if self.categories.is_empty() {
            return Err(ConfigError::Invalid("at least one category is required".to_string()));
        }
        let mut seen = HashSet::new();
        for spec in &self.categories {
            if spec.max == 0 {
                return Err(ConfigError::Invalid(format!("category {} has max 0", spec.key)));
            }
            if !seen.insert(spec.key.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate category {}", spec.key)));
            }
        }
        Ok(())
    }
}

/// Tunables for the pairing search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Two appearances of one contestant must be more than this many cards apart.
    pub cooldown: usize,
    /// Upper bound on search restarts.
    pub max_restarts: usize,
    /// Placement budget multiplier per eligible pair.
    pub step_budget_per_pair: usize,
    /// Hard cap on placements within one restart.
    pub max_steps_per_restart: usize,
    /// Break ties between equally constrained pairs by rating difference.
    pub prefer_close_ratings: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cooldown: 3,
            max_restarts: 8,
            step_budget_per_pair: 4,
            max_steps_per_restart: 200_000,
            prefer_close_ratings: false,
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Judge panel settings.
    pub judging: JudgingConfig,
    /// Scheduler settings.
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Parses and validates a TOML document. Missing keys take defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw)?;
        config.judging.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_toml_str("").expect("parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.judging.judge_ids().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [scheduler]
            cooldown = 1

            [judging]
            judge_count = 5
            "#,
        )
        .expect("parse");
        assert_eq!(config.scheduler.cooldown, 1);
        assert_eq!(config.scheduler.max_restarts, 8);
        assert_eq!(config.judging.judge_count, 5);
        assert_eq!(config.judging.categories.len(), 3);
    }

    #[test]
    fn duplicate_category_is_rejected() {
        let err = Config::from_toml_str(
            r#"
            [[judging.categories]]
            key = "damage"
            label = "Damage"
            max = 8

            [[judging.categories]]
            key = "damage"
            label = "Damage again"
            max = 4
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_reads_toml_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("matchcard.toml");
        std::fs::write(&path, "[scheduler]\nprefer_close_ratings = true\n").expect("write");
        let config = Config::load(&path).expect("load");
        assert!(config.scheduler.prefer_close_ratings);
        assert!(matches!(Config::load(dir.path().join("missing.toml")), Err(ConfigError::Io(_))));
    }

    #[test]
    fn zero_judges_is_rejected() {
        let err = Config::from_toml_str("[judging]\njudge_count = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
