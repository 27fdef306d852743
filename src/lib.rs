//! Tournament fight scheduling and multi-judge scoring.
//!
//! The scheduler pairs present contestants within each weight class, never
//! rematching robots that already met and keeping every robot rested between
//! fights. The judging side keeps one shared state (the current match plus
//! archived history) behind [`core::store::AtomicStateStore`], which serializes
//! every read-modify-write and versions each persisted change.
//!
//! # Examples
//!
//! Generating a schedule:
//! ```
//! use matchcard::{
//!     dataset::{ClassDataset, DatasetByClass, RobotInfo},
//!     generate_schedule,
//! };
//!
//! let mut dataset = DatasetByClass::new();
//! dataset.insert(
//!     "Antweights".to_string(),
//!     ClassDataset::default()
//!         .with_robot("A", RobotInfo::present())
//!         .with_robot("B", RobotInfo::present())
//!         .with_robot("C", RobotInfo::present())
//!         .with_robot("D", RobotInfo::present()),
//! );
//!
//! let cards = generate_schedule(1, &dataset, Some(7));
//! assert_eq!(cards.len(), 2);
//! ```
//!
//! Scoring through the store:
//! ```
//! use matchcard::{
//!     config::JudgingConfig,
//!     core::store::AtomicStateStore,
//!     judging::submit::JudgeSubmission,
//!     persist::memory::MemoryStateBackend,
//!     schedule::card::ScheduledCard,
//!     submit_judge_score,
//! };
//!
//! let config = JudgingConfig::default();
//! let store = AtomicStateStore::new(Box::new(MemoryStateBackend::new()));
//! let schedule = vec![ScheduledCard::new("Antweights", "Razer", "Chaos 2")];
//! let submission = JudgeSubmission {
//!     judge_id: 1,
//!     sliders: Default::default(),
//!     judge_name: "Ada".to_string(),
//!     expected_match_id: None,
//! };
//!
//! let state = store
//!     .update(|state| submit_judge_score(&config, state, &schedule, &submission, 0))
//!     .expect("submit");
//! assert_eq!(state.version(), 1);
//! assert_eq!(state.current.map(|m| m.judges.len()), Some(1));
//! ```
//!
//! Runtime usage with JSON files:
//! ```no_run
//! use matchcard::{
//!     core::store::AtomicStateStore,
//!     persist::json::{JsonScheduleFile, JsonStateFile},
//!     runtime::handle::{spawn_judging, RuntimeConfig},
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = AtomicStateStore::new(Box::new(JsonStateFile::new("judging.json")));
//! let schedule = Box::new(JsonScheduleFile::new("schedule.json"));
//! let handle = spawn_judging(store, schedule, RuntimeConfig::default());
//! let state = handle.state().await.expect("state");
//! println!("version {}", state.version());
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```
#![warn(missing_docs)]

/// TOML configuration for judging and scheduling.
pub mod config;
/// Name canonicalization, indices and the state store.
pub mod core;
/// Contestant presence, ratings and meeting history.
pub mod dataset;
/// Judging records, scoring and state transitions.
pub mod judging;
/// Persistence abstraction with JSON and in-memory implementations.
pub mod persist;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Fight cards and the pairing scheduler.
pub mod schedule;
/// Shared primitive types and enums.
pub mod types;

pub use crate::{
    core::{canon::canonicalize_name, store::AtomicStateStore},
    judging::{score::summarize, submit::submit_judge_score, sync::reconcile},
    persist::{
        ScheduleBackend, StateBackend,
        json::{JsonScheduleFile, JsonStateFile},
        memory::{MemoryScheduleBackend, MemoryStateBackend},
    },
    runtime::handle::{JudgingHandle, RuntimeConfig, spawn_judging},
    schedule::search::generate_schedule,
};
