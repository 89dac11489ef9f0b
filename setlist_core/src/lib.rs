#![forbid(unsafe_code)]

//! Core domain model and business logic for the Setlist workout engine.
//!
//! This crate provides:
//! - Domain types (exercises, steps, set records, summaries)
//! - Sequence building and rest scheduling for supersets
//! - Progressive overload suggestions
//! - Target update rules
//! - The session state machine
//! - Persistence (targets, history) and configuration

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod plan;
pub mod sequence;
pub mod rest;
pub mod overload;
pub mod rules;
pub mod store;
pub mod history;
pub mod timer;
pub mod session;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::{Config, SessionConfig};
pub use plan::{default_plan, Plan};
pub use sequence::build_sequence;
pub use rest::{rest_indices_for_steps, rest_round_end_indices, RestRoundEndIndices};
pub use overload::{advise, OverloadCategory, OverloadSuggestion};
pub use rules::{apply_target_updates, evaluate_target_updates, TargetUpdate};
pub use store::{FileStore, MemoryStore, TargetStore};
pub use history::{export_csv, last_performance, LastPerformance};
pub use timer::{ElapsedClock, RestTimer};
pub use session::{SetOutcome, WorkoutSession};
