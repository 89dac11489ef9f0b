//! Core domain types for the Setlist system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercises and workout plans
//! - Sequence steps and captured set records
//! - Per-exercise targets
//! - Session phases, state and summaries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ============================================================================
// Exercise and Plan Types
// ============================================================================

/// An exercise from the user's library. `name` is the unique key.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub name: String,
    pub equipment: String,
    pub primary_muscle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_muscles: Option<String>,
    /// Number of sets; falls back to the configured `sets_per_superset`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sets: Option<u32>,
}

impl Exercise {
    pub fn new(
        name: impl Into<String>,
        equipment: impl Into<String>,
        primary_muscle: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            equipment: equipment.into(),
            primary_muscle: primary_muscle.into(),
            secondary_muscles: None,
            sets: None,
        }
    }

    pub fn with_sets(mut self, sets: u32) -> Self {
        self.sets = Some(sets);
        self
    }

    pub fn with_secondary(mut self, muscles: impl Into<String>) -> Self {
        self.secondary_muscles = Some(muscles.into());
        self
    }

    /// Secondary muscles split on commas, trimmed, empties dropped
    pub fn secondary_muscle_list(&self) -> Vec<&str> {
        self.secondary_muscles
            .as_deref()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Ordered exercises; `None` marks an unfilled placeholder slot
pub type WorkoutPlan = Vec<Option<Exercise>>;

/// Group sizes: each entry is the number of consecutive plan slots in one superset
pub type SupersetConfig = Vec<usize>;

// ============================================================================
// Sequence and Record Types
// ============================================================================

/// One "do this exercise, this set" step of a session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SequenceStep {
    pub exercise: Exercise,
    /// 1-based
    pub set_number: u32,
    pub total_sets: u32,
    /// Index of the non-empty superset group this step belongs to
    pub group: usize,
    /// Number of real exercises in that group
    pub group_size: usize,
}

/// A completed set as captured from the user
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetRecord {
    pub exercise_name: String,
    pub set_number: u32,
    pub weight: f64,
    pub reps: u32,
}

/// Persisted per-exercise targets
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseTargets {
    pub weight: Option<f64>,
    pub target_reps: Option<u32>,
}

// ============================================================================
// Session Types
// ============================================================================

/// Phase of a workout session
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Warmup,
    Exercise,
    Cooldown,
    Complete,
}

/// How the warm-up and cool-down phases were left
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PhaseFlags {
    pub warmup_completed: bool,
    pub warmup_skipped: bool,
    pub cooldown_completed: bool,
    pub cooldown_skipped: bool,
}

/// Mutable state of a running session; serializable as "resume" state
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionState {
    pub phase: Phase,
    pub current_step_index: usize,
    pub records: Vec<SetRecord>,
    pub elapsed_seconds: u64,
    #[serde(default)]
    pub flags: PhaseFlags,
    #[serde(default)]
    pub is_partial: bool,
    /// Plan as edited during the session
    #[serde(default)]
    pub plan: WorkoutPlan,
    /// Steps as edited during the session; extra sets and swaps included
    #[serde(default)]
    pub sequence: Vec<SequenceStep>,
}

/// A single set as stored in history
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetEntry {
    pub set: u32,
    pub weight: f64,
    pub reps: u32,
}

/// All sets of one exercise within a session summary
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ExerciseSets {
    pub sets: Vec<SetEntry>,
}

/// Finished session as appended to history
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub duration_seconds: u64,
    pub per_exercise: BTreeMap<String, ExerciseSets>,
    pub warmup_completed: bool,
    pub warmup_skipped: bool,
    pub cooldown_completed: bool,
    pub cooldown_skipped: bool,
    pub is_partial: bool,
}

// ============================================================================
// Input Sanitation
// ============================================================================

/// Clamp a weight to a finite, non-negative value
pub fn sanitize_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}

/// Clamp reps to a whole, non-negative count; anything below 1 becomes 0
pub fn sanitize_reps(reps: f64) -> u32 {
    if !reps.is_finite() || reps < 1.0 {
        return 0;
    }
    reps.trunc().min(u32::MAX as f64) as u32
}

/// Parse raw weight text, clamping anything unusable to 0
pub fn parse_weight(raw: &str) -> f64 {
    sanitize_weight(raw.trim().parse::<f64>().unwrap_or(0.0))
}

/// Parse raw reps text, clamping anything unusable to 0
pub fn parse_reps(raw: &str) -> u32 {
    sanitize_reps(raw.trim().parse::<f64>().unwrap_or(0.0))
}
