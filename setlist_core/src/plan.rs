//! Workout plan files and the built-in default plan.
//!
//! A plan file is TOML:
//!
//! ```toml
//! supersets = [1, 2]
//! sets_per_superset = 3   # optional
//!
//! [[slots]]
//! name = "Back Squat"
//! equipment = "barbell"
//! primary_muscle = "quads"
//! secondary_muscles = "glutes, hamstrings"
//! sets = 4
//!
//! [[slots]]               # no name: placeholder slot
//! ```

use crate::{Error, Exercise, Result, SupersetConfig, WorkoutPlan};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// A plan as handed to the session engine
#[derive(Clone, Debug, PartialEq)]
pub struct Plan {
    pub exercises: WorkoutPlan,
    pub supersets: SupersetConfig,
    /// Overrides the configured default when present
    pub sets_per_superset: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PlanFile {
    supersets: Vec<usize>,
    sets_per_superset: Option<u32>,
    #[serde(default)]
    slots: Vec<SlotEntry>,
}

#[derive(Debug, Deserialize)]
struct SlotEntry {
    name: Option<String>,
    #[serde(default)]
    equipment: String,
    #[serde(default)]
    primary_muscle: String,
    secondary_muscles: Option<String>,
    sets: Option<u32>,
}

impl SlotEntry {
    fn into_exercise(self) -> Option<Exercise> {
        Some(Exercise {
            name: self.name?,
            equipment: self.equipment,
            primary_muscle: self.primary_muscle,
            secondary_muscles: self.secondary_muscles,
            sets: self.sets,
        })
    }
}

/// Cached default plan - built once and reused
static DEFAULT_PLAN: Lazy<Plan> = Lazy::new(build_default_plan);

/// Get a reference to the built-in plan
pub fn default_plan() -> &'static Plan {
    &DEFAULT_PLAN
}

fn build_default_plan() -> Plan {
    Plan {
        exercises: vec![
            Some(
                Exercise::new("Back Squat", "barbell", "quads")
                    .with_secondary("glutes, hamstrings")
                    .with_sets(4),
            ),
            Some(Exercise::new("Bench Press", "barbell", "chest").with_secondary("triceps, front delts")),
            Some(Exercise::new("Bent-Over Row", "barbell", "upper back").with_secondary("biceps, rear delts")),
            Some(Exercise::new("Plank", "bodyweight", "core")),
        ],
        supersets: vec![1, 2, 1],
        sets_per_superset: None,
    }
}

impl Plan {
    /// Load and validate a plan file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let plan = Self::from_toml_str(&contents)?;
        tracing::info!("Loaded plan from {:?}", path);
        Ok(plan)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: PlanFile = toml::from_str(contents)?;
        let plan = Plan {
            exercises: file.slots.into_iter().map(SlotEntry::into_exercise).collect(),
            supersets: file.supersets,
            sets_per_superset: file.sets_per_superset,
        };
        plan.validate()?;
        Ok(plan)
    }

    /// Check names are present and unique
    ///
    /// Supersets that ask for more slots than the plan has are only reported:
    /// the sequence builder truncates them.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for exercise in self.exercises.iter().flatten() {
            if exercise.name.trim().is_empty() {
                return Err(Error::Plan("exercise name must not be empty".into()));
            }
            if !seen.insert(exercise.name.as_str()) {
                return Err(Error::Plan(format!(
                    "duplicate exercise name: {}",
                    exercise.name
                )));
            }
        }

        if self.sets_per_superset == Some(0) {
            return Err(Error::Plan("sets_per_superset must be at least 1".into()));
        }

        let requested: usize = self.supersets.iter().sum();
        if requested > self.exercises.len() {
            tracing::warn!(
                "Supersets cover {} slots but the plan has {}; trailing groups will be truncated",
                requested,
                self.exercises.len()
            );
        }

        Ok(())
    }

    /// Names of the real exercises, in plan order
    pub fn exercise_names(&self) -> Vec<&str> {
        self.exercises
            .iter()
            .flatten()
            .map(|e| e.name.as_str())
            .collect()
    }

    /// Effective default set count given the configured fallback
    pub fn sets_per_superset_or(&self, configured: u32) -> u32 {
        self.sets_per_superset.unwrap_or(configured)
    }
}
