//! Target update rules applied when a session (or part of one) is finished.
//!
//! For each exercise that has records:
//! - every set beat the stored target reps → new target reps = fewest reps done
//! - every set met the stored target reps → new target weight = last set's weight
//! - any set short of target → nothing is written for that exercise
//!
//! Evaluation is pure; [`apply_target_updates`] performs the writes.

use crate::{ExerciseTargets, SetRecord, TargetStore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Writes decided for one exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TargetUpdate {
    pub exercise: String,
    pub target_reps: Option<u32>,
    pub weight: Option<f64>,
}

/// Decide target writes for every exercise present in `records`
///
/// Updates come back in the order each exercise was first recorded.
pub fn evaluate_target_updates(
    records: &[SetRecord],
    initial_targets: &HashMap<String, ExerciseTargets>,
) -> Vec<TargetUpdate> {
    let mut order: Vec<&str> = Vec::new();
    let mut grouped: HashMap<&str, Vec<&SetRecord>> = HashMap::new();

    for record in records {
        let name = record.exercise_name.as_str();
        grouped
            .entry(name)
            .or_insert_with(|| {
                order.push(name);
                Vec::new()
            })
            .push(record);
    }

    let mut updates = Vec::new();

    for name in order {
        let sets = &grouped[name];
        if sets.is_empty() {
            continue;
        }

        let initial = initial_targets.get(name).cloned().unwrap_or_default();
        let current_target_reps = initial.target_reps.unwrap_or(0);

        let min_reps = sets.iter().map(|r| r.reps).min().unwrap_or(0);
        let all_met = sets.iter().all(|r| r.reps >= current_target_reps);
        let all_exceeded = sets.iter().all(|r| r.reps > current_target_reps);

        let target_reps = (all_exceeded && min_reps > 0).then_some(min_reps);

        let weight = if all_met {
            sets.last()
                .map(|r| r.weight)
                .filter(|w| w.is_finite() && *w >= 0.0)
                .filter(|w| initial.weight != Some(*w))
        } else {
            None
        };

        if target_reps.is_none() && weight.is_none() {
            tracing::debug!("No target changes for {}", name);
            continue;
        }

        updates.push(TargetUpdate {
            exercise: name.to_string(),
            target_reps,
            weight,
        });
    }

    updates
}

/// Write updates to the store one exercise at a time
///
/// `applied` remembers values already written this session so repeated calls
/// with the same decisions do not write again. Failed writes are logged and
/// skipped. Returns the number of successful writes.
pub fn apply_target_updates<S: TargetStore + ?Sized>(
    store: &mut S,
    updates: &[TargetUpdate],
    applied: &mut HashMap<String, ExerciseTargets>,
) -> usize {
    let mut writes = 0;

    for update in updates {
        let seen = applied.entry(update.exercise.clone()).or_default();

        if let Some(reps) = update.target_reps {
            if seen.target_reps != Some(reps) {
                match store.set_target_reps(&update.exercise, Some(reps)) {
                    Ok(()) => {
                        seen.target_reps = Some(reps);
                        writes += 1;
                        tracing::info!("Target reps for {} set to {}", update.exercise, reps);
                    }
                    Err(e) => tracing::warn!(
                        "Failed to save target reps for {}: {}. Continuing.",
                        update.exercise,
                        e
                    ),
                }
            }
        }

        if let Some(weight) = update.weight {
            if seen.weight != Some(weight) {
                match store.set_target_weight(&update.exercise, Some(weight)) {
                    Ok(()) => {
                        seen.weight = Some(weight);
                        writes += 1;
                        tracing::info!("Target weight for {} set to {}", update.exercise, weight);
                    }
                    Err(e) => tracing::warn!(
                        "Failed to save target weight for {}: {}. Continuing.",
                        update.exercise,
                        e
                    ),
                }
            }
        }
    }

    writes
}
