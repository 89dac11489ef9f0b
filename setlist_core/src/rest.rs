//! Rest scheduling.
//!
//! Members of a superset are performed back to back, so rest only falls
//! between rounds. Single exercises rest after every set. Nothing rests after
//! the final step of the workout.

use crate::{build_sequence, Exercise, SequenceStep};
use std::collections::BTreeSet;

/// Indices of steps after which a rest period begins
pub type RestRoundEndIndices = BTreeSet<usize>;

/// Compute rest indices for a plan
pub fn rest_round_end_indices(
    plan: &[Option<Exercise>],
    supersets: &[usize],
    sets_per_superset: u32,
) -> RestRoundEndIndices {
    rest_indices_for_steps(&build_sequence(plan, supersets, sets_per_superset))
}

/// Compute rest indices from an already built (possibly edited) sequence
///
/// A step ends a round when it is the last step of its group block; a step in
/// a single-exercise group always ends a round. The final step never rests.
pub fn rest_indices_for_steps(steps: &[SequenceStep]) -> RestRoundEndIndices {
    steps
        .iter()
        .enumerate()
        .filter(|(i, step)| {
            let Some(next) = steps.get(i + 1) else {
                return false;
            };
            step.group_size == 1 || next.group != step.group
        })
        .map(|(i, _)| i)
        .collect()
}
