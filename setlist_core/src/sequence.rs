//! Sequence building: plan + superset layout → ordered set steps.
//!
//! The plan is walked once and cut into superset groups. Within a group every
//! exercise is performed for set 1, then every exercise for set 2, and so on,
//! up to the largest set count in the group.

use crate::{Exercise, SequenceStep};

/// Partition the plan into non-empty superset groups
///
/// Each configured size consumes exactly that many plan slots (fewer if the
/// plan runs out). Placeholder slots are dropped, and a group left with no
/// real exercises is skipped entirely.
pub(crate) fn group_plan<'a>(
    plan: &'a [Option<Exercise>],
    supersets: &[usize],
) -> Vec<Vec<&'a Exercise>> {
    let mut groups = Vec::new();
    let mut cursor = 0;

    for (config_index, &size) in supersets.iter().enumerate() {
        if cursor >= plan.len() {
            tracing::debug!(
                "Plan exhausted after {} slots; ignoring superset entries from #{}",
                plan.len(),
                config_index
            );
            break;
        }

        let end = (cursor + size).min(plan.len());
        let group: Vec<&Exercise> = plan[cursor..end].iter().flatten().collect();
        cursor = end;

        if group.is_empty() {
            tracing::debug!("Superset #{} has no exercises, skipping", config_index);
            continue;
        }
        groups.push(group);
    }

    groups
}

/// Largest set count among a group's exercises
pub(crate) fn group_max_sets(group: &[&Exercise], sets_per_superset: u32) -> u32 {
    group
        .iter()
        .map(|e| e.sets.unwrap_or(sets_per_superset))
        .max()
        .unwrap_or(0)
}

/// Build the ordered step list for a plan
///
/// Deterministic and side-effect free. The result length is the sum over
/// non-empty groups of `group_max_sets * group_size`.
pub fn build_sequence(
    plan: &[Option<Exercise>],
    supersets: &[usize],
    sets_per_superset: u32,
) -> Vec<SequenceStep> {
    let mut steps = Vec::new();

    for (group_index, group) in group_plan(plan, supersets).iter().enumerate() {
        let max_sets = group_max_sets(group, sets_per_superset);

        for set_number in 1..=max_sets {
            for exercise in group {
                steps.push(SequenceStep {
                    exercise: (*exercise).clone(),
                    set_number,
                    total_sets: max_sets,
                    group: group_index,
                    group_size: group.len(),
                });
            }
        }
    }

    tracing::debug!("Built sequence of {} steps", steps.len());
    steps
}
