//! Workout session state machine.
//!
//! Phases run `warmup → exercise → cooldown → complete`. Warm-up and cool-down
//! can each be completed or skipped; both outcomes are kept for the summary.
//! During the exercise phase every [`WorkoutSession::record_set`] captures one
//! record for the current step, so `records.len() == current_step_index`
//! holds until the phase ends. Target updates are written when the exercise
//! phase ends or the session is partially completed.
//!
//! Timers live outside the machine: the session only reports when a rest
//! should start and accumulates the seconds it is told about.

use crate::overload::{advise, OverloadSuggestion};
use crate::rest::{rest_indices_for_steps, RestRoundEndIndices};
use crate::rules::{apply_target_updates, evaluate_target_updates, TargetUpdate};
use crate::store::read_targets;
use crate::{
    build_sequence, parse_reps, parse_weight, sanitize_weight, Error, Exercise, ExerciseSets,
    ExerciseTargets, Phase, PhaseFlags, Plan, Result, SequenceStep, SessionConfig, SessionState,
    SessionSummary, SetEntry, SetRecord, SupersetConfig, TargetStore,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use uuid::Uuid;

/// What happened when a set was recorded
#[derive(Clone, Debug, PartialEq)]
pub struct SetOutcome {
    pub record: SetRecord,
    /// The completed step ends a round: the caller should start its rest timer
    pub start_rest: bool,
    pub suggestion: Option<OverloadSuggestion>,
    /// Phase after the set was recorded
    pub phase: Phase,
    /// Target writes decided if this set finished the exercise phase
    pub target_updates: Vec<TargetUpdate>,
}

/// A running workout session
pub struct WorkoutSession<S: TargetStore> {
    supersets: SupersetConfig,
    rest_indices: RestRoundEndIndices,
    state: SessionState,
    initial_targets: HashMap<String, ExerciseTargets>,
    current_targets: HashMap<String, ExerciseTargets>,
    overridden: HashSet<String>,
    applied: HashMap<String, ExerciseTargets>,
    cooldown_enabled: bool,
    finalized: bool,
    store: S,
}

impl<S: TargetStore> WorkoutSession<S> {
    /// Start a session, snapshotting stored targets for every plan exercise
    pub fn new(plan: &Plan, config: &SessionConfig, store: S) -> Self {
        let state = SessionState {
            phase: Phase::Warmup,
            current_step_index: 0,
            records: Vec::new(),
            elapsed_seconds: 0,
            flags: PhaseFlags::default(),
            is_partial: false,
            plan: Vec::new(),
            sequence: Vec::new(),
        };

        let mut session = Self::assemble(plan, config, state, store);

        if !config.warmup_enabled {
            tracing::info!("Warm-up disabled, starting with exercises");
            session.enter_exercise_phase();
        }

        session
    }

    /// Rebuild a session from previously saved state
    ///
    /// The saved plan and sequence win over `plan`, so mid-session swaps and
    /// extra sets survive. `plan` only fills in state saved without them.
    pub fn resume(plan: &Plan, config: &SessionConfig, state: SessionState, store: S) -> Result<Self> {
        let session = Self::assemble(plan, config, state, store);
        let len = session.state.sequence.len();
        let state = &session.state;

        if state.current_step_index > len || state.records.len() > len {
            return Err(Error::Session(format!(
                "saved state is past the end of a {}-step sequence",
                len
            )));
        }
        if state.phase == Phase::Exercise && state.records.len() != state.current_step_index {
            return Err(Error::Session(format!(
                "saved state has {} records at step {}",
                state.records.len(),
                state.current_step_index
            )));
        }

        tracing::info!(
            "Resumed session in {:?} phase at step {}",
            state.phase,
            state.current_step_index
        );
        Ok(session)
    }

    fn assemble(plan: &Plan, config: &SessionConfig, mut state: SessionState, store: S) -> Self {
        if state.plan.is_empty() {
            let sets_per_superset = plan.sets_per_superset_or(config.sets_per_superset);
            state.plan = plan.exercises.clone();
            state.sequence = build_sequence(&plan.exercises, &plan.supersets, sets_per_superset);
        }
        let rest_indices = rest_indices_for_steps(&state.sequence);

        let names: BTreeSet<&str> = state
            .plan
            .iter()
            .flatten()
            .map(|e| e.name.as_str())
            .chain(state.sequence.iter().map(|s| s.exercise.name.as_str()))
            .collect();
        let initial_targets: HashMap<String, ExerciseTargets> = names
            .into_iter()
            .map(|name| (name.to_string(), read_targets(&store, name)))
            .collect();

        tracing::info!(
            "Session ready: {} steps, {} rest points",
            state.sequence.len(),
            rest_indices.len()
        );

        Self {
            supersets: plan.supersets.clone(),
            rest_indices,
            state,
            current_targets: initial_targets.clone(),
            initial_targets,
            overridden: HashSet::new(),
            applied: HashMap::new(),
            cooldown_enabled: config.cooldown_enabled,
            finalized: false,
            store,
        }
    }

    // ------------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn sequence(&self) -> &[SequenceStep] {
        &self.state.sequence
    }

    pub fn rest_indices(&self) -> &RestRoundEndIndices {
        &self.rest_indices
    }

    pub fn plan(&self) -> &[Option<Exercise>] {
        &self.state.plan
    }

    pub fn supersets(&self) -> &[usize] {
        &self.supersets
    }

    pub fn records(&self) -> &[SetRecord] {
        &self.state.records
    }

    pub fn current_step_index(&self) -> usize {
        self.state.current_step_index
    }

    /// The step awaiting a record, if the exercise phase is running
    pub fn current_step(&self) -> Option<&SequenceStep> {
        if self.state.phase != Phase::Exercise {
            return None;
        }
        self.state.sequence.get(self.state.current_step_index)
    }

    /// In-memory targets, including manual edits made during the session
    pub fn targets_for(&self, exercise: &str) -> ExerciseTargets {
        self.current_targets.get(exercise).cloned().unwrap_or_default()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.state.elapsed_seconds
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ------------------------------------------------------------------------
    // Warm-up
    // ------------------------------------------------------------------------

    pub fn complete_warmup(&mut self) -> Result<Phase> {
        self.leave_warmup(false)
    }

    pub fn skip_warmup(&mut self) -> Result<Phase> {
        self.leave_warmup(true)
    }

    fn leave_warmup(&mut self, skipped: bool) -> Result<Phase> {
        self.expect_phase(Phase::Warmup, if skipped { "skip warm-up" } else { "complete warm-up" })?;

        if skipped {
            self.state.flags.warmup_skipped = true;
        } else {
            self.state.flags.warmup_completed = true;
        }
        tracing::info!("Warm-up {}", if skipped { "skipped" } else { "completed" });

        self.enter_exercise_phase();
        Ok(self.state.phase)
    }

    fn enter_exercise_phase(&mut self) {
        self.state.phase = Phase::Exercise;
        self.state.current_step_index = 0;

        if self.state.sequence.is_empty() {
            tracing::warn!("Workout has no steps, moving straight on");
            self.finish_exercise_phase();
        }
    }

    // ------------------------------------------------------------------------
    // Exercise phase
    // ------------------------------------------------------------------------

    /// Capture the current step's set and advance
    ///
    /// Weight is clamped to a non-negative number; nothing is rejected.
    pub fn record_set(&mut self, weight: f64, reps: u32) -> Result<SetOutcome> {
        self.expect_phase(Phase::Exercise, "record a set")?;

        let index = self.state.current_step_index;
        let step = self.state.sequence.get(index).ok_or_else(|| {
            Error::Session(format!("no step at index {}", index))
        })?;

        let record = SetRecord {
            exercise_name: step.exercise.name.clone(),
            set_number: step.set_number,
            weight: sanitize_weight(weight),
            reps,
        };

        let suggestion = if self.overridden.contains(&record.exercise_name) {
            None
        } else {
            let target_reps = self
                .current_targets
                .get(&record.exercise_name)
                .and_then(|t| t.target_reps)
                .unwrap_or(0);
            advise(record.weight, record.reps, target_reps)
        };

        tracing::debug!(
            "Recorded {} set {}/{}: {} x {}",
            record.exercise_name,
            record.set_number,
            step.total_sets,
            record.weight,
            record.reps
        );

        self.state.records.push(record.clone());
        self.state.current_step_index += 1;

        let start_rest = self.rest_indices.contains(&index);

        let target_updates = if self.state.current_step_index >= self.state.sequence.len() {
            self.finish_exercise_phase()
        } else {
            Vec::new()
        };

        Ok(SetOutcome {
            record,
            start_rest,
            suggestion,
            phase: self.state.phase,
            target_updates,
        })
    }

    /// Capture a set from raw text input, clamping unusable values to 0
    pub fn record_raw(&mut self, weight: &str, reps: &str) -> Result<SetOutcome> {
        self.record_set(parse_weight(weight), parse_reps(reps))
    }

    /// Undo the most recent set; a no-op at the first step
    pub fn go_back(&mut self) -> bool {
        if self.state.phase != Phase::Exercise || self.state.current_step_index == 0 {
            return false;
        }

        self.state.current_step_index -= 1;
        let removed = self.state.records.pop();
        if let Some(record) = removed {
            tracing::debug!("Undid {} set {}", record.exercise_name, record.set_number);
        }
        true
    }

    /// Write any earned target updates for the records captured so far
    ///
    /// Safe to call repeatedly: values already written are not written again.
    pub fn persist_targets(&mut self) -> Vec<TargetUpdate> {
        let updates = evaluate_target_updates(&self.state.records, &self.initial_targets);
        let writes = apply_target_updates(&mut self.store, &updates, &mut self.applied);
        tracing::debug!("{} target updates, {} writes", updates.len(), writes);
        updates
    }

    fn finish_exercise_phase(&mut self) -> Vec<TargetUpdate> {
        let updates = self.persist_targets();

        self.state.phase = if self.cooldown_enabled {
            Phase::Cooldown
        } else {
            Phase::Complete
        };
        tracing::info!("Exercises finished, moving to {:?}", self.state.phase);
        updates
    }

    /// End the session early, keeping target updates already earned
    pub fn partial_complete(&mut self) -> Result<Vec<TargetUpdate>> {
        if !matches!(self.state.phase, Phase::Exercise | Phase::Cooldown) {
            return Err(Error::Session(format!(
                "cannot partially complete during {:?}",
                self.state.phase
            )));
        }
        if self.state.records.is_empty() {
            return Err(Error::Session(
                "cannot partially complete without any recorded sets".into(),
            ));
        }

        let updates = self.persist_targets();
        self.state.phase = Phase::Complete;
        self.state.is_partial = true;
        tracing::info!(
            "Session ended early after {} sets",
            self.state.records.len()
        );
        Ok(updates)
    }

    // ------------------------------------------------------------------------
    // Mid-session edits
    // ------------------------------------------------------------------------

    /// Replace an exercise for every step not yet performed
    ///
    /// Completed steps and their records are left alone. Returns the number of
    /// steps that changed.
    pub fn swap_exercise(&mut self, old_name: &str, replacement: Exercise) -> Result<usize> {
        if !matches!(self.state.phase, Phase::Warmup | Phase::Exercise) {
            return Err(Error::Session(format!(
                "cannot swap exercises during {:?}",
                self.state.phase
            )));
        }

        let in_plan = |name: &str| self.state.plan.iter().flatten().any(|e| e.name == name);
        if replacement.name != old_name && in_plan(&replacement.name) {
            return Err(Error::Session(format!(
                "{} is already in this workout",
                replacement.name
            )));
        }

        let position = self
            .state
            .plan
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|e| e.name == old_name))
            .ok_or_else(|| Error::Session(format!("{} is not in this workout", old_name)))?;

        self.state.plan[position] = Some(replacement.clone());

        let start = self.state.current_step_index.min(self.state.sequence.len());
        let mut changed = 0;
        for step in &mut self.state.sequence[start..] {
            if step.exercise.name == old_name {
                step.exercise = replacement.clone();
                changed += 1;
            }
        }

        if !self.initial_targets.contains_key(&replacement.name) {
            let targets = read_targets(&self.store, &replacement.name);
            self.current_targets
                .insert(replacement.name.clone(), targets.clone());
            self.initial_targets.insert(replacement.name.clone(), targets);
        }

        tracing::info!(
            "Swapped {} for {} on {} remaining steps",
            old_name,
            replacement.name,
            changed
        );
        Ok(changed)
    }

    /// Add one more set of the current step's exercise
    ///
    /// The set goes at the end of the current superset block, so the group
    /// stays contiguous and rest still falls after the round. Only that
    /// exercise's remaining steps change their set total; the plan is left
    /// as written.
    pub fn add_extra_set(&mut self) -> Result<&SequenceStep> {
        let index = self.state.current_step_index;
        let current = self
            .current_step()
            .cloned()
            .ok_or_else(|| Error::Session("no current step to extend".into()))?;
        let name = current.exercise.name.clone();

        let block_end = (index..self.state.sequence.len())
            .take_while(|&i| self.state.sequence[i].group == current.group)
            .last()
            .unwrap_or(index);

        let new_total = self
            .state
            .sequence
            .iter()
            .filter(|s| s.exercise.name == name)
            .map(|s| s.set_number)
            .max()
            .unwrap_or(0)
            + 1;

        for step in &mut self.state.sequence[index..] {
            if step.exercise.name == name {
                step.total_sets = new_total;
            }
        }

        let mut extra = current;
        extra.set_number = new_total;
        extra.total_sets = new_total;

        let insert_at = block_end + 1;
        self.state.sequence.insert(insert_at, extra);
        self.rest_indices = rest_indices_for_steps(&self.state.sequence);

        tracing::info!("Added set {} of {}", new_total, name);
        Ok(&self.state.sequence[insert_at])
    }

    /// Manually set an exercise's working weight for this session
    ///
    /// Suppresses overload suggestions for that exercise from now on.
    pub fn override_target_weight(&mut self, exercise: &str, weight: f64) {
        let weight = sanitize_weight(weight);
        self.current_targets
            .entry(exercise.to_string())
            .or_default()
            .weight = Some(weight);
        self.overridden.insert(exercise.to_string());
        tracing::debug!("Manual weight for {} set to {}", exercise, weight);
    }

    // ------------------------------------------------------------------------
    // Cool-down and completion
    // ------------------------------------------------------------------------

    pub fn complete_cooldown(&mut self) -> Result<Phase> {
        self.leave_cooldown(false)
    }

    pub fn skip_cooldown(&mut self) -> Result<Phase> {
        self.leave_cooldown(true)
    }

    fn leave_cooldown(&mut self, skipped: bool) -> Result<Phase> {
        self.expect_phase(Phase::Cooldown, if skipped { "skip cool-down" } else { "complete cool-down" })?;

        if skipped {
            self.state.flags.cooldown_skipped = true;
        } else {
            self.state.flags.cooldown_completed = true;
        }
        self.state.phase = Phase::Complete;
        tracing::info!("Cool-down {}", if skipped { "skipped" } else { "completed" });
        Ok(self.state.phase)
    }

    /// Add elapsed seconds; ignored once the session is complete
    pub fn tick(&mut self, seconds: u64) {
        if self.state.phase != Phase::Complete {
            self.state.elapsed_seconds += seconds;
        }
    }

    /// Build the session summary and append it to history
    ///
    /// A failed history write is logged; the summary is still returned.
    pub fn finalize(&mut self, now: DateTime<Utc>) -> Result<SessionSummary> {
        self.expect_phase(Phase::Complete, "finalize")?;
        if self.finalized {
            return Err(Error::Session("session already finalized".into()));
        }

        let summary = self.summary(now);
        if let Err(e) = self.store.append_history(&summary) {
            tracing::warn!("Failed to save session {} to history: {}", summary.id, e);
        }
        self.finalized = true;

        tracing::info!(
            "Session {} finalized: {} exercises, {}s",
            summary.id,
            summary.per_exercise.len(),
            summary.duration_seconds
        );
        Ok(summary)
    }

    fn summary(&self, now: DateTime<Utc>) -> SessionSummary {
        let mut per_exercise: BTreeMap<String, ExerciseSets> = BTreeMap::new();
        for record in &self.state.records {
            per_exercise
                .entry(record.exercise_name.clone())
                .or_default()
                .sets
                .push(SetEntry {
                    set: record.set_number,
                    weight: record.weight,
                    reps: record.reps,
                });
        }

        let flags = self.state.flags;
        SessionSummary {
            id: Uuid::new_v4(),
            date: now,
            duration_seconds: self.state.elapsed_seconds,
            per_exercise,
            warmup_completed: flags.warmup_completed,
            warmup_skipped: flags.warmup_skipped,
            cooldown_completed: flags.cooldown_completed,
            cooldown_skipped: flags.cooldown_skipped,
            is_partial: self.state.is_partial,
        }
    }

    /// Leave the session without saving anything, handing back the store
    pub fn abandon(self) -> S {
        tracing::info!(
            "Session abandoned in {:?} phase with {} sets",
            self.state.phase,
            self.state.records.len()
        );
        self.store
    }

    fn expect_phase(&self, phase: Phase, action: &str) -> Result<()> {
        if self.state.phase != phase {
            return Err(Error::Session(format!(
                "cannot {} during {:?}",
                action, self.state.phase
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overload::OverloadCategory;
    use crate::MemoryStore;

    fn plan_of(names: &[&str], supersets: &[usize]) -> Plan {
        Plan {
            exercises: names
                .iter()
                .map(|n| Some(Exercise::new(*n, "barbell", "legs")))
                .collect(),
            supersets: supersets.to_vec(),
            sets_per_superset: None,
        }
    }

    fn config(sets: u32) -> SessionConfig {
        SessionConfig {
            sets_per_superset: sets,
            ..SessionConfig::default()
        }
    }

    fn store_with(entries: &[(&str, f64, u32)]) -> MemoryStore {
        MemoryStore::with_targets(
            entries
                .iter()
                .map(|(name, weight, reps)| {
                    (
                        name.to_string(),
                        ExerciseTargets {
                            weight: Some(*weight),
                            target_reps: Some(*reps),
                        },
                    )
                })
                .collect(),
        )
    }

    fn started(plan: &Plan, sets: u32, store: MemoryStore) -> WorkoutSession<MemoryStore> {
        crate::logging::init_test();
        let mut session = WorkoutSession::new(plan, &config(sets), store);
        session.complete_warmup().unwrap();
        session
    }

    #[test]
    fn test_full_session_flow() {
        let plan = plan_of(&["Squat", "Row"], &[2]);
        let mut session = started(&plan, 2, store_with(&[("Squat", 100.0, 8), ("Row", 60.0, 10)]));

        assert_eq!(session.phase(), Phase::Exercise);
        assert_eq!(session.sequence().len(), 4);

        for _ in 0..3 {
            let outcome = session.record_set(100.0, 9).unwrap();
            assert_eq!(outcome.phase, Phase::Exercise);
            assert!(outcome.target_updates.is_empty());
        }
        let last = session.record_set(60.0, 10).unwrap();
        assert_eq!(last.phase, Phase::Cooldown);
        assert!(!last.start_rest);

        session.tick(900);
        session.complete_cooldown().unwrap();
        assert_eq!(session.phase(), Phase::Complete);

        let summary = session.finalize(Utc::now()).unwrap();
        assert!(summary.warmup_completed);
        assert!(!summary.warmup_skipped);
        assert!(summary.cooldown_completed);
        assert!(!summary.is_partial);
        assert_eq!(summary.duration_seconds, 900);
        assert_eq!(summary.per_exercise["Squat"].sets.len(), 2);
        assert_eq!(summary.per_exercise["Row"].sets[1].weight, 60.0);
        assert_eq!(session.store().history().unwrap().len(), 1);
    }

    #[test]
    fn test_records_track_step_index() {
        let plan = plan_of(&["Squat"], &[1]);
        let mut session = started(&plan, 3, MemoryStore::default());

        session.record_set(50.0, 5).unwrap();
        session.record_set(50.0, 5).unwrap();
        assert_eq!(session.records().len(), session.current_step_index());
        assert_eq!(session.records()[1].set_number, 2);
    }

    #[test]
    fn test_rest_signals_follow_superset_layout() {
        let plan = plan_of(&["A", "B", "C", "D"], &[1, 2, 1]);
        let mut session = started(&plan, 3, MemoryStore::default());

        let mut rests = Vec::new();
        for i in 0..session.sequence().len() {
            if session.record_set(20.0, 10).unwrap().start_rest {
                rests.push(i);
            }
        }
        assert_eq!(rests, vec![0, 1, 2, 8, 9, 10]);
    }

    #[test]
    fn test_go_back_restores_previous_state() {
        let plan = plan_of(&["Squat", "Row"], &[2]);
        let mut session = started(&plan, 2, MemoryStore::default());
        session.record_set(100.0, 8).unwrap();

        let before = session.state().clone();
        session.record_set(60.0, 10).unwrap();
        assert!(session.go_back());

        assert_eq!(session.state(), &before);
    }

    #[test]
    fn test_go_back_at_first_step_is_noop() {
        let plan = plan_of(&["Squat"], &[1]);
        let mut session = started(&plan, 2, MemoryStore::default());

        assert!(!session.go_back());
        assert_eq!(session.current_step_index(), 0);
        assert!(session.records().is_empty());
    }

    #[test]
    fn test_bad_input_is_clamped() {
        let plan = plan_of(&["Squat"], &[1]);
        let mut session = started(&plan, 2, MemoryStore::default());

        let outcome = session.record_raw("abc", "-4").unwrap();
        assert_eq!(outcome.record.weight, 0.0);
        assert_eq!(outcome.record.reps, 0);

        let outcome = session.record_set(-20.0, 6).unwrap();
        assert_eq!(outcome.record.weight, 0.0);
    }

    #[test]
    fn test_suggestion_uses_target_reps() {
        let plan = plan_of(&["Squat"], &[1]);
        let mut session = started(&plan, 3, store_with(&[("Squat", 100.0, 8)]));

        let outcome = session.record_set(100.0, 10).unwrap();
        let suggestion = outcome.suggestion.unwrap();
        assert_eq!(suggestion.suggested_weight, 110.0);
        assert_eq!(suggestion.category, OverloadCategory::Excellent);
    }

    #[test]
    fn test_no_suggestion_without_target_or_after_override() {
        let plan = plan_of(&["Squat", "Row"], &[1, 1]);
        let mut session = started(&plan, 1, store_with(&[("Row", 50.0, 10)]));

        // Squat has no stored target reps
        assert!(session.record_set(100.0, 10).unwrap().suggestion.is_none());

        session.override_target_weight("Row", 55.0);
        assert_eq!(session.targets_for("Row").weight, Some(55.0));
        assert!(session.record_set(55.0, 12).unwrap().suggestion.is_none());
    }

    #[test]
    fn test_targets_written_when_exercises_finish() {
        let plan = plan_of(&["Squat", "Row"], &[1, 1]);
        let mut session = started(&plan, 2, store_with(&[("Squat", 100.0, 8), ("Row", 60.0, 10)]));

        session.record_set(105.0, 9).unwrap();
        session.record_set(105.0, 10).unwrap();
        session.record_set(65.0, 10).unwrap();
        let outcome = session.record_set(65.0, 8).unwrap();

        assert_eq!(outcome.target_updates.len(), 1);
        let store = session.store();
        assert_eq!(store.target_reps("Squat").unwrap(), Some(9));
        assert_eq!(store.target_weight("Squat").unwrap(), Some(105.0));
        // Row missed on the last set: untouched
        assert_eq!(store.target_reps("Row").unwrap(), Some(10));
        assert_eq!(store.target_weight("Row").unwrap(), Some(60.0));
    }

    #[test]
    fn test_repeated_persistence_writes_once() {
        let plan = plan_of(&["Squat"], &[1]);
        let mut session = started(&plan, 2, store_with(&[("Squat", 100.0, 8)]));

        session.record_set(110.0, 9).unwrap();
        let first = session.persist_targets();
        let writes = session.store().write_count();
        assert_eq!(writes, 2);

        assert_eq!(session.persist_targets(), first);
        assert_eq!(session.store().write_count(), writes);

        // Finishing with the same outcome writes nothing new
        session.record_set(110.0, 9).unwrap();
        assert_eq!(session.store().write_count(), writes);
    }

    #[test]
    fn test_partial_complete() {
        let plan = plan_of(&["Squat", "Row"], &[1, 1]);
        let mut session = started(&plan, 3, store_with(&[("Squat", 100.0, 8)]));

        session.record_set(100.0, 9).unwrap();
        let updates = session.partial_complete().unwrap();

        assert_eq!(updates.len(), 1);
        assert_eq!(session.phase(), Phase::Complete);
        assert_eq!(session.store().target_reps("Squat").unwrap(), Some(9));

        let summary = session.finalize(Utc::now()).unwrap();
        assert!(summary.is_partial);
        assert!(!summary.cooldown_completed && !summary.cooldown_skipped);
    }

    #[test]
    fn test_partial_complete_requires_a_record() {
        let plan = plan_of(&["Squat"], &[1]);
        let mut session = started(&plan, 3, MemoryStore::default());

        assert!(matches!(session.partial_complete(), Err(Error::Session(_))));
        assert_eq!(session.phase(), Phase::Exercise);
    }

    #[test]
    fn test_skips_are_flagged() {
        let plan = plan_of(&["Squat"], &[1]);
        let mut session = WorkoutSession::new(&plan, &config(1), MemoryStore::default());

        session.skip_warmup().unwrap();
        session.record_set(60.0, 5).unwrap();
        session.skip_cooldown().unwrap();

        let summary = session.finalize(Utc::now()).unwrap();
        assert!(summary.warmup_skipped && !summary.warmup_completed);
        assert!(summary.cooldown_skipped && !summary.cooldown_completed);
    }

    #[test]
    fn test_cooldown_disabled_goes_straight_to_complete() {
        let plan = plan_of(&["Squat"], &[1]);
        let cfg = SessionConfig {
            sets_per_superset: 1,
            warmup_enabled: false,
            cooldown_enabled: false,
            ..SessionConfig::default()
        };
        let mut session = WorkoutSession::new(&plan, &cfg, MemoryStore::default());

        assert_eq!(session.phase(), Phase::Exercise);
        let outcome = session.record_set(60.0, 5).unwrap();
        assert_eq!(outcome.phase, Phase::Complete);
    }

    #[test]
    fn test_wrong_phase_operations_rejected() {
        let plan = plan_of(&["Squat"], &[1]);
        let mut session = WorkoutSession::new(&plan, &config(1), MemoryStore::default());

        assert!(session.record_set(60.0, 5).is_err());
        assert!(session.complete_cooldown().is_err());
        assert!(session.finalize(Utc::now()).is_err());

        session.complete_warmup().unwrap();
        assert!(session.complete_warmup().is_err());
    }

    #[test]
    fn test_finalize_only_once() {
        let plan = plan_of(&["Squat"], &[1]);
        let mut session = started(&plan, 1, MemoryStore::default());
        session.record_set(60.0, 5).unwrap();
        session.complete_cooldown().unwrap();

        session.finalize(Utc::now()).unwrap();
        assert!(session.finalize(Utc::now()).is_err());
        assert_eq!(session.store().history().unwrap().len(), 1);
    }

    #[test]
    fn test_empty_plan_skips_exercise_phase() {
        let plan = plan_of(&[], &[2]);
        let mut session = started(&plan, 3, MemoryStore::default());
        assert_eq!(session.phase(), Phase::Cooldown);
    }

    #[test]
    fn test_elapsed_stops_at_complete() {
        let plan = plan_of(&["Squat"], &[1]);
        let mut session = started(&plan, 1, MemoryStore::default());
        session.tick(30);
        session.record_set(60.0, 5).unwrap();
        session.skip_cooldown().unwrap();
        session.tick(30);
        assert_eq!(session.elapsed_seconds(), 30);
    }

    #[test]
    fn test_failed_target_write_does_not_block_completion() {
        let plan = plan_of(&["Squat"], &[1]);
        let mut store = store_with(&[("Squat", 100.0, 8)]);
        store.fail_writes_for("Squat");
        let mut session = started(&plan, 1, store);

        let outcome = session.record_set(110.0, 10).unwrap();
        assert_eq!(outcome.phase, Phase::Cooldown);
        assert_eq!(session.store().target_weight("Squat").unwrap(), Some(100.0));
    }

    #[test]
    fn test_swap_only_touches_remaining_steps() {
        let plan = plan_of(&["Squat", "Row"], &[1, 1]);
        let mut session = started(&plan, 2, store_with(&[("Goblet Squat", 30.0, 12)]));
        session.record_set(100.0, 8).unwrap();

        let goblet = Exercise::new("Goblet Squat", "kettlebell", "quads");
        let changed = session.swap_exercise("Squat", goblet).unwrap();

        assert_eq!(changed, 1);
        assert_eq!(session.records()[0].exercise_name, "Squat");
        assert_eq!(session.sequence()[0].exercise.name, "Squat");
        assert_eq!(session.current_step().unwrap().exercise.name, "Goblet Squat");
        assert_eq!(session.plan()[0].as_ref().unwrap().name, "Goblet Squat");
        assert_eq!(session.targets_for("Goblet Squat").target_reps, Some(12));

        let outcome = session.record_set(30.0, 12).unwrap();
        assert_eq!(outcome.suggestion.unwrap().category, OverloadCategory::Success);
    }

    #[test]
    fn test_swap_rejects_duplicates_and_unknowns() {
        let plan = plan_of(&["Squat", "Row"], &[1, 1]);
        let mut session = started(&plan, 2, MemoryStore::default());

        let row = Exercise::new("Row", "cable", "back");
        assert!(session.swap_exercise("Squat", row).is_err());

        let curl = Exercise::new("Curl", "dumbbell", "biceps");
        assert!(session.swap_exercise("Deadlift", curl).is_err());
    }

    #[test]
    fn test_extra_set_in_superset_lands_at_end_of_round_block() {
        let plan = plan_of(&["A", "B", "C"], &[2, 1]);
        let mut session = started(&plan, 2, MemoryStore::default());
        // A1 B1 A2 B2 | C1 C2
        session.record_set(10.0, 10).unwrap();

        let added = session.add_extra_set().unwrap().clone();
        assert_eq!(added.exercise.name, "B");
        assert_eq!(added.set_number, 3);

        let order: Vec<_> = session
            .sequence()
            .iter()
            .map(|s| format!("{}{}", s.exercise.name, s.set_number))
            .collect();
        assert_eq!(order, vec!["A1", "B1", "A2", "B2", "B3", "C1", "C2"]);
        assert_eq!(session.sequence()[1].total_sets, 3);

        let expected: RestRoundEndIndices = [4, 5].into_iter().collect();
        assert_eq!(session.rest_indices(), &expected);
        assert_eq!(session.plan()[1].as_ref().unwrap().sets, None);
    }

    #[test]
    fn test_extra_set_for_single_exercise_rests_between_sets() {
        let plan = plan_of(&["A"], &[1]);
        let mut session = started(&plan, 2, MemoryStore::default());

        session.add_extra_set().unwrap();
        assert_eq!(session.sequence().len(), 3);

        let rests: Vec<_> = session.rest_indices().iter().copied().collect();
        assert_eq!(rests, vec![0, 1]);
    }

    #[test]
    fn test_resume_round_trip() {
        let plan = plan_of(&["Squat", "Row"], &[2]);
        let mut session = started(&plan, 2, MemoryStore::default());
        session.record_set(100.0, 8).unwrap();
        session.tick(120);

        let saved = serde_json::to_string(session.state()).unwrap();
        let state: SessionState = serde_json::from_str(&saved).unwrap();

        let mut resumed =
            WorkoutSession::resume(&plan, &config(2), state, MemoryStore::default()).unwrap();
        assert_eq!(resumed.current_step_index(), 1);
        assert_eq!(resumed.elapsed_seconds(), 120);
        assert_eq!(resumed.current_step().unwrap().exercise.name, "Row");
        resumed.record_set(60.0, 10).unwrap();
    }

    #[test]
    fn test_resume_keeps_extra_set() {
        let plan = plan_of(&["A", "B", "C"], &[2, 1]);
        let mut session = started(&plan, 2, MemoryStore::default());
        session.record_set(10.0, 10).unwrap();
        session.add_extra_set().unwrap();

        let saved = serde_json::to_string(session.state()).unwrap();
        let state: SessionState = serde_json::from_str(&saved).unwrap();

        let resumed =
            WorkoutSession::resume(&plan, &config(2), state, MemoryStore::default()).unwrap();
        assert_eq!(resumed.sequence(), session.sequence());
        assert_eq!(resumed.plan(), session.plan());
        assert_eq!(resumed.rest_indices(), session.rest_indices());
        assert_eq!(resumed.sequence().len(), 7);
        assert_eq!(resumed.sequence()[4].set_number, 3);
    }

    #[test]
    fn test_resume_keeps_swapped_exercise() {
        let plan = plan_of(&["Squat", "Row"], &[1, 1]);
        let mut session = started(&plan, 2, store_with(&[("Goblet Squat", 30.0, 12)]));
        session.record_set(100.0, 8).unwrap();
        let goblet = Exercise::new("Goblet Squat", "kettlebell", "quads");
        session.swap_exercise("Squat", goblet).unwrap();

        let saved = serde_json::to_string(session.state()).unwrap();
        let state: SessionState = serde_json::from_str(&saved).unwrap();

        let store = store_with(&[("Goblet Squat", 30.0, 12)]);
        let mut resumed = WorkoutSession::resume(&plan, &config(2), state, store).unwrap();
        assert_eq!(resumed.sequence()[0].exercise.name, "Squat");
        assert_eq!(resumed.current_step().unwrap().exercise.name, "Goblet Squat");
        assert_eq!(resumed.plan()[0].as_ref().unwrap().name, "Goblet Squat");

        let outcome = resumed.record_set(30.0, 12).unwrap();
        assert_eq!(outcome.suggestion.unwrap().category, OverloadCategory::Success);
    }

    #[test]
    fn test_resume_without_saved_sequence_rebuilds_from_plan() {
        let plan = plan_of(&["Squat", "Row"], &[2]);
        let saved = r#"{"phase":"exercise","current_step_index":1,"records":[{"exercise_name":"Squat","set_number":1,"weight":100.0,"reps":8}],"elapsed_seconds":30}"#;
        let state: SessionState = serde_json::from_str(saved).unwrap();

        let resumed =
            WorkoutSession::resume(&plan, &config(2), state, MemoryStore::default()).unwrap();
        assert_eq!(resumed.sequence().len(), 4);
        assert_eq!(resumed.current_step().unwrap().exercise.name, "Row");
    }

    #[test]
    fn test_resume_rejects_inconsistent_state() {
        let plan = plan_of(&["Squat"], &[1]);
        let state = SessionState {
            phase: Phase::Exercise,
            current_step_index: 2,
            records: vec![],
            elapsed_seconds: 0,
            flags: PhaseFlags::default(),
            is_partial: false,
            plan: Vec::new(),
            sequence: Vec::new(),
        };
        assert!(WorkoutSession::resume(&plan, &config(3), state, MemoryStore::default()).is_err());
    }

    #[test]
    fn test_abandon_returns_store_untouched() {
        let plan = plan_of(&["Squat"], &[1]);
        let mut session = started(&plan, 3, store_with(&[("Squat", 100.0, 8)]));
        session.record_set(120.0, 12).unwrap();

        let store = session.abandon();
        assert_eq!(store.write_count(), 0);
        assert!(store.history().unwrap().is_empty());
    }
}
