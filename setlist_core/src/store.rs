//! Persistence collaborators for targets and history.
//!
//! The engine only talks to [`TargetStore`]. Two implementations ship here:
//! an in-memory store and a directory-backed store that keeps targets in a
//! locked, atomically replaced JSON file and history in an append-only JSONL
//! log.

use crate::{Error, ExerciseTargets, Result, SessionSummary};
use fs2::FileExt;
use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Key-value persistence consumed by the session engine
pub trait TargetStore {
    fn target_weight(&self, exercise: &str) -> Result<Option<f64>>;
    fn set_target_weight(&mut self, exercise: &str, weight: Option<f64>) -> Result<()>;
    fn target_reps(&self, exercise: &str) -> Result<Option<u32>>;
    fn set_target_reps(&mut self, exercise: &str, reps: Option<u32>) -> Result<()>;
    /// Past sessions, oldest first
    fn history(&self) -> Result<Vec<SessionSummary>>;
    fn append_history(&mut self, summary: &SessionSummary) -> Result<()>;
}

/// Read both targets for an exercise, treating read failures as unset
pub fn read_targets<S: TargetStore + ?Sized>(store: &S, exercise: &str) -> ExerciseTargets {
    let weight = store.target_weight(exercise).unwrap_or_else(|e| {
        tracing::warn!("Failed to read target weight for {}: {}. Treating as unset.", exercise, e);
        None
    });
    let target_reps = store.target_reps(exercise).unwrap_or_else(|e| {
        tracing::warn!("Failed to read target reps for {}: {}. Treating as unset.", exercise, e);
        None
    });
    ExerciseTargets {
        weight,
        target_reps,
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// HashMap-backed store for tests and dry runs
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    targets: HashMap<String, ExerciseTargets>,
    history: Vec<SessionSummary>,
    failing: HashSet<String>,
    writes: usize,
}

impl MemoryStore {
    pub fn with_targets(targets: HashMap<String, ExerciseTargets>) -> Self {
        Self {
            targets,
            ..Self::default()
        }
    }

    /// Make every target write for `exercise` fail, to exercise degraded persistence
    pub fn fail_writes_for(&mut self, exercise: &str) {
        self.failing.insert(exercise.to_string());
    }

    /// Number of successful target writes so far
    pub fn write_count(&self) -> usize {
        self.writes
    }

    fn check_writable(&self, exercise: &str) -> Result<()> {
        if self.failing.contains(exercise) {
            return Err(Error::Store(format!("write rejected for {}", exercise)));
        }
        Ok(())
    }
}

impl TargetStore for MemoryStore {
    fn target_weight(&self, exercise: &str) -> Result<Option<f64>> {
        Ok(self.targets.get(exercise).and_then(|t| t.weight))
    }

    fn set_target_weight(&mut self, exercise: &str, weight: Option<f64>) -> Result<()> {
        self.check_writable(exercise)?;
        self.targets.entry(exercise.to_string()).or_default().weight = weight;
        self.writes += 1;
        Ok(())
    }

    fn target_reps(&self, exercise: &str) -> Result<Option<u32>> {
        Ok(self.targets.get(exercise).and_then(|t| t.target_reps))
    }

    fn set_target_reps(&mut self, exercise: &str, reps: Option<u32>) -> Result<()> {
        self.check_writable(exercise)?;
        self.targets.entry(exercise.to_string()).or_default().target_reps = reps;
        self.writes += 1;
        Ok(())
    }

    fn history(&self) -> Result<Vec<SessionSummary>> {
        Ok(self.history.clone())
    }

    fn append_history(&mut self, summary: &SessionSummary) -> Result<()> {
        self.history.push(summary.clone());
        Ok(())
    }
}

// ============================================================================
// File-backed store
// ============================================================================

/// Directory-backed store: `targets.json` plus `history.jsonl`
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn targets_path(&self) -> PathBuf {
        self.dir.join("targets.json")
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.join("history.jsonl")
    }

    /// Load all targets with a shared lock
    ///
    /// Returns empty targets if the file doesn't exist or is corrupted.
    pub fn load_targets(&self) -> Result<HashMap<String, ExerciseTargets>> {
        let path = self.targets_path();
        if !path.exists() {
            tracing::debug!("No targets file at {:?}, starting empty", path);
            return Ok(HashMap::new());
        }

        let file = File::open(&path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let read = BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        match serde_json::from_str(&contents) {
            Ok(targets) => Ok(targets),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse targets file {:?}: {}. Using empty targets.",
                    path,
                    e
                );
                Ok(HashMap::new())
            }
        }
    }

    /// Atomically replace the targets file
    ///
    /// Writes to a temp file in the same directory, syncs, then renames.
    fn save_targets(&self, targets: &HashMap<String, ExerciseTargets>) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let temp = NamedTempFile::new_in(&self.dir)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, targets)?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(self.targets_path())
            .map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    fn update_targets<F>(&self, exercise: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut ExerciseTargets),
    {
        let mut targets = self.load_targets()?;
        f(targets.entry(exercise.to_string()).or_default());
        self.save_targets(&targets)?;
        tracing::debug!("Saved targets for {}", exercise);
        Ok(())
    }
}

impl TargetStore for FileStore {
    fn target_weight(&self, exercise: &str) -> Result<Option<f64>> {
        Ok(self.load_targets()?.get(exercise).and_then(|t| t.weight))
    }

    fn set_target_weight(&mut self, exercise: &str, weight: Option<f64>) -> Result<()> {
        self.update_targets(exercise, |t| t.weight = weight)
    }

    fn target_reps(&self, exercise: &str) -> Result<Option<u32>> {
        Ok(self.load_targets()?.get(exercise).and_then(|t| t.target_reps))
    }

    fn set_target_reps(&mut self, exercise: &str, reps: Option<u32>) -> Result<()> {
        self.update_targets(exercise, |t| t.target_reps = reps)
    }

    fn history(&self) -> Result<Vec<SessionSummary>> {
        read_history(&self.history_path())
    }

    fn append_history(&mut self, summary: &SessionSummary) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.history_path())?;
        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(summary)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;
        tracing::debug!("Appended session {} to history", summary.id);
        Ok(())
    }
}

/// Read every session from a JSONL history file, skipping corrupt lines
pub fn read_history(path: &Path) -> Result<Vec<SessionSummary>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut sessions = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<SessionSummary>(&line) {
            Ok(session) => sessions.push(session),
            Err(e) => {
                tracing::warn!("Failed to parse history at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} sessions from history", sessions.len());
    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn summary() -> SessionSummary {
        SessionSummary {
            id: Uuid::new_v4(),
            date: Utc::now(),
            duration_seconds: 600,
            per_exercise: BTreeMap::new(),
            warmup_completed: true,
            warmup_skipped: false,
            cooldown_completed: true,
            cooldown_skipped: false,
            is_partial: false,
        }
    }

    #[test]
    fn test_file_store_targets_persist() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(temp_dir.path());

        store.set_target_weight("Squat", Some(100.0)).unwrap();
        store.set_target_reps("Squat", Some(8)).unwrap();
        store.set_target_reps("Row", Some(12)).unwrap();

        let reopened = FileStore::new(temp_dir.path());
        assert_eq!(reopened.target_weight("Squat").unwrap(), Some(100.0));
        assert_eq!(reopened.target_reps("Squat").unwrap(), Some(8));
        assert_eq!(reopened.target_weight("Row").unwrap(), None);
        assert_eq!(reopened.target_reps("Missing").unwrap(), None);
    }

    #[test]
    fn test_file_store_clearing_a_target() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(temp_dir.path());

        store.set_target_weight("Squat", Some(100.0)).unwrap();
        store.set_target_weight("Squat", None).unwrap();
        assert_eq!(store.target_weight("Squat").unwrap(), None);
    }

    #[test]
    fn test_corrupted_targets_fall_back_to_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(temp_dir.path());
        std::fs::write(store.targets_path(), "{ invalid json }").unwrap();

        assert!(store.load_targets().unwrap().is_empty());
        assert_eq!(store.target_weight("Squat").unwrap(), None);
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(temp_dir.path());
        store.set_target_weight("Squat", Some(60.0)).unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "targets.json")
            .collect();
        assert!(extras.is_empty(), "unexpected files: {:?}", extras);
    }

    #[test]
    fn test_history_append_and_read() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(temp_dir.path());

        let first = summary();
        let second = summary();
        store.append_history(&first).unwrap();
        store.append_history(&second).unwrap();

        let history = store.history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, first.id);
        assert_eq!(history[1].id, second.id);
    }

    #[test]
    fn test_history_skips_corrupt_lines() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(temp_dir.path());
        store.append_history(&summary()).unwrap();

        let mut file = OpenOptions::new()
            .append(true)
            .open(store.history_path())
            .unwrap();
        writeln!(file, "{{ not a session").unwrap();
        drop(file);
        store.append_history(&summary()).unwrap();

        assert_eq!(store.history().unwrap().len(), 2);
    }

    #[test]
    fn test_read_targets_degrades_on_missing() {
        let store = MemoryStore::default();
        assert_eq!(read_targets(&store, "Nothing"), ExerciseTargets::default());
    }
}
