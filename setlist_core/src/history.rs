//! History helpers: last performance lookup and CSV export.

use crate::{Result, SessionSummary, SetEntry};
use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::path::Path;
use uuid::Uuid;

/// Best set of an exercise from the most recent session that included it
#[derive(Clone, Debug, PartialEq)]
pub struct LastPerformance {
    pub date: DateTime<Utc>,
    pub best_set: SetEntry,
}

/// Find the last performance of `exercise` in oldest-first history
///
/// The best set is the heaviest one; ties go to the earliest set.
pub fn last_performance(history: &[SessionSummary], exercise: &str) -> Option<LastPerformance> {
    history.iter().rev().find_map(|session| {
        let sets = &session.per_exercise.get(exercise)?.sets;
        let best = sets.iter().fold(None::<&SetEntry>, |best, set| match best {
            Some(b) if b.weight >= set.weight => Some(b),
            _ => Some(set),
        })?;
        Some(LastPerformance {
            date: session.date,
            best_set: best.clone(),
        })
    })
}

/// A row in the CSV export
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    id: Uuid,
    date: String,
    exercise: &'a str,
    set: u32,
    weight: f64,
    reps: u32,
    is_partial: bool,
}

/// Append history as one CSV row per set
///
/// Creates the file with headers if needed. Returns the number of rows written.
pub fn export_csv(history: &[SessionSummary], csv_path: &Path) -> Result<usize> {
    if let Some(parent) = csv_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let needs_headers = !csv_path.exists() || std::fs::metadata(csv_path)?.len() == 0;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(&file);

    let mut rows = 0;
    for session in history {
        let date = session.date.to_rfc3339();
        for (exercise, sets) in &session.per_exercise {
            for entry in &sets.sets {
                writer.serialize(CsvRow {
                    id: session.id,
                    date: date.clone(),
                    exercise,
                    set: entry.set,
                    weight: entry.weight,
                    reps: entry.reps,
                    is_partial: session.is_partial,
                })?;
                rows += 1;
            }
        }
    }

    writer.flush()?;
    drop(writer);
    file.sync_all()?;

    tracing::info!("Exported {} history rows to {:?}", rows, csv_path);
    Ok(rows)
}
