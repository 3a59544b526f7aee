//! JSON import/export.
//! Word lists are imported into the catalog; a learner's scheduling records
//! are exported as a progress report.

use crate::error::StorageError;
use crate::models::{SchedulingRecord, WordList};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub learner_id: String,
    pub exported_at: DateTime<Utc>,
    pub records: Vec<SchedulingRecord>,
}

/// Writes a word list as pretty JSON.
pub fn export_word_list_to_path(list: &WordList, path: &Path) -> Result<(), StorageError> {
    let json_string = serde_json::to_string_pretty(list)?;
    std::fs::write(path, json_string)?;
    Ok(())
}

/// Reads a word list. Storage identities in the file, if any, are ignored.
pub fn import_word_list(path: &Path) -> Result<WordList, StorageError> {
    let contents = std::fs::read_to_string(path)?;
    let list: WordList = serde_json::from_str(&contents)?;

    info!(name = %list.name, words = list.words.len(), path = %path.display(), "Word list read");
    Ok(list)
}

pub fn export_progress_to_path(
    learner_id: &str,
    records: &[SchedulingRecord],
    exported_at: DateTime<Utc>,
    path: &Path,
) -> Result<(), StorageError> {
    let report = ProgressReport {
        learner_id: learner_id.to_string(),
        exported_at,
        records: records.to_vec(),
    };
    std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
    info!(learner_id, records = records.len(), path = %path.display(), "Progress exported");
    Ok(())
}
