//! Collaborator interfaces the scheduler depends on.

use crate::error::StorageError;
use crate::models::{RecordId, SchedulingRecord, Subject};
use chrono::{DateTime, Utc};

pub type Result<T> = std::result::Result<T, StorageError>;

/// Read-only view of the word catalog.
pub trait SubjectCatalog {
    fn exists(&self, subject: Subject) -> Result<bool>;

    /// False for soft-deleted words and lists, and for words of a deleted list.
    fn is_active(&self, subject: Subject) -> Result<bool>;
}

/// Persistence of scheduling records.
pub trait RecordStore {
    fn load(&self, learner_id: &str, subject: Subject) -> Result<Option<SchedulingRecord>>;

    fn load_by_id(&self, id: RecordId) -> Result<Option<SchedulingRecord>>;

    /// Creates the record for a pair, failing with [`StorageError::Duplicate`]
    /// when one already exists.
    fn insert(&self, learner_id: &str, subject: Subject) -> Result<SchedulingRecord>;

    /// Writes `record` if the stored version still equals `record.version`
    /// and returns it with the incremented version. Otherwise fails with
    /// [`StorageError::StaleWrite`] and leaves the stored row untouched.
    fn save(&self, record: &SchedulingRecord) -> Result<SchedulingRecord>;

    /// Reviewed records with `next_review <= now`, oldest due date first.
    fn query_due(&self, learner_id: &str, now: DateTime<Utc>) -> Result<Vec<SchedulingRecord>>;

    /// Records that were started but never reviewed.
    fn query_not_started(&self, learner_id: &str) -> Result<Vec<SchedulingRecord>>;

    fn records_for(&self, learner_id: &str) -> Result<Vec<SchedulingRecord>>;
}
