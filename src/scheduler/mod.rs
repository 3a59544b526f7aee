//! Review scheduling: starting practice, grading reviews and the due queue.
//!
//! The scheduler owns no state of its own. Every operation loads the current
//! record from the store, derives the next value with the SM-2 calculator and
//! writes it back under an optimistic version check.

pub mod store;

use crate::error::{SchedulerError, StorageError};
use crate::models::{Grade, RecordId, SchedulingRecord, Subject};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

pub use store::{RecordStore, SubjectCatalog};

pub type Result<T> = std::result::Result<T, SchedulerError>;

pub const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 3;

pub struct Scheduler<S> {
    store: S,
    max_write_attempts: u32,
}

impl<S> Scheduler<S>
where
    S: SubjectCatalog + RecordStore,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
        }
    }

    /// How many times a review is attempted when concurrent writers keep
    /// winning the version check. At least one attempt is always made.
    pub fn with_max_write_attempts(mut self, attempts: u32) -> Self {
        self.max_write_attempts = attempts.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates the scheduling record for a learner who begins practicing
    /// `subject`.
    pub fn start_practicing(&self, learner_id: &str, subject: Subject) -> Result<SchedulingRecord> {
        let learner_id = learner(learner_id)?;

        if !self.store.exists(subject)? || !self.store.is_active(subject)? {
            return Err(SchedulerError::NotFound(format!("subject {subject}")));
        }

        if let Some(existing) = self.store.load(learner_id, subject)? {
            return Err(duplicate(learner_id, subject, Some(existing.id)));
        }

        match self.store.insert(learner_id, subject) {
            Ok(record) => {
                info!(record_id = record.id, learner_id, %subject, "Started practicing");
                Ok(record)
            }
            // Lost a race against another start for the same pair
            Err(StorageError::Duplicate { .. }) => Err(duplicate(learner_id, subject, None)),
            Err(e) => Err(e.into()),
        }
    }

    /// Applies `grade`, given at `now`, to the record and persists the result.
    pub fn submit_review(
        &self,
        record_id: RecordId,
        grade: Grade,
        now: DateTime<Utc>,
    ) -> Result<SchedulingRecord> {
        for attempt in 1..=self.max_write_attempts {
            let current = self
                .store
                .load_by_id(record_id)?
                .ok_or_else(|| SchedulerError::NotFound(format!("scheduling record {record_id}")))?;

            let next = current.reviewed(grade, now);

            match self.store.save(&next) {
                Ok(saved) => {
                    debug!(
                        record_id,
                        %grade,
                        repetitions = saved.repetition_count,
                        easiness = saved.easiness_factor,
                        interval_days = saved.interval_days,
                        "Review recorded"
                    );
                    return Ok(saved);
                }
                Err(StorageError::StaleWrite { expected_version, .. }) => {
                    warn!(record_id, attempt, expected_version, "Concurrent review, reloading");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(SchedulerError::Conflict(format!(
            "scheduling record {record_id} kept changing after {} attempts",
            self.max_write_attempts
        )))
    }

    /// Records of `learner_id` due at `now`, most overdue first.
    pub fn get_due(&self, learner_id: &str, now: DateTime<Utc>) -> Result<Vec<SchedulingRecord>> {
        let mut due = self.store.query_due(learner(learner_id)?, now)?;
        // The store already filters; keep the contract even for lax stores
        due.retain(|record| record.is_due(now));
        due.sort_by(|a, b| a.next_review.cmp(&b.next_review).then(a.id.cmp(&b.id)));
        Ok(due)
    }

    /// Records started by `learner_id` that have no review yet.
    pub fn not_started(&self, learner_id: &str) -> Result<Vec<SchedulingRecord>> {
        Ok(self.store.query_not_started(learner(learner_id)?)?)
    }

    pub fn records_for(&self, learner_id: &str) -> Result<Vec<SchedulingRecord>> {
        Ok(self.store.records_for(learner(learner_id)?)?)
    }
}

/// Learner ids are compared without surrounding whitespace.
fn learner(learner_id: &str) -> Result<&str> {
    let learner_id = learner_id.trim();
    if learner_id.is_empty() {
        return Err(SchedulerError::InvalidInput(
            "learner id must not be empty".to_string(),
        ));
    }
    Ok(learner_id)
}

fn duplicate(learner_id: &str, subject: Subject, existing: Option<RecordId>) -> SchedulerError {
    let message = match existing {
        Some(id) => format!("learner '{learner_id}' already practices {subject} (record {id})"),
        None => format!("learner '{learner_id}' already practices {subject}"),
    };
    SchedulerError::Conflict(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::db::SqliteStore;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 2, 7, 0, 0).unwrap()
    }

    /// Store with one list "Polish" holding words cześć, dziękuję, proszę.
    fn seeded() -> (Scheduler<SqliteStore>, i64, Vec<i64>) {
        let store = SqliteStore::open_in_memory().unwrap();
        let list = store.new_word_list("Polish").unwrap();
        let words = ["cześć", "dziękuję", "proszę"]
            .iter()
            .map(|term| store.add_word("Polish", term, "…").unwrap())
            .collect();
        (Scheduler::new(store), list, words)
    }

    #[test]
    fn test_start_practicing_creates_fresh_record() {
        let (scheduler, _, words) = seeded();
        let record = scheduler.start_practicing("ala", Subject::Word(words[0])).unwrap();

        assert_eq!(record.learner_id, "ala");
        assert_eq!(record.repetition_count, 0);
        assert_eq!(record.easiness_factor, 2.5);
        assert!(record.last_reviewed.is_none());
        assert!(record.next_review.is_none());
        assert_eq!(record.version, 0);
    }

    #[test]
    fn test_start_practicing_twice_conflicts() {
        let (scheduler, list, _) = seeded();
        scheduler.start_practicing("ala", Subject::WordList(list)).unwrap();

        let err = scheduler
            .start_practicing("ala", Subject::WordList(list))
            .unwrap_err();
        assert!(err.is_conflict());

        // Other learners are independent
        assert!(scheduler.start_practicing("ola", Subject::WordList(list)).is_ok());
    }

    #[test]
    fn test_start_practicing_unknown_subject() {
        let (scheduler, _, _) = seeded();
        let err = scheduler.start_practicing("ala", Subject::Word(999)).unwrap_err();
        assert!(err.is_not_found());
        let err = scheduler.start_practicing("ala", Subject::WordList(999)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_start_practicing_soft_deleted_subject() {
        let (scheduler, list, words) = seeded();
        scheduler.store().deactivate_word(words[1]).unwrap();
        let err = scheduler.start_practicing("ala", Subject::Word(words[1])).unwrap_err();
        assert!(err.is_not_found());

        scheduler.store().deactivate_word_list(list).unwrap();
        let err = scheduler.start_practicing("ala", Subject::Word(words[0])).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_start_practicing_requires_learner() {
        let (scheduler, _, words) = seeded();
        let err = scheduler.start_practicing("  ", Subject::Word(words[0])).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidInput(_)));
    }

    #[test]
    fn test_padded_learner_id_matches_everywhere() {
        let (scheduler, _, words) = seeded();
        let record = scheduler.start_practicing(" ala ", Subject::Word(words[0])).unwrap();
        assert_eq!(record.learner_id, "ala");

        assert_eq!(scheduler.not_started(" ala ").unwrap().len(), 1);
        scheduler.submit_review(record.id, Grade::Good, t0()).unwrap();
        assert_eq!(scheduler.get_due("ala ", t0() + Duration::days(1)).unwrap().len(), 1);
        assert_eq!(scheduler.records_for("\tala").unwrap().len(), 1);
        assert!(matches!(
            scheduler.get_due(" ", t0()),
            Err(SchedulerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_submit_review_unknown_record() {
        let (scheduler, _, _) = seeded();
        let err = scheduler.submit_review(42, Grade::Good, t0()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_submit_review_scenario() {
        let (scheduler, _, words) = seeded();
        let record = scheduler.start_practicing("ala", Subject::Word(words[0])).unwrap();

        let first = scheduler.submit_review(record.id, Grade::Easy, t0()).unwrap();
        assert_eq!(first.repetition_count, 1);
        assert_eq!(first.next_review, Some(t0() + Duration::days(1)));
        assert!(first.easiness_factor > 2.5);
        assert_eq!(first.version, 1);

        let t1 = t0() + Duration::days(1);
        let second = scheduler.submit_review(record.id, Grade::Easy, t1).unwrap();
        assert_eq!(second.repetition_count, 2);
        assert!(second.interval_days > first.interval_days);

        let t2 = t1 + Duration::days(6);
        let third = scheduler.submit_review(record.id, Grade::Hard, t2).unwrap();
        assert_eq!(third.repetition_count, 0);
        assert_eq!(third.next_review, Some(t2 + Duration::days(1)));
        assert_eq!(third.version, 3);

        let stored = scheduler.store().load_by_id(record.id).unwrap().unwrap();
        assert_eq!(stored, third);
    }

    #[test]
    fn test_fractional_second_review_matches_stored_record() {
        let (scheduler, _, words) = seeded();
        let record = scheduler.start_practicing("ala", Subject::Word(words[0])).unwrap();
        let now = t0() + Duration::milliseconds(700);

        let returned = scheduler.submit_review(record.id, Grade::Good, now).unwrap();
        let stored = scheduler.store().load_by_id(record.id).unwrap().unwrap();
        assert_eq!(returned, stored);
        assert_eq!(returned.last_reviewed, Some(t0()));

        let due_at = t0() + Duration::days(1);
        let due = scheduler.get_due("ala", due_at + Duration::milliseconds(400)).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].next_review, Some(due_at));
        assert!(scheduler
            .get_due("ala", due_at - Duration::milliseconds(300))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_sequential_submissions_use_persisted_state() {
        let (scheduler, _, words) = seeded();
        let record = scheduler.start_practicing("ala", Subject::Word(words[0])).unwrap();
        let t1 = t0();
        let t2 = t0() + Duration::hours(30);

        scheduler.submit_review(record.id, Grade::Good, t1).unwrap();
        let latest = scheduler.submit_review(record.id, Grade::Good, t2).unwrap();

        assert_eq!(latest.last_reviewed, Some(t2));
        // Second repetition: 6 days, derived from the post-first state
        assert_eq!(latest.next_review, Some(t2 + Duration::days(6)));
    }

    #[test]
    fn test_get_due_filters_and_orders() {
        let (scheduler, list, words) = seeded();
        let a = scheduler.start_practicing("ala", Subject::Word(words[0])).unwrap();
        let b = scheduler.start_practicing("ala", Subject::Word(words[1])).unwrap();
        let c = scheduler.start_practicing("ala", Subject::Word(words[2])).unwrap();
        let never = scheduler.start_practicing("ala", Subject::WordList(list)).unwrap();

        // a due on day 2, b due on day 1, c due on day 7 (second repetition)
        scheduler.submit_review(a.id, Grade::Good, t0() + Duration::days(1)).unwrap();
        scheduler.submit_review(b.id, Grade::Good, t0()).unwrap();
        scheduler.submit_review(c.id, Grade::Good, t0()).unwrap();
        scheduler.submit_review(c.id, Grade::Good, t0() + Duration::days(1)).unwrap();

        let now = t0() + Duration::days(3);
        let due = scheduler.get_due("ala", now).unwrap();
        let ids: Vec<_> = due.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
        assert!(due.iter().all(|r| r.next_review.is_some_and(|d| d <= now)));
        assert!(!ids.contains(&never.id));

        let waiting = scheduler.not_started("ala").unwrap();
        assert_eq!(waiting.len(), 1);
        assert_eq!(waiting[0].id, never.id);
    }

    #[test]
    fn test_get_due_empty_for_unknown_learner() {
        let (scheduler, _, _) = seeded();
        assert!(scheduler.get_due("nobody", t0()).unwrap().is_empty());
    }

    /// Lets another writer update the record right before each of our saves.
    struct RacingStore {
        inner: SqliteStore,
        races_left: AtomicU32,
    }

    impl SubjectCatalog for RacingStore {
        fn exists(&self, subject: Subject) -> store::Result<bool> {
            self.inner.exists(subject)
        }

        fn is_active(&self, subject: Subject) -> store::Result<bool> {
            self.inner.is_active(subject)
        }
    }

    impl RecordStore for RacingStore {
        fn load(&self, learner_id: &str, subject: Subject) -> store::Result<Option<SchedulingRecord>> {
            self.inner.load(learner_id, subject)
        }

        fn load_by_id(&self, id: RecordId) -> store::Result<Option<SchedulingRecord>> {
            self.inner.load_by_id(id)
        }

        fn insert(&self, learner_id: &str, subject: Subject) -> store::Result<SchedulingRecord> {
            self.inner.insert(learner_id, subject)
        }

        fn save(&self, record: &SchedulingRecord) -> store::Result<SchedulingRecord> {
            if self.races_left.load(Ordering::SeqCst) > 0 {
                self.races_left.fetch_sub(1, Ordering::SeqCst);
                let theirs = self.inner.load_by_id(record.id)?.ok_or(StorageError::Poisoned)?;
                self.inner.save(&theirs.reviewed(Grade::Easy, t0()))?;
            }
            self.inner.save(record)
        }

        fn query_due(&self, learner_id: &str, now: DateTime<Utc>) -> store::Result<Vec<SchedulingRecord>> {
            self.inner.query_due(learner_id, now)
        }

        fn query_not_started(&self, learner_id: &str) -> store::Result<Vec<SchedulingRecord>> {
            self.inner.query_not_started(learner_id)
        }

        fn records_for(&self, learner_id: &str) -> store::Result<Vec<SchedulingRecord>> {
            self.inner.records_for(learner_id)
        }
    }

    fn racing(races: u32) -> (Scheduler<RacingStore>, RecordId) {
        let inner = SqliteStore::open_in_memory().unwrap();
        inner.new_word_list("Polish").unwrap();
        let word = inner.add_word("Polish", "cześć", "hello").unwrap();
        let record = inner.insert("ala", Subject::Word(word)).unwrap();
        let store = RacingStore {
            inner,
            races_left: AtomicU32::new(races),
        };
        (Scheduler::new(store), record.id)
    }

    #[test]
    fn test_stale_write_retries_on_fresh_state() {
        let (scheduler, id) = racing(1);
        let later = t0() + Duration::days(1);

        let saved = scheduler.submit_review(id, Grade::Good, later).unwrap();

        // The competing Easy review landed first; ours builds on top of it
        assert_eq!(saved.version, 2);
        assert_eq!(saved.repetition_count, 2);
        assert_eq!(saved.last_reviewed, Some(later));
        assert_eq!(saved.next_review, Some(later + Duration::days(6)));
    }

    #[test]
    fn test_stale_write_budget_exhausted_is_conflict() {
        let (scheduler, id) = racing(5);
        let scheduler = scheduler.with_max_write_attempts(2);

        let err = scheduler.submit_review(id, Grade::Good, t0()).unwrap_err();
        assert!(err.is_conflict());

        // Only the competing writes were persisted
        let stored = scheduler.store().load_by_id(id).unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.last_grade, Some(Grade::Easy));
    }
}
