//! Per-(learner, subject) scheduling state.
//!
//! Records are values: a review produces a new record through
//! [`SchedulingRecord::reviewed`] and only the store bumps `version`.

use super::sm2::{self, DEFAULT_EASINESS};
use super::{Grade, ReviewState};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type RecordId = i64;

/// The thing being scheduled: a single word or a whole word list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum Subject {
    Word(i64),
    WordList(i64),
}

impl Subject {
    pub fn kind(&self) -> &'static str {
        match self {
            Subject::Word(_) => "word",
            Subject::WordList(_) => "word_list",
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Subject::Word(id) | Subject::WordList(id) => *id,
        }
    }

    /// Inverse of `(kind(), id())`, used when reading rows back.
    pub fn from_parts(kind: &str, id: i64) -> Option<Self> {
        match kind {
            "word" => Some(Subject::Word(id)),
            "word_list" => Some(Subject::WordList(id)),
            _ => None,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingRecord {
    pub id: RecordId,
    pub learner_id: String,
    #[serde(rename = "subjectId")]
    pub subject: Subject,
    pub repetition_count: u32,
    pub easiness_factor: f64,
    pub interval_days: i64,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub next_review: Option<DateTime<Utc>>,
    pub last_grade: Option<Grade>,
    /// Optimistic concurrency token, incremented by every persisted write.
    pub version: u64,
}

impl SchedulingRecord {
    /// A freshly started record that has not been reviewed yet.
    pub fn started(id: RecordId, learner_id: impl Into<String>, subject: Subject) -> Self {
        Self {
            id,
            learner_id: learner_id.into(),
            subject,
            repetition_count: 0,
            easiness_factor: DEFAULT_EASINESS,
            interval_days: 0,
            last_reviewed: None,
            next_review: None,
            last_grade: None,
            version: 0,
        }
    }

    pub fn review_state(&self) -> ReviewState {
        ReviewState {
            repetition_count: self.repetition_count,
            easiness_factor: self.easiness_factor,
            interval_days: self.interval_days,
            last_reviewed: self.last_reviewed,
        }
    }

    /// Returns the record as it stands after `grade` was given at `now`.
    /// Identity and `version` are carried over unchanged. `now` is truncated
    /// to whole seconds, the precision records are stored with.
    pub fn reviewed(&self, grade: Grade, now: DateTime<Utc>) -> Self {
        let now = now.trunc_subsecs(0);
        let outcome = sm2::compute_next(&self.review_state(), grade, now);
        Self {
            repetition_count: outcome.repetition_count,
            easiness_factor: outcome.easiness_factor,
            interval_days: outcome.interval_days,
            last_reviewed: Some(now),
            next_review: Some(outcome.next_review),
            last_grade: Some(grade),
            ..self.clone()
        }
    }

    pub fn is_started_only(&self) -> bool {
        self.next_review.is_none()
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review.is_some_and(|due| due <= now)
    }
}
