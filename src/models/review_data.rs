use chrono::{DateTime, Utc};

/// Scheduling state the interval calculator reads.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReviewState {
    pub repetition_count: u32,
    pub easiness_factor: f64,
    pub interval_days: i64,
    pub last_reviewed: Option<DateTime<Utc>>,
}

impl ReviewState {
    /// State of a subject the learner has started but never reviewed.
    pub fn new_subject() -> Self {
        Self {
            repetition_count: 0,
            easiness_factor: super::sm2::DEFAULT_EASINESS,
            interval_days: 0,
            last_reviewed: None,
        }
    }

    pub fn is_first_review(&self) -> bool {
        self.last_reviewed.is_none()
    }
}
