//! Review session over a learner's due queue.
//! Handles multi-round presentation. Only the first-round grade of each item
//! is submitted to the scheduler; retry rounds are practice within the sitting.

use super::{Catalog, Grade, RecordId, SchedulingRecord};
use crate::error::SchedulerError;
use crate::scheduler::{RecordStore, Scheduler, SubjectCatalog};
use chrono::{DateTime, Utc};

/// One due record as presented to the learner.
#[derive(Clone, Debug)]
pub struct ReviewItem {
    pub record_id: RecordId,
    pub prompt: String,
    pub answer: String,
    pub passed: bool,
}

/// Walks the due queue in rounds.
/// Items graded Hard come back in the next round until they are passed.
pub struct ReviewSession {
    pub learner_id: String,
    pub items: Vec<ReviewItem>,
    pub current_round: Vec<usize>,
    pub current_index: usize,
    pub show_answer: bool,
    pub round_number: usize,
}

impl ReviewSession {
    /// Builds a session from due records, in the order given.
    /// Records whose subject is no longer in the catalog are skipped.
    pub fn from_due(learner_id: &str, due: &[SchedulingRecord], catalog: &Catalog) -> Self {
        let items: Vec<ReviewItem> = due
            .iter()
            .filter_map(|record| {
                catalog
                    .prompt_for(record.subject)
                    .map(|(prompt, answer)| ReviewItem {
                        record_id: record.id,
                        prompt,
                        answer,
                        passed: false,
                    })
            })
            .collect();

        Self {
            learner_id: learner_id.to_string(),
            current_round: (0..items.len()).collect(),
            items,
            current_index: 0,
            show_answer: false,
            round_number: 1,
        }
    }

    pub fn current_item(&self) -> Option<&ReviewItem> {
        self.current_round
            .get(self.current_index)
            .and_then(|&idx| self.items.get(idx))
    }

    pub fn toggle_answer(&mut self) {
        self.show_answer = !self.show_answer;
    }

    /// Grades the current item and moves on.
    ///
    /// In the first round the grade is submitted and the updated record is
    /// returned. Retry rounds only track whether the item was passed, so
    /// they return `None`.
    pub fn grade_current<S>(
        &mut self,
        scheduler: &Scheduler<S>,
        grade: Grade,
        now: DateTime<Utc>,
    ) -> Result<Option<SchedulingRecord>, SchedulerError>
    where
        S: SubjectCatalog + RecordStore,
    {
        let idx = *self
            .current_round
            .get(self.current_index)
            .ok_or_else(|| SchedulerError::InvalidInput("review session is finished".to_string()))?;

        let updated = if self.round_number == 1 {
            // On failure the item stays current so the learner can grade again
            Some(scheduler.submit_review(self.items[idx].record_id, grade, now)?)
        } else {
            None
        };
        self.items[idx].passed = grade.is_pass();
        self.advance();
        Ok(updated)
    }

    fn advance(&mut self) {
        self.show_answer = false;
        if self.current_index + 1 < self.current_round.len() {
            self.current_index += 1;
        } else {
            self.start_next_round();
        }
    }

    /// Starts a new round with the items graded Hard.
    /// If none remain, the session is complete.
    fn start_next_round(&mut self) {
        let failed: Vec<usize> = self
            .current_round
            .iter()
            .copied()
            .filter(|&idx| !self.items[idx].passed)
            .collect();

        if !failed.is_empty() {
            self.round_number += 1;
        }
        self.current_round = failed;
        self.current_index = 0;
    }

    pub fn passed_count(&self) -> usize {
        self.current_round
            .iter()
            .filter(|&&idx| self.items[idx].passed)
            .count()
    }

    pub fn total_count(&self) -> usize {
        self.current_round.len()
    }

    pub fn remaining_count(&self) -> usize {
        self.total_count() - self.passed_count()
    }

    pub fn is_completed(&self) -> bool {
        self.current_round.is_empty()
    }

    pub fn phase_message(&self) -> String {
        if self.round_number == 1 {
            format!("Round {}: {} due", self.round_number, self.total_count())
        } else {
            format!(
                "Round {} (Retry): {} to repeat",
                self.round_number,
                self.total_count()
            )
        }
    }
}
