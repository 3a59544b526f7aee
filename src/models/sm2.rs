//! SM-2 (SuperMemo 2) interval calculator adapted to three recall grades.
//!
//! - Grades map to SM-2 quality scores: Hard = 1, Good = 3, Easy = 5
//! - The easiness factor (EF) is updated on every review and never drops below 1.3
//! - Hard resets the repetition count and schedules the subject for tomorrow
//! - Good/Easy grow the interval: 1 day → 6 days → previous interval × EF
//! - The very first review always seeds a 1 day interval
//!
//! The calculator is pure: the caller supplies `now` and receives a new value.

use super::{Grade, ReviewState};
use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_EASINESS: f64 = 2.5;
pub const MIN_EASINESS: f64 = 1.3;
pub const SEED_INTERVAL_DAYS: i64 = 1;
pub const SECOND_INTERVAL_DAYS: i64 = 6;
/// Keeps due dates far inside chrono's representable range.
pub const MAX_INTERVAL_DAYS: i64 = 36_500;

/// Output of one review: the replacement scheduling values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReviewOutcome {
    pub repetition_count: u32,
    pub easiness_factor: f64,
    pub interval_days: i64,
    pub next_review: DateTime<Utc>,
}

/// EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)), floored at 1.3.
pub fn next_easiness(easiness_factor: f64, grade: Grade) -> f64 {
    let q = f64::from(grade.quality());
    let ef = easiness_factor + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02));
    // NaN.max(x) yields x, so a corrupt stored factor also lands on the floor
    ef.max(MIN_EASINESS)
}

/// Computes the scheduling state that follows `grade` given at `now`.
///
/// A passing grade on a reviewed item yields a strictly longer interval,
/// except once it has reached `MAX_INTERVAL_DAYS`, where it stays at the cap.
pub fn compute_next(state: &ReviewState, grade: Grade, now: DateTime<Utc>) -> ReviewOutcome {
    let easiness_factor = next_easiness(state.easiness_factor, grade);

    let (repetition_count, interval_days) = if !grade.is_pass() {
        // Start from the beginning; EF has still been lowered
        (0, SEED_INTERVAL_DAYS)
    } else if state.is_first_review() {
        (state.repetition_count + 1, SEED_INTERVAL_DAYS)
    } else {
        let reps = state.repetition_count + 1;
        let scheduled = match reps {
            1 => SEED_INTERVAL_DAYS,
            2 => SECOND_INTERVAL_DAYS,
            _ => (state.interval_days as f64 * easiness_factor).round() as i64,
        };
        let interval = if state.repetition_count > 0 {
            scheduled.max(state.interval_days + 1)
        } else {
            scheduled
        };
        (reps, interval)
    };

    let interval_days = interval_days.clamp(SEED_INTERVAL_DAYS, MAX_INTERVAL_DAYS);

    ReviewOutcome {
        repetition_count,
        easiness_factor,
        interval_days,
        next_review: now + Duration::days(interval_days),
    }
}
