// src/exam/eligibility.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        attempt::{Attempt, ClaimOutcome},
        exam::Exam,
    },
    store::ExamStore,
};

/// Why a student may not start an attempt. Not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum BlockReason {
    /// The pair already has an attempt. `prior_score` is set once it was submitted.
    AlreadyAttempted { prior_score: Option<i32> },
    NotStarted { scheduled_start: DateTime<Utc> },
    Ended { scheduled_end: DateTime<Utc> },
}

impl BlockReason {
    pub fn message(&self) -> &'static str {
        match self {
            BlockReason::AlreadyAttempted { .. } => "You have already taken this exam",
            BlockReason::NotStarted { .. } => "The exam has not started yet",
            BlockReason::Ended { .. } => "The exam has ended",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Eligibility {
    /// A fresh attempt was recorded for the student and now locks the pair.
    Granted(Attempt),
    Blocked(BlockReason),
}

impl Eligibility {
    pub fn can_attempt(&self) -> bool {
        matches!(self, Eligibility::Granted(_))
    }
}

fn already_attempted(attempt: &Attempt) -> BlockReason {
    BlockReason::AlreadyAttempted {
        prior_score: attempt.is_submitted().then_some(attempt.score).flatten(),
    }
}

/// Decides whether `student_id` may start `exam` at `now`, and if so claims the attempt.
///
/// Granting and claiming are one operation: a grant is only returned once the
/// store has recorded the in-progress attempt. A claim lost to a concurrent
/// request reports `AlreadyAttempted`.
pub async fn check_eligibility(
    store: &dyn ExamStore,
    exam: &Exam,
    student_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Eligibility, AppError> {
    if let Some(attempt) = store.find_attempt(exam.id, student_id).await? {
        tracing::info!(exam_id = %exam.id, %student_id, "exam already attempted");
        return Ok(Eligibility::Blocked(already_attempted(&attempt)));
    }

    if let Some(start) = exam.start_time.filter(|start| now < *start) {
        return Ok(Eligibility::Blocked(BlockReason::NotStarted {
            scheduled_start: start,
        }));
    }

    if let Some(end) = exam.end_time.filter(|end| now > *end) {
        return Ok(Eligibility::Blocked(BlockReason::Ended { scheduled_end: end }));
    }

    match store.claim_attempt(exam.id, student_id, now).await? {
        ClaimOutcome::Claimed(attempt) => {
            tracing::info!(exam_id = %exam.id, %student_id, attempt_id = %attempt.id, "exam attempt granted");
            Ok(Eligibility::Granted(attempt))
        }
        ClaimOutcome::Existing(attempt) => {
            tracing::warn!(exam_id = %exam.id, %student_id, "lost attempt claim to a concurrent request");
            Ok(Eligibility::Blocked(already_attempted(&attempt)))
        }
    }
}
