// src/models/attempt.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use uuid::Uuid;
use validator::Validate;

/// Chosen option index per question.
pub type AnswerMap = BTreeMap<Uuid, i64>;

pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_PASSED: &str = "passed";
pub const STATUS_FAILED: &str = "failed";

/// Represents the 'exam_attempts' table in the database.
/// At most one row exists per (exam_id, student_id).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub student_id: Uuid,

    /// 'in_progress', 'passed' or 'failed'.
    pub status: String,

    pub score: Option<i32>,
    pub total_marks: Option<i32>,
    pub answers: Option<Json<AnswerMap>>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Attempt {
    pub fn in_progress(exam_id: Uuid, student_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            exam_id,
            student_id,
            status: STATUS_IN_PROGRESS.to_string(),
            score: None,
            total_marks: None,
            answers: None,
            started_at,
            completed_at: None,
        }
    }

    /// Submitted attempts are frozen.
    pub fn is_submitted(&self) -> bool {
        self.status != STATUS_IN_PROGRESS
    }
}

/// Result of the atomic grant-and-lock at the store.
#[derive(Debug, Clone)]
pub enum ClaimOutcome {
    /// A new in-progress attempt was recorded for the caller.
    Claimed(Attempt),
    /// The pair already had an attempt; nothing was written.
    Existing(Attempt),
}

/// Everything persisted when an attempt is frozen.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptSubmission {
    pub exam_id: Uuid,
    pub student_id: Uuid,
    pub answers: AnswerMap,
    pub score: i32,
    pub total_marks: i32,
    pub passed: bool,
}

impl AttemptSubmission {
    pub fn status(&self) -> &'static str {
        if self.passed { STATUS_PASSED } else { STATUS_FAILED }
    }
}

/// DTO for recording an answer.
/// The option index is trusted as sent.
#[derive(Debug, Deserialize)]
pub struct SelectAnswerRequest {
    pub question_id: Uuid,
    pub option_index: i64,
}

/// DTO for moving the question cursor.
#[derive(Debug, Deserialize)]
pub struct GoToQuestionRequest {
    pub index: usize,
}

/// Query params for the staff attempt listing.
#[derive(Debug, Deserialize, Validate)]
pub struct AttemptListParams {
    #[validate(range(min = 1, max = 200))]
    pub limit: Option<i64>,

    /// Optional status filter: 'in_progress', 'passed' or 'failed'.
    #[validate(custom(function = validate_status))]
    pub status: Option<String>,
}

fn validate_status(status: &str) -> Result<(), validator::ValidationError> {
    match status {
        STATUS_IN_PROGRESS | STATUS_PASSED | STATUS_FAILED => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_attempt_status")),
    }
}
