// src/models/exam.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Represents the 'exams' table in the database.
/// Authored elsewhere; the exam-taking core only ever reads it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i32,

    /// Declared total. When absent or zero the sum of question marks is used.
    pub total_marks: Option<i32>,

    /// Raw passing threshold, either an absolute mark count or a percentage.
    /// See `exam::scoring::passing_marks`.
    pub passing_marks: Option<i32>,

    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Exam {
    /// Length of the countdown for one attempt.
    pub fn duration_seconds(&self) -> u32 {
        (self.duration_minutes.max(0) as u32).saturating_mul(60)
    }
}
