// src/store/mod.rs

//! The attempt-store and exam-data collaborator.
//!
//! The exam core never talks to a database directly; it goes through
//! `ExamStore`. `PgExamStore` is the deployed implementation, `MemoryExamStore`
//! keeps everything in process.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        attempt::{Attempt, AttemptSubmission, ClaimOutcome},
        exam::Exam,
        question::RawQuestion,
    },
};

pub use memory::MemoryExamStore;
pub use postgres::PgExamStore;

#[async_trait]
pub trait ExamStore: Send + Sync {
    async fn get_exam(&self, exam_id: Uuid) -> Result<Option<Exam>, AppError>;

    /// Raw questions ordered by display order.
    async fn get_exam_questions(&self, exam_id: Uuid) -> Result<Vec<RawQuestion>, AppError>;

    async fn find_attempt(&self, exam_id: Uuid, student_id: Uuid) -> Result<Option<Attempt>, AppError>;

    /// Records a new in-progress attempt unless the pair already has one.
    /// Check and insert happen as one step at the store.
    async fn claim_attempt(
        &self,
        exam_id: Uuid,
        student_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<ClaimOutcome, AppError>;

    /// Freezes the attempt with its answers and score.
    /// Fails with `NotFound` when no attempt was claimed and `Conflict` when it is already frozen.
    async fn submit_attempt(&self, submission: &AttemptSubmission) -> Result<Attempt, AppError>;

    /// Attempts for one exam, newest first.
    async fn list_attempts(
        &self,
        exam_id: Uuid,
        status: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Attempt>, AppError>;
}
