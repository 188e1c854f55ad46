// src/store/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::ExamStore;
use crate::{
    error::AppError,
    models::{
        attempt::{Attempt, AttemptSubmission, ClaimOutcome},
        exam::Exam,
        question::RawQuestion,
    },
};

#[derive(Default)]
struct Tables {
    exams: HashMap<Uuid, Exam>,
    questions: HashMap<Uuid, Vec<RawQuestion>>,
    attempts: HashMap<(Uuid, Uuid), Attempt>,
}

/// In-process store. One write lock covers the whole claim, which gives the
/// same per-pair uniqueness as the database constraint.
#[derive(Default)]
pub struct MemoryExamStore {
    tables: RwLock<Tables>,
}

impl MemoryExamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_exam(&self, exam: Exam) {
        self.tables.write().await.exams.insert(exam.id, exam);
    }

    pub async fn insert_question(&self, question: RawQuestion) {
        let mut tables = self.tables.write().await;
        let list = tables.questions.entry(question.exam_id).or_default();
        list.push(question);
        list.sort_by_key(|q| q.display_order);
    }
}

#[async_trait]
impl ExamStore for MemoryExamStore {
    async fn get_exam(&self, exam_id: Uuid) -> Result<Option<Exam>, AppError> {
        Ok(self.tables.read().await.exams.get(&exam_id).cloned())
    }

    async fn get_exam_questions(&self, exam_id: Uuid) -> Result<Vec<RawQuestion>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .questions
            .get(&exam_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_attempt(&self, exam_id: Uuid, student_id: Uuid) -> Result<Option<Attempt>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .attempts
            .get(&(exam_id, student_id))
            .cloned())
    }

    async fn claim_attempt(
        &self,
        exam_id: Uuid,
        student_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<ClaimOutcome, AppError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.attempts.get(&(exam_id, student_id)) {
            return Ok(ClaimOutcome::Existing(existing.clone()));
        }

        let attempt = Attempt::in_progress(exam_id, student_id, started_at);
        tables.attempts.insert((exam_id, student_id), attempt.clone());
        Ok(ClaimOutcome::Claimed(attempt))
    }

    async fn submit_attempt(&self, submission: &AttemptSubmission) -> Result<Attempt, AppError> {
        let mut tables = self.tables.write().await;
        let attempt = tables
            .attempts
            .get_mut(&(submission.exam_id, submission.student_id))
            .ok_or(AppError::NotFound("Exam attempt not found".to_string()))?;

        if attempt.is_submitted() {
            return Err(AppError::Conflict("Exam attempt already submitted".to_string()));
        }

        attempt.status = submission.status().to_string();
        attempt.score = Some(submission.score);
        attempt.total_marks = Some(submission.total_marks);
        attempt.answers = Some(Json(submission.answers.clone()));
        attempt.completed_at = Some(Utc::now());

        Ok(attempt.clone())
    }

    async fn list_attempts(
        &self,
        exam_id: Uuid,
        status: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Attempt>, AppError> {
        let tables = self.tables.read().await;
        let mut attempts: Vec<Attempt> = tables
            .attempts
            .values()
            .filter(|a| a.exam_id == exam_id)
            .filter(|a| status.is_none_or(|s| a.status == s))
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        attempts.truncate(limit.max(0) as usize);
        Ok(attempts)
    }
}
