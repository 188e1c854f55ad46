// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};
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

const ATTEMPT_COLUMNS: &str = r#"
    id, exam_id, student_id, status, score, total_marks, answers, started_at, completed_at
"#;

#[derive(Clone)]
pub struct PgExamStore {
    pool: PgPool,
}

impl PgExamStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExamStore for PgExamStore {
    async fn get_exam(&self, exam_id: Uuid) -> Result<Option<Exam>, AppError> {
        sqlx::query_as::<_, Exam>(
            r#"
            SELECT
                id, course_id, title, description, duration_minutes,
                total_marks, passing_marks, start_time, end_time, is_active, created_at
            FROM exams
            WHERE id = $1
            "#,
        )
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch exam {}: {:?}", exam_id, e);
            AppError::InternalServerError(e.to_string())
        })
    }

    async fn get_exam_questions(&self, exam_id: Uuid) -> Result<Vec<RawQuestion>, AppError> {
        sqlx::query_as::<_, RawQuestion>(
            r#"
            SELECT
                id, exam_id, display_order, question_text, options, correct_answer, marks
            FROM exam_questions
            WHERE exam_id = $1
            ORDER BY display_order, created_at
            "#,
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch questions for exam {}: {:?}", exam_id, e);
            AppError::InternalServerError(e.to_string())
        })
    }

    async fn find_attempt(&self, exam_id: Uuid, student_id: Uuid) -> Result<Option<Attempt>, AppError> {
        let sql = format!(
            "SELECT {} FROM exam_attempts WHERE exam_id = $1 AND student_id = $2",
            ATTEMPT_COLUMNS
        );
        let attempt = sqlx::query_as::<_, Attempt>(&sql)
            .bind(exam_id)
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(attempt)
    }

    async fn claim_attempt(
        &self,
        exam_id: Uuid,
        student_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<ClaimOutcome, AppError> {
        // UNIQUE (exam_id, student_id) makes the insert the lock.
        let insert = format!(
            r#"
            INSERT INTO exam_attempts (id, exam_id, student_id, status, started_at)
            VALUES ($1, $2, $3, 'in_progress', $4)
            ON CONFLICT (exam_id, student_id) DO NOTHING
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        );

        let claimed = sqlx::query_as::<_, Attempt>(&insert)
            .bind(Uuid::new_v4())
            .bind(exam_id)
            .bind(student_id)
            .bind(started_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to claim exam attempt: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

        if let Some(attempt) = claimed {
            return Ok(ClaimOutcome::Claimed(attempt));
        }

        self.find_attempt(exam_id, student_id)
            .await?
            .map(ClaimOutcome::Existing)
            .ok_or(AppError::InternalServerError(
                "Attempt conflict reported but no attempt found".to_string(),
            ))
    }

    async fn submit_attempt(&self, submission: &AttemptSubmission) -> Result<Attempt, AppError> {
        let update = format!(
            r#"
            UPDATE exam_attempts
            SET status = $1,
                score = $2,
                total_marks = $3,
                answers = $4,
                completed_at = NOW()
            WHERE exam_id = $5 AND student_id = $6 AND status = 'in_progress'
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        );

        let updated = sqlx::query_as::<_, Attempt>(&update)
            .bind(submission.status())
            .bind(submission.score)
            .bind(submission.total_marks)
            .bind(Json(&submission.answers))
            .bind(submission.exam_id)
            .bind(submission.student_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to submit exam attempt: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

        match updated {
            Some(attempt) => Ok(attempt),
            None => match self.find_attempt(submission.exam_id, submission.student_id).await? {
                Some(_) => Err(AppError::Conflict("Exam attempt already submitted".to_string())),
                None => Err(AppError::NotFound("Exam attempt not found".to_string())),
            },
        }
    }

    async fn list_attempts(
        &self,
        exam_id: Uuid,
        status: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Attempt>, AppError> {
        let mut query_builder = QueryBuilder::<Postgres>::new("SELECT ");
        query_builder.push(ATTEMPT_COLUMNS);
        query_builder.push(" FROM exam_attempts WHERE exam_id = ");
        query_builder.push_bind(exam_id);

        if let Some(status) = status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
        }

        query_builder.push(" ORDER BY started_at DESC LIMIT ");
        query_builder.push_bind(limit);

        let attempts: Vec<Attempt> = query_builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        Ok(attempts)
    }
}
