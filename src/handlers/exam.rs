// src/handlers/exam.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    exam::{normalize, report},
    models::{exam::Exam, question::PublicQuestion},
    store::ExamStore,
    utils::jwt::Claims,
};

pub(crate) async fn load_exam(store: &dyn ExamStore, exam_id: Uuid) -> Result<Exam, AppError> {
    store
        .get_exam(exam_id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))
}

/// Exam metadata.
pub async fn get_exam(
    State(store): State<Arc<dyn ExamStore>>,
    Path(exam_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let exam = load_exam(store.as_ref(), exam_id).await?;
    Ok(Json(exam))
}

/// Normalized questions without the answer key.
pub async fn get_exam_questions(
    State(store): State<Arc<dyn ExamStore>>,
    Path(exam_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    load_exam(store.as_ref(), exam_id).await?;
    let raw = store.get_exam_questions(exam_id).await?;

    let questions: Vec<PublicQuestion> = normalize::normalize_all(&raw)
        .iter()
        .map(PublicQuestion::from)
        .collect();

    Ok(Json(questions))
}

/// Read-only result of the caller's submitted attempt.
///
/// Total and passing marks are recomputed from the exam and its questions,
/// since the exam row may not carry a total.
pub async fn get_result(
    State(store): State<Arc<dyn ExamStore>>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.student_id()?;

    let attempt = store
        .find_attempt(exam_id, student_id)
        .await?
        .ok_or(AppError::NotFound("No attempt for this exam".to_string()))?;

    let exam = load_exam(store.as_ref(), exam_id).await?;
    let questions = normalize::normalize_all(&store.get_exam_questions(exam_id).await?);

    let report = report::prior_result(&exam, &questions, &attempt)?;
    Ok(Json(report))
}
