// src/handlers/session.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppError,
    exam::runner::{self, SessionRegistry, SharedSession},
    models::attempt::{GoToQuestionRequest, SelectAnswerRequest},
    store::ExamStore,
    utils::jwt::Claims,
};

/// Finished sessions leave the registry, so a missing entry with a submitted
/// attempt behind it is a conflict rather than a 404.
async fn hosted_session(
    store: &dyn ExamStore,
    registry: &SessionRegistry,
    exam_id: Uuid,
    student_id: Uuid,
) -> Result<SharedSession, AppError> {
    if let Some(session) = registry.get(exam_id, student_id).await {
        return Ok(session);
    }

    match store.find_attempt(exam_id, student_id).await? {
        Some(attempt) if attempt.is_submitted() => Err(AppError::Conflict(
            "Exam already submitted".to_string(),
        )),
        _ => Err(AppError::NotFound("No exam session in progress".to_string())),
    }
}

/// Opens the caller's session: runs the eligibility gate and, when granted,
/// claims the attempt and starts the countdown.
///
/// An ineligible student gets a `blocked` view, not an error.
pub async fn start_session(
    State(store): State<Arc<dyn ExamStore>>,
    State(registry): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.student_id()?;

    let session = runner::start_session(store, &registry, exam_id, student_id, Utc::now()).await?;
    let view = session.lock().await.view();

    let status = if view.state == "active" {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(view)))
}

/// Current state of the caller's session.
pub async fn get_session(
    State(store): State<Arc<dyn ExamStore>>,
    State(registry): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = hosted_session(store.as_ref(), &registry, exam_id, claims.student_id()?).await?;
    let view = session.lock().await.view();
    Ok(Json(view))
}

pub async fn select_answer(
    State(store): State<Arc<dyn ExamStore>>,
    State(registry): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<Uuid>,
    Json(req): Json<SelectAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = hosted_session(store.as_ref(), &registry, exam_id, claims.student_id()?).await?;

    let mut guard = session.lock().await;
    guard.select_answer(req.question_id, req.option_index)?;
    Ok(Json(guard.view()))
}

pub async fn go_to_question(
    State(store): State<Arc<dyn ExamStore>>,
    State(registry): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<Uuid>,
    Json(req): Json<GoToQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = hosted_session(store.as_ref(), &registry, exam_id, claims.student_id()?).await?;

    let mut guard = session.lock().await;
    guard.go_to_question(req.index)?;
    Ok(Json(guard.view()))
}

/// User submit. Persisting happens afterwards and never blocks the result.
pub async fn submit_session(
    State(store): State<Arc<dyn ExamStore>>,
    State(registry): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = hosted_session(store.as_ref(), &registry, exam_id, claims.student_id()?).await?;
    let report = runner::submit_session(store.as_ref(), &registry, &session).await?;
    Ok(Json(report))
}
