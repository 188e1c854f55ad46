// src/handlers/staff.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::exam::load_exam,
    models::attempt::AttemptListParams,
    store::ExamStore,
};

const DEFAULT_LIMIT: i64 = 50;

/// Lists attempts for an exam, newest first.
/// Teachers and admins only.
pub async fn list_attempts(
    State(store): State<Arc<dyn ExamStore>>,
    Path(exam_id): Path<Uuid>,
    Query(params): Query<AttemptListParams>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = params.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    load_exam(store.as_ref(), exam_id).await?;

    let attempts = store
        .list_attempts(
            exam_id,
            params.status.as_deref(),
            params.limit.unwrap_or(DEFAULT_LIMIT),
        )
        .await?;

    Ok(Json(attempts))
}
