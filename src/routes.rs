// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{exam, session, staff},
    state::AppState,
    utils::jwt::{auth_middleware, staff_middleware},
};

/// Assembles the main application router.
///
/// * Student routes: exam metadata, questions, the exam session and results.
/// * Staff routes: attempt listing.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:5173"),
            HeaderValue::from_static("http://127.0.0.1:5173"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let exam_routes = Router::new()
        .route("/{id}", get(exam::get_exam))
        .route("/{id}/questions", get(exam::get_exam_questions))
        .route("/{id}/result", get(exam::get_result))
        .route(
            "/{id}/session",
            post(session::start_session).get(session::get_session),
        )
        .route("/{id}/session/answers", put(session::select_answer))
        .route("/{id}/session/cursor", put(session::go_to_question))
        .route("/{id}/session/submit", post(session::submit_session))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let staff_routes = Router::new()
        .route("/exams/{id}/attempts", get(staff::list_attempts))
        // Auth first, then the role check
        .layer(middleware::from_fn(staff_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/exams", exam_routes)
        .nest("/api/staff", staff_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
