// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{analytics, quiz},
    state::AppState,
    utils::jwt::{auth_middleware, educator_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (quiz, analytics, educator).
/// * Every route requires a verified identity token.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let quiz_routes = Router::new()
        .route("/generate", post(quiz::generate_quiz))
        .route("/check", post(quiz::check_answer))
        .route("/submit", post(quiz::submit_quiz))
        .route("/history", get(quiz::get_history));

    let educator_routes = Router::new()
        .route("/students", get(analytics::list_students))
        .route(
            "/students/{learner_id}/analytics",
            get(analytics::get_student_analytics),
        )
        // Runs after auth_middleware (layers apply outside in)
        .route_layer(middleware::from_fn(educator_middleware));

    Router::new()
        .nest("/api/quiz", quiz_routes)
        .route("/api/analytics", get(analytics::get_my_analytics))
        .nest("/api/educator", educator_routes)
        // route_layer keeps unknown paths a plain 404
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
