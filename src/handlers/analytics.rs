// src/handlers/analytics.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::analytics::{ClassOverview, PerformanceReport},
    quiz::{analyzer, recommend::recommend},
    services::store::HistoryStore,
    utils::jwt::Claims,
};

/// Builds the full report for one learner from their stored history.
async fn build_report(
    store: &dyn HistoryStore,
    learner_id: &str,
) -> Result<PerformanceReport, AppError> {
    let profile = store.profile(learner_id).await?;
    let history = store.history(learner_id).await?;

    let topic_performance = analyzer::analyze_topics(&history);
    let difficulty_analysis = analyzer::analyze_difficulty(&history);
    let recommendations = recommend(&topic_performance, &difficulty_analysis);

    Ok(PerformanceReport {
        profile,
        topic_performance,
        difficulty_analysis,
        recommendations,
    })
}

/// Get the current learner's analytics and study recommendations.
pub async fn get_my_analytics(
    State(store): State<Arc<dyn HistoryStore>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let report = build_report(store.as_ref(), &claims.sub).await?;
    Ok(Json(report))
}

/// Class totals plus every learner profile.
/// Educator only.
pub async fn list_students(
    State(store): State<Arc<dyn HistoryStore>>,
) -> Result<impl IntoResponse, AppError> {
    let profiles = store.profiles().await?;
    Ok(Json(ClassOverview::from_profiles(profiles)))
}

/// Get analytics for any learner.
/// Educator only.
pub async fn get_student_analytics(
    State(store): State<Arc<dyn HistoryStore>>,
    Path(learner_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let report = build_report(store.as_ref(), &learner_id).await?;
    if report.profile.is_none() {
        return Err(AppError::NotFound(format!("Learner '{}' not found", learner_id)));
    }
    Ok(Json(report))
}
