// src/handlers/quiz.rs

use std::{sync::Arc, time::Duration};

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::{
        history::{HistoricalQuizRecord, HistoryQuery, HistoryResponse, HistorySummary},
        question::{GenerateQuizRequest, PublicQuestion},
        quiz_result::{CheckAnswerRequest, QuizResponse, SubmissionResponse, SubmitQuizRequest},
        session::QuizSession,
    },
    quiz::{grader, parser},
    services::{generator::TextGenerator, store::HistoryStore},
    utils::jwt::{Claims, sign_quiz_token, verify_quiz_token},
};

/// Resolves a quiz token to the caller's open quiz.
async fn open_quiz(
    store: &dyn HistoryStore,
    config: &Config,
    claims: &Claims,
    quiz_token: &str,
) -> Result<QuizSession, AppError> {
    let token = verify_quiz_token(quiz_token, &config.jwt_secret, &claims.sub)?;

    let quiz = store
        .quiz_session(token.jti)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

    if quiz.learner_id != claims.sub {
        return Err(AppError::AuthError("Quiz belongs to another learner".to_string()));
    }
    if quiz.completed_at.is_some() {
        return Err(AppError::Conflict("Quiz has already been submitted".to_string()));
    }
    Ok(quiz)
}

/// Generates a quiz on a learner-supplied topic.
///
/// * Asks the text model for questions, bounded by the configured timeout.
/// * Falls back to the built-in question set when generation fails or times out.
/// * Keeps the quiz server-side and returns the questions without answers,
///   plus a signed token naming the quiz.
pub async fn generate_quiz(
    State(generator): State<Arc<dyn TextGenerator>>,
    State(store): State<Arc<dyn HistoryStore>>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<GenerateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let topic = req.topic.trim();
    let timeout = Duration::from_secs(config.generator.timeout_secs);

    let questions = match tokio::time::timeout(
        timeout,
        parser::generate(generator.as_ref(), topic, req.difficulty, req.num_questions),
    )
    .await
    {
        Ok(questions) => questions,
        Err(_) => {
            tracing::warn!(
                "Question generation for '{}' timed out after {:?}, using fallback set",
                topic,
                timeout
            );
            parser::fallback_quiz(topic, req.num_questions)
        }
    };

    let public_questions: Vec<PublicQuestion> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| PublicQuestion::from_question(i, q))
        .collect();

    let time_limit_seconds = req.time_limit_minutes.map(|minutes| minutes * 60);
    let quiz = QuizSession::new(
        claims.sub.as_str(),
        topic,
        req.difficulty,
        questions,
        time_limit_seconds,
        Utc::now(),
    );
    store.start_quiz(&quiz).await?;

    // The token outlives the time limit so a late submission is still graded.
    let expires_in = config.quiz_token_ttl + time_limit_seconds.unwrap_or(0);
    let quiz_token = sign_quiz_token(&claims.sub, quiz.id, &config.jwt_secret, expires_in)?;

    tracing::info!(
        "Issued quiz {} on '{}' ({} questions) to {}",
        quiz.id,
        topic,
        quiz.questions.len(),
        claims.sub
    );

    Ok((
        StatusCode::CREATED,
        Json(QuizResponse {
            quiz_id: quiz.id,
            quiz_token,
            topic: topic.to_string(),
            questions: public_questions,
            time_limit_seconds,
            expires_in,
        }),
    ))
}

/// Checks one answer of an in-progress quiz.
///
/// The first checked answer for a question is final: checking again
/// evaluates the locked answer, and submission grades it.
pub async fn check_answer(
    State(store): State<Arc<dyn HistoryStore>>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CheckAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = open_quiz(store.as_ref(), &config, &claims, &req.quiz_token).await?;

    if quiz.is_time_up(Utc::now()) {
        return Err(AppError::Conflict(
            "Time limit reached, submit the quiz".to_string(),
        ));
    }

    let question = quiz.questions.get(req.question_index).ok_or_else(|| {
        AppError::NotFound(format!("Question {} not found in quiz", req.question_index))
    })?;

    let answer = store
        .lock_answer(quiz.id, req.question_index, &req.answer)
        .await?;

    Ok(Json(grader::evaluate_answer(question, &answer)))
}

/// Submits a learner's answers and grades the quiz.
///
/// * Verifies the quiz token belongs to the caller and the quiz is still open.
/// * Rejects answers keyed past the last question.
/// * After the time limit only answers checked in time count, and the time
///   taken is the limit.
/// * Grades, stores the attempt in the learner's history and returns the breakdown.
/// * A quiz is graded once; submitting it again is a 409.
pub async fn submit_quiz(
    State(store): State<Arc<dyn HistoryStore>>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = open_quiz(store.as_ref(), &config, &claims, &req.quiz_token).await?;

    grader::validate_submission(&quiz.questions, &req.answers)?;

    let now = Utc::now();
    let time_up = quiz.is_time_up(now);
    let answers = quiz.answers_to_grade(&req.answers, now);

    let result = grader::score(&quiz.questions, &answers, quiz.time_taken(now));
    let record = HistoricalQuizRecord {
        id: quiz.id,
        ..HistoricalQuizRecord::from_result(&quiz.topic, quiz.difficulty, &result, now)
    };

    store
        .complete_quiz(&claims.sub, claims.name.as_deref(), &record)
        .await?;

    tracing::info!(
        "Learner {} scored {}/{} on '{}'{}",
        claims.sub,
        result.score,
        result.total_questions,
        quiz.topic,
        if time_up { " (time up)" } else { "" }
    );

    let grade = grader::letter_grade(result.percentage);
    let feedback = grader::feedback_for(result.percentage);

    Ok(Json(SubmissionResponse {
        quiz_id: record.id,
        result,
        grade,
        feedback,
        time_up,
    }))
}

/// Lists the caller's completed quizzes, oldest first, with totals.
///
/// Optional query filters: `topic`, `difficulty`, `min_score`, `days`.
pub async fn get_history(
    State(store): State<Arc<dyn HistoryStore>>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let records: Vec<HistoricalQuizRecord> = store
        .history(&claims.sub)
        .await?
        .into_iter()
        .filter(|record| query.matches(record, now))
        .collect();

    Ok(Json(HistoryResponse {
        summary: HistorySummary::from_records(&records),
        records,
    }))
}
