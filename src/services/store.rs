// src/services/store.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool, types::Json};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        history::{HistoricalQuizRecord, LearnerProfile},
        question::{Difficulty, Question},
        quiz_result::{AnswerMap, QuestionBreakdown},
        session::QuizSession,
    },
};

/// Per-learner quiz history and running profile.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Appends a record and folds it into the learner's profile, creating the profile if needed.
    async fn record_result(
        &self,
        learner_id: &str,
        display_name: Option<&str>,
        record: &HistoricalQuizRecord,
    ) -> Result<(), AppError>;

    /// All records for a learner, oldest first.
    async fn history(&self, learner_id: &str) -> Result<Vec<HistoricalQuizRecord>, AppError>;

    async fn profile(&self, learner_id: &str) -> Result<Option<LearnerProfile>, AppError>;

    /// Every learner profile, ordered by learner id.
    async fn profiles(&self) -> Result<Vec<LearnerProfile>, AppError>;

    /// Keeps a freshly issued quiz until it is submitted.
    async fn start_quiz(&self, session: &QuizSession) -> Result<(), AppError>;

    async fn quiz_session(&self, quiz_id: Uuid) -> Result<Option<QuizSession>, AppError>;

    /// Locks `answer` in for question `index` unless one is locked already,
    /// and returns the answer that holds.
    async fn lock_answer(
        &self,
        quiz_id: Uuid,
        index: usize,
        answer: &str,
    ) -> Result<String, AppError>;

    /// Marks quiz `record.id` completed and records the attempt.
    /// Fails with `Conflict` when the quiz was already completed.
    async fn complete_quiz(
        &self,
        learner_id: &str,
        display_name: Option<&str>,
        record: &HistoricalQuizRecord,
    ) -> Result<(), AppError>;
}

fn already_submitted() -> AppError {
    AppError::Conflict("Quiz has already been submitted".to_string())
}

fn quiz_not_found() -> AppError {
    AppError::NotFound("Quiz not found".to_string())
}

#[derive(Default)]
struct LearnerData {
    profile: Option<LearnerProfile>,
    records: Vec<HistoricalQuizRecord>,
}

#[derive(Default)]
struct MemoryState {
    learners: HashMap<String, LearnerData>,
    quizzes: HashMap<Uuid, QuizSession>,
}

impl MemoryState {
    fn append(&mut self, learner_id: &str, display_name: Option<&str>, record: &HistoricalQuizRecord) {
        let data = self.learners.entry(learner_id.to_string()).or_default();

        let profile = data.profile.get_or_insert_with(|| {
            LearnerProfile::new(learner_id, display_name.map(str::to_owned))
        });
        profile.record(record.percentage, record.completed_at);

        // Stable sort keeps insertion order among equal timestamps.
        data.records.push(record.clone());
        data.records.sort_by_key(|r| r.completed_at);
    }
}

/// Store used when no database is configured, and in tests.
#[derive(Default)]
pub struct MemoryHistoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn record_result(
        &self,
        learner_id: &str,
        display_name: Option<&str>,
        record: &HistoricalQuizRecord,
    ) -> Result<(), AppError> {
        self.state.write().await.append(learner_id, display_name, record);
        Ok(())
    }

    async fn history(&self, learner_id: &str) -> Result<Vec<HistoricalQuizRecord>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .learners
            .get(learner_id)
            .map(|data| data.records.clone())
            .unwrap_or_default())
    }

    async fn profile(&self, learner_id: &str) -> Result<Option<LearnerProfile>, AppError> {
        let state = self.state.read().await;
        Ok(state.learners.get(learner_id).and_then(|data| data.profile.clone()))
    }

    async fn profiles(&self) -> Result<Vec<LearnerProfile>, AppError> {
        let state = self.state.read().await;
        let mut profiles: Vec<LearnerProfile> = state
            .learners
            .values()
            .filter_map(|data| data.profile.clone())
            .collect();
        profiles.sort_by(|a, b| a.learner_id.cmp(&b.learner_id));
        Ok(profiles)
    }

    async fn start_quiz(&self, session: &QuizSession) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        if state.quizzes.contains_key(&session.id) {
            return Err(AppError::Conflict("Quiz id already in use".to_string()));
        }
        state.quizzes.insert(session.id, session.clone());
        Ok(())
    }

    async fn quiz_session(&self, quiz_id: Uuid) -> Result<Option<QuizSession>, AppError> {
        Ok(self.state.read().await.quizzes.get(&quiz_id).cloned())
    }

    async fn lock_answer(
        &self,
        quiz_id: Uuid,
        index: usize,
        answer: &str,
    ) -> Result<String, AppError> {
        let mut state = self.state.write().await;
        let quiz = state.quizzes.get_mut(&quiz_id).ok_or_else(quiz_not_found)?;
        if quiz.completed_at.is_some() {
            return Err(already_submitted());
        }
        Ok(quiz
            .checked_answers
            .entry(index)
            .or_insert_with(|| answer.to_string())
            .clone())
    }

    async fn complete_quiz(
        &self,
        learner_id: &str,
        display_name: Option<&str>,
        record: &HistoricalQuizRecord,
    ) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        let quiz = state.quizzes.get_mut(&record.id).ok_or_else(quiz_not_found)?;
        if quiz.completed_at.is_some() {
            return Err(already_submitted());
        }
        quiz.completed_at = Some(record.completed_at);

        state.append(learner_id, display_name, record);
        Ok(())
    }
}

/// Row of the 'quiz_records' table.
#[derive(FromRow)]
struct QuizRecordRow {
    id: Uuid,
    topic: String,
    difficulty: Option<String>,
    score: i32,
    total_questions: i32,
    percentage: f64,
    time_taken: f64,
    questions_breakdown: Json<Vec<QuestionBreakdown>>,
    completed_at: DateTime<Utc>,
}

impl From<QuizRecordRow> for HistoricalQuizRecord {
    fn from(row: QuizRecordRow) -> Self {
        // Unknown or missing labels count as medium.
        let difficulty = row
            .difficulty
            .as_deref()
            .and_then(|d| d.parse::<Difficulty>().ok())
            .unwrap_or_default();

        Self {
            id: row.id,
            topic: row.topic,
            difficulty,
            score: row.score.max(0) as usize,
            total_questions: row.total_questions.max(0) as usize,
            percentage: row.percentage,
            time_taken: row.time_taken,
            questions_breakdown: row.questions_breakdown.0,
            completed_at: row.completed_at,
        }
    }
}

/// Row of the 'learner_profiles' table.
#[derive(FromRow)]
struct ProfileRow {
    learner_id: String,
    display_name: Option<String>,
    quiz_count: i64,
    total_score: f64,
    average_score: f64,
    last_quiz_at: Option<DateTime<Utc>>,
}

impl From<ProfileRow> for LearnerProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            learner_id: row.learner_id,
            display_name: row.display_name,
            quiz_count: row.quiz_count,
            total_score: row.total_score,
            average_score: row.average_score,
            last_quiz_at: row.last_quiz_at,
        }
    }
}

/// Row of the 'quiz_sessions' table.
#[derive(FromRow)]
struct QuizSessionRow {
    id: Uuid,
    learner_id: String,
    topic: String,
    difficulty: String,
    questions: Json<Vec<Question>>,
    checked_answers: Json<AnswerMap>,
    started_at: DateTime<Utc>,
    time_limit_secs: Option<i64>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<QuizSessionRow> for QuizSession {
    fn from(row: QuizSessionRow) -> Self {
        Self {
            id: row.id,
            learner_id: row.learner_id,
            topic: row.topic,
            difficulty: row.difficulty.parse().unwrap_or_default(),
            questions: row.questions.0,
            checked_answers: row.checked_answers.0,
            started_at: row.started_at,
            time_limit_secs: row.time_limit_secs.map(|secs| secs.max(0) as u64),
            completed_at: row.completed_at,
        }
    }
}

/// Inserts the record and folds it into the learner's profile row.
async fn append_record(
    conn: &mut PgConnection,
    learner_id: &str,
    display_name: Option<&str>,
    record: &HistoricalQuizRecord,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO quiz_records
            (id, learner_id, topic, difficulty, score, total_questions,
             percentage, time_taken, questions_breakdown, completed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(record.id)
    .bind(learner_id)
    .bind(&record.topic)
    .bind(record.difficulty.as_str())
    .bind(record.score as i32)
    .bind(record.total_questions as i32)
    .bind(record.percentage)
    .bind(record.time_taken)
    .bind(Json(record.questions_breakdown.clone()))
    .bind(record.completed_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert quiz record: {:?}", e);
        AppError::from(e)
    })?;

    // Upsert: running totals live on the profile row
    sqlx::query(
        r#"
        INSERT INTO learner_profiles
            (learner_id, display_name, quiz_count, total_score, average_score, last_quiz_at)
        VALUES ($1, $2, 1, $3, $3, $4)
        ON CONFLICT (learner_id) DO UPDATE SET
            display_name = COALESCE(EXCLUDED.display_name, learner_profiles.display_name),
            quiz_count = learner_profiles.quiz_count + 1,
            total_score = learner_profiles.total_score + EXCLUDED.total_score,
            average_score = (learner_profiles.total_score + EXCLUDED.total_score)
                / (learner_profiles.quiz_count + 1),
            last_quiz_at = EXCLUDED.last_quiz_at
        "#,
    )
    .bind(learner_id)
    .bind(display_name)
    .bind(record.percentage)
    .bind(record.completed_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        tracing::error!("Failed to upsert learner profile: {:?}", e);
        AppError::from(e)
    })?;

    Ok(())
}

/// Postgres-backed store.
pub struct PgHistoryStore {
    pool: PgPool,
}

impl PgHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn record_result(
        &self,
        learner_id: &str,
        display_name: Option<&str>,
        record: &HistoricalQuizRecord,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        append_record(&mut tx, learner_id, display_name, record).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn history(&self, learner_id: &str) -> Result<Vec<HistoricalQuizRecord>, AppError> {
        let rows: Vec<QuizRecordRow> = sqlx::query_as(
            r#"
            SELECT id, topic, difficulty, score, total_questions,
                   percentage, time_taken, questions_breakdown, completed_at
            FROM quiz_records
            WHERE learner_id = $1
            ORDER BY completed_at ASC, seq ASC
            "#,
        )
        .bind(learner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch quiz history: {:?}", e);
            AppError::from(e)
        })?;

        Ok(rows.into_iter().map(HistoricalQuizRecord::from).collect())
    }

    async fn profile(&self, learner_id: &str) -> Result<Option<LearnerProfile>, AppError> {
        let row: Option<ProfileRow> = sqlx::query_as(
            r#"
            SELECT learner_id, display_name, quiz_count, total_score, average_score, last_quiz_at
            FROM learner_profiles
            WHERE learner_id = $1
            "#,
        )
        .bind(learner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(LearnerProfile::from))
    }

    async fn profiles(&self) -> Result<Vec<LearnerProfile>, AppError> {
        let rows: Vec<ProfileRow> = sqlx::query_as(
            r#"
            SELECT learner_id, display_name, quiz_count, total_score, average_score, last_quiz_at
            FROM learner_profiles
            ORDER BY learner_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list learner profiles: {:?}", e);
            AppError::from(e)
        })?;

        Ok(rows.into_iter().map(LearnerProfile::from).collect())
    }

    async fn start_quiz(&self, session: &QuizSession) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO quiz_sessions
                (id, learner_id, topic, difficulty, questions, checked_answers,
                 started_at, time_limit_secs)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(session.id)
        .bind(&session.learner_id)
        .bind(&session.topic)
        .bind(session.difficulty.as_str())
        .bind(Json(session.questions.clone()))
        .bind(Json(session.checked_answers.clone()))
        .bind(session.started_at)
        .bind(session.time_limit_secs.map(|secs| secs as i64))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to store quiz session: {:?}", e);
            AppError::from(e)
        })?;

        Ok(())
    }

    async fn quiz_session(&self, quiz_id: Uuid) -> Result<Option<QuizSession>, AppError> {
        let row: Option<QuizSessionRow> = sqlx::query_as(
            r#"
            SELECT id, learner_id, topic, difficulty, questions, checked_answers,
                   started_at, time_limit_secs, completed_at
            FROM quiz_sessions
            WHERE id = $1
            "#,
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(QuizSession::from))
    }

    async fn lock_answer(
        &self,
        quiz_id: Uuid,
        index: usize,
        answer: &str,
    ) -> Result<String, AppError> {
        let key = index.to_string();

        // No-op when the index is already locked or the quiz is completed
        sqlx::query(
            r#"
            UPDATE quiz_sessions
            SET checked_answers = checked_answers || jsonb_build_object($2::text, $3::text)
            WHERE id = $1 AND completed_at IS NULL AND NOT (checked_answers ? $2::text)
            "#,
        )
        .bind(quiz_id)
        .bind(&key)
        .bind(answer)
        .execute(&self.pool)
        .await?;

        let row: Option<(Json<AnswerMap>, Option<DateTime<Utc>>)> = sqlx::query_as(
            "SELECT checked_answers, completed_at FROM quiz_sessions WHERE id = $1",
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;

        let (Json(checked), completed_at) = row.ok_or_else(quiz_not_found)?;
        if completed_at.is_some() {
            return Err(already_submitted());
        }
        checked.get(&index).cloned().ok_or_else(|| {
            AppError::InternalServerError(format!("Answer {} of quiz {} was not locked", index, quiz_id))
        })
    }

    async fn complete_quiz(
        &self,
        learner_id: &str,
        display_name: Option<&str>,
        record: &HistoricalQuizRecord,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let marked = sqlx::query(
            "UPDATE quiz_sessions SET completed_at = $2 WHERE id = $1 AND completed_at IS NULL",
        )
        .bind(record.id)
        .bind(record.completed_at)
        .execute(&mut *tx)
        .await?;

        if marked.rows_affected() == 0 {
            return Err(already_submitted());
        }

        append_record(&mut tx, learner_id, display_name, record).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz_result::QuizResult;
    use chrono::Duration;

    fn record(topic: &str, percentage: f64, completed_at: DateTime<Utc>) -> HistoricalQuizRecord {
        let result = QuizResult {
            score: 0,
            total_questions: 0,
            percentage,
            time_taken: 0.0,
            questions_breakdown: Vec::new(),
        };
        HistoricalQuizRecord::from_result(topic, Difficulty::Medium, &result, completed_at)
    }

    #[tokio::test]
    async fn memory_store_keeps_history_chronological() {
        let store = MemoryHistoryStore::new();
        let now = Utc::now();

        store.record_result("a", None, &record("late", 10.0, now)).await.unwrap();
        store
            .record_result("a", None, &record("early", 20.0, now - Duration::minutes(5)))
            .await
            .unwrap();

        let history = store.history("a").await.unwrap();
        let topics: Vec<&str> = history.iter().map(|r| r.topic.as_str()).collect();
        assert_eq!(topics, vec!["early", "late"]);
    }

    #[tokio::test]
    async fn memory_store_updates_profile_average() {
        let store = MemoryHistoryStore::new();
        let now = Utc::now();

        store.record_result("a", Some("Ada"), &record("x", 90.0, now)).await.unwrap();
        store.record_result("a", None, &record("x", 70.0, now)).await.unwrap();

        let profile = store.profile("a").await.unwrap().unwrap();
        assert_eq!(profile.quiz_count, 2);
        assert_eq!(profile.average_score, 80.0);
        assert_eq!(profile.display_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn memory_store_unknown_learner_is_empty() {
        let store = MemoryHistoryStore::new();
        assert!(store.history("ghost").await.unwrap().is_empty());
        assert!(store.profile("ghost").await.unwrap().is_none());
        assert!(store.profiles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn memory_store_lists_profiles_by_id() {
        let store = MemoryHistoryStore::new();
        let now = Utc::now();
        store.record_result("zed", None, &record("x", 50.0, now)).await.unwrap();
        store.record_result("amy", None, &record("x", 50.0, now)).await.unwrap();

        let ids: Vec<String> = store
            .profiles()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.learner_id)
            .collect();
        assert_eq!(ids, vec!["amy".to_string(), "zed".to_string()]);
    }

    fn issued_quiz(learner: &str) -> QuizSession {
        QuizSession::new(learner, "Rust", Difficulty::Easy, Vec::new(), None, Utc::now())
    }

    #[tokio::test]
    async fn memory_store_first_locked_answer_wins() {
        let store = MemoryHistoryStore::new();
        let quiz = issued_quiz("a");
        store.start_quiz(&quiz).await.unwrap();

        assert_eq!(store.lock_answer(quiz.id, 1, "C").await.unwrap(), "C");
        assert_eq!(store.lock_answer(quiz.id, 1, "A").await.unwrap(), "C");

        let stored = store.quiz_session(quiz.id).await.unwrap().unwrap();
        assert_eq!(stored.checked_answers, AnswerMap::from([(1, "C".to_string())]));
    }

    #[tokio::test]
    async fn memory_store_completes_a_quiz_once() {
        let store = MemoryHistoryStore::new();
        let quiz = issued_quiz("a");
        store.start_quiz(&quiz).await.unwrap();

        let attempt = HistoricalQuizRecord {
            id: quiz.id,
            ..record("Rust", 80.0, Utc::now())
        };
        store.complete_quiz("a", None, &attempt).await.unwrap();

        let replay = store.complete_quiz("a", None, &attempt).await;
        assert!(matches!(replay, Err(AppError::Conflict(_))));
        assert!(matches!(
            store.lock_answer(quiz.id, 0, "A").await,
            Err(AppError::Conflict(_))
        ));

        assert_eq!(store.history("a").await.unwrap().len(), 1);
        assert_eq!(store.profile("a").await.unwrap().unwrap().quiz_count, 1);
    }

    #[tokio::test]
    async fn memory_store_unknown_quiz_is_not_found() {
        let store = MemoryHistoryStore::new();
        assert!(store.quiz_session(Uuid::new_v4()).await.unwrap().is_none());
        assert!(matches!(
            store.lock_answer(Uuid::new_v4(), 0, "A").await,
            Err(AppError::NotFound(_))
        ));
    }
}
