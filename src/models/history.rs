// src/models/history.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    question::Difficulty,
    quiz_result::{QuestionBreakdown, QuizResult},
};

/// One completed quiz as kept by the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalQuizRecord {
    pub id: Uuid,
    pub topic: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub score: usize,
    pub total_questions: usize,
    pub percentage: f64,
    pub time_taken: f64,
    #[serde(default)]
    pub questions_breakdown: Vec<QuestionBreakdown>,
    pub completed_at: DateTime<Utc>,
}

impl HistoricalQuizRecord {
    pub fn from_result(
        topic: impl Into<String>,
        difficulty: Difficulty,
        result: &QuizResult,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            difficulty,
            score: result.score,
            total_questions: result.total_questions,
            percentage: result.percentage,
            time_taken: result.time_taken,
            questions_breakdown: result.questions_breakdown.clone(),
            completed_at,
        }
    }

    /// Rebuilds the graded result this record was created from.
    pub fn to_result(&self) -> QuizResult {
        QuizResult {
            score: self.score,
            total_questions: self.total_questions,
            percentage: self.percentage,
            time_taken: self.time_taken,
            questions_breakdown: self.questions_breakdown.clone(),
        }
    }
}

/// Running aggregate kept per learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub learner_id: String,
    pub display_name: Option<String>,
    pub quiz_count: i64,
    pub total_score: f64,
    pub average_score: f64,
    pub last_quiz_at: Option<DateTime<Utc>>,
}

impl LearnerProfile {
    pub fn new(learner_id: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            learner_id: learner_id.into(),
            display_name,
            quiz_count: 0,
            total_score: 0.0,
            average_score: 0.0,
            last_quiz_at: None,
        }
    }

    /// Folds one more quiz percentage into the running average.
    pub fn record(&mut self, percentage: f64, completed_at: DateTime<Utc>) {
        self.quiz_count += 1;
        self.total_score += percentage;
        self.average_score = self.total_score / self.quiz_count as f64;
        self.last_quiz_at = Some(completed_at);
    }
}

/// Optional filters on `GET /api/quiz/history`. Absent fields match everything.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    /// Lowest percentage to include.
    pub min_score: Option<f64>,
    /// Only quizzes completed within the last `days` days.
    pub days: Option<i64>,
}

impl HistoryQuery {
    pub fn matches(&self, record: &HistoricalQuizRecord, now: DateTime<Utc>) -> bool {
        self.topic
            .as_deref()
            .is_none_or(|topic| record.topic == topic.trim())
            && self.difficulty.is_none_or(|d| record.difficulty == d)
            && self.min_score.is_none_or(|min| record.percentage >= min)
            && self.days.is_none_or(|days| {
                // Spans too large to represent reach back to the start of time.
                Duration::try_days(days)
                    .and_then(|span| now.checked_sub_signed(span))
                    .is_none_or(|cutoff| record.completed_at >= cutoff)
            })
    }
}

/// Totals over a list of records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySummary {
    pub total_quizzes: usize,
    pub average_score: f64,
    pub best_score: f64,
    /// Seconds.
    pub total_time: f64,
}

impl HistorySummary {
    pub fn from_records(records: &[HistoricalQuizRecord]) -> Self {
        if records.is_empty() {
            return Self {
                total_quizzes: 0,
                average_score: 0.0,
                best_score: 0.0,
                total_time: 0.0,
            };
        }

        let total: f64 = records.iter().map(|r| r.percentage).sum();
        Self {
            total_quizzes: records.len(),
            average_score: total / records.len() as f64,
            best_score: records.iter().map(|r| r.percentage).fold(f64::MIN, f64::max),
            total_time: records.iter().map(|r| r.time_taken).sum(),
        }
    }
}

/// DTO for a learner's (filtered) history.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub summary: HistorySummary,
    pub records: Vec<HistoricalQuizRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_keeps_running_average() {
        let mut profile = LearnerProfile::new("learner-1", None);
        let now = Utc::now();
        profile.record(80.0, now);
        profile.record(60.0, now);
        profile.record(40.0, now);

        assert_eq!(profile.quiz_count, 3);
        assert_eq!(profile.total_score, 180.0);
        assert_eq!(profile.average_score, 60.0);
        assert_eq!(profile.last_quiz_at, Some(now));
    }

    #[test]
    fn record_round_trips_result() {
        let result = QuizResult {
            score: 3,
            total_questions: 4,
            percentage: 75.0,
            time_taken: 42.5,
            questions_breakdown: Vec::new(),
        };
        let record = HistoricalQuizRecord::from_result("Algebra", Difficulty::Hard, &result, Utc::now());
        assert_eq!(record.to_result(), result);
        assert_eq!(record.topic, "Algebra");
    }

    #[test]
    fn missing_difficulty_defaults_to_medium() {
        let json = serde_json::json!({
            "id": Uuid::new_v4(),
            "topic": "Biology",
            "score": 1,
            "total_questions": 2,
            "percentage": 50.0,
            "time_taken": 10.0,
            "completed_at": "2025-01-01T00:00:00Z"
        });
        let record: HistoricalQuizRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.difficulty, Difficulty::Medium);
        assert!(record.questions_breakdown.is_empty());
    }

    fn attempt(topic: &str, difficulty: Difficulty, percentage: f64, days_ago: i64) -> HistoricalQuizRecord {
        let result = QuizResult {
            score: 0,
            total_questions: 4,
            percentage,
            time_taken: 30.0,
            questions_breakdown: Vec::new(),
        };
        HistoricalQuizRecord::from_result(topic, difficulty, &result, Utc::now() - Duration::days(days_ago))
    }

    #[test]
    fn history_query_combines_filters() {
        let records = vec![
            attempt("Algebra", Difficulty::Easy, 90.0, 1),
            attempt("Algebra", Difficulty::Hard, 40.0, 1),
            attempt("Biology", Difficulty::Easy, 95.0, 1),
            attempt("Algebra", Difficulty::Easy, 85.0, 40),
        ];
        let query = HistoryQuery {
            topic: Some("Algebra".to_string()),
            difficulty: Some(Difficulty::Easy),
            min_score: Some(50.0),
            days: Some(30),
        };

        let now = Utc::now();
        let kept: Vec<f64> = records
            .iter()
            .filter(|r| query.matches(r, now))
            .map(|r| r.percentage)
            .collect();
        assert_eq!(kept, vec![90.0]);
        assert!(records.iter().all(|r| HistoryQuery::default().matches(r, now)));
    }

    #[test]
    fn summary_totals_records() {
        let records = vec![
            attempt("Algebra", Difficulty::Easy, 90.0, 0),
            attempt("Algebra", Difficulty::Easy, 60.0, 0),
        ];
        let summary = HistorySummary::from_records(&records);
        assert_eq!(summary.total_quizzes, 2);
        assert_eq!(summary.average_score, 75.0);
        assert_eq!(summary.best_score, 90.0);
        assert_eq!(summary.total_time, 60.0);

        assert_eq!(HistorySummary::from_records(&[]).total_quizzes, 0);
    }
}
