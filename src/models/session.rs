// src/models/session.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    question::{Difficulty, Question},
    quiz_result::AnswerMap,
};

/// An issued quiz, kept server-side until it is submitted.
///
/// The client only ever holds a token naming `id`; questions and answer keys
/// stay here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSession {
    pub id: Uuid,
    pub learner_id: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub questions: Vec<Question>,
    /// Answers locked in through the check endpoint. First answer per index wins.
    #[serde(default)]
    pub checked_answers: AnswerMap,
    pub started_at: DateTime<Utc>,
    pub time_limit_secs: Option<u64>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl QuizSession {
    pub fn new(
        learner_id: impl Into<String>,
        topic: impl Into<String>,
        difficulty: Difficulty,
        questions: Vec<Question>,
        time_limit_secs: Option<u64>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            learner_id: learner_id.into(),
            topic: topic.into(),
            difficulty,
            questions,
            checked_answers: AnswerMap::new(),
            started_at,
            time_limit_secs,
            completed_at: None,
        }
    }

    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> f64 {
        (now - self.started_at).num_milliseconds().max(0) as f64 / 1000.0
    }

    pub fn is_time_up(&self, now: DateTime<Utc>) -> bool {
        self.time_limit_secs
            .is_some_and(|limit| self.elapsed_seconds(now) >= limit as f64)
    }

    /// Time charged for the attempt: elapsed time, capped at the limit.
    pub fn time_taken(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = self.elapsed_seconds(now);
        match self.time_limit_secs {
            Some(limit) => elapsed.min(limit as f64),
            None => elapsed,
        }
    }

    /// Answers to grade. Checked answers override the submitted ones; once time
    /// is up only the checked answers count.
    pub fn answers_to_grade(&self, submitted: &AnswerMap, now: DateTime<Utc>) -> AnswerMap {
        let mut answers = if self.is_time_up(now) {
            AnswerMap::new()
        } else {
            submitted.clone()
        };
        answers.extend(
            self.checked_answers
                .iter()
                .map(|(index, answer)| (*index, answer.clone())),
        );
        answers
    }
}
