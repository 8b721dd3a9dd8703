// src/models/quiz_result.rs

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::question::{OptionLetter, PublicQuestion};

/// Sentinel stored as the user answer of a skipped question.
pub const NOT_ANSWERED: &str = "Not answered";

/// Submitted answers keyed by 0-based question index. Missing keys are unanswered.
pub type AnswerMap = HashMap<usize, String>;

/// Outcome of a single question within a graded quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionBreakdown {
    /// 1-based.
    pub question_number: usize,
    pub question: String,
    pub options: BTreeMap<OptionLetter, String>,
    /// Submitted letter, or `"Not answered"`.
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub explanation: String,
}

/// Graded quiz attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    pub score: usize,
    pub total_questions: usize,
    /// 0-100, two decimals.
    pub percentage: f64,
    /// Seconds, two decimals.
    pub time_taken: f64,
    pub questions_breakdown: Vec<QuestionBreakdown>,
}

impl QuizResult {
    pub fn zeroed() -> Self {
        Self {
            score: 0,
            total_questions: 0,
            percentage: 0.0,
            time_taken: 0.0,
            questions_breakdown: Vec::new(),
        }
    }
}

/// Immediate feedback for one answered question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerEvaluation {
    pub is_correct: bool,
    pub correct_answer: String,
    pub explanation: String,
    pub user_answer: String,
    pub score: u8,
}

/// Colour hint for presenting feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackTone {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feedback {
    pub level: &'static str,
    pub message: &'static str,
    pub tone: FeedbackTone,
}

/// DTO returned after generating a quiz.
#[derive(Debug, Serialize, Deserialize)]
pub struct QuizResponse {
    pub quiz_id: Uuid,
    pub quiz_token: String,
    pub topic: String,
    pub questions: Vec<PublicQuestion>,
    pub time_limit_seconds: Option<u64>,
    pub expires_in: u64, // seconds
}

/// DTO for checking a single answer mid-quiz.
#[derive(Debug, Deserialize)]
pub struct CheckAnswerRequest {
    pub quiz_token: String,
    pub question_index: usize,
    pub answer: String,
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    /// The token received from generate.
    pub quiz_token: String,

    /// Key: 0-based question index. Value: selected option letter.
    /// Answers already locked in through the check endpoint take precedence.
    #[serde(default)]
    pub answers: AnswerMap,
}

/// DTO returned after grading a submission.
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub quiz_id: Uuid,
    pub result: QuizResult,
    pub grade: &'static str,
    pub feedback: Feedback,
    /// Submitted after the time limit; only answers checked in time were graded.
    pub time_up: bool,
}
