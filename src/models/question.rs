// src/models/question.rs

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::{MAX_QUESTIONS, MAX_TIME_LIMIT_MINUTES, MIN_QUESTIONS};

/// Complexity level requested from generation and recorded with each attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

/// Option key of a multiple-choice question. Orders A < B < C < D.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OptionLetter {
    A,
    B,
    C,
    D,
}

impl OptionLetter {
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(OptionLetter::A),
            'B' => Some(OptionLetter::B),
            'C' => Some(OptionLetter::C),
            'D' => Some(OptionLetter::D),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionLetter::A => "A",
            OptionLetter::B => "B",
            OptionLetter::C => "C",
            OptionLetter::D => "D",
        }
    }
}

impl fmt::Display for OptionLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "question")]
    pub text: String,

    /// Options keyed by letter, kept in A-D order.
    pub options: BTreeMap<OptionLetter, String>,

    /// Letter of the correct option. Kept verbatim from the generated text.
    pub correct_answer: String,

    pub explanation: String,
}

impl Question {
    /// Resolves `correct_answer` to an option letter, if it names one.
    pub fn answer_key(&self) -> Option<OptionLetter> {
        let mut chars = self.correct_answer.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => OptionLetter::from_char(c),
            _ => None,
        }
    }

    /// True when the answer names a present option and there are at least two options.
    pub fn is_well_formed(&self) -> bool {
        self.options.len() >= 2
            && self
                .answer_key()
                .is_some_and(|key| self.options.contains_key(&key))
    }
}

/// DTO for sending a question to the client (excludes answer and explanation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    /// 1-based position in the quiz.
    pub number: usize,
    pub question: String,
    pub options: BTreeMap<OptionLetter, String>,
}

impl PublicQuestion {
    pub fn from_question(index: usize, question: &Question) -> Self {
        Self {
            number: index + 1,
            question: question.text.clone(),
            options: question.options.clone(),
        }
    }
}

/// DTO for requesting a new quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateQuizRequest {
    #[validate(
        length(min = 1, max = 200, message = "Topic must be between 1 and 200 characters."),
        custom(function = validate_topic)
    )]
    pub topic: String,

    #[serde(default)]
    pub difficulty: Difficulty,

    #[validate(range(min = MIN_QUESTIONS, max = MAX_QUESTIONS, message = "Number of questions must be between 3 and 10."))]
    pub num_questions: usize,

    /// Whole-quiz time limit. Without one the quiz only expires with its token.
    #[validate(range(min = 1, max = MAX_TIME_LIMIT_MINUTES, message = "Time limit must be between 1 and 30 minutes."))]
    #[serde(default)]
    pub time_limit_minutes: Option<u64>,
}

fn validate_topic(topic: &str) -> Result<(), validator::ValidationError> {
    if topic.trim().is_empty() {
        return Err(validator::ValidationError::new("topic_cannot_be_blank"));
    }
    Ok(())
}
