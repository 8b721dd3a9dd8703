// src/quiz/grader.rs

use std::fmt;

use crate::models::{
    question::Question,
    quiz_result::{
        AnswerEvaluation, AnswerMap, Feedback, FeedbackTone, NOT_ANSWERED, QuestionBreakdown,
        QuizResult,
    },
};

/// A submission that cannot be graded as sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GradeError {
    NoQuestions,
    AnswerOutOfRange { index: usize, total: usize },
}

impl fmt::Display for GradeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradeError::NoQuestions => write!(f, "Quiz has no questions"),
            GradeError::AnswerOutOfRange { index, total } => write!(
                f,
                "Answer for question index {} is out of range (quiz has {} questions)",
                index, total
            ),
        }
    }
}

impl std::error::Error for GradeError {}

/// Rounds to two decimal places, ties to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

fn matches(submitted: &str, correct: &str) -> bool {
    let submitted = submitted.trim();
    !submitted.is_empty() && submitted.eq_ignore_ascii_case(correct.trim())
}

/// Checks that a submission is gradable. `score` does not require this;
/// it exists so callers can reject bad input instead of getting a zeroed result.
pub fn validate_submission(questions: &[Question], answers: &AnswerMap) -> Result<(), GradeError> {
    if questions.is_empty() {
        return Err(GradeError::NoQuestions);
    }
    if let Some(&index) = answers.keys().filter(|&&i| i >= questions.len()).min() {
        return Err(GradeError::AnswerOutOfRange {
            index,
            total: questions.len(),
        });
    }
    Ok(())
}

/// Grades a submission positionally: `answers[i]` is checked against `questions[i]`.
///
/// Comparison is case-insensitive. Missing answers are incorrect and show up as
/// `"Not answered"` in the breakdown. Answers for indices past the end are ignored.
/// An empty quiz yields a zeroed result.
pub fn score(questions: &[Question], answers: &AnswerMap, elapsed_seconds: f64) -> QuizResult {
    if questions.is_empty() {
        tracing::warn!("Grading requested for an empty quiz, returning zeroed result");
        return QuizResult::zeroed();
    }

    let questions_breakdown: Vec<QuestionBreakdown> = questions
        .iter()
        .enumerate()
        .map(|(i, question)| {
            let submitted = answers.get(&i);
            let is_correct = submitted.is_some_and(|ans| matches(ans, &question.correct_answer));

            QuestionBreakdown {
                question_number: i + 1,
                question: question.text.clone(),
                options: question.options.clone(),
                user_answer: submitted
                    .cloned()
                    .unwrap_or_else(|| NOT_ANSWERED.to_string()),
                correct_answer: question.correct_answer.clone(),
                is_correct,
                explanation: question.explanation.clone(),
            }
        })
        .collect();

    let total_questions = questions.len();
    let score = questions_breakdown.iter().filter(|b| b.is_correct).count();
    let percentage = round2(score as f64 / total_questions as f64 * 100.0);

    QuizResult {
        score,
        total_questions,
        percentage,
        time_taken: round2(elapsed_seconds.max(0.0)),
        questions_breakdown,
    }
}

/// Immediate feedback on one answer.
pub fn evaluate_answer(question: &Question, answer: &str) -> AnswerEvaluation {
    let is_correct = matches(answer, &question.correct_answer);
    AnswerEvaluation {
        is_correct,
        correct_answer: question.correct_answer.clone(),
        explanation: question.explanation.clone(),
        user_answer: answer.to_string(),
        score: u8::from(is_correct),
    }
}

/// Letter grade for a percentage.
pub fn letter_grade(percentage: f64) -> &'static str {
    const SCALE: [(f64, &str); 11] = [
        (97.0, "A+"),
        (93.0, "A"),
        (90.0, "A-"),
        (87.0, "B+"),
        (83.0, "B"),
        (80.0, "B-"),
        (77.0, "C+"),
        (73.0, "C"),
        (70.0, "C-"),
        (67.0, "D+"),
        (65.0, "D"),
    ];

    SCALE
        .iter()
        .find(|(floor, _)| percentage >= *floor)
        .map(|(_, grade)| *grade)
        .unwrap_or("F")
}

pub fn feedback_for(percentage: f64) -> Feedback {
    if percentage >= 90.0 {
        Feedback {
            level: "Excellent",
            message: "Outstanding performance! You have mastered this topic.",
            tone: FeedbackTone::Success,
        }
    } else if percentage >= 80.0 {
        Feedback {
            level: "Good",
            message: "Great job! You have a solid understanding of the material.",
            tone: FeedbackTone::Success,
        }
    } else if percentage >= 70.0 {
        Feedback {
            level: "Satisfactory",
            message: "Good work! There's room for improvement in some areas.",
            tone: FeedbackTone::Info,
        }
    } else if percentage >= 60.0 {
        Feedback {
            level: "Needs Improvement",
            message: "You're on the right track, but consider reviewing the material.",
            tone: FeedbackTone::Warning,
        }
    } else {
        Feedback {
            level: "Needs Significant Improvement",
            message: "Please review the material thoroughly and consider additional practice.",
            tone: FeedbackTone::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::OptionLetter;

    fn question(text: &str, correct: &str) -> Question {
        Question {
            text: text.to_string(),
            options: [
                (OptionLetter::A, "alpha".to_string()),
                (OptionLetter::B, "beta".to_string()),
                (OptionLetter::C, "gamma".to_string()),
                (OptionLetter::D, "delta".to_string()),
            ]
            .into_iter()
            .collect(),
            correct_answer: correct.to_string(),
            explanation: format!("{} explained", text),
        }
    }

    fn answers(pairs: &[(usize, &str)]) -> AnswerMap {
        pairs.iter().map(|(i, a)| (*i, a.to_string())).collect()
    }

    #[test]
    fn test_lowercase_answer_matches() {
        let questions = vec![question("Q1", "B")];
        let result = score(&questions, &answers(&[(0, "b")]), 1.0);
        assert!(result.questions_breakdown[0].is_correct);
        assert_eq!(result.score, 1);
        assert_eq!(result.percentage, 100.0);
    }

    #[test]
    fn test_no_answers_scores_zero() {
        let questions: Vec<Question> = (0..5).map(|i| question(&format!("Q{}", i), "A")).collect();
        let result = score(&questions, &AnswerMap::new(), 12.0);

        assert_eq!(result.score, 0);
        assert_eq!(result.total_questions, 5);
        assert_eq!(result.percentage, 0.0);
        assert!(
            result
                .questions_breakdown
                .iter()
                .all(|b| b.user_answer == NOT_ANSWERED && !b.is_correct)
        );
    }

    #[test]
    fn test_percentage_rounded_to_two_decimals() {
        let questions = vec![question("Q1", "A"), question("Q2", "B"), question("Q3", "C")];
        let result = score(&questions, &answers(&[(0, "A"), (1, "C"), (2, "D")]), 12.3456);
        assert_eq!(result.score, 1);
        assert_eq!(result.percentage, 33.33);
        assert_eq!(result.time_taken, 12.35);
    }

    #[test]
    fn test_percentage_ties_round_to_even() {
        // 1/32 is exactly 3.125%
        let questions: Vec<Question> = (0..32).map(|i| question(&format!("Q{}", i), "A")).collect();
        let result = score(&questions, &answers(&[(0, "A")]), 0.0);
        assert_eq!(result.percentage, 3.12);
        assert_eq!(round2(0.375), 0.38);
    }

    #[test]
    fn test_breakdown_in_question_order() {
        let questions = vec![question("First", "A"), question("Second", "B")];
        let result = score(&questions, &answers(&[(1, "B")]), 0.0);

        let numbers: Vec<usize> = result.questions_breakdown.iter().map(|b| b.question_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(result.questions_breakdown[0].question, "First");
        assert_eq!(result.questions_breakdown[0].user_answer, NOT_ANSWERED);
        assert_eq!(result.questions_breakdown[1].explanation, "Second explained");
        assert!(result.questions_breakdown[1].is_correct);
    }

    #[test]
    fn test_grading_is_positional() {
        let q1 = question("Q1", "A");
        let q2 = question("Q2", "B");
        let submitted = answers(&[(0, "A"), (1, "B")]);

        let in_order = score(&[q1.clone(), q2.clone()], &submitted, 0.0);
        let swapped = score(&[q2, q1], &submitted, 0.0);
        assert_eq!(in_order.score, 2);
        assert_eq!(swapped.score, 0);
    }

    #[test]
    fn test_empty_quiz_is_zeroed() {
        let result = score(&[], &answers(&[(0, "A")]), 99.0);
        assert_eq!(result, QuizResult::zeroed());
    }

    #[test]
    fn test_out_of_range_answers_are_ignored() {
        let questions = vec![question("Q1", "A")];
        let result = score(&questions, &answers(&[(0, "A"), (7, "B")]), 0.0);
        assert_eq!(result.score, 1);
        assert_eq!(result.total_questions, 1);
    }

    #[test]
    fn test_validate_submission() {
        let questions = vec![question("Q1", "A"), question("Q2", "B")];
        assert_eq!(validate_submission(&questions, &answers(&[(1, "B")])), Ok(()));
        assert_eq!(
            validate_submission(&questions, &answers(&[(0, "A"), (2, "B"), (5, "C")])),
            Err(GradeError::AnswerOutOfRange { index: 2, total: 2 })
        );
        assert_eq!(
            validate_submission(&[], &AnswerMap::new()),
            Err(GradeError::NoQuestions)
        );
    }

    #[test]
    fn test_evaluate_answer() {
        let q = question("Q1", "C");
        let right = evaluate_answer(&q, "c");
        assert!(right.is_correct);
        assert_eq!(right.score, 1);

        let wrong = evaluate_answer(&q, "A");
        assert!(!wrong.is_correct);
        assert_eq!(wrong.score, 0);
        assert_eq!(wrong.correct_answer, "C");
        assert_eq!(wrong.explanation, "Q1 explained");
    }

    #[test]
    fn test_letter_grade_boundaries() {
        assert_eq!(letter_grade(100.0), "A+");
        assert_eq!(letter_grade(97.0), "A+");
        assert_eq!(letter_grade(96.99), "A");
        assert_eq!(letter_grade(70.0), "C-");
        assert_eq!(letter_grade(65.0), "D");
        assert_eq!(letter_grade(64.99), "F");
        assert_eq!(letter_grade(0.0), "F");
    }

    #[test]
    fn test_feedback_levels() {
        assert_eq!(feedback_for(95.0).level, "Excellent");
        assert_eq!(feedback_for(80.0).tone, FeedbackTone::Success);
        assert_eq!(feedback_for(75.0).level, "Satisfactory");
        assert_eq!(feedback_for(60.0).tone, FeedbackTone::Warning);
        assert_eq!(feedback_for(10.0).tone, FeedbackTone::Error);
    }
}
