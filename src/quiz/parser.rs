// src/quiz/parser.rs

//! Turns raw model output into multiple-choice questions.
//!
//! The model is asked to emit one block per question:
//!
//! ```text
//! Question: ...
//! A) ...
//! B) ...
//! C) ...
//! D) ...
//! Correct Answer: B
//! Explanation: ...
//! ```
//!
//! Anything that does not start with one of those prefixes is ignored. When
//! nothing usable comes back the caller gets a fixed, topic-parameterised
//! fallback set instead of an error.

use std::{collections::BTreeMap, fmt, sync::LazyLock};

use regex::Regex;

use crate::{
    config::FALLBACK_QUESTION_COUNT,
    models::question::{Difficulty, OptionLetter, Question},
    services::generator::TextGenerator,
    utils::html::strip_markup,
};

static OPTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-D])\)(.*)$").expect("option pattern is valid"));

const QUESTION_PREFIX: &str = "Question:";
const ANSWER_PREFIX: &str = "Correct Answer:";
const EXPLANATION_PREFIX: &str = "Explanation:";

/// Why a response could not be turned into questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFailure {
    /// The response was blank.
    Empty,
    /// No `Question:` line with any text was found.
    NoQuestions,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFailure::Empty => write!(f, "generated text was empty"),
            ParseFailure::NoQuestions => write!(f, "no questions found in generated text"),
        }
    }
}

impl std::error::Error for ParseFailure {}

/// Builds the instruction sent to the text model.
pub fn build_prompt(topic: &str, difficulty: Difficulty, count: usize) -> String {
    format!(
        "Generate {count} multiple choice questions about {topic} at {difficulty} difficulty level.

Format each question exactly as follows:
Question: [Question text]
A) [Option A]
B) [Option B]
C) [Option C]
D) [Option D]
Correct Answer: [A, B, C, or D]
Explanation: [Brief explanation of the correct answer]

Topic: {topic}
Difficulty: {difficulty}
Number of questions: {count}

Questions:
"
    )
}

/// Question under construction while scanning lines.
#[derive(Default)]
struct PendingQuestion {
    text: String,
    options: BTreeMap<OptionLetter, String>,
    correct_answer: String,
    explanation: String,
}

impl PendingQuestion {
    fn finish(self) -> Option<Question> {
        if self.text.is_empty() {
            return None;
        }
        Some(Question {
            text: self.text,
            options: self.options,
            correct_answer: self.correct_answer,
            explanation: self.explanation,
        })
    }
}

/// Scans `text` line by line and collects every question block.
///
/// The answer letter is kept verbatim; it is not checked against the options.
pub fn try_parse(text: &str) -> Result<Vec<Question>, ParseFailure> {
    if text.trim().is_empty() {
        return Err(ParseFailure::Empty);
    }

    let mut questions = Vec::new();
    let mut current: Option<PendingQuestion> = None;

    for line in text.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix(QUESTION_PREFIX) {
            if let Some(done) = current.take().and_then(PendingQuestion::finish) {
                questions.push(done);
            }
            current = Some(PendingQuestion {
                text: rest.trim().to_string(),
                ..PendingQuestion::default()
            });
            continue;
        }

        // Lines before the first question have nothing to attach to.
        let Some(pending) = current.as_mut() else {
            continue;
        };

        if let Some(caps) = OPTION_LINE.captures(line) {
            let letter = caps[1].chars().next().and_then(OptionLetter::from_char);
            if let Some(letter) = letter {
                pending.options.insert(letter, caps[2].trim().to_string());
            }
        } else if let Some(rest) = line.strip_prefix(ANSWER_PREFIX) {
            pending.correct_answer = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix(EXPLANATION_PREFIX) {
            pending.explanation = rest.trim().to_string();
        }
    }

    if let Some(done) = current.and_then(PendingQuestion::finish) {
        questions.push(done);
    }

    if questions.is_empty() {
        return Err(ParseFailure::NoQuestions);
    }
    Ok(questions)
}

fn fallback(
    text: String,
    options: [String; 4],
    correct: OptionLetter,
    explanation: String,
) -> Question {
    let letters = [OptionLetter::A, OptionLetter::B, OptionLetter::C, OptionLetter::D];
    Question {
        text,
        options: letters.into_iter().zip(options).collect(),
        correct_answer: correct.to_string(),
        explanation,
    }
}

/// The built-in question set, first `min(count, 5)` entries.
pub fn fallback_questions(topic: &str, count: usize) -> Vec<Question> {
    let library = [
        fallback(
            format!("What is an important concept in {topic}?"),
            [
                format!("Basic principle of {topic}"),
                format!("Advanced theory in {topic}"),
                format!("Common misconception about {topic}"),
                "Unrelated concept".to_string(),
            ],
            OptionLetter::A,
            format!("The basic principles form the foundation of understanding {topic}."),
        ),
        fallback(
            format!("Which of the following best describes {topic}?"),
            [
                "A complex field of study".to_string(),
                "An area requiring practical application".to_string(),
                "A theoretical framework".to_string(),
                "All of the above".to_string(),
            ],
            OptionLetter::D,
            format!("{topic} encompasses theoretical knowledge and practical applications."),
        ),
        fallback(
            format!("What is the primary goal when studying {topic}?"),
            [
                format!("To memorize facts about {topic}"),
                "To understand core concepts and applications".to_string(),
                "To pass examinations only".to_string(),
                "To impress others with knowledge".to_string(),
            ],
            OptionLetter::B,
            format!(
                "Understanding core concepts and their applications is key to mastering {topic}."
            ),
        ),
        fallback(
            format!("How can knowledge of {topic} be applied in real-world scenarios?"),
            [
                "Through theoretical analysis only".to_string(),
                "By solving practical problems".to_string(),
                "In academic discussions exclusively".to_string(),
                "It has no practical applications".to_string(),
            ],
            OptionLetter::B,
            format!("Knowledge of {topic} is most valuable when applied to solve real-world problems."),
        ),
        fallback(
            format!("What approach is most effective for learning {topic}?"),
            [
                "Passive reading only".to_string(),
                "Active practice and application".to_string(),
                "Memorization without understanding".to_string(),
                "Avoiding challenging concepts".to_string(),
            ],
            OptionLetter::B,
            format!(
                "Active practice and application reinforce understanding and retention of {topic}."
            ),
        ),
    ];

    library
        .into_iter()
        .take(count.min(FALLBACK_QUESTION_COUNT))
        .collect()
}

/// The fallback set as served to learners, with the topic text cleaned.
pub fn fallback_quiz(topic: &str, count: usize) -> Vec<Question> {
    sanitized(fallback_questions(topic, count))
}

fn sanitize(question: Question) -> Question {
    Question {
        text: strip_markup(&question.text),
        options: question
            .options
            .into_iter()
            .map(|(letter, text)| (letter, strip_markup(&text)))
            .collect(),
        correct_answer: question.correct_answer,
        explanation: strip_markup(&question.explanation),
    }
}

/// Asks the model for `count` questions on `topic`.
///
/// Never fails: a failed call or an unparseable response yields the fallback set.
/// Makes exactly one call and applies no timeout of its own.
pub async fn generate(
    generator: &dyn TextGenerator,
    topic: &str,
    difficulty: Difficulty,
    count: usize,
) -> Vec<Question> {
    let prompt = build_prompt(topic, difficulty, count);

    let parsed = match generator.generate(&prompt).await {
        Ok(text) => try_parse(&text),
        Err(e) => {
            tracing::warn!("Question generation failed for '{}': {}", topic, e);
            return fallback_quiz(topic, count);
        }
    };

    match parsed {
        Ok(mut questions) => {
            questions.truncate(count);
            tracing::info!("Parsed {} generated questions for '{}'", questions.len(), topic);
            sanitized(questions)
        }
        Err(e) => {
            tracing::warn!("Falling back to built-in questions for '{}': {}", topic, e);
            fallback_quiz(topic, count)
        }
    }
}

fn sanitized(questions: Vec<Question>) -> Vec<Question> {
    questions.into_iter().map(sanitize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::generator::GenerationError;
    use async_trait::async_trait;

    struct Canned(Result<String, GenerationError>);

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            self.0.clone()
        }
    }

    const TWO_QUESTIONS: &str = "
Here are your questions.
Question: What is 2 + 2?
A) 3
B) 4
C) 5
D) 22
Correct Answer: B
Explanation: Two plus two is four.

Question: Which is a prime?
A) 4
B) 6
C) 7
Correct Answer: C
Explanation: 7 has no divisors other than 1 and itself.
";

    #[test]
    fn parses_question_blocks() {
        let questions = try_parse(TWO_QUESTIONS).unwrap();
        assert_eq!(questions.len(), 2);

        let first = &questions[0];
        assert_eq!(first.text, "What is 2 + 2?");
        assert_eq!(first.options.len(), 4);
        assert_eq!(first.options[&OptionLetter::B], "4");
        assert_eq!(first.correct_answer, "B");
        assert_eq!(first.explanation, "Two plus two is four.");

        let second = &questions[1];
        assert_eq!(second.options.len(), 3);
        assert!(!second.options.contains_key(&OptionLetter::D));
        assert!(second.is_well_formed());
    }

    #[test]
    fn option_order_is_stable() {
        let text = "Question: Order?\nC) third\nA) first\nB) second\nCorrect Answer: A";
        let questions = try_parse(text).unwrap();
        let letters: Vec<OptionLetter> = questions[0].options.keys().copied().collect();
        assert_eq!(letters, vec![OptionLetter::A, OptionLetter::B, OptionLetter::C]);
    }

    #[test]
    fn correct_answer_is_kept_verbatim() {
        let text = "Question: Capital of France?\nA) Paris\nB) Rome\nCorrect Answer: A) Paris";
        let questions = try_parse(text).unwrap();
        assert_eq!(questions[0].correct_answer, "A) Paris");
        assert!(!questions[0].is_well_formed());
    }

    #[test]
    fn lines_before_first_question_are_ignored() {
        let text = "A) stray\nCorrect Answer: D\nQuestion: Real one?\nA) yes\nB) no\nCorrect Answer: A";
        let questions = try_parse(text).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].options.len(), 2);
        assert_eq!(questions[0].correct_answer, "A");
    }

    #[test]
    fn question_without_text_is_dropped() {
        let text = "Question:\nA) one\nQuestion: Kept?\nA) yes\nB) no\nCorrect Answer: B";
        let questions = try_parse(text).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].text, "Kept?");
    }

    #[test]
    fn blank_and_unstructured_text_fail() {
        assert_eq!(try_parse("   \n  "), Err(ParseFailure::Empty));
        assert_eq!(try_parse("I cannot help with that."), Err(ParseFailure::NoQuestions));
    }

    #[test]
    fn fallback_references_topic_and_is_consistent() {
        let questions = fallback_questions("Photosynthesis", 10);
        assert_eq!(questions.len(), 5);
        for q in &questions {
            assert!(q.is_well_formed());
            let mentions_topic = q.text.contains("Photosynthesis")
                || q.explanation.contains("Photosynthesis");
            assert!(mentions_topic);
        }
        assert_eq!(questions[1].correct_answer, "D");
    }

    #[test]
    fn fallback_is_truncated_to_count() {
        assert_eq!(fallback_questions("Rust", 3).len(), 3);
        assert_eq!(fallback_questions("Rust", 0).len(), 0);
    }

    #[test]
    fn prompt_names_topic_and_format() {
        let prompt = build_prompt("Geology", Difficulty::Hard, 7);
        assert!(prompt.starts_with(
            "Generate 7 multiple choice questions about Geology at hard difficulty level."
        ));
        assert!(prompt.contains("Correct Answer: [A, B, C, or D]"));
        assert!(prompt.contains("Number of questions: 7"));
        assert!(prompt.trim_end().ends_with("Questions:"));
    }

    #[tokio::test]
    async fn generate_truncates_to_requested_count() {
        let generator = Canned(Ok(TWO_QUESTIONS.to_string()));
        let questions = generate(&generator, "Math", Difficulty::Easy, 1).await;
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].text, "What is 2 + 2?");
    }

    #[tokio::test]
    async fn generate_accepts_fewer_questions_than_requested() {
        let generator = Canned(Ok(TWO_QUESTIONS.to_string()));
        let questions = generate(&generator, "Math", Difficulty::Easy, 5).await;
        assert_eq!(questions.len(), 2);
    }

    #[tokio::test]
    async fn generate_falls_back_when_call_fails() {
        let generator = Canned(Err(GenerationError::Status(503)));
        let questions = generate(&generator, "Chemistry", Difficulty::Medium, 4).await;
        assert_eq!(questions, fallback_questions("Chemistry", 4));
    }

    #[tokio::test]
    async fn generate_falls_back_when_unparseable() {
        let generator = Canned(Ok("lorem ipsum".to_string()));
        let questions = generate(&generator, "History", Difficulty::Hard, 8).await;
        assert_eq!(questions.len(), 5);
        assert!(questions[0].text.contains("History"));
    }

    #[tokio::test]
    async fn generate_strips_markup_from_model_text() {
        let text = "Question: <b>Bold</b> question?\nA) <i>yes</i>\nB) no\nCorrect Answer: A\nExplanation: <script>x()</script>Because.";
        let generator = Canned(Ok(text.to_string()));
        let questions = generate(&generator, "Safety", Difficulty::Easy, 3).await;
        assert_eq!(questions[0].text, "Bold question?");
        assert_eq!(questions[0].options[&OptionLetter::A], "yes");
        assert_eq!(questions[0].explanation, "Because.");
    }

    #[tokio::test]
    async fn fallback_keeps_special_characters_in_topic() {
        let generator = Canned(Err(GenerationError::Status(503)));
        let questions = generate(&generator, "R&D", Difficulty::Easy, 3).await;
        assert_eq!(questions[0].text, "What is an important concept in R&D?");
        assert_eq!(questions[0].options[&OptionLetter::A], "Basic principle of R&D");
    }

    #[tokio::test]
    async fn comparison_signs_survive_parsing() {
        let text = "Question: Is 2 < 3 & 4 > 1?\nA) Yes\nB) No\nCorrect Answer: A\nExplanation: 2 < 3 holds.";
        let generator = Canned(Ok(text.to_string()));
        let questions = generate(&generator, "Logic", Difficulty::Easy, 3).await;
        assert_eq!(questions[0].text, "Is 2 < 3 & 4 > 1?");
        assert_eq!(questions[0].explanation, "2 < 3 holds.");
    }

    #[test]
    fn served_fallback_drops_markup_from_topic() {
        let questions = fallback_quiz("<b>Optics</b>", 2);
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].text, "What is an important concept in Optics?");
    }
}
