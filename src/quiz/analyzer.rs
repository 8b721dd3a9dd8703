// src/quiz/analyzer.rs

//! Per-topic and per-difficulty statistics over a learner's history.
//!
//! Both analyses are recomputed from scratch on every call. The history is
//! taken in the order given; trends assume it is chronological.

use std::collections::BTreeMap;

use crate::{
    config::SUCCESS_THRESHOLD,
    models::{
        analytics::{DifficultyAnalysis, DifficultyStats, TopicPerformance, TopicStats},
        history::HistoricalQuizRecord,
    },
};

/// How many attempts form the "early" and "recent" windows of a trend.
const TREND_WINDOW: usize = 3;

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Recent mean minus early mean. Zero with fewer than two scores.
///
/// With two scores both windows cover the same attempts, so the trend is zero.
fn trend(scores: &[f64]) -> f64 {
    if scores.len() < 2 {
        return 0.0;
    }
    let window = scores.len().min(TREND_WINDOW);
    let early = &scores[..window];
    let recent = &scores[scores.len() - window..];
    mean(recent) - mean(early)
}

/// Groups records by exact topic label.
pub fn analyze_topics(history: &[HistoricalQuizRecord]) -> TopicPerformance {
    let mut scores_by_topic: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in history {
        scores_by_topic
            .entry(record.topic.as_str())
            .or_default()
            .push(record.percentage);
    }

    scores_by_topic
        .into_iter()
        .map(|(topic, scores)| {
            let total_score: f64 = scores.iter().sum();
            let best_score = scores.iter().copied().fold(f64::MIN, f64::max);
            let worst_score = scores.iter().copied().fold(f64::MAX, f64::min);

            let stats = TopicStats {
                total_quizzes: scores.len(),
                total_score,
                best_score,
                worst_score,
                average_score: total_score / scores.len() as f64,
                trend: trend(&scores),
            };
            (topic.to_string(), stats)
        })
        .collect()
}

/// Groups records by difficulty.
pub fn analyze_difficulty(history: &[HistoricalQuizRecord]) -> DifficultyAnalysis {
    let mut scores_by_difficulty = BTreeMap::new();
    for record in history {
        scores_by_difficulty
            .entry(record.difficulty)
            .or_insert_with(Vec::new)
            .push(record.percentage);
    }

    scores_by_difficulty
        .into_iter()
        .map(|(difficulty, scores)| {
            let total_score: f64 = scores.iter().sum();
            let successes = scores.iter().filter(|&&s| s >= SUCCESS_THRESHOLD).count();
            let count = scores.len() as f64;

            let stats = DifficultyStats {
                total_quizzes: scores.len(),
                total_score,
                average_score: total_score / count,
                success_rate: successes as f64 / count * 100.0,
            };
            (difficulty, stats)
        })
        .collect()
}
