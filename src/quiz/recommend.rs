// src/quiz/recommend.rs

use crate::{
    config::{
        DECLINE_TREND_THRESHOLD, MAX_RECOMMENDATIONS, WEAK_DIFFICULTY_THRESHOLD,
        WEAK_TOPIC_THRESHOLD,
    },
    models::analytics::{DifficultyAnalysis, TopicPerformance},
};

pub const DEFAULT_RECOMMENDATION: &str =
    "Keep up the great work! Continue practicing regularly to maintain your performance.";

/// Up to three study suggestions, most important first.
///
/// Weakest topic comes first, then the declining-topics alert, then one entry
/// per weak difficulty in easy-to-hard order. Ties for the weakest topic go to
/// the first topic in map order.
pub fn recommend(topics: &TopicPerformance, difficulties: &DifficultyAnalysis) -> Vec<String> {
    let mut recommendations = Vec::new();

    let weakest = topics.iter().fold(None, |weakest, (topic, stats)| match weakest {
        Some((_, best)) if stats.average_score >= best => weakest,
        _ => Some((topic, stats.average_score)),
    });
    if let Some((topic, average)) = weakest {
        if average < WEAK_TOPIC_THRESHOLD {
            recommendations.push(format!(
                "Focus on improving your understanding of {} - your average score is {:.1}%",
                topic, average
            ));
        }
    }

    let declining: Vec<&str> = topics
        .iter()
        .filter(|(_, stats)| stats.trend < DECLINE_TREND_THRESHOLD)
        .map(|(topic, _)| topic.as_str())
        .collect();
    if !declining.is_empty() {
        recommendations.push(format!(
            "Review {} as your performance seems to be declining in these areas",
            declining.join(", ")
        ));
    }

    for (difficulty, stats) in difficulties {
        if stats.average_score < WEAK_DIFFICULTY_THRESHOLD {
            recommendations.push(format!(
                "Consider practicing more {} level questions - your success rate is {:.1}%",
                difficulty, stats.success_rate
            ));
        }
    }

    if recommendations.is_empty() {
        recommendations.push(DEFAULT_RECOMMENDATION.to_string());
    }

    recommendations.truncate(MAX_RECOMMENDATIONS);
    recommendations
}
