// src/models/analytics.rs

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{history::LearnerProfile, question::Difficulty};

/// Aggregate over every attempt on one topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicStats {
    pub total_quizzes: usize,
    pub total_score: f64,
    pub best_score: f64,
    pub worst_score: f64,
    pub average_score: f64,
    /// Mean of the last three percentages minus mean of the first three.
    pub trend: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifficultyStats {
    pub total_quizzes: usize,
    pub total_score: f64,
    pub average_score: f64,
    /// Share of attempts at or above the success threshold, as a percentage.
    pub success_rate: f64,
}

pub type TopicPerformance = BTreeMap<String, TopicStats>;

pub type DifficultyAnalysis = BTreeMap<Difficulty, DifficultyStats>;

/// Everything the dashboard shows for a learner.
#[derive(Debug, Serialize)]
pub struct PerformanceReport {
    pub profile: Option<LearnerProfile>,
    pub topic_performance: TopicPerformance,
    pub difficulty_analysis: DifficultyAnalysis,
    pub recommendations: Vec<String>,
}

/// Educator overview of every learner.
#[derive(Debug, Serialize)]
pub struct ClassOverview {
    pub total_students: usize,
    /// Learners with at least one completed quiz.
    pub active_students: usize,
    pub total_quizzes: i64,
    /// Mean of the learners' average scores.
    pub average_score: f64,
    pub students: Vec<LearnerProfile>,
}

impl ClassOverview {
    pub fn from_profiles(students: Vec<LearnerProfile>) -> Self {
        let total_students = students.len();
        let average_score = if total_students > 0 {
            students.iter().map(|s| s.average_score).sum::<f64>() / total_students as f64
        } else {
            0.0
        };

        Self {
            total_students,
            active_students: students.iter().filter(|s| s.quiz_count > 0).count(),
            total_quizzes: students.iter().map(|s| s.quiz_count).sum(),
            average_score,
            students,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn overview_totals_profiles() {
        let mut ada = LearnerProfile::new("ada", None);
        ada.record(90.0, Utc::now());
        ada.record(70.0, Utc::now());
        let mut bob = LearnerProfile::new("bob", None);
        bob.record(40.0, Utc::now());

        let overview = ClassOverview::from_profiles(vec![ada, bob]);
        assert_eq!(overview.total_students, 2);
        assert_eq!(overview.active_students, 2);
        assert_eq!(overview.total_quizzes, 3);
        assert_eq!(overview.average_score, 60.0);
        assert_eq!(overview.students[0].learner_id, "ada");
    }

    #[test]
    fn empty_class_has_zero_average() {
        let overview = ClassOverview::from_profiles(Vec::new());
        assert_eq!(overview.total_students, 0);
        assert_eq!(overview.average_score, 0.0);
    }
}
