//! Independent recomputation of quiz scores
//!
//! The harness knows which answers it submitted were right, so it can
//! predict the percentage the server should report and flag drift.

use serde::Serialize;

use crate::config::QuizConfig;

/// How many submitted answers were right, wrong, or left blank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AnswerTally {
    pub correct: u32,
    pub incorrect: u32,
    pub unanswered: u32,
}

impl AnswerTally {
    pub fn new(correct: u32, incorrect: u32, unanswered: u32) -> Self {
        Self {
            correct,
            incorrect,
            unanswered,
        }
    }

    pub fn total(&self) -> u32 {
        self.correct + self.incorrect + self.unanswered
    }
}

/// Points model the server grades with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringModel {
    pub correct_points: f64,
    pub wrong_penalty: f64,
}

impl ScoringModel {
    pub fn from_config(quiz: &QuizConfig) -> Self {
        Self {
            correct_points: quiz.correct_points,
            wrong_penalty: quiz.wrong_penalty,
        }
    }

    /// Expected percentage, clamped to `[0, 100]` and rounded to 2 decimals
    pub fn expected_percentage(&self, tally: AnswerTally) -> f64 {
        let max_points = f64::from(tally.total()) * self.correct_points;
        if max_points <= 0.0 {
            return 0.0;
        }

        let earned = f64::from(tally.correct) * self.correct_points
            - f64::from(tally.incorrect) * self.wrong_penalty;
        let earned = earned.clamp(0.0, max_points);

        ((earned / max_points) * 100.0 * 100.0).round() / 100.0
    }
}

impl Default for ScoringModel {
    fn default() -> Self {
        Self::from_config(&QuizConfig::default())
    }
}

pub fn within_tolerance(reported: f64, expected: f64, tolerance: f64) -> bool {
    reported.is_finite() && (reported - expected).abs() <= tolerance
}
