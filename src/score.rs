//! Scoring and result summaries
//!
//! Scoring is a pure reduction over the question sequence and the answer
//! map. A question without an entry in the map counts as unanswered and
//! therefore incorrect.

use std::collections::HashMap;

use itertools::Itertools;
use serde::Serialize;

use crate::{
    constants,
    question::{Question, QuestionId},
};

/// The user's selected option for each answered question
pub type AnswerMap = HashMap<QuestionId, String>;

/// Counts the questions whose recorded answer equals the correct answer
///
/// # Arguments
///
/// * `questions` - The ordered question sequence
/// * `answers` - The selected option per question identifier
///
/// # Returns
///
/// A value between `0` and `questions.len()` inclusive
pub fn score(questions: &[Question], answers: &AnswerMap) -> usize {
    questions
        .iter()
        .filter(|question| {
            answers
                .get(question.id())
                .is_some_and(|answer| question.is_correct(answer))
        })
        .count()
}

/// Rounds `score / total` to a whole percentage, `0` when there are no questions
pub fn percentage(score: usize, total: usize) -> u32 {
    if total == 0 {
        0
    } else {
        (score as f64 / total as f64 * 100.).round() as u32
    }
}

/// Feedback band shown with the final score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::Display)]
pub enum FeedbackTier {
    /// At least 80%
    #[display("Excellent work! You're a quiz master!")]
    Excellent,
    /// At least 50%
    #[display("Good job! You passed the quiz.")]
    Good,
    /// Below 50%
    #[display("Keep practicing! You can do better.")]
    KeepPracticing,
}

impl FeedbackTier {
    /// Picks the tier for a whole percentage
    pub fn from_percentage(percentage: u32) -> Self {
        if percentage >= constants::score::EXCELLENT_PERCENTAGE {
            Self::Excellent
        } else if percentage >= constants::score::PASSING_PERCENTAGE {
            Self::Good
        } else {
            Self::KeepPracticing
        }
    }

    /// Returns the message displayed for this tier
    pub fn message(self) -> String {
        self.to_string()
    }
}

/// Review line for one question on the results screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerReview {
    /// The question prompt
    pub question: String,
    /// The option the user picked, `None` if unanswered
    pub answer: Option<String>,
    /// The correct option
    pub correct_answer: String,
    /// Whether the picked option was correct
    pub correct: bool,
}

/// Builds the per-question review in question order
pub fn review(questions: &[Question], answers: &AnswerMap) -> Vec<AnswerReview> {
    questions
        .iter()
        .map(|question| {
            let answer = answers.get(question.id()).cloned();
            AnswerReview {
                question: question.text().to_owned(),
                correct: answer.as_deref().is_some_and(|a| question.is_correct(a)),
                answer,
                correct_answer: question.correct_answer().to_owned(),
            }
        })
        .collect_vec()
}

/// Final result of a completed quiz
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Number of correct answers
    pub score: usize,
    /// Number of questions in the quiz
    pub total: usize,
    /// Rounded percentage of correct answers
    pub percentage: u32,
    /// Feedback band for the percentage
    pub tier: FeedbackTier,
    /// Feedback message for the band
    pub message: String,
    /// Per-question review
    pub review: Vec<AnswerReview>,
}

impl Summary {
    /// Scores `answers` against `questions` and assembles the full summary
    pub fn new(questions: &[Question], answers: &AnswerMap) -> Self {
        let score = score(questions, answers);
        let total = questions.len();
        let percentage = percentage(score, total);
        let tier = FeedbackTier::from_percentage(percentage);

        Self {
            score,
            total,
            percentage,
            tier,
            message: tier.message(),
            review: review(questions, answers),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::source::sample_questions;

    fn answers(entries: &[(&str, &str)]) -> AnswerMap {
        entries
            .iter()
            .map(|(id, answer)| (QuestionId::new(*id), (*answer).to_string()))
            .collect()
    }

    #[test]
    fn test_empty_answers_score_zero() {
        let questions = sample_questions();
        assert_eq!(score(&questions, &AnswerMap::new()), 0);
    }

    #[test]
    fn test_all_correct() {
        let questions = sample_questions();
        let answers = answers(&[("q1", "Paris"), ("q2", "<style>"), ("q3", "Pacific Ocean")]);

        let summary = Summary::new(&questions, &answers);
        assert_eq!(summary.score, 3);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.percentage, 100);
        assert_eq!(summary.tier, FeedbackTier::Excellent);
        assert!(summary.message.starts_with("Excellent work!"));
    }

    #[test]
    fn test_partial_answers_count_missing_as_incorrect() {
        let questions = sample_questions();
        let answers = answers(&[("q1", "Berlin")]);

        let summary = Summary::new(&questions, &answers);
        assert_eq!(summary.score, 0);
        assert_eq!(summary.percentage, 0);
        assert_eq!(summary.tier, FeedbackTier::KeepPracticing);
        assert!(summary.message.starts_with("Keep practicing!"));
    }

    #[test]
    fn test_score_ignores_unknown_ids() {
        let questions = sample_questions();
        let answers = answers(&[("q1", "Paris"), ("gq9-unknown", "Paris")]);
        assert_eq!(score(&questions, &answers), 1);
    }

    #[test]
    fn test_score_is_idempotent() {
        let questions = sample_questions();
        let answers = answers(&[("q1", "Paris"), ("q3", "Arctic Ocean")]);
        assert_eq!(score(&questions, &answers), score(&questions, &answers));
        assert_eq!(score(&questions, &answers), 1);
    }

    #[test]
    fn test_score_order_independent() {
        let mut questions = sample_questions();
        let answers = answers(&[("q2", "<style>"), ("q3", "Pacific Ocean")]);
        let before = score(&questions, &answers);
        questions.reverse();
        assert_eq!(score(&questions, &answers), before);
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(5, 5), 100);
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(FeedbackTier::from_percentage(100), FeedbackTier::Excellent);
        assert_eq!(FeedbackTier::from_percentage(80), FeedbackTier::Excellent);
        assert_eq!(FeedbackTier::from_percentage(79), FeedbackTier::Good);
        assert_eq!(FeedbackTier::from_percentage(50), FeedbackTier::Good);
        assert_eq!(FeedbackTier::from_percentage(49), FeedbackTier::KeepPracticing);
        assert_eq!(FeedbackTier::from_percentage(0), FeedbackTier::KeepPracticing);
    }

    #[test]
    fn test_review_marks_unanswered() {
        let questions = sample_questions();
        let answers = answers(&[("q1", "Paris"), ("q2", "<css>")]);

        let review = review(&questions, &answers);
        assert_eq!(review.len(), 3);
        assert_eq!(review[0].answer.as_deref(), Some("Paris"));
        assert!(review[0].correct);
        assert_eq!(review[1].correct_answer, "<style>");
        assert!(!review[1].correct);
        assert_eq!(review[2].answer, None);
        assert!(!review[2].correct);
    }
}
