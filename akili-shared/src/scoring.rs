/// Answer scoring
///
/// Scoring is exact match between the submitted choice index and the stored
/// correct index, summed to an integer. Percentages are rounded to two
/// decimals, and a percentage equal to the threshold passes.
///
/// ```
/// use akili_shared::scoring::{is_passing, percentage, QUIZ_PASS_PERCENTAGE};
///
/// assert_eq!(percentage(15, 20), 75.0);
/// assert!(is_passing(60.0, QUIZ_PASS_PERCENTAGE));
/// ```

use serde::Serialize;

use crate::models::question::Question;

/// Quizzes and module gating pass at this percentage
pub const QUIZ_PASS_PERCENTAGE: f64 = 60.0;

/// Course exams pass at this percentage
pub const EXAM_PASS_PERCENTAGE: f64 = 50.0;

/// Recorded in place of a choice index for a skipped question
pub const SKIPPED: i32 = -1;

/// Result of scoring one submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    pub score: i32,
    pub total: i32,
    pub percentage: f64,
    pub passed: bool,

    /// Normalized answers, one per question, [`SKIPPED`] where nothing valid was chosen
    pub answers: Vec<i32>,
}

/// Rounds half away from zero to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `round(score / total * 100, 2)`, or 0 for an empty question set
pub fn percentage(score: i32, total: i32) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    round2(score as f64 / total as f64 * 100.0)
}

pub fn is_passing(percentage: f64, threshold: f64) -> bool {
    percentage >= threshold
}

/// Scores a submission against the question set.
///
/// Missing answers and indices outside the choice list count as skipped.
/// Extra answers beyond the question count are ignored.
pub fn score_answers(questions: &[Question], submitted: &[Option<i32>], threshold: f64) -> ScoreCard {
    let answers: Vec<i32> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| match submitted.get(i).copied().flatten() {
            Some(choice) if choice >= 0 && (choice as usize) < q.choices.len() => choice,
            _ => SKIPPED,
        })
        .collect();

    let score = questions
        .iter()
        .zip(&answers)
        .filter(|(q, &a)| a != SKIPPED && a as usize == q.correct_index)
        .count() as i32;

    let total = questions.len() as i32;
    let percentage = percentage(score, total);

    ScoreCard {
        score,
        total,
        percentage,
        passed: is_passing(percentage, threshold),
        answers,
    }
}
