/// Multiple-choice questions shared by quizzes and exams
///
/// Questions are stored as a JSONB array on the attempt row. The answer key
/// stays server-side; learners receive [`QuestionView`] until they submit.

use serde::{Deserialize, Serialize};

/// Choices per question
pub const CHOICES_PER_QUESTION: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question_text: String,

    /// Exactly [`CHOICES_PER_QUESTION`] entries
    pub choices: Vec<String>,

    /// Index into `choices`
    pub correct_index: usize,

    #[serde(default)]
    pub explanation: String,
}

/// A question with the answer key removed
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub number: usize,
    pub question_text: String,
    pub choices: Vec<String>,
}

impl Question {
    pub fn view(&self, index: usize) -> QuestionView {
        QuestionView {
            number: index + 1,
            question_text: self.question_text.clone(),
            choices: self.choices.clone(),
        }
    }
}

/// Per-question feedback returned after submission
#[derive(Debug, Clone, Serialize)]
pub struct QuestionReview {
    pub number: usize,
    pub question_text: String,
    pub choices: Vec<String>,

    /// -1 when skipped
    pub chosen_index: i32,
    pub correct_index: usize,
    pub is_correct: bool,
    pub explanation: String,
}

/// Pairs each question with the submitted answer
pub fn review(questions: &[Question], answers: &[i32]) -> Vec<QuestionReview> {
    questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let chosen = answers.get(i).copied().unwrap_or(-1);
            QuestionReview {
                number: i + 1,
                question_text: q.question_text.clone(),
                choices: q.choices.clone(),
                chosen_index: chosen,
                correct_index: q.correct_index,
                is_correct: chosen >= 0 && chosen as usize == q.correct_index,
                explanation: q.explanation.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct: usize) -> Question {
        Question {
            question_text: "2 + 2 = ?".to_string(),
            choices: vec!["3".into(), "4".into(), "5".into(), "22".into()],
            correct_index: correct,
            explanation: "Basic addition".to_string(),
        }
    }

    #[test]
    fn test_view_hides_answer() {
        let json = serde_json::to_value(question(1).view(0)).unwrap();
        assert_eq!(json["number"], 1);
        assert!(json.get("correct_index").is_none());
    }

    #[test]
    fn test_review_marks_skipped_and_short_answer_lists() {
        let questions = vec![question(1), question(2), question(0)];
        let reviews = review(&questions, &[1, -1]);

        assert!(reviews[0].is_correct);
        assert!(!reviews[1].is_correct);
        assert_eq!(reviews[1].chosen_index, -1);
        assert_eq!(reviews[2].chosen_index, -1);
    }
}
