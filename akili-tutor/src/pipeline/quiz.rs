/// Module quiz pipeline
///
/// Quizzes are free. A learner unlocks module *n* by passing the quiz of
/// module *n − 1*, and an unfinished attempt is handed back instead of
/// generating a new one.

use akili_shared::models::course::Course;
use akili_shared::models::module::Module;
use akili_shared::models::question::{Question, QuestionView, CHOICES_PER_QUESTION};
use akili_shared::models::quiz::QuizAttempt;
use akili_shared::scoring::QUIZ_PASS_PERCENTAGE;
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::{GenerationError, GenerationPipeline};
use crate::fallback::FallbackRequest;
use crate::parse::string_field;
use crate::prompts;

pub const QUIZ_QUESTION_COUNT: usize = 5;

/// Fewest valid questions accepted for a quiz
pub const QUIZ_QUESTION_FLOOR: usize = 3;

pub const QUIZ_MAX_TOKENS: u32 = 3000;

#[derive(Debug, Clone, Serialize)]
pub struct QuizStart {
    pub attempt_id: Uuid,
    pub module_id: Uuid,
    pub questions: Vec<QuestionView>,

    /// An unfinished attempt was returned
    pub reused: bool,

    pub tier_used: Option<String>,
}

impl QuizStart {
    fn from_attempt(attempt: &QuizAttempt, reused: bool, tier_used: Option<String>) -> Self {
        QuizStart {
            attempt_id: attempt.id,
            module_id: attempt.module_id,
            questions: attempt
                .questions
                .iter()
                .enumerate()
                .map(|(i, q)| q.view(i))
                .collect(),
            reused,
            tier_used,
        }
    }
}

/// Choice list from an array, or from an object keyed "A".."D"
fn choices_from_value(value: &Value) -> Option<Vec<String>> {
    let choices: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .map(|c| match c {
                Value::String(s) => s.trim().to_string(),
                other => other.to_string(),
            })
            .collect(),
        Value::Object(map) => ["A", "B", "C", "D"]
            .iter()
            .filter_map(|key| map.get(*key).or_else(|| map.get(&key.to_lowercase())))
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .collect(),
        _ => return None,
    };

    if choices.len() < CHOICES_PER_QUESTION || choices.iter().any(String::is_empty) {
        return None;
    }
    Some(choices.into_iter().take(CHOICES_PER_QUESTION).collect())
}

/// Correct index from a number (taken modulo the choice count) or a letter A-D
fn correct_index_from(item: &Value) -> Option<usize> {
    let raw = ["correct_index", "answer_index", "answer", "correct_answer"]
        .iter()
        .find_map(|key| item.get(*key))?;

    let choices = CHOICES_PER_QUESTION as i64;
    match raw {
        Value::Number(n) => n.as_i64().map(|i| i.rem_euclid(choices) as usize),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Some(i.rem_euclid(choices) as usize);
            }
            match s.to_ascii_uppercase().as_str() {
                "A" => Some(0),
                "B" => Some(1),
                "C" => Some(2),
                "D" => Some(3),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Builds a question from either generated shape, or `None` if unusable
pub(super) fn question_from_value(item: &Value) -> Option<Question> {
    let question_text = string_field(item, &["question_text", "question"])?;
    let choices = ["choices", "options"]
        .iter()
        .find_map(|key| item.get(*key))
        .and_then(choices_from_value)?;
    let correct_index = correct_index_from(item)?;
    let explanation = string_field(item, &["explanation"]).unwrap_or_default();

    Some(Question {
        question_text,
        choices,
        correct_index,
        explanation,
    })
}

/// Keeps up to [`QUIZ_QUESTION_COUNT`] valid questions
pub fn normalize_quiz_questions(items: Vec<Value>) -> Result<Vec<Question>, GenerationError> {
    let questions: Vec<Question> = items
        .iter()
        .filter_map(question_from_value)
        .take(QUIZ_QUESTION_COUNT)
        .collect();

    if questions.len() < QUIZ_QUESTION_FLOOR {
        return Err(GenerationError::TooFewItems {
            kind: "quiz",
            got: questions.len(),
            min: QUIZ_QUESTION_FLOOR,
        });
    }
    Ok(questions)
}

impl GenerationPipeline {
    /// Starts (or resumes) the quiz of a module.
    pub async fn start_quiz(&self, user_id: Uuid, module_id: Uuid) -> Result<QuizStart, GenerationError> {
        let module = Module::find_for_user(&self.db, module_id, user_id)
            .await?
            .ok_or(GenerationError::NotFound("Module"))?;

        if let Some(previous) = module.previous(&self.db).await? {
            let unlocked =
                QuizAttempt::has_passed(&self.db, user_id, previous.id, QUIZ_PASS_PERCENTAGE).await?;
            if !unlocked {
                return Err(GenerationError::ModuleLocked {
                    required_position: previous.position,
                });
            }
        }

        if let Some(open) = QuizAttempt::find_open(&self.db, user_id, module.id).await? {
            return Ok(QuizStart::from_attempt(&open, true, None));
        }

        let course = Course::find_for_user(&self.db, module.course_id, user_id)
            .await?
            .ok_or(GenerationError::NotFound("Course"))?;

        let prompt = prompts::quiz(
            &course.subject,
            &course.context_label(),
            &module.title,
            &module.syllabus_topic,
            QUIZ_QUESTION_COUNT,
        );
        let request = FallbackRequest::new(prompt)
            .max_tokens(QUIZ_MAX_TOKENS)
            .subject(&course.subject);

        let (items, tier_used) = self.generate_list(request, "questions").await?;
        let questions = normalize_quiz_questions(items)?;
        let attempt = QuizAttempt::create(&self.db, user_id, module.id, questions).await?;

        info!(
            user_id = %user_id,
            module_id = %module.id,
            attempt_id = %attempt.id,
            tier = %tier_used,
            "Quiz generated"
        );
        Ok(QuizStart::from_attempt(&attempt, false, Some(tier_used)))
    }
}
