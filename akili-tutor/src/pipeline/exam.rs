/// Course exam pipeline

use akili_shared::models::course::Course;
use akili_shared::models::curriculum::Curriculum;
use akili_shared::models::exam::CourseExam;
use akili_shared::models::module::Module;
use akili_shared::models::question::{Question, QuestionView};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::quiz::question_from_value;
use super::{GenerationError, GenerationPipeline};
use crate::fallback::FallbackRequest;
use crate::prompts;

pub const EXAM_QUESTION_COUNT: usize = 20;

/// Fewest valid questions accepted for an exam
pub const EXAM_QUESTION_FLOOR: usize = 5;

pub const EXAM_MAX_TOKENS: u32 = 4000;

/// Modules whose titles are offered to the model as exam topics
pub const EXAM_TOPIC_MODULES: usize = 14;

#[derive(Debug, Clone, Serialize)]
pub struct ExamStart {
    pub exam_id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub questions: Vec<QuestionView>,
    pub charged: i32,
    pub tier_used: String,
}

/// Keeps up to [`EXAM_QUESTION_COUNT`] valid questions
pub fn normalize_exam_questions(items: Vec<Value>) -> Result<Vec<Question>, GenerationError> {
    let questions: Vec<Question> = items
        .iter()
        .filter_map(question_from_value)
        .take(EXAM_QUESTION_COUNT)
        .collect();

    if questions.len() < EXAM_QUESTION_FLOOR {
        return Err(GenerationError::TooFewItems {
            kind: "exam",
            got: questions.len(),
            min: EXAM_QUESTION_FLOOR,
        });
    }
    Ok(questions)
}

impl GenerationPipeline {
    /// Generates a course-wide mock exam.
    ///
    /// The learner's completed exams for the course are cleared only once the
    /// new exam has its questions. A refused charge or a failed generation
    /// leaves them in place; a failure after charging deletes the new exam
    /// and refunds.
    pub async fn start_exam(&self, user_id: Uuid, course_id: Uuid) -> Result<ExamStart, GenerationError> {
        let course = Course::find_for_user(&self.db, course_id, user_id)
            .await?
            .ok_or(GenerationError::NotFound("Course"))?;

        let curriculum = match course.curriculum_id {
            Some(id) => Curriculum::find_by_id(&self.db, id).await?,
            None => None,
        }
        .ok_or_else(|| GenerationError::CurriculumMissing(format!("{} ({})", course.subject, course.context_label())))?;

        let cost = self.costs.exam;
        let reason = format!("exam: {}", course.subject);
        self.ledger.charge(user_id, cost, &reason).await?;

        let title = format!("{} {} - Course-Wide Mock Exam", course.context_label(), course.subject);
        let exam = match CourseExam::create_pending(&self.db, user_id, course.id, &title).await {
            Ok(exam) => exam,
            Err(e) => {
                self.refund(user_id, cost, &reason).await;
                return Err(e.into());
            }
        };

        match self.generate_exam(&course, &curriculum, exam.id).await {
            Ok((exam, tier_used)) => {
                self.clear_completed_exams(user_id, course.id).await;
                info!(
                    user_id = %user_id,
                    exam_id = %exam.id,
                    questions = exam.total_questions,
                    tier = %tier_used,
                    "Exam generated"
                );
                Ok(ExamStart {
                    exam_id: exam.id,
                    course_id: exam.course_id,
                    title: exam.title.clone(),
                    questions: exam.questions.iter().enumerate().map(|(i, q)| q.view(i)).collect(),
                    charged: cost,
                    tier_used,
                })
            }
            Err(e) => {
                warn!(exam_id = %exam.id, error = %e, "Exam generation failed, removing exam");
                if let Err(delete_err) = CourseExam::delete(&self.db, exam.id).await {
                    error!(exam_id = %exam.id, error = %delete_err, "Failed to remove exam");
                }
                self.refund(user_id, cost, &reason).await;
                Err(e)
            }
        }
    }

    /// Drops earlier results once a replacement exam exists. The new exam is
    /// still open, so it is never matched.
    async fn clear_completed_exams(&self, user_id: Uuid, course_id: Uuid) {
        match CourseExam::delete_completed(&self.db, user_id, course_id).await {
            Ok(0) => {}
            Ok(cleared) => info!(user_id = %user_id, course_id = %course_id, cleared, "Cleared completed exams"),
            Err(e) => error!(user_id = %user_id, course_id = %course_id, error = %e, "Failed to clear completed exams"),
        }
    }

    async fn generate_exam(
        &self,
        course: &Course,
        curriculum: &Curriculum,
        exam_id: Uuid,
    ) -> Result<(CourseExam, String), GenerationError> {
        let topics: Vec<String> = Module::list_for_course(&self.db, course.id)
            .await?
            .into_iter()
            .take(EXAM_TOPIC_MODULES)
            .map(|m| m.title)
            .collect();

        let prompt = prompts::exam(
            &course.subject,
            &course.context_label(),
            &topics,
            &curriculum.syllabus,
            EXAM_QUESTION_COUNT,
        );
        let request = FallbackRequest::new(prompt)
            .max_tokens(EXAM_MAX_TOKENS)
            .subject(&course.subject);

        let (items, tier_used) = self.generate_list(request, "questions").await?;
        let questions = normalize_exam_questions(items)?;
        let exam = CourseExam::attach_questions(&self.db, exam_id, questions).await?;

        Ok((exam, tier_used))
    }
}
