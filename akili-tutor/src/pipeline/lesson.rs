/// Lesson pipeline
///
/// Lessons are a shared cache keyed by (subject topic, syllabus version):
/// two learners on the same topic of the same syllabus read the same
/// lesson, and only the first one pays for it.

use akili_shared::models::course::Course;
use akili_shared::models::curriculum::Curriculum;
use akili_shared::models::lesson::{Lesson, StoreLesson};
use akili_shared::models::module::Module;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::{GenerationError, GenerationPipeline};
use crate::fallback::FallbackRequest;
use crate::parse::ParseError;
use crate::prompts;
use crate::render::render_lesson;
use crate::validator::{ValidationPolicy, Verdict};

pub const LESSON_MAX_TOKENS: u32 = 2500;

/// Cache version for courses without a curriculum
const UNVERSIONED: &str = "unversioned";

#[derive(Debug, Clone, Serialize)]
pub struct LessonDelivery {
    pub lesson: Lesson,
    pub module: Module,

    /// Served from the cache
    pub cached: bool,

    /// Credits spent on this request
    pub charged: i32,
}

/// Cache topic: the syllabus topic qualified by subject, since topics such
/// as "Introduction" recur across subjects.
pub(crate) fn cache_topic(subject: &str, syllabus_topic: &str) -> String {
    format!("{} / {}", subject.trim().to_lowercase(), syllabus_topic.trim())
}

/// Lesson body after review, and whether the review vouched for it
fn apply_verdict(
    content: String,
    verdict: Verdict,
    policy: ValidationPolicy,
) -> Result<(String, bool), GenerationError> {
    match verdict {
        Verdict::Approved => Ok((content, true)),
        Verdict::Corrected(corrected) => Ok((corrected, true)),
        Verdict::Unavailable => match policy {
            ValidationPolicy::FailOpen => Ok((content, false)),
            ValidationPolicy::FailClosed => Err(GenerationError::ReviewUnavailable),
        },
    }
}

impl GenerationPipeline {
    /// Returns the lesson of a module, generating it on a cache miss.
    pub async fn lesson_for_module(
        &self,
        user_id: Uuid,
        module_id: Uuid,
    ) -> Result<LessonDelivery, GenerationError> {
        let module = Module::find_for_user(&self.db, module_id, user_id)
            .await?
            .ok_or(GenerationError::NotFound("Module"))?;
        let course = Course::find_for_user(&self.db, module.course_id, user_id)
            .await?
            .ok_or(GenerationError::NotFound("Course"))?;

        let version = match course.curriculum_id {
            Some(id) => Curriculum::find_by_id(&self.db, id).await?.map(|c| c.version),
            None => None,
        }
        .unwrap_or_else(|| UNVERSIONED.to_string());
        let topic = cache_topic(&course.subject, &module.syllabus_topic);

        if let Some(lesson) = Lesson::find_cached(&self.db, &topic, &version).await? {
            return Ok(LessonDelivery {
                lesson,
                module,
                cached: true,
                charged: 0,
            });
        }

        let cost = self.costs.lesson;
        let reason = format!("lesson: {}", module.title);
        self.ledger.charge(user_id, cost, &reason).await?;

        match self.generate_lesson(user_id, &course, &module, topic, version).await {
            Ok(lesson) => {
                info!(
                    user_id = %user_id,
                    module_id = %module.id,
                    lesson_id = %lesson.id,
                    tier = %lesson.tier_used,
                    validated = lesson.is_validated,
                    "Lesson generated"
                );
                Ok(LessonDelivery {
                    lesson,
                    module,
                    cached: false,
                    charged: cost,
                })
            }
            Err(e) => {
                warn!(module_id = %module.id, error = %e, "Lesson generation failed");
                self.refund(user_id, cost, &reason).await;
                Err(e)
            }
        }
    }

    async fn generate_lesson(
        &self,
        user_id: Uuid,
        course: &Course,
        module: &Module,
        topic: String,
        version: String,
    ) -> Result<Lesson, GenerationError> {
        let prompt = prompts::lesson(
            &course.subject,
            &course.context_label(),
            &module.title,
            &module.syllabus_topic,
        );
        let request = FallbackRequest::new(prompt)
            .max_tokens(LESSON_MAX_TOKENS)
            .subject(&course.subject);

        let (content, tier_used) = self.generate(request).await?;
        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(ParseError::Empty.into());
        }

        let verdict = self.validator.validate(&content, Some(&course.subject)).await;
        let (markdown, is_validated) = apply_verdict(content, verdict, self.validator.policy())?;
        let content_html = render_lesson(&markdown);

        let lesson = Lesson::store(
            &self.db,
            StoreLesson {
                topic,
                syllabus_version: version,
                content_markdown: markdown,
                content_html,
                is_validated,
                tier_used,
                requested_by: Some(user_id),
            },
        )
        .await?;

        Ok(lesson)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_topic_is_subject_qualified() {
        assert_eq!(cache_topic(" Physics ", "Introduction "), "physics / Introduction");
        assert_ne!(cache_topic("Physics", "Introduction"), cache_topic("Chemistry", "Introduction"));
    }

    #[test]
    fn test_verdict_approved() {
        let (body, validated) =
            apply_verdict("body".into(), Verdict::Approved, ValidationPolicy::FailOpen).unwrap();
        assert_eq!(body, "body");
        assert!(validated);
    }

    #[test]
    fn test_verdict_corrected_replaces_body() {
        let (body, validated) = apply_verdict(
            "wrong".into(),
            Verdict::Corrected("right".into()),
            ValidationPolicy::FailClosed,
        )
        .unwrap();
        assert_eq!(body, "right");
        assert!(validated);
    }

    #[test]
    fn test_unavailable_fail_open_keeps_unvalidated() {
        let (body, validated) =
            apply_verdict("body".into(), Verdict::Unavailable, ValidationPolicy::FailOpen).unwrap();
        assert_eq!(body, "body");
        assert!(!validated);
    }

    #[test]
    fn test_unavailable_fail_closed_rejects() {
        let err = apply_verdict("body".into(), Verdict::Unavailable, ValidationPolicy::FailClosed)
            .unwrap_err();
        assert!(matches!(err, GenerationError::ReviewUnavailable));
    }
}
