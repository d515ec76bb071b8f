/// Course creation and the module-list pipeline

use akili_shared::models::course::{Course, CourseScope, CreateCourse};
use akili_shared::models::curriculum::Curriculum;
use akili_shared::models::module::{Module, ModuleOutline};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{GenerationError, GenerationPipeline};
use crate::fallback::FallbackRequest;
use crate::parse::string_field;
use crate::prompts;

/// Modules per course
pub const MODULE_COUNT: usize = 15;

/// Fewest usable modules accepted from a model
pub const MODULE_FLOOR: usize = 10;

pub const MODULE_LIST_MAX_TOKENS: u32 = 1500;

const UNTITLED: &str = "Untitled Module";
const UNSPECIFIED: &str = "Unspecified Topic";

/// Course creation request
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub user_id: Uuid,
    pub subject: String,
    pub scope: CourseScope,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseCreation {
    pub course: Course,
    pub modules: Vec<Module>,

    /// `false` when an identical course already existed (nothing charged)
    pub created: bool,

    pub tier_used: Option<String>,
}

/// Turns model output into exactly [`MODULE_COUNT`] outlines.
///
/// Objects without a title get "Untitled Module" and objects without a topic
/// get "Unspecified Topic"; items carrying neither, and non-objects other than
/// plain strings, are skipped. Below [`MODULE_FLOOR`] usable items the list is
/// rejected; short lists are padded with review modules and long ones cut.
pub fn normalize_modules(items: Vec<Value>) -> Result<Vec<ModuleOutline>, GenerationError> {
    let mut outline: Vec<ModuleOutline> = items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) if !s.trim().is_empty() => Some(ModuleOutline {
                title: s.trim().to_string(),
                topic: s.trim().to_string(),
            }),
            Value::Object(_) => {
                let title = string_field(item, &["title", "module_title", "name"]);
                let topic = string_field(item, &["topic", "syllabus_topic"]);
                if title.is_none() && topic.is_none() {
                    return None;
                }
                Some(ModuleOutline {
                    title: title.unwrap_or_else(|| UNTITLED.to_string()),
                    topic: topic.unwrap_or_else(|| UNSPECIFIED.to_string()),
                })
            }
            _ => None,
        })
        .collect();

    if outline.len() < MODULE_FLOOR {
        return Err(GenerationError::TooFewItems {
            kind: "module list",
            got: outline.len(),
            min: MODULE_FLOOR,
        });
    }

    let usable = outline.len();
    outline.truncate(MODULE_COUNT);
    for i in 0..MODULE_COUNT.saturating_sub(usable) {
        let base = &outline[i % usable];
        let review = ModuleOutline {
            title: format!("Review: {}", base.title),
            topic: base.topic.clone(),
        };
        outline.push(review);
    }

    Ok(outline)
}

fn describe_scope(subject: &str, scope: &CourseScope) -> String {
    match scope {
        CourseScope::Exam { exam_type } => format!("{} ({})", subject, exam_type.as_str()),
        CourseScope::Level { school_level, term } => {
            format!("{} ({} {})", subject, school_level, term)
        }
    }
}

impl GenerationPipeline {
    /// Creates a course and its module list.
    ///
    /// An identical existing course is returned as-is without charging. A
    /// missing curriculum aborts before any credit is spent. Once charged,
    /// any failure deletes the course and refunds in full.
    pub async fn create_course(&self, request: NewCourse) -> Result<CourseCreation, GenerationError> {
        let subject = request.subject.trim().to_string();

        if let Some(existing) =
            Course::find_duplicate(&self.db, request.user_id, &subject, &request.scope).await?
        {
            info!(user_id = %request.user_id, course_id = %existing.id, "Course already exists");
            let modules = Module::list_for_course(&self.db, existing.id).await?;
            return Ok(CourseCreation {
                course: existing,
                modules,
                created: false,
                tier_used: None,
            });
        }

        let curriculum = self
            .find_curriculum(&subject, &request.scope)
            .await?
            .ok_or_else(|| GenerationError::CurriculumMissing(describe_scope(&subject, &request.scope)))?;

        let cost = self.costs.course;
        let reason = format!("course: {}", subject);
        self.ledger.charge(request.user_id, cost, &reason).await?;

        let course = match Course::create(
            &self.db,
            CreateCourse {
                user_id: request.user_id,
                subject,
                scope: request.scope,
                curriculum_id: Some(curriculum.id),
            },
        )
        .await
        {
            Ok(course) => course,
            Err(e) => {
                self.refund(request.user_id, cost, &reason).await;
                return Err(e.into());
            }
        };

        match self.generate_modules(&course, &curriculum).await {
            Ok((modules, tier_used)) => {
                info!(
                    user_id = %course.user_id,
                    course_id = %course.id,
                    modules = modules.len(),
                    tier = %tier_used,
                    "Course created"
                );
                Ok(CourseCreation {
                    course,
                    modules,
                    created: true,
                    tier_used: Some(tier_used),
                })
            }
            Err(e) => {
                warn!(course_id = %course.id, error = %e, "Module generation failed, removing course");
                if let Err(delete_err) = Course::delete(&self.db, course.id).await {
                    error!(course_id = %course.id, error = %delete_err, "Failed to remove course");
                }
                self.refund(course.user_id, cost, &reason).await;
                Err(e)
            }
        }
    }

    async fn find_curriculum(
        &self,
        subject: &str,
        scope: &CourseScope,
    ) -> Result<Option<Curriculum>, sqlx::Error> {
        match scope {
            CourseScope::Exam { exam_type } => {
                Curriculum::find_for_exam(&self.db, subject, *exam_type).await
            }
            CourseScope::Level { school_level, term } => {
                Curriculum::find_for_level(&self.db, subject, school_level, term).await
            }
        }
    }

    async fn generate_modules(
        &self,
        course: &Course,
        curriculum: &Curriculum,
    ) -> Result<(Vec<Module>, String), GenerationError> {
        let prompt = prompts::module_list(
            &course.subject,
            &course.context_label(),
            &curriculum.overview,
            &curriculum.syllabus,
            MODULE_COUNT,
        );
        let request = FallbackRequest::new(prompt)
            .max_tokens(MODULE_LIST_MAX_TOKENS)
            .subject(&course.subject);

        let (items, tier_used) = self.generate_list(request, "modules").await?;
        let outline = normalize_modules(items)?;

        let mut tx = self.db.begin().await?;
        let modules = Module::insert_outline(&mut tx, course.id, &outline).await?;
        tx.commit().await?;

        Ok((modules, tier_used))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn items(n: usize) -> Vec<Value> {
        (1..=n)
            .map(|i| json!({"title": format!("Module {i}"), "topic": format!("Topic {i}")}))
            .collect()
    }

    #[test]
    fn test_exact_count_kept_in_order() {
        let outline = normalize_modules(items(15)).unwrap();
        assert_eq!(outline.len(), 15);
        assert_eq!(outline[0].title, "Module 1");
        assert_eq!(outline[14].title, "Module 15");
    }

    #[test]
    fn test_twelve_padded_to_fifteen() {
        let outline = normalize_modules(items(12)).unwrap();
        assert_eq!(outline.len(), 15);
        assert_eq!(outline[11].title, "Module 12");
        assert_eq!(outline[12].title, "Review: Module 1");
        assert_eq!(outline[14].title, "Review: Module 3");
        assert_eq!(outline[14].topic, "Topic 3");
    }

    #[test]
    fn test_seventeen_truncated_to_fifteen() {
        let outline = normalize_modules(items(17)).unwrap();
        assert_eq!(outline.len(), 15);
        assert_eq!(outline.last().unwrap().title, "Module 15");
    }

    #[test]
    fn test_below_floor_rejected() {
        let err = normalize_modules(items(9)).unwrap_err();
        assert!(matches!(
            err,
            GenerationError::TooFewItems { got: 9, min: 10, .. }
        ));
    }

    #[test]
    fn test_missing_fields_defaulted() {
        let mut list = items(9);
        list.push(json!({"title": "Only a title"}));
        list.push(json!({"topic": "Only a topic"}));
        list.push(json!({"unrelated": 1}));
        list.push(json!(42));

        let outline = normalize_modules(list).unwrap();
        assert_eq!(outline[9].topic, "Unspecified Topic");
        assert_eq!(outline[10].title, "Untitled Module");
        assert_eq!(outline[10].topic, "Only a topic");
        assert_eq!(outline.len(), 15);
    }

    #[test]
    fn test_describe_scope() {
        use akili_shared::models::course::ExamType;

        let exam = CourseScope::Exam { exam_type: ExamType::Jamb };
        assert_eq!(describe_scope("Physics", &exam), "Physics (JAMB)");

        let level = CourseScope::Level {
            school_level: "SS2".to_string(),
            term: "First Term".to_string(),
        };
        assert_eq!(describe_scope("Physics", &level), "Physics (SS2 First Term)");
    }
}
