/// Course model
///
/// A course is one learner's study plan for a subject. It is either tied to
/// an exam body (JAMB, SSCE, JSS) or to a school level and term. The module
/// list, exams and quiz attempts hang off it and are removed with it.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE courses (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     subject TEXT NOT NULL,
///     exam_type TEXT,
///     school_level TEXT,
///     term TEXT,
///     curriculum_id UUID REFERENCES curricula(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Nigerian examination bodies a legacy course can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExamType {
    #[serde(rename = "JAMB")]
    Jamb,
    #[serde(rename = "SSCE")]
    Ssce,
    #[serde(rename = "JSS")]
    Jss,
}

impl ExamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamType::Jamb => "JAMB",
            ExamType::Ssce => "SSCE",
            ExamType::Jss => "JSS",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "JAMB" => Some(ExamType::Jamb),
            "SSCE" | "WAEC" => Some(ExamType::Ssce),
            "JSS" => Some(ExamType::Jss),
            _ => None,
        }
    }

    /// Long form used in prompts
    pub fn description(&self) -> &'static str {
        match self {
            ExamType::Jamb => "JAMB UTME (university entrance)",
            ExamType::Ssce => "SSCE/WAEC senior secondary certificate",
            ExamType::Jss => "Junior Secondary School",
        }
    }
}

/// How a course is scoped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CourseScope {
    /// Tied to an examination body
    Exam { exam_type: ExamType },

    /// Tied to a school level and term, e.g. "SS2", "First Term"
    Level { school_level: String, term: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject: String,
    pub exam_type: Option<String>,
    pub school_level: Option<String>,
    pub term: Option<String>,
    pub curriculum_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Input for [`Course::create`]
#[derive(Debug, Clone)]
pub struct CreateCourse {
    pub user_id: Uuid,
    pub subject: String,
    pub scope: CourseScope,
    pub curriculum_id: Option<Uuid>,
}

impl Course {
    /// Reassembles the scope from the stored columns
    pub fn scope(&self) -> Option<CourseScope> {
        if let Some(exam_type) = self.exam_type.as_deref().and_then(ExamType::from_str) {
            return Some(CourseScope::Exam { exam_type });
        }
        match (&self.school_level, &self.term) {
            (Some(level), Some(term)) => Some(CourseScope::Level {
                school_level: level.clone(),
                term: term.clone(),
            }),
            _ => None,
        }
    }

    /// Short context label, e.g. "JAMB" or "SS2 First Term"
    pub fn context_label(&self) -> String {
        match self.scope() {
            Some(CourseScope::Exam { exam_type }) => exam_type.as_str().to_string(),
            Some(CourseScope::Level { school_level, term }) => format!("{} {}", school_level, term),
            None => "General".to_string(),
        }
    }

    pub async fn create(pool: &PgPool, data: CreateCourse) -> Result<Self, sqlx::Error> {
        let (exam_type, school_level, term) = match &data.scope {
            CourseScope::Exam { exam_type } => (Some(exam_type.as_str()), None, None),
            CourseScope::Level { school_level, term } => {
                (None, Some(school_level.as_str()), Some(term.as_str()))
            }
        };

        sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (user_id, subject, exam_type, school_level, term, curriculum_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(data.user_id)
        .bind(&data.subject)
        .bind(exam_type)
        .bind(school_level)
        .bind(term)
        .bind(data.curriculum_id)
        .fetch_one(pool)
        .await
    }

    /// Finds a course owned by `user_id`
    pub async fn find_for_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Existing course for the same user, subject and scope
    pub async fn find_duplicate(
        pool: &PgPool,
        user_id: Uuid,
        subject: &str,
        scope: &CourseScope,
    ) -> Result<Option<Self>, sqlx::Error> {
        match scope {
            CourseScope::Exam { exam_type } => {
                sqlx::query_as::<_, Course>(
                    r#"
                    SELECT * FROM courses
                    WHERE user_id = $1 AND LOWER(subject) = LOWER($2) AND exam_type = $3
                    LIMIT 1
                    "#,
                )
                .bind(user_id)
                .bind(subject)
                .bind(exam_type.as_str())
                .fetch_optional(pool)
                .await
            }
            CourseScope::Level { school_level, term } => {
                sqlx::query_as::<_, Course>(
                    r#"
                    SELECT * FROM courses
                    WHERE user_id = $1 AND LOWER(subject) = LOWER($2)
                      AND LOWER(school_level) = LOWER($3) AND LOWER(term) = LOWER($4)
                    LIMIT 1
                    "#,
                )
                .bind(user_id)
                .bind(subject)
                .bind(school_level)
                .bind(term)
                .fetch_optional(pool)
                .await
            }
        }
    }

    /// Newest first
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Course>(
            "SELECT * FROM courses WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn count_for_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM courses WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Deletes the course and everything hanging off it
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(exam_type: Option<&str>, level: Option<&str>, term: Option<&str>) -> Course {
        Course {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            subject: "Physics".to_string(),
            exam_type: exam_type.map(str::to_string),
            school_level: level.map(str::to_string),
            term: term.map(str::to_string),
            curriculum_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_exam_type_parsing() {
        assert_eq!(ExamType::from_str("jamb"), Some(ExamType::Jamb));
        assert_eq!(ExamType::from_str("WAEC"), Some(ExamType::Ssce));
        assert_eq!(ExamType::from_str("NECO"), None);
    }

    #[test]
    fn test_scope_prefers_exam_type() {
        let c = course(Some("SSCE"), Some("SS3"), Some("Third Term"));
        assert_eq!(c.scope(), Some(CourseScope::Exam { exam_type: ExamType::Ssce }));
        assert_eq!(c.context_label(), "SSCE");
    }

    #[test]
    fn test_scope_level() {
        let c = course(None, Some("SS2"), Some("First Term"));
        assert_eq!(c.context_label(), "SS2 First Term");
    }

    #[test]
    fn test_scope_incomplete_level() {
        let c = course(None, Some("SS2"), None);
        assert_eq!(c.scope(), None);
        assert_eq!(c.context_label(), "General");
    }

    #[test]
    fn test_scope_deserializes_tagged() {
        let scope: CourseScope =
            serde_json::from_str(r#"{"kind":"exam","exam_type":"JAMB"}"#).unwrap();
        assert_eq!(scope, CourseScope::Exam { exam_type: ExamType::Jamb });
    }
}
