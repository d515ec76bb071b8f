/// Curriculum records
///
/// A curriculum maps a course context to the syllabus text that grounds the
/// generated material. Two kinds exist side by side:
///
/// - exam-type curricula (`exam_type` set: JAMB, SSCE, JSS) used by legacy courses
/// - level curricula (`school_level` and `term` set) used by term-based courses
///
/// Curricula are reference data loaded by operators; learners never write them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::course::ExamType;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Curriculum {
    pub id: Uuid,
    pub subject: String,
    pub school_level: Option<String>,
    pub term: Option<String>,
    pub exam_type: Option<String>,

    /// Bumped when the syllabus text changes; part of the lesson cache key
    pub version: String,

    pub overview: String,
    pub syllabus: String,
    pub created_at: DateTime<Utc>,
}

/// Input for [`Curriculum::create`]
#[derive(Debug, Clone, Default)]
pub struct CreateCurriculum {
    pub subject: String,
    pub school_level: Option<String>,
    pub term: Option<String>,
    pub exam_type: Option<ExamType>,
    pub version: String,
    pub overview: String,
    pub syllabus: String,
}

impl Curriculum {
    pub async fn create(pool: &PgPool, data: CreateCurriculum) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Curriculum>(
            r#"
            INSERT INTO curricula (subject, school_level, term, exam_type, version, overview, syllabus)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&data.subject)
        .bind(&data.school_level)
        .bind(&data.term)
        .bind(data.exam_type.map(|t| t.as_str()))
        .bind(&data.version)
        .bind(&data.overview)
        .bind(&data.syllabus)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Curriculum>("SELECT * FROM curricula WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Latest curriculum for a subject at a school level and term
    pub async fn find_for_level(
        pool: &PgPool,
        subject: &str,
        school_level: &str,
        term: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Curriculum>(
            r#"
            SELECT * FROM curricula
            WHERE LOWER(subject) = LOWER($1)
              AND LOWER(school_level) = LOWER($2)
              AND LOWER(term) = LOWER($3)
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(subject)
        .bind(school_level)
        .bind(term)
        .fetch_optional(pool)
        .await
    }

    /// Latest syllabus for a subject under an exam body
    pub async fn find_for_exam(
        pool: &PgPool,
        subject: &str,
        exam_type: ExamType,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Curriculum>(
            r#"
            SELECT * FROM curricula
            WHERE LOWER(subject) = LOWER($1) AND exam_type = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(subject)
        .bind(exam_type.as_str())
        .fetch_optional(pool)
        .await
    }
}
