/// Term grades
///
/// One row per (student, curriculum, term). Rows are overwritten by every
/// recomputation; see [`crate::grading`] for how the numbers are derived.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Grade {
    pub id: Uuid,
    pub student_id: Uuid,
    pub curriculum_id: Uuid,
    pub term: String,
    pub ca_score: f64,
    pub exam_score: f64,
    pub total_score: f64,
    pub letter: String,
    pub grade_point: f64,
    pub remark: String,
    pub updated_at: DateTime<Utc>,
}

/// Values written by [`Grade::upsert`]
#[derive(Debug, Clone, PartialEq)]
pub struct GradeRecord {
    pub student_id: Uuid,
    pub curriculum_id: Uuid,
    pub term: String,
    pub ca_score: f64,
    pub exam_score: f64,
    pub total_score: f64,
    pub letter: &'static str,
    pub grade_point: f64,
    pub remark: &'static str,
}

/// A grade joined with its curriculum's subject for listings
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GradeSummary {
    pub subject: String,
    pub school_level: Option<String>,
    pub term: String,
    pub ca_score: f64,
    pub exam_score: f64,
    pub total_score: f64,
    pub letter: String,
    pub grade_point: f64,
    pub remark: String,
    pub updated_at: DateTime<Utc>,
}

impl Grade {
    /// Inserts or overwrites the grade for the record's key
    pub async fn upsert(pool: &PgPool, record: &GradeRecord) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Grade>(
            r#"
            INSERT INTO grades
                (student_id, curriculum_id, term, ca_score, exam_score, total_score, letter, grade_point, remark)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (student_id, curriculum_id, term) DO UPDATE SET
                ca_score = EXCLUDED.ca_score,
                exam_score = EXCLUDED.exam_score,
                total_score = EXCLUDED.total_score,
                letter = EXCLUDED.letter,
                grade_point = EXCLUDED.grade_point,
                remark = EXCLUDED.remark,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(record.student_id)
        .bind(record.curriculum_id)
        .bind(&record.term)
        .bind(record.ca_score)
        .bind(record.exam_score)
        .bind(record.total_score)
        .bind(record.letter)
        .bind(record.grade_point)
        .bind(record.remark)
        .fetch_one(pool)
        .await
    }

    pub async fn list_for_student(
        pool: &PgPool,
        student_id: Uuid,
    ) -> Result<Vec<GradeSummary>, sqlx::Error> {
        sqlx::query_as::<_, GradeSummary>(
            r#"
            SELECT c.subject, c.school_level, g.term, g.ca_score, g.exam_score, g.total_score,
                   g.letter, g.grade_point, g.remark, g.updated_at
            FROM grades g
            JOIN curricula c ON c.id = g.curriculum_id
            WHERE g.student_id = $1
            ORDER BY c.subject, g.term
            "#,
        )
        .bind(student_id)
        .fetch_all(pool)
        .await
    }
}
