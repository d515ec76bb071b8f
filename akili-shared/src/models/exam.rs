/// Course exams
///
/// An end-of-course exam drawn from the course's modules. A learner keeps at
/// most one completed exam per course: starting a new one clears the old
/// completed ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::question::Question;
use crate::scoring::ScoreCard;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CourseExam {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub questions: Json<Vec<Question>>,
    pub answers: Option<Json<Vec<i32>>>,
    pub score: Option<i32>,
    pub total_questions: i32,
    pub percentage: Option<f64>,
    pub passed: Option<bool>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CourseExam {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Creates an exam shell with no questions yet
    pub async fn create_pending(
        pool: &PgPool,
        user_id: Uuid,
        course_id: Uuid,
        title: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, CourseExam>(
            r#"
            INSERT INTO course_exams (user_id, course_id, title, questions, total_questions)
            VALUES ($1, $2, $3, '[]'::jsonb, 0)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(title)
        .fetch_one(pool)
        .await
    }

    /// Stores the generated questions on a pending exam
    pub async fn attach_questions(
        pool: &PgPool,
        id: Uuid,
        questions: Vec<Question>,
    ) -> Result<Self, sqlx::Error> {
        let total = questions.len() as i32;
        sqlx::query_as::<_, CourseExam>(
            r#"
            UPDATE course_exams SET questions = $2, total_questions = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Json(questions))
        .bind(total)
        .fetch_one(pool)
        .await
    }

    pub async fn find_for_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, CourseExam>(
            "SELECT * FROM course_exams WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM course_exams WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes the learner's completed exams for a course
    pub async fn delete_completed(
        pool: &PgPool,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM course_exams WHERE user_id = $1 AND course_id = $2 AND completed_at IS NOT NULL",
        )
        .bind(user_id)
        .bind(course_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Records the result. Returns `None` if the exam was already completed.
    pub async fn complete(
        pool: &PgPool,
        id: Uuid,
        card: &ScoreCard,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, CourseExam>(
            r#"
            UPDATE course_exams
            SET answers = $2, score = $3, percentage = $4, passed = $5, completed_at = NOW()
            WHERE id = $1 AND completed_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Json(&card.answers))
        .bind(card.score)
        .bind(card.percentage)
        .bind(card.passed)
        .fetch_optional(pool)
        .await
    }

    /// Best completed percentage for the course, if any exam was completed
    pub async fn best_percentage(
        pool: &PgPool,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<f64>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT MAX(percentage) FROM course_exams
            WHERE user_id = $1 AND course_id = $2 AND completed_at IS NOT NULL
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(pool)
        .await
    }
}
