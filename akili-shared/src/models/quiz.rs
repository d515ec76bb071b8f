/// Quiz attempts
///
/// A quiz attempt belongs to one learner and one module and holds its own
/// generated question set. It is open until submitted; an open attempt is
/// reused when the learner asks for the same module's quiz again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::question::Question;
use crate::scoring::ScoreCard;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub module_id: Uuid,
    pub questions: Json<Vec<Question>>,

    /// Chosen index per question, -1 for skipped
    pub answers: Option<Json<Vec<i32>>>,

    pub score: Option<i32>,
    pub total_questions: i32,
    pub percentage: Option<f64>,
    pub passed: Option<bool>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Best completed percentage of one module
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ModuleBest {
    pub module_id: Uuid,
    pub best_percentage: f64,
}

impl QuizAttempt {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        module_id: Uuid,
        questions: Vec<Question>,
    ) -> Result<Self, sqlx::Error> {
        let total = questions.len() as i32;
        sqlx::query_as::<_, QuizAttempt>(
            r#"
            INSERT INTO quiz_attempts (user_id, module_id, questions, total_questions)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(module_id)
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
        sqlx::query_as::<_, QuizAttempt>(
            "SELECT * FROM quiz_attempts WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Newest open attempt for the module
    pub async fn find_open(
        pool: &PgPool,
        user_id: Uuid,
        module_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, QuizAttempt>(
            r#"
            SELECT * FROM quiz_attempts
            WHERE user_id = $1 AND module_id = $2 AND completed_at IS NULL
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(module_id)
        .fetch_optional(pool)
        .await
    }

    /// Records the result. Returns `None` if the attempt was already completed.
    pub async fn complete(
        pool: &PgPool,
        id: Uuid,
        card: &ScoreCard,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, QuizAttempt>(
            r#"
            UPDATE quiz_attempts
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

    /// Whether the learner has a completed attempt on the module at or above `threshold`
    pub async fn has_passed(
        pool: &PgPool,
        user_id: Uuid,
        module_id: Uuid,
        threshold: f64,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM quiz_attempts
                WHERE user_id = $1 AND module_id = $2
                  AND completed_at IS NOT NULL AND percentage >= $3
            )
            "#,
        )
        .bind(user_id)
        .bind(module_id)
        .bind(threshold)
        .fetch_one(pool)
        .await
    }

    /// Best completed percentage per module of a course, for modules with any completed attempt
    pub async fn best_per_module(
        pool: &PgPool,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Vec<ModuleBest>, sqlx::Error> {
        sqlx::query_as::<_, ModuleBest>(
            r#"
            SELECT q.module_id, MAX(q.percentage) AS best_percentage
            FROM quiz_attempts q
            JOIN modules m ON m.id = q.module_id
            WHERE q.user_id = $1 AND m.course_id = $2
              AND q.completed_at IS NOT NULL AND q.percentage IS NOT NULL
            GROUP BY q.module_id
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_all(pool)
        .await
    }

    pub async fn count_completed_for_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM quiz_attempts WHERE user_id = $1 AND completed_at IS NOT NULL",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }
}
