/// Cached lessons
///
/// Lessons are generated once per (topic, syllabus version) and shared by
/// every learner studying that topic. Learners can report a lesson; once the
/// report count reaches the configured threshold the row is deleted and the
/// next request regenerates it.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE lessons (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     topic TEXT NOT NULL,
///     syllabus_version TEXT NOT NULL,
///     content_markdown TEXT NOT NULL,
///     content_html TEXT NOT NULL,
///     is_validated BOOLEAN NOT NULL DEFAULT FALSE,
///     report_count INTEGER NOT NULL DEFAULT 0,
///     tier_used TEXT NOT NULL,
///     requested_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (topic, syllabus_version)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lesson {
    pub id: Uuid,
    pub topic: String,
    pub syllabus_version: String,
    pub content_markdown: String,

    /// Sanitized rendering of `content_markdown`
    pub content_html: String,

    /// Whether the review pass approved or corrected the content
    pub is_validated: bool,

    pub report_count: i32,
    pub tier_used: String,
    pub requested_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Input for [`Lesson::store`]
#[derive(Debug, Clone)]
pub struct StoreLesson {
    pub topic: String,
    pub syllabus_version: String,
    pub content_markdown: String,
    pub content_html: String,
    pub is_validated: bool,
    pub tier_used: String,
    pub requested_by: Option<Uuid>,
}

/// Outcome of [`Lesson::report`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// Counter incremented; lesson kept
    Recorded { report_count: i32 },

    /// Threshold reached; lesson deleted for regeneration
    Evicted,

    NotFound,
}

impl Lesson {
    pub async fn find_cached(
        pool: &PgPool,
        topic: &str,
        syllabus_version: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Lesson>(
            "SELECT * FROM lessons WHERE topic = $1 AND syllabus_version = $2",
        )
        .bind(topic)
        .bind(syllabus_version)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Lesson>("SELECT * FROM lessons WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Stores a lesson, replacing any cached copy for the same key
    /// (two learners can race to generate the same topic).
    pub async fn store(pool: &PgPool, data: StoreLesson) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Lesson>(
            r#"
            INSERT INTO lessons
                (topic, syllabus_version, content_markdown, content_html, is_validated, tier_used, requested_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (topic, syllabus_version) DO UPDATE SET
                content_markdown = EXCLUDED.content_markdown,
                content_html = EXCLUDED.content_html,
                is_validated = EXCLUDED.is_validated,
                tier_used = EXCLUDED.tier_used,
                requested_by = EXCLUDED.requested_by,
                report_count = 0,
                created_at = NOW()
            RETURNING *
            "#,
        )
        .bind(&data.topic)
        .bind(&data.syllabus_version)
        .bind(&data.content_markdown)
        .bind(&data.content_html)
        .bind(data.is_validated)
        .bind(&data.tier_used)
        .bind(data.requested_by)
        .fetch_one(pool)
        .await
    }

    /// Increments the report counter, deleting the lesson once it reaches `threshold`.
    pub async fn report(
        pool: &PgPool,
        id: Uuid,
        threshold: i32,
    ) -> Result<ReportOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let count: Option<i32> = sqlx::query_scalar(
            "UPDATE lessons SET report_count = report_count + 1 WHERE id = $1 RETURNING report_count",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match count {
            None => ReportOutcome::NotFound,
            Some(count) if count >= threshold => {
                sqlx::query("DELETE FROM lessons WHERE id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                ReportOutcome::Evicted
            }
            Some(count) => ReportOutcome::Recorded { report_count: count },
        };

        tx.commit().await?;
        Ok(outcome)
    }
}
