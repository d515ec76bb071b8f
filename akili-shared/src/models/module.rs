/// Course modules
///
/// A module is one entry of a course's generated syllabus outline. Modules
/// are written in one batch by the module pipeline; `position` is the
/// 1-based index in the generated list and is unique per course.

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Module {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub position: i32,
    pub syllabus_topic: String,
}

/// Title and syllabus topic of a module before it is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleOutline {
    pub title: String,
    pub topic: String,
}

impl Module {
    /// Inserts the outline in order, numbering from 1.
    pub async fn insert_outline(
        conn: &mut PgConnection,
        course_id: Uuid,
        outline: &[ModuleOutline],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut modules = Vec::with_capacity(outline.len());

        for (index, entry) in outline.iter().enumerate() {
            let module = sqlx::query_as::<_, Module>(
                r#"
                INSERT INTO modules (course_id, title, position, syllabus_topic)
                VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
            )
            .bind(course_id)
            .bind(&entry.title)
            .bind(index as i32 + 1)
            .bind(&entry.topic)
            .fetch_one(&mut *conn)
            .await?;
            modules.push(module);
        }

        Ok(modules)
    }

    pub async fn list_for_course(pool: &PgPool, course_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Module>(
            "SELECT * FROM modules WHERE course_id = $1 ORDER BY position",
        )
        .bind(course_id)
        .fetch_all(pool)
        .await
    }

    /// Finds a module whose course belongs to `user_id`
    pub async fn find_for_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Module>(
            r#"
            SELECT m.* FROM modules m
            JOIN courses c ON c.id = m.course_id
            WHERE m.id = $1 AND c.user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// The module immediately before this one in its course, if any
    pub async fn previous(&self, pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Module>(
            "SELECT * FROM modules WHERE course_id = $1 AND position = $2",
        )
        .bind(self.course_id)
        .bind(self.position - 1)
        .fetch_optional(pool)
        .await
    }
}
