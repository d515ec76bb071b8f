/// Payment records
///
/// A payment row is written when a checkout is initialized and flipped to
/// verified exactly once, in the same transaction that credits the user.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE payments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     reference TEXT NOT NULL UNIQUE,
///     amount_kobo BIGINT NOT NULL CHECK (amount_kobo > 0),
///     credits INTEGER,
///     verified BOOLEAN NOT NULL DEFAULT FALSE,
///     verified_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,

    /// Gateway transaction reference
    pub reference: String,

    /// Amount in kobo (1/100 naira)
    pub amount_kobo: i64,

    /// Credits granted, set on verification
    pub credits: Option<i32>,

    pub verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        reference: &str,
        amount_kobo: i64,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (user_id, reference, amount_kobo)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(reference)
        .bind(amount_kobo)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_reference(
        pool: &PgPool,
        reference: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE reference = $1")
            .bind(reference)
            .fetch_optional(pool)
            .await
    }

    /// Loads and row-locks the payment inside the caller's transaction
    pub async fn lock_by_reference(
        conn: &mut PgConnection,
        reference: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE reference = $1 FOR UPDATE")
            .bind(reference)
            .fetch_optional(conn)
            .await
    }

    pub async fn mark_verified(
        conn: &mut PgConnection,
        id: Uuid,
        credits: i32,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments SET verified = TRUE, verified_at = NOW(), credits = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(credits)
        .fetch_one(conn)
        .await
    }
}
