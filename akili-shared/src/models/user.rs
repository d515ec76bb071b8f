/// User model and database operations
///
/// A user is a learner. Identity is issued elsewhere; the row is provisioned
/// the first time a bearer token for a new subject is seen. Besides identity
/// the row carries the credit balance, the daily free-credit cap, and the
/// date the cap was last applied.
///
/// The balance columns are written only by [`crate::credits::CreditLedger`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY,
///     email TEXT NOT NULL UNIQUE,
///     username TEXT NOT NULL UNIQUE,
///     credit_balance INTEGER NOT NULL CHECK (credit_balance >= 0),
///     daily_credit_cap INTEGER NOT NULL CHECK (daily_credit_cap >= 0),
///     last_reset_date DATE NOT NULL DEFAULT CURRENT_DATE,
///     referred_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use akili_shared::models::user::{ProvisionUser, User};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::provision(&pool, ProvisionUser {
///     id: Uuid::new_v4(),
///     email: "ada@example.com".to_string(),
///     initial_credits: 10,
/// })
/// .await?;
///
/// let same = User::find_by_username(&pool, &user.username).await?;
/// assert!(same.is_some());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// A learner account with its credit state
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Subject of the bearer token
    pub id: Uuid,

    pub email: String,

    /// Public handle used as a referral code
    pub username: String,

    /// Spendable credits, never negative
    pub credit_balance: i32,

    /// Floor the balance is topped up to once per day
    pub daily_credit_cap: i32,

    /// Last day the daily top-up was applied
    pub last_reset_date: NaiveDate,

    /// User whose referral code this user claimed
    pub referred_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`User::provision`]
#[derive(Debug, Clone)]
pub struct ProvisionUser {
    pub id: Uuid,
    pub email: String,

    /// Starting balance, also used as the starting daily cap
    pub initial_credits: i32,
}

impl User {
    /// Derives a username from the email local part plus a short random suffix.
    ///
    /// ```
    /// use akili_shared::models::user::User;
    ///
    /// let name = User::derive_username("Ada.Lovelace@example.com");
    /// assert!(name.starts_with("adalovelace_"));
    /// assert_eq!(name.len(), "adalovelace_".len() + 8);
    /// ```
    pub fn derive_username(email: &str) -> String {
        let local: String = email
            .split('@')
            .next()
            .unwrap_or_default()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .take(30)
            .collect();
        let local = if local.is_empty() { "learner".to_string() } else { local };
        let suffix = Uuid::new_v4().simple().to_string();

        format!("{}_{}", local, &suffix[..8])
    }

    /// Inserts the user if the id is unseen, then returns the stored row.
    ///
    /// Existing users are returned untouched, so this is safe to call on
    /// every authenticated request.
    pub async fn provision(pool: &PgPool, data: ProvisionUser) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, username, credit_balance, daily_credit_cap, last_reset_date)
            VALUES ($1, $2, $3, $4, $4, CURRENT_DATE)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(data.id)
        .bind(&data.email)
        .bind(Self::derive_username(&data.email))
        .bind(data.initial_credits)
        .execute(pool)
        .await?;

        Self::find_by_id(pool, data.id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by username (case-insensitive)
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(username) = LOWER($1)")
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Loads the row and holds a row lock until the surrounding transaction ends.
    pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Records who referred this user. Only succeeds once per user.
    ///
    /// Returns `false` if the user already has a referrer.
    pub async fn set_referrer(
        conn: &mut PgConnection,
        id: Uuid,
        referrer_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET referred_by = $2, updated_at = NOW()
            WHERE id = $1 AND referred_by IS NULL
            "#,
        )
        .bind(id)
        .bind(referrer_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a user and, by cascade, everything they own
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_username_strips_symbols() {
        let name = User::derive_username("j.o-h+n@school.ng");
        assert!(name.starts_with("john_"));
    }

    #[test]
    fn test_derive_username_falls_back_for_empty_local_part() {
        let name = User::derive_username("@example.com");
        assert!(name.starts_with("learner_"));
    }

    #[test]
    fn test_derive_username_is_unique_per_call() {
        let a = User::derive_username("ada@example.com");
        let b = User::derive_username("ada@example.com");
        assert_ne!(a, b);
    }
}
