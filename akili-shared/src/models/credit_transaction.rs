/// Append-only credit audit log
///
/// Every mutation the ledger makes to a balance writes one row here in the
/// same transaction, with the balance it produced. Rows are never updated.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE credit_transactions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     kind TEXT NOT NULL,
///     amount INTEGER NOT NULL,
///     balance_after INTEGER NOT NULL,
///     reason TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Why a balance changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Credits spent on a generation
    Deduct,

    /// Credits returned after a failed generation
    Refund,

    /// Credits bought through the payment gateway
    Purchase,

    /// Daily top-up to the cap
    DailyReset,

    /// Manual correction
    Adjustment,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deduct => "deduct",
            TransactionKind::Refund => "refund",
            TransactionKind::Purchase => "purchase",
            TransactionKind::DailyReset => "daily_reset",
            TransactionKind::Adjustment => "adjustment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "deduct" => Some(TransactionKind::Deduct),
            "refund" => Some(TransactionKind::Refund),
            "purchase" => Some(TransactionKind::Purchase),
            "daily_reset" => Some(TransactionKind::DailyReset),
            "adjustment" => Some(TransactionKind::Adjustment),
            _ => None,
        }
    }
}

/// One audit entry. `amount` is signed: negative for deductions.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CreditTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub amount: i32,
    pub balance_after: i32,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl CreditTransaction {
    /// Parses the stored kind
    pub fn kind(&self) -> Option<TransactionKind> {
        TransactionKind::from_str(&self.kind)
    }

    /// Appends an entry. Callers pass the connection of the transaction that
    /// changed the balance.
    pub async fn record(
        conn: &mut PgConnection,
        user_id: Uuid,
        kind: TransactionKind,
        amount: i32,
        balance_after: i32,
        reason: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, CreditTransaction>(
            r#"
            INSERT INTO credit_transactions (user_id, kind, amount, balance_after, reason)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(amount)
        .bind(balance_after)
        .bind(reason)
        .fetch_one(conn)
        .await
    }

    /// Most recent entries first
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CreditTransaction>(
            r#"
            SELECT * FROM credit_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_kind_round_trip() {
        for kind in [
            TransactionKind::Deduct,
            TransactionKind::Refund,
            TransactionKind::Purchase,
            TransactionKind::DailyReset,
            TransactionKind::Adjustment,
        ] {
            assert_eq!(TransactionKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(TransactionKind::from_str("gift"), None);
    }

    #[test]
    fn test_transaction_kind_serializes_snake_case() {
        let json = serde_json::to_string(&TransactionKind::DailyReset).unwrap();
        assert_eq!(json, "\"daily_reset\"");
    }
}
