/// Credit ledger
///
/// The ledger is the only writer of `users.credit_balance`. Every mutation
/// runs in its own transaction holding a row lock on the user, so two
/// concurrent requests cannot both spend the same last credits, and every
/// mutation appends a `credit_transactions` row with the resulting balance.
///
/// # Rules
///
/// - **Daily reset**: on the first deduction of a new day the balance is
///   raised to the daily cap if it is below it. Purchased credits above the
///   cap are never taken away.
/// - **Deduct**: succeeds only if the (reset) balance covers the amount.
/// - **Add**: unconditional; used for refunds and purchases.
/// - **Daily cap**: grows through referrals up to a configured ceiling.
///
/// # Example
///
/// ```no_run
/// use akili_shared::credits::{CreditLedger, CreditPolicy};
/// use akili_shared::models::credit_transaction::TransactionKind;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let ledger = CreditLedger::new(pool, CreditPolicy::default());
///
/// if ledger.deduct(user_id, 5, "course generation").await? {
///     // generation failed later on
///     ledger.add(user_id, 5, TransactionKind::Refund, "course generation failed").await?;
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::credit_transaction::{CreditTransaction, TransactionKind};
use crate::models::user::User;

/// Ledger errors
#[derive(Debug, thiserror::Error)]
pub enum CreditError {
    /// Balance does not cover the requested amount
    #[error("Insufficient credits: {required} required, {available} available")]
    InsufficientCredits { required: i32, available: i32 },

    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    /// Amounts must be positive
    #[error("Invalid credit amount: {0}")]
    InvalidAmount(i32),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Tunables for the free-credit allowance
#[derive(Debug, Clone, Copy)]
pub struct CreditPolicy {
    /// Starting balance and starting daily cap of a new user
    pub daily_free_credits: i32,

    /// Ceiling for referral-boosted caps
    pub max_daily_cap: i32,

    /// Cap increase granted to a referrer per referral
    pub credits_per_referral: i32,
}

impl Default for CreditPolicy {
    fn default() -> Self {
        CreditPolicy {
            daily_free_credits: 10,
            max_daily_cap: 30,
            credits_per_referral: 2,
        }
    }
}

/// Balance after applying the daily reset rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyReset {
    pub balance: i32,

    /// Credits added by the reset (0 when the balance was already at or above the cap)
    pub topped_up: i32,

    /// Whether a new day started since the last reset
    pub applied: bool,
}

/// Applies the daily reset rule without touching storage.
///
/// ```
/// use akili_shared::credits::apply_daily_reset;
/// use chrono::NaiveDate;
///
/// let yesterday = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
/// let today = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
///
/// assert_eq!(apply_daily_reset(3, 10, yesterday, today).balance, 10);
/// assert_eq!(apply_daily_reset(45, 10, yesterday, today).balance, 45);
/// assert_eq!(apply_daily_reset(3, 10, today, today).balance, 3);
/// ```
pub fn apply_daily_reset(balance: i32, cap: i32, last_reset: NaiveDate, today: NaiveDate) -> DailyReset {
    if today <= last_reset {
        return DailyReset {
            balance,
            topped_up: 0,
            applied: false,
        };
    }

    let reset_balance = balance.max(cap);
    DailyReset {
        balance: reset_balance,
        topped_up: reset_balance - balance,
        applied: true,
    }
}

/// Cap after a referral boost: raised by `amount`, clamped to `max`, never lowered.
pub fn raised_cap(current: i32, amount: i32, max: i32) -> i32 {
    current.saturating_add(amount).min(max).max(current)
}

/// Read-only view of a user's credits
#[derive(Debug, Clone, Serialize)]
pub struct CreditSnapshot {
    /// Balance the next deduction will see
    pub balance: i32,
    pub daily_cap: i32,
    pub stored_balance: i32,
    pub last_reset_date: NaiveDate,
}

/// Today's date in UTC
fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Credit ledger service
#[derive(Debug, Clone)]
pub struct CreditLedger {
    db: PgPool,
    policy: CreditPolicy,
}

impl CreditLedger {
    pub fn new(db: PgPool, policy: CreditPolicy) -> Self {
        CreditLedger { db, policy }
    }

    pub fn policy(&self) -> &CreditPolicy {
        &self.policy
    }

    /// Spends `amount` credits. Returns `false`, leaving the balance as it
    /// was after the daily reset, when the balance is too low.
    pub async fn deduct(&self, user_id: Uuid, amount: i32, reason: &str) -> Result<bool, CreditError> {
        match self.charge(user_id, amount, reason).await {
            Ok(_) => Ok(true),
            Err(CreditError::InsufficientCredits { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Like [`CreditLedger::deduct`] but reports a short balance as an error.
    /// Returns the balance after the deduction.
    pub async fn charge(&self, user_id: Uuid, amount: i32, reason: &str) -> Result<i32, CreditError> {
        if amount <= 0 {
            return Err(CreditError::InvalidAmount(amount));
        }

        let mut tx = self.db.begin().await?;
        let user = User::lock(&mut tx, user_id)
            .await?
            .ok_or(CreditError::UserNotFound(user_id))?;

        let today = today();
        let reset = apply_daily_reset(user.credit_balance, user.daily_credit_cap, user.last_reset_date, today);
        if reset.applied {
            persist_balance(&mut tx, user_id, reset.balance, Some(today)).await?;
            if reset.topped_up > 0 {
                CreditTransaction::record(
                    &mut tx,
                    user_id,
                    TransactionKind::DailyReset,
                    reset.topped_up,
                    reset.balance,
                    "daily free credits",
                )
                .await?;
            }
            debug!(user_id = %user_id, balance = reset.balance, "Daily credit reset applied");
        }

        if reset.balance < amount {
            // Keep the reset; it only ever raises the balance.
            tx.commit().await?;
            info!(
                user_id = %user_id,
                required = amount,
                available = reset.balance,
                "Deduction refused"
            );
            return Err(CreditError::InsufficientCredits {
                required: amount,
                available: reset.balance,
            });
        }

        let balance_after = reset.balance - amount;
        persist_balance(&mut tx, user_id, balance_after, None).await?;
        CreditTransaction::record(
            &mut tx,
            user_id,
            TransactionKind::Deduct,
            -amount,
            balance_after,
            reason,
        )
        .await?;
        tx.commit().await?;

        info!(user_id = %user_id, amount, balance_after, reason, "Credits deducted");
        Ok(balance_after)
    }

    /// Adds credits unconditionally. Returns the new balance.
    pub async fn add(
        &self,
        user_id: Uuid,
        amount: i32,
        kind: TransactionKind,
        reason: &str,
    ) -> Result<i32, CreditError> {
        let mut tx = self.db.begin().await?;
        let balance = Self::add_in(&mut tx, user_id, amount, kind, reason).await?;
        tx.commit().await?;
        Ok(balance)
    }

    /// [`CreditLedger::add`] inside a caller-owned transaction, for callers
    /// that must commit the credit together with their own writes.
    pub async fn add_in(
        conn: &mut PgConnection,
        user_id: Uuid,
        amount: i32,
        kind: TransactionKind,
        reason: &str,
    ) -> Result<i32, CreditError> {
        if amount <= 0 {
            return Err(CreditError::InvalidAmount(amount));
        }

        let user = User::lock(&mut *conn, user_id)
            .await?
            .ok_or(CreditError::UserNotFound(user_id))?;

        let balance_after = user.credit_balance.saturating_add(amount);
        persist_balance(&mut *conn, user_id, balance_after, None).await?;
        CreditTransaction::record(conn, user_id, kind, amount, balance_after, reason).await?;

        info!(user_id = %user_id, amount, balance_after, kind = kind.as_str(), "Credits added");
        Ok(balance_after)
    }

    /// Raises the daily cap by `amount`, clamped to the policy ceiling.
    /// Returns the new cap.
    pub async fn increase_daily_cap(&self, user_id: Uuid, amount: i32) -> Result<i32, CreditError> {
        let mut tx = self.db.begin().await?;
        let cap = Self::increase_daily_cap_in(&mut tx, user_id, amount, self.policy.max_daily_cap).await?;
        tx.commit().await?;
        Ok(cap)
    }

    /// [`CreditLedger::increase_daily_cap`] inside a caller-owned transaction
    pub async fn increase_daily_cap_in(
        conn: &mut PgConnection,
        user_id: Uuid,
        amount: i32,
        max_cap: i32,
    ) -> Result<i32, CreditError> {
        if amount <= 0 {
            return Err(CreditError::InvalidAmount(amount));
        }

        let user = User::lock(&mut *conn, user_id)
            .await?
            .ok_or(CreditError::UserNotFound(user_id))?;
        let cap = raised_cap(user.daily_credit_cap, amount, max_cap);

        sqlx::query("UPDATE users SET daily_credit_cap = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(cap)
            .execute(conn)
            .await?;

        info!(user_id = %user_id, daily_credit_cap = cap, "Daily credit cap raised");
        Ok(cap)
    }

    /// Current credits as the next deduction would see them. Does not write.
    pub async fn snapshot(&self, user_id: Uuid) -> Result<CreditSnapshot, CreditError> {
        let user = User::find_by_id(&self.db, user_id)
            .await?
            .ok_or(CreditError::UserNotFound(user_id))?;
        let reset = apply_daily_reset(
            user.credit_balance,
            user.daily_credit_cap,
            user.last_reset_date,
            today(),
        );

        Ok(CreditSnapshot {
            balance: reset.balance,
            daily_cap: user.daily_credit_cap,
            stored_balance: user.credit_balance,
            last_reset_date: user.last_reset_date,
        })
    }
}

async fn persist_balance(
    conn: &mut PgConnection,
    user_id: Uuid,
    balance: i32,
    reset_date: Option<NaiveDate>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE users
        SET credit_balance = $2,
            last_reset_date = COALESCE($3, last_reset_date),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(balance)
    .bind(reset_date)
    .execute(conn)
    .await?;
    Ok(())
}
