/// Referral claims
///
/// A learner can name the user who referred them, once. The referrer's
/// daily free-credit cap grows by the policy's per-referral amount, up to
/// the policy ceiling. Recording the referrer and raising the cap commit
/// together.

use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::credits::{CreditError, CreditLedger, CreditPolicy};
use crate::models::user::User;

#[derive(Debug, thiserror::Error)]
pub enum ReferralError {
    #[error("No user with referral code '{0}'")]
    UnknownCode(String),

    #[error("You cannot refer yourself")]
    SelfReferral,

    #[error("A referral has already been recorded for this account")]
    AlreadyReferred,

    #[error(transparent)]
    Credit(#[from] CreditError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferralOutcome {
    pub referrer_id: Uuid,
    pub referrer_daily_cap: i32,
}

/// Records `referrer_code` (a username) as the referrer of `user_id`.
pub async fn claim_referral(
    pool: &PgPool,
    policy: &CreditPolicy,
    user_id: Uuid,
    referrer_code: &str,
) -> Result<ReferralOutcome, ReferralError> {
    let code = referrer_code.trim();
    let referrer = User::find_by_username(pool, code)
        .await?
        .ok_or_else(|| ReferralError::UnknownCode(code.to_string()))?;

    if referrer.id == user_id {
        return Err(ReferralError::SelfReferral);
    }

    let mut tx = pool.begin().await?;
    if !User::set_referrer(&mut tx, user_id, referrer.id).await? {
        return Err(ReferralError::AlreadyReferred);
    }
    let cap = CreditLedger::increase_daily_cap_in(
        &mut tx,
        referrer.id,
        policy.credits_per_referral,
        policy.max_daily_cap,
    )
    .await?;
    tx.commit().await?;

    info!(user_id = %user_id, referrer_id = %referrer.id, daily_cap = cap, "Referral recorded");
    Ok(ReferralOutcome {
        referrer_id: referrer.id,
        referrer_daily_cap: cap,
    })
}
