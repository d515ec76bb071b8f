/// Crediting successful payments
///
/// Both the verify endpoint and the webhook can observe the same successful
/// charge, in either order. Settlement row-locks the payment, and only the
/// first caller to see it unverified grants credits.

use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};

use super::client::PaystackError;
use super::tiers::credits_for_amount;
use crate::credits::CreditLedger;
use crate::models::credit_transaction::TransactionKind;
use crate::models::payment::Payment;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Settlement {
    /// Credits granted now. `balance` is absent when the amount was too small to earn any.
    Credited { credits: i32, balance: Option<i32> },

    /// Settled earlier; nothing changed
    AlreadySettled,
}

/// Marks the payment verified and grants credits for `collected_kobo`.
pub async fn settle_payment(
    pool: &PgPool,
    reference: &str,
    collected_kobo: i64,
) -> Result<Settlement, PaystackError> {
    let mut tx = pool.begin().await?;

    let payment = Payment::lock_by_reference(&mut tx, reference)
        .await?
        .ok_or_else(|| PaystackError::PaymentNotFound(reference.to_string()))?;

    if payment.verified {
        return Ok(Settlement::AlreadySettled);
    }

    if collected_kobo != payment.amount_kobo {
        warn!(
            reference,
            expected_kobo = payment.amount_kobo,
            collected_kobo,
            "Collected amount differs from initialized amount"
        );
    }

    let credits = credits_for_amount(collected_kobo);
    Payment::mark_verified(&mut tx, payment.id, credits).await?;

    let balance = if credits > 0 {
        let balance = CreditLedger::add_in(
            &mut tx,
            payment.user_id,
            credits,
            TransactionKind::Purchase,
            &format!("payment {}", reference),
        )
        .await?;
        Some(balance)
    } else {
        None
    };
    tx.commit().await?;

    info!(reference, user_id = %payment.user_id, credits, "Payment settled");
    Ok(Settlement::Credited { credits, balance })
}
