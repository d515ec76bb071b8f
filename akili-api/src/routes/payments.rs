/// Payment endpoints (Paystack)
///
/// - `POST /v1/payments` - Start a checkout for a credit pack
/// - `GET /v1/payments/:reference/verify` - Confirm a checkout after the redirect
/// - `POST /webhooks/paystack` - Gateway notification, authenticated by signature
///
/// The verify endpoint and the webhook can both see the same successful
/// charge. Settlement grants credits exactly once, whichever arrives first.
///
/// # Webhook responses
///
/// | Condition | Status |
/// |---|---|
/// | payments not configured | 500 |
/// | signature missing or wrong | 401 |
/// | body is not JSON | 400 |
/// | anything else, including unknown references | 200 |

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use akili_shared::{
    auth::middleware::AuthContext,
    models::payment::Payment,
    paystack::{credits_for_amount, settle_payment, verify_signature, PaystackError, Settlement, SIGNATURE_HEADER},
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

/// Event that carries a completed charge
const CHARGE_SUCCESS: &str = "charge.success";

#[derive(Debug, Deserialize, Validate)]
pub struct InitializePaymentRequest {
    /// Amount in kobo (₦1 = 100 kobo)
    #[validate(range(min = 10_000, max = 100_000_000, message = "Amount must be between ₦100 and ₦1,000,000"))]
    pub amount_kobo: i64,
}

#[derive(Debug, Serialize)]
pub struct InitializePaymentResponse {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,

    /// Credits the payment will grant once collected
    pub credits: i32,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub reference: String,

    /// Gateway status: "success", "failed", "abandoned", ...
    pub status: String,
    pub settlement: Option<Settlement>,
}

/// Webhook envelope
#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(default)]
    event: String,
    #[serde(default)]
    data: WebhookCharge,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookCharge {
    reference: Option<String>,
    #[serde(default)]
    amount: i64,
}

/// Start a checkout
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `502 Bad Gateway`: Paystack refused or could not be reached
/// - `503 Service Unavailable`: Payments not configured
pub async fn initialize_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<InitializePaymentRequest>,
) -> ApiResult<(StatusCode, Json<InitializePaymentResponse>)> {
    req.validate()?;

    let client = state.paystack()?;
    let callback_url = state
        .config
        .paystack
        .as_ref()
        .and_then(|p| p.callback_url.as_deref());

    let checkout = client.initialize(&auth.email, req.amount_kobo, callback_url).await?;
    Payment::create(&state.db, auth.user_id, &checkout.reference, req.amount_kobo).await?;

    tracing::info!(
        user_id = %auth.user_id,
        reference = %checkout.reference,
        amount_kobo = req.amount_kobo,
        "Payment initialized"
    );

    Ok((
        StatusCode::CREATED,
        Json(InitializePaymentResponse {
            authorization_url: checkout.authorization_url,
            access_code: checkout.access_code,
            reference: checkout.reference,
            credits: credits_for_amount(req.amount_kobo),
        }),
    ))
}

/// Confirm a checkout with the gateway and grant credits
pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(reference): Path<String>,
) -> ApiResult<Json<VerifyPaymentResponse>> {
    let payment = Payment::find_by_reference(&state.db, &reference)
        .await?
        .filter(|p| p.user_id == auth.user_id)
        .ok_or_else(|| ApiError::NotFound("Payment not found".to_string()))?;

    if payment.verified {
        return Ok(Json(VerifyPaymentResponse {
            reference,
            status: "success".to_string(),
            settlement: Some(Settlement::AlreadySettled),
        }));
    }

    let transaction = state.paystack()?.verify(&reference).await?;
    if !transaction.is_successful() {
        tracing::info!(reference = %reference, status = %transaction.status, "Payment not successful yet");
        return Ok(Json(VerifyPaymentResponse {
            reference,
            status: transaction.status,
            settlement: None,
        }));
    }

    let settlement = settle_payment(&state.db, &reference, transaction.amount).await?;
    Ok(Json(VerifyPaymentResponse {
        reference,
        status: transaction.status,
        settlement: Some(settlement),
    }))
}

/// Paystack webhook
///
/// The signature is the hex HMAC-SHA512 of the raw body under the secret
/// key, so the body is taken as bytes and only parsed after it checks out.
pub async fn paystack_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let secret = state
        .config
        .paystack
        .as_ref()
        .map(|p| p.secret_key.as_str())
        .ok_or_else(|| ApiError::InternalError("Paystack webhook received but no secret key is configured".to_string()))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !verify_signature(&body, signature, secret) {
        tracing::warn!("Paystack webhook signature mismatch");
        return Err(ApiError::Unauthorized("Invalid signature".to_string()));
    }

    let event: WebhookEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!(error = %e, "Paystack webhook payload is not valid JSON");
        ApiError::BadRequest("Invalid JSON payload".to_string())
    })?;

    if event.event != CHARGE_SUCCESS {
        tracing::debug!(event = %event.event, "Paystack webhook event ignored");
        return Ok(Json(json!({ "status": "ignored" })));
    }

    let Some(reference) = event.data.reference.filter(|r| !r.is_empty()) else {
        tracing::warn!("Paystack charge.success without a reference");
        return Ok(Json(json!({ "status": "ignored" })));
    };

    match settle_payment(&state.db, &reference, event.data.amount).await {
        Ok(Settlement::Credited { credits, .. }) => {
            tracing::info!(reference = %reference, credits, "Webhook credited payment");
            Ok(Json(json!({ "status": "credited", "credits": credits })))
        }
        Ok(Settlement::AlreadySettled) => Ok(Json(json!({ "status": "already_settled" }))),
        Err(PaystackError::PaymentNotFound(_)) => {
            tracing::warn!(reference = %reference, "Webhook: payment not found");
            Ok(Json(json!({ "status": "ignored" })))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_event_tolerates_missing_fields() {
        let event: WebhookEvent = serde_json::from_str(r#"{"event":"transfer.success"}"#).unwrap();
        assert_eq!(event.event, "transfer.success");
        assert!(event.data.reference.is_none());
        assert_eq!(event.data.amount, 0);
    }

    #[test]
    fn test_webhook_event_charge() {
        let event: WebhookEvent = serde_json::from_str(
            r#"{"event":"charge.success","data":{"reference":"ref_1","amount":100000,"currency":"NGN"}}"#,
        )
        .unwrap();
        assert_eq!(event.event, CHARGE_SUCCESS);
        assert_eq!(event.data.reference.as_deref(), Some("ref_1"));
        assert_eq!(event.data.amount, 100_000);
    }

    #[test]
    fn test_amount_range_validated() {
        assert!(InitializePaymentRequest { amount_kobo: 500 }.validate().is_err());
        assert!(InitializePaymentRequest { amount_kobo: 50_000 }.validate().is_ok());
    }
}
