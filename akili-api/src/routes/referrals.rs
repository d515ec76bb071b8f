/// Referral endpoint
///
/// `POST /v1/referrals` records who referred the caller. Allowed once per
/// learner; the referrer's daily free-credit cap grows by
/// `CREDITS_PER_REFERRAL`, up to `MAX_DAILY_CREDIT_CAP`.
///
/// ```text
/// POST /v1/referrals
/// { "referral_code": "adaeze_1a2b3c4d" }
/// ```

use crate::{app::AppState, error::ApiResult};
use akili_shared::{auth::middleware::AuthContext, referrals::claim_referral};
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct ClaimReferralRequest {
    /// The referrer's username
    #[validate(length(min = 1, max = 64, message = "Referral code must be 1-64 characters"))]
    pub referral_code: String,
}

#[derive(Debug, Serialize)]
pub struct ClaimReferralResponse {
    pub referred_by: String,
}

/// # Errors
///
/// - `400 Bad Request`: Validation failed, or self-referral
/// - `404 Not Found`: No learner with that code
/// - `409 Conflict`: A referrer is already recorded
pub async fn claim(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ClaimReferralRequest>,
) -> ApiResult<Json<ClaimReferralResponse>> {
    req.validate()?;

    claim_referral(&state.db, &state.config.credits, auth.user_id, &req.referral_code).await?;

    Ok(Json(ClaimReferralResponse {
        referred_by: req.referral_code.trim().to_string(),
    }))
}
