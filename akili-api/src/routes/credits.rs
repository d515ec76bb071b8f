/// Credit and dashboard endpoints
///
/// - `GET /v1/credits` - Balance, daily cap and recent ledger entries
/// - `GET /v1/dashboard` - Learner summary
///
/// The balance shown is the one the next deduction will see, so a learner
/// whose daily reset is due sees the topped-up figure before spending.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use akili_shared::{
    auth::middleware::AuthContext,
    models::{course::Course, credit_transaction::CreditTransaction, quiz::QuizAttempt, user::User},
};
use axum::{extract::State, Extension, Json};
use chrono::NaiveDate;
use serde::Serialize;

/// Ledger entries returned by `GET /v1/credits`
const RECENT_TRANSACTIONS: i64 = 20;

#[derive(Debug, Serialize)]
pub struct CreditsResponse {
    pub balance: i32,
    pub daily_cap: i32,
    pub last_reset_date: NaiveDate,

    /// Newest first
    pub transactions: Vec<CreditTransaction>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub username: String,
    pub credits: i32,
    pub daily_cap: i32,
    pub courses: i64,
    pub completed_quizzes: i64,

    /// What other learners enter to name this learner as their referrer
    pub referral_code: String,
    pub referred: bool,
}

pub async fn get_credits(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<CreditsResponse>> {
    let snapshot = state.ledger.snapshot(auth.user_id).await?;
    let transactions = CreditTransaction::list_for_user(&state.db, auth.user_id, RECENT_TRANSACTIONS).await?;

    Ok(Json(CreditsResponse {
        balance: snapshot.balance,
        daily_cap: snapshot.daily_cap,
        last_reset_date: snapshot.last_reset_date,
        transactions,
    }))
}

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<DashboardResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    let snapshot = state.ledger.snapshot(auth.user_id).await?;
    let courses = Course::count_for_user(&state.db, auth.user_id).await?;
    let completed_quizzes = QuizAttempt::count_completed_for_user(&state.db, auth.user_id).await?;

    Ok(Json(DashboardResponse {
        referral_code: user.username.clone(),
        username: user.username,
        credits: snapshot.balance,
        daily_cap: snapshot.daily_cap,
        courses,
        completed_quizzes,
        referred: user.referred_by.is_some(),
    }))
}
