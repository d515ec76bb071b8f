/// Grade endpoints
///
/// - `GET /v1/grades` - The caller's term grades
/// - `POST /v1/grades/backfill` - Recompute grades for every course of the caller
///
/// Grades are normally refreshed on each quiz or exam submission; backfill
/// covers attempts made before a course was linked to a curriculum term.

use crate::{app::AppState, error::ApiResult};
use akili_shared::{auth::middleware::AuthContext, models::grade::{Grade, GradeSummary}};
use axum::{extract::State, Extension, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ListGradesResponse {
    pub grades: Vec<GradeSummary>,
}

#[derive(Debug, Serialize)]
pub struct BackfillResponse {
    /// Grades written
    pub recomputed: usize,
}

pub async fn list_grades(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ListGradesResponse>> {
    let grades = Grade::list_for_student(&state.db, auth.user_id).await?;
    Ok(Json(ListGradesResponse { grades }))
}

pub async fn backfill_grades(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<BackfillResponse>> {
    let recomputed = state.grader.backfill_for_user(auth.user_id).await?;
    Ok(Json(BackfillResponse { recomputed }))
}
