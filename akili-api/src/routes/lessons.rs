/// Lesson endpoints
///
/// - `GET /v1/modules/:id/lesson` - Cached lesson, or a newly generated one (costs `LESSON_COST` on a miss)
/// - `POST /v1/lessons/:id/report` - Flag a lesson as wrong or unhelpful
///
/// Lessons are shared between learners studying the same topic of the same
/// syllabus version, so reports from different learners add up. Once they
/// reach `LESSON_REPORT_THRESHOLD` the lesson is dropped and the next view
/// generates a fresh one.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use akili_shared::{
    auth::middleware::AuthContext,
    models::lesson::{Lesson, ReportOutcome},
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct LessonResponse {
    pub lesson_id: Uuid,
    pub module_id: Uuid,
    pub title: String,
    pub content_markdown: String,

    /// Sanitized HTML rendering of `content_markdown`
    pub content_html: String,
    pub is_validated: bool,
    pub cached: bool,
    pub credits_charged: i32,
    pub tier_used: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportResponse {
    Recorded { report_count: i32 },

    /// The lesson was removed and will be regenerated on next view
    Regenerating,
}

/// Lesson for a module
///
/// # Errors
///
/// - `402 Payment Required`: Cache miss and not enough credits
/// - `404 Not Found`: Module missing or owned by someone else
/// - `503 Service Unavailable`: Every AI tier failed (refunded)
pub async fn get_lesson(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(module_id): Path<Uuid>,
) -> ApiResult<Json<LessonResponse>> {
    let delivery = state.pipeline.lesson_for_module(auth.user_id, module_id).await?;
    let Lesson {
        id,
        content_markdown,
        content_html,
        is_validated,
        tier_used,
        ..
    } = delivery.lesson;

    Ok(Json(LessonResponse {
        lesson_id: id,
        module_id: delivery.module.id,
        title: delivery.module.title,
        content_markdown,
        content_html,
        is_validated,
        cached: delivery.cached,
        credits_charged: delivery.charged,
        tier_used,
    }))
}

pub async fn report_lesson(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(lesson_id): Path<Uuid>,
) -> ApiResult<Json<ReportResponse>> {
    let outcome = Lesson::report(&state.db, lesson_id, state.config.lesson_report_threshold).await?;

    match outcome {
        ReportOutcome::NotFound => Err(ApiError::NotFound("Lesson not found".to_string())),
        ReportOutcome::Recorded { report_count } => {
            tracing::info!(user_id = %auth.user_id, lesson_id = %lesson_id, report_count, "Lesson reported");
            Ok(Json(ReportResponse::Recorded { report_count }))
        }
        ReportOutcome::Evicted => {
            tracing::warn!(lesson_id = %lesson_id, "Lesson reached report threshold, evicted from cache");
            Ok(Json(ReportResponse::Regenerating))
        }
    }
}
