/// Course exam endpoints
///
/// - `POST /v1/courses/:id/exam` - Generate a course-wide mock exam (costs `EXAM_COST`)
/// - `POST /v1/exams/:id/submit` - Submit answers; passing is 50 %

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::quizzes::{refresh_grade, SubmissionResponse, SubmitAnswersRequest},
};
use akili_shared::{
    auth::middleware::AuthContext,
    models::exam::CourseExam,
    scoring::{score_answers, EXAM_PASS_PERCENTAGE},
};
use akili_tutor::pipeline::ExamStart;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

/// Generate a course exam
///
/// # Errors
///
/// - `402 Payment Required`: Not enough credits
/// - `404 Not Found`: Course missing or owned by someone else
/// - `422 Unprocessable Entity`: Course has no curriculum
/// - `502 Bad Gateway`: Too few usable questions generated (refunded)
/// - `503 Service Unavailable`: Every AI tier failed (refunded)
pub async fn start_exam(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(course_id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<ExamStart>)> {
    let exam = state.pipeline.start_exam(auth.user_id, course_id).await?;
    Ok((StatusCode::CREATED, Json(exam)))
}

pub async fn submit_exam(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(exam_id): Path<Uuid>,
    Json(req): Json<SubmitAnswersRequest>,
) -> ApiResult<Json<SubmissionResponse>> {
    req.validate()?;

    let exam = CourseExam::find_for_user(&state.db, exam_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))?;
    if exam.is_completed() {
        return Err(ApiError::Conflict("Exam already submitted".to_string()));
    }
    if exam.questions.is_empty() {
        return Err(ApiError::Conflict("Exam is still being prepared".to_string()));
    }

    let card = score_answers(&exam.questions, &req.answers, EXAM_PASS_PERCENTAGE);
    CourseExam::complete(&state.db, exam.id, &card)
        .await?
        .ok_or_else(|| ApiError::Conflict("Exam already submitted".to_string()))?;

    tracing::info!(
        user_id = %auth.user_id,
        exam_id = %exam.id,
        score = card.score,
        passed = card.passed,
        "Exam submitted"
    );

    let grade = refresh_grade(&state, auth.user_id, exam.course_id).await;
    Ok(Json(SubmissionResponse::new(&exam.questions, card, grade)))
}
