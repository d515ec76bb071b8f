/// Quiz endpoints
///
/// - `POST /v1/modules/:id/quiz` - Start a module quiz, or resume the open one (free)
/// - `POST /v1/quizzes/:id/submit` - Submit answers and get them marked
///
/// Module *n* unlocks once module *n - 1* has a completed attempt at or above
/// 60 %. Submitting recomputes the course grade.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use akili_shared::{
    auth::middleware::AuthContext,
    models::{
        grade::Grade,
        module::Module,
        question::{review, Question, QuestionReview},
        quiz::QuizAttempt,
    },
    scoring::{score_answers, ScoreCard, QUIZ_PASS_PERCENTAGE},
};
use akili_tutor::pipeline::QuizStart;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Answers in question order: the chosen choice index, or `null` to skip
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswersRequest {
    #[validate(length(max = 50, message = "Too many answers"))]
    pub answers: Vec<Option<i32>>,
}

/// Marked submission, shared by quizzes and exams
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub score: i32,
    pub total: i32,
    pub percentage: f64,
    pub passed: bool,
    pub review: Vec<QuestionReview>,

    /// Updated term grade; absent when the course has no curriculum term
    pub grade: Option<Grade>,
}

impl SubmissionResponse {
    pub(crate) fn new(questions: &[Question], card: ScoreCard, grade: Option<Grade>) -> Self {
        SubmissionResponse {
            review: review(questions, &card.answers),
            score: card.score,
            total: card.total,
            percentage: card.percentage,
            passed: card.passed,
            grade,
        }
    }
}

/// Recomputes the course grade after a submission.
///
/// The submission is already stored, so a failure here is logged and the
/// grade left for the next recompute or backfill.
pub(crate) async fn refresh_grade(state: &AppState, user_id: Uuid, course_id: Uuid) -> Option<Grade> {
    match state.grader.recompute(user_id, course_id).await {
        Ok(grade) => grade,
        Err(e) => {
            tracing::error!(user_id = %user_id, course_id = %course_id, error = %e, "Grade recompute failed");
            None
        }
    }
}

/// Start or resume a module quiz
///
/// Returns `201 Created` for a new quiz and `200 OK` when an unfinished
/// attempt is resumed. Answer keys are never included.
///
/// # Errors
///
/// - `403 Forbidden`: Previous module not passed yet
/// - `404 Not Found`: Module missing or owned by someone else
/// - `502 Bad Gateway`: Too few usable questions generated
/// - `503 Service Unavailable`: Every AI tier failed
pub async fn start_quiz(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(module_id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<QuizStart>)> {
    let quiz = state.pipeline.start_quiz(auth.user_id, module_id).await?;
    let status = if quiz.reused { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(quiz)))
}

/// Submit quiz answers
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `404 Not Found`: Attempt missing or owned by someone else
/// - `409 Conflict`: Attempt already submitted
pub async fn submit_quiz(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(attempt_id): Path<Uuid>,
    Json(req): Json<SubmitAnswersRequest>,
) -> ApiResult<Json<SubmissionResponse>> {
    req.validate()?;

    let attempt = QuizAttempt::find_for_user(&state.db, attempt_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))?;
    if attempt.is_completed() {
        return Err(ApiError::Conflict("Quiz already submitted".to_string()));
    }

    let card = score_answers(&attempt.questions, &req.answers, QUIZ_PASS_PERCENTAGE);
    QuizAttempt::complete(&state.db, attempt.id, &card)
        .await?
        .ok_or_else(|| ApiError::Conflict("Quiz already submitted".to_string()))?;

    tracing::info!(
        user_id = %auth.user_id,
        attempt_id = %attempt.id,
        score = card.score,
        passed = card.passed,
        "Quiz submitted"
    );

    let grade = match Module::find_for_user(&state.db, attempt.module_id, auth.user_id).await? {
        Some(module) => refresh_grade(&state, auth.user_id, module.course_id).await,
        None => None,
    };

    Ok(Json(SubmissionResponse::new(&attempt.questions, card, grade)))
}
