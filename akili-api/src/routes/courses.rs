/// Course endpoints
///
/// # Endpoints
///
/// - `POST /v1/courses` - Create a course and generate its modules (costs `COURSE_COST`)
/// - `GET /v1/courses` - List the caller's courses
/// - `GET /v1/courses/:id` - Course with its modules
/// - `DELETE /v1/courses/:id` - Delete a course with its modules, quizzes and exams

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use akili_shared::{
    auth::middleware::AuthContext,
    models::{
        course::{Course, CourseScope, ExamType},
        module::Module,
    },
};
use akili_tutor::pipeline::NewCourse;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Create course request
///
/// Either `exam_type` (legacy course) or both `school_level` and `term`
/// (level-based course) must be given. Level-based wins when both are.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(min = 2, max = 100, message = "Subject must be 2-100 characters"))]
    pub subject: String,

    /// "JAMB", "SSCE" (or "WAEC") or "JSS"
    pub exam_type: Option<String>,

    /// e.g. "SS2"
    #[validate(length(min = 1, max = 20, message = "School level must be 1-20 characters"))]
    pub school_level: Option<String>,

    /// e.g. "First Term"
    #[validate(length(min = 1, max = 30, message = "Term must be 1-30 characters"))]
    pub term: Option<String>,
}

impl CreateCourseRequest {
    fn scope(&self) -> Result<CourseScope, ApiError> {
        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        if let (Some(school_level), Some(term)) = (non_empty(&self.school_level), non_empty(&self.term)) {
            return Ok(CourseScope::Level { school_level, term });
        }

        match non_empty(&self.exam_type) {
            Some(raw) => ExamType::from_str(&raw)
                .map(|exam_type| CourseScope::Exam { exam_type })
                .ok_or_else(|| invalid("exam_type", "Exam type must be JAMB, SSCE or JSS")),
            None => Err(invalid(
                "exam_type",
                "Provide an exam_type, or a school_level and term",
            )),
        }
    }
}

fn invalid(field: &str, message: &str) -> ApiError {
    ApiError::ValidationError(vec![ValidationErrorDetail {
        field: field.to_string(),
        message: message.to_string(),
    }])
}

/// Course with its modules
#[derive(Debug, Serialize)]
pub struct CourseResponse {
    pub course: Course,
    pub modules: Vec<Module>,
}

/// Create course response
#[derive(Debug, Serialize)]
pub struct CreateCourseResponse {
    pub course: Course,
    pub modules: Vec<Module>,

    /// `false` when an identical course already existed
    pub created: bool,
    pub credits_charged: i32,
    pub tier_used: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListCoursesResponse {
    pub courses: Vec<Course>,
}

/// Create a course
///
/// # Endpoint
///
/// ```text
/// POST /v1/courses
/// Authorization: Bearer <jwt_token>
///
/// { "subject": "Physics", "exam_type": "JAMB" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `402 Payment Required`: Not enough credits
/// - `422 Unprocessable Entity`: No curriculum for this subject and scope
/// - `429 Too Many Requests`: Generation rate limit
/// - `502 Bad Gateway`: The AI answered with an unusable module list (refunded)
/// - `503 Service Unavailable`: Every AI tier failed (refunded)
pub async fn create_course(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateCourseRequest>,
) -> ApiResult<(StatusCode, Json<CreateCourseResponse>)> {
    req.validate()?;
    let scope = req.scope()?;

    let creation = state
        .pipeline
        .create_course(NewCourse {
            user_id: auth.user_id,
            subject: req.subject.trim().to_string(),
            scope,
        })
        .await?;

    let (status, credits_charged) = if creation.created {
        (StatusCode::CREATED, state.pipeline.costs().course)
    } else {
        (StatusCode::OK, 0)
    };

    Ok((
        status,
        Json(CreateCourseResponse {
            course: creation.course,
            modules: creation.modules,
            created: creation.created,
            credits_charged,
            tier_used: creation.tier_used,
        }),
    ))
}

/// List the caller's courses, newest first
pub async fn list_courses(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ListCoursesResponse>> {
    let courses = Course::list_for_user(&state.db, auth.user_id).await?;
    Ok(Json(ListCoursesResponse { courses }))
}

pub async fn get_course(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CourseResponse>> {
    let course = Course::find_for_user(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;
    let modules = Module::list_for_course(&state.db, course.id).await?;

    Ok(Json(CourseResponse { course, modules }))
}

/// Delete a course
///
/// Modules, quiz attempts and exams go with it. Credits are not returned.
pub async fn delete_course(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    Course::find_for_user(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    Course::delete(&state.db, id).await?;
    tracing::info!(user_id = %auth.user_id, course_id = %id, "Course deleted");

    Ok(StatusCode::NO_CONTENT)
}
