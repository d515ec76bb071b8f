/// Error handling for the API server
///
/// Every handler returns `ApiResult<T>`. Library errors convert into
/// [`ApiError`] through `From`, so `?` picks the status code:
///
/// | Condition | Status |
/// |---|---|
/// | request body validation | 400 with per-field `details` |
/// | missing/invalid bearer token, bad webhook signature | 401 |
/// | not enough credits | 402 |
/// | locked module | 403 |
/// | no curriculum for the requested course | 422 |
/// | rate limit | 429 with `Retry-After` |
/// | unusable AI output | 502 |
/// | every AI tier failed | 503 with the capacity message |
///
/// # Example
///
/// ```
/// use akili_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler(id: Option<u32>) -> ApiResult<Json<serde_json::Value>> {
///     let id = id.ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;
///     Ok(Json(json!({ "id": id })))
/// }
/// ```

use akili_shared::auth::middleware::AuthError;
use akili_shared::credits::CreditError;
use akili_shared::grading::GradeError;
use akili_shared::paystack::PaystackError;
use akili_shared::referrals::ReferralError;
use akili_tutor::pipeline::GenerationError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Shown when the AI returned something that could not be used
pub const RETRY_MESSAGE: &str = "The AI tutor returned an unusable response. Please try again.";

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Payment required (402): the credit balance does not cover the action
    PaymentRequired { required: i32, available: i32 },

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409)
    Conflict(String),

    /// Unprocessable entity (422): the request is well formed but cannot be served as configured
    Unprocessable(String),

    /// Request body validation failed (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Too many requests (429)
    RateLimitExceeded { retry_after: u64, message: String },

    /// Internal server error (500)
    InternalError(String),

    /// Bad gateway (502): an upstream answered with something unusable
    BadGateway(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "insufficient_credits")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::PaymentRequired { required, available } => write!(
                f,
                "Insufficient credits: {} required, {} available",
                required, available
            ),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::Unprocessable(msg) => write!(f, "Unprocessable: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::RateLimitExceeded { message, .. } => write!(f, "Rate limit exceeded: {}", message),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::BadGateway(msg) => write!(f, "Bad gateway: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::RateLimitExceeded { retry_after, message } = self {
            let body = Json(ErrorResponse {
                error: "rate_limit_exceeded".to_string(),
                message,
                details: None,
            });

            let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
            return response;
        }

        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::PaymentRequired { required, available } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_credits",
                format!(
                    "This needs {} credits but you have {}. Credits refill daily, or you can buy more.",
                    required, available
                ),
                None,
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::Unprocessable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "unprocessable",
                msg,
                None,
            ),
            ApiError::ValidationError(errors) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::RateLimitExceeded { message, .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limit_exceeded",
                message,
                None,
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "bad_gateway", msg, None),
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg,
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if let Some(constraint) = db_err.constraint() {
                    return ApiError::Conflict(format!("Constraint violation: {}", constraint));
                }
                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", error.code)),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(details)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => ApiError::Unauthorized("Missing credentials".to_string()),
            AuthError::InvalidFormat(msg) => ApiError::BadRequest(msg),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
        }
    }
}

impl From<CreditError> for ApiError {
    fn from(err: CreditError) -> Self {
        match err {
            CreditError::InsufficientCredits { required, available } => {
                ApiError::PaymentRequired { required, available }
            }
            CreditError::UserNotFound(_) => ApiError::NotFound("User not found".to_string()),
            CreditError::InvalidAmount(amount) => {
                ApiError::BadRequest(format!("Invalid credit amount: {}", amount))
            }
            CreditError::Database(e) => e.into(),
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        if err.is_generation_failure() {
            tracing::warn!(error = %err, "Generation failed");
        }

        match err {
            GenerationError::InsufficientCredits { required, available } => {
                ApiError::PaymentRequired { required, available }
            }
            GenerationError::CurriculumMissing(context) => ApiError::Unprocessable(format!(
                "No curriculum is available for {} yet",
                context
            )),
            GenerationError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            e @ GenerationError::ModuleLocked { .. } => ApiError::Forbidden(e.to_string()),
            GenerationError::ProvidersExhausted(message) => ApiError::ServiceUnavailable(message),
            GenerationError::Parse(_) | GenerationError::TooFewItems { .. } => {
                ApiError::BadGateway(RETRY_MESSAGE.to_string())
            }
            GenerationError::ReviewUnavailable => ApiError::ServiceUnavailable(
                "The lesson could not be checked right now. Please try again shortly.".to_string(),
            ),
            GenerationError::Credit(e) => e.into(),
            GenerationError::Database(e) => e.into(),
        }
    }
}

impl From<ReferralError> for ApiError {
    fn from(err: ReferralError) -> Self {
        match err {
            e @ ReferralError::UnknownCode(_) => ApiError::NotFound(e.to_string()),
            e @ ReferralError::SelfReferral => ApiError::BadRequest(e.to_string()),
            e @ ReferralError::AlreadyReferred => ApiError::Conflict(e.to_string()),
            ReferralError::Credit(e) => e.into(),
            ReferralError::Database(e) => e.into(),
        }
    }
}

impl From<GradeError> for ApiError {
    fn from(err: GradeError) -> Self {
        match err {
            GradeError::CourseNotFound(_) => ApiError::NotFound("Course not found".to_string()),
            GradeError::Database(e) => e.into(),
        }
    }
}

impl From<PaystackError> for ApiError {
    fn from(err: PaystackError) -> Self {
        match err {
            PaystackError::NotConfigured => {
                ApiError::ServiceUnavailable("Payments are not available right now".to_string())
            }
            PaystackError::Http(e) => {
                tracing::warn!(error = %e, "Payment gateway unreachable");
                ApiError::BadGateway("Payment gateway is unreachable".to_string())
            }
            PaystackError::Status(status) => {
                ApiError::BadGateway(format!("Payment gateway returned status {}", status))
            }
            PaystackError::Rejected(message) => ApiError::BadGateway(message),
            PaystackError::PaymentNotFound(reference) => {
                ApiError::NotFound(format!("Payment {} not found", reference))
            }
            PaystackError::Database(e) => e.into(),
            PaystackError::Credit(e) => e.into(),
        }
    }
}
