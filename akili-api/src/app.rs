/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use akili_api::{app::{build_router, AppState}, config::Config};
/// use akili_tutor::fallback::FallbackOrchestrator;
/// use sqlx::PgPool;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let orchestrator = FallbackOrchestrator::from_settings(reqwest::Client::new(), &config.providers);
/// let state = AppState::new(pool, config, Arc::new(orchestrator))?;
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{
        auth::jwt_auth_layer,
        rate_limit::{rate_limit_layer, GenerationRateLimiter, RateLimit},
        security::SecurityHeadersLayer,
    },
    routes,
};
use akili_shared::credits::CreditLedger;
use akili_shared::grading::GradeAggregator;
use akili_shared::paystack::{PaystackClient, PaystackError};
use akili_tutor::fallback::FallbackOrchestrator;
use akili_tutor::pipeline::GenerationPipeline;
use akili_tutor::validator::ContentValidator;
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into every handler by Axum's `State` extractor; all members are
/// cheap handles.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub pipeline: GenerationPipeline,
    pub ledger: CreditLedger,
    pub grader: GradeAggregator,

    /// `None` when payments are not configured
    pub paystack: Option<PaystackClient>,
    pub rate_limiter: GenerationRateLimiter,
}

impl AppState {
    /// Wires the services together over one pool and one provider cascade
    pub fn new(
        db: PgPool,
        config: Config,
        orchestrator: Arc<FallbackOrchestrator>,
    ) -> Result<Self, PaystackError> {
        let ledger = CreditLedger::new(db.clone(), config.credits);
        let validator = ContentValidator::new(orchestrator.clone(), config.validator_policy);
        let pipeline = GenerationPipeline::new(
            db.clone(),
            orchestrator,
            validator,
            ledger.clone(),
            config.costs,
        );
        let grader = GradeAggregator::new(db.clone(), config.grading);

        let paystack = match &config.paystack {
            Some(p) => Some(PaystackClient::new(p.secret_key.clone(), p.base_url.clone())?),
            None => None,
        };

        let rate_limiter = GenerationRateLimiter::new(RateLimit::per_minute(config.generation_rate_limit));

        Ok(Self {
            db,
            config: Arc::new(config),
            pipeline,
            ledger,
            grader,
            paystack,
            rate_limiter,
        })
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// The payment gateway, or `NotConfigured`
    pub fn paystack(&self) -> Result<&PaystackClient, PaystackError> {
        self.paystack.as_ref().ok_or(PaystackError::NotConfigured)
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health                        # liveness (public)
/// ├── GET  /ready                         # database readiness (public)
/// ├── POST /webhooks/paystack             # signed by the gateway (public)
/// └── /v1/                                # bearer token required
///     ├── POST   /courses                 # rate-limited
///     ├── GET    /courses
///     ├── GET    /courses/:id
///     ├── DELETE /courses/:id
///     ├── POST   /courses/:id/exam        # rate-limited
///     ├── GET    /modules/:id/lesson      # rate-limited
///     ├── POST   /modules/:id/quiz        # rate-limited
///     ├── POST   /lessons/:id/report
///     ├── POST   /quizzes/:id/submit
///     ├── POST   /exams/:id/submit
///     ├── GET    /grades
///     ├── POST   /grades/backfill
///     ├── GET    /credits
///     ├── GET    /dashboard
///     ├── POST   /referrals
///     ├── POST   /payments
///     └── GET    /payments/:reference/verify
/// ```
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, request tracing, then on `/v1`
/// authentication, then on generation routes the rate limiter.
pub fn build_router(state: AppState) -> Router {
    let limited = from_fn_with_state(state.clone(), rate_limit_layer);

    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/ready", get(routes::health::readiness_check))
        .route("/webhooks/paystack", post(routes::payments::paystack_webhook));

    let v1_routes = Router::new()
        .route(
            "/courses",
            post(routes::courses::create_course)
                .route_layer(limited.clone())
                .get(routes::courses::list_courses),
        )
        .route(
            "/courses/:id",
            get(routes::courses::get_course).delete(routes::courses::delete_course),
        )
        .route(
            "/courses/:id/exam",
            post(routes::exams::start_exam).route_layer(limited.clone()),
        )
        .route(
            "/modules/:id/lesson",
            get(routes::lessons::get_lesson).route_layer(limited.clone()),
        )
        .route(
            "/modules/:id/quiz",
            post(routes::quizzes::start_quiz).route_layer(limited),
        )
        .route("/lessons/:id/report", post(routes::lessons::report_lesson))
        .route("/quizzes/:id/submit", post(routes::quizzes::submit_quiz))
        .route("/exams/:id/submit", post(routes::exams::submit_exam))
        .route("/grades", get(routes::grades::list_grades))
        .route("/grades/backfill", post(routes::grades::backfill_grades))
        .route("/credits", get(routes::credits::get_credits))
        .route("/dashboard", get(routes::credits::dashboard))
        .route("/referrals", post(routes::referrals::claim))
        .route("/payments", post(routes::payments::initialize_payment))
        .route("/payments/:reference/verify", get(routes::payments::verify_payment))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_layer));

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(public_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
