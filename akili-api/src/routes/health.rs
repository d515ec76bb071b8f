/// Health endpoints
///
/// ```text
/// GET /health   liveness: always {"status": "healthy"}, never touches the database
/// GET /ready    readiness: runs a database round trip
/// ```
///
/// Readiness response:
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "ai_tiers": ["gemini_flash", "groq"]
/// }
/// ```
///
/// `status` is `degraded` (still HTTP 200) when the database does not answer.

use crate::app::AppState;
use akili_shared::db::pool;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub version: String,
    pub database: String,

    /// Configured AI tiers in cascade order
    pub ai_tiers: Vec<String>,
}

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn readiness_check(State(state): State<AppState>) -> Json<ReadinessResponse> {
    let connected = match pool::health_check(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check: database unreachable");
            false
        }
    };

    Json(ReadinessResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
        ai_tiers: state.pipeline.tier_names(),
    })
}
