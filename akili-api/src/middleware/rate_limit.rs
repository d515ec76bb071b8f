/// Per-user rate limiting for generation endpoints
///
/// Each AI call can take most of a minute and costs provider quota, so the
/// generation routes share one GCRA limiter keyed by user:
///
/// - Burst: `GENERATION_RATE_LIMIT` requests
/// - Replenish: one request every 60 / `GENERATION_RATE_LIMIT` seconds
///
/// State lives in process memory. Requests that arrive before the next cell
/// is free get `429 Too Many Requests` with a `Retry-After` header.
///
/// # Headers
///
/// Successful responses carry:
/// - `X-RateLimit-Limit`: requests allowed per minute
/// - `X-RateLimit-Remaining`: burst capacity left after this request

use crate::{app::AppState, error::ApiError};
use akili_shared::auth::middleware::AuthContext;
use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
    Extension,
};
use governor::{
    clock::{Clock, DefaultClock},
    middleware::StateInformationMiddleware,
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;
use uuid::Uuid;

/// Stale keys are dropped once the store tracks more users than this
const PRUNE_THRESHOLD: usize = 10_000;

type KeyedLimiter =
    RateLimiter<Uuid, DefaultKeyedStateStore<Uuid>, DefaultClock, StateInformationMiddleware>;

/// Rate limit configuration
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub requests_per_minute: NonZeroU32,
}

impl RateLimit {
    /// A zero limit is treated as one request per minute
    pub fn per_minute(requests: u32) -> Self {
        Self {
            requests_per_minute: NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN),
        }
    }

    fn quota(&self) -> Quota {
        Quota::per_minute(self.requests_per_minute)
    }
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy)]
pub struct RateLimitResult {
    pub ok: bool,
    pub remaining: u32,
    /// Whole seconds until the next request is allowed
    pub retry_after: u64,
}

/// Keyed limiter shared by all generation routes
#[derive(Clone)]
pub struct GenerationRateLimiter {
    limit: RateLimit,
    limiter: Arc<KeyedLimiter>,
    clock: DefaultClock,
}

impl GenerationRateLimiter {
    pub fn new(limit: RateLimit) -> Self {
        let limiter = RateLimiter::keyed(limit.quota()).with_middleware::<StateInformationMiddleware>();
        Self {
            limit,
            limiter: Arc::new(limiter),
            clock: DefaultClock::default(),
        }
    }

    pub fn limit(&self) -> RateLimit {
        self.limit
    }

    pub fn check(&self, user_id: Uuid) -> RateLimitResult {
        if self.limiter.len() > PRUNE_THRESHOLD {
            self.limiter.retain_recent();
        }

        match self.limiter.check_key(&user_id) {
            Ok(snapshot) => RateLimitResult {
                ok: true,
                remaining: snapshot.remaining_burst_capacity(),
                retry_after: 0,
            },
            Err(not_until) => {
                let wait = not_until.wait_time_from(self.clock.now());
                let seconds = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
                RateLimitResult {
                    ok: false,
                    remaining: 0,
                    retry_after: seconds.max(1),
                }
            }
        }
    }
}

/// Rate limiting middleware
///
/// Must run after authentication so the user id is available.
pub async fn rate_limit_layer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let result = state.rate_limiter.check(auth.user_id);

    if !result.ok {
        tracing::info!(
            user_id = %auth.user_id,
            retry_after = result.retry_after,
            "Generation rate limit exceeded"
        );
        return Err(ApiError::RateLimitExceeded {
            retry_after: result.retry_after,
            message: format!(
                "Too many generation requests. Try again in {} seconds",
                result.retry_after
            ),
        });
    }

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        "X-RateLimit-Limit",
        HeaderValue::from(state.rate_limiter.limit().requests_per_minute.get()),
    );
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(result.remaining));

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_per_minute() {
        assert_eq!(RateLimit::per_minute(10).requests_per_minute.get(), 10);
    }

    #[test]
    fn test_rate_limit_zero_is_clamped() {
        assert_eq!(RateLimit::per_minute(0).requests_per_minute.get(), 1);
    }

    #[test]
    fn test_limiter_exhausts_burst() {
        let limiter = GenerationRateLimiter::new(RateLimit::per_minute(3));
        let user = Uuid::new_v4();

        for remaining in [2, 1, 0] {
            let result = limiter.check(user);
            assert!(result.ok);
            assert_eq!(result.remaining, remaining);
        }

        // 3 per minute frees one request every 20 seconds
        let blocked = limiter.check(user);
        assert!(!blocked.ok);
        assert_eq!(blocked.remaining, 0);
        assert!((1..=20).contains(&blocked.retry_after));
    }

    #[test]
    fn test_limiter_is_per_user() {
        let limiter = GenerationRateLimiter::new(RateLimit::per_minute(1));
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(limiter.check(a).ok);
        assert!(!limiter.check(a).ok);
        assert!(limiter.check(b).ok);
    }

    #[test]
    fn test_clones_share_state() {
        let limiter = GenerationRateLimiter::new(RateLimit::per_minute(1));
        let clone = limiter.clone();
        let user = Uuid::new_v4();

        assert!(limiter.check(user).ok);
        assert!(!clone.check(user).ok);
    }

    #[test]
    fn test_single_request_limit_waits_a_minute() {
        let limiter = GenerationRateLimiter::new(RateLimit::per_minute(1));
        let user = Uuid::new_v4();

        assert!(limiter.check(user).ok);
        let blocked = limiter.check(user);
        assert!(blocked.retry_after > 50 && blocked.retry_after <= 60);
    }
}
