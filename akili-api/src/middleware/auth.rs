/// Bearer authentication middleware
///
/// Validates the JWT issued by the identity service, makes sure a `users`
/// row exists for the subject, and inserts the [`AuthContext`] into request
/// extensions for handlers to extract with `Extension<AuthContext>`.
///
/// A first-time subject is provisioned with `DAILY_FREE_CREDITS` as both
/// balance and daily cap.

use crate::{app::AppState, error::ApiError};
use akili_shared::auth::middleware::authenticate;
use akili_shared::models::user::{ProvisionUser, User};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

pub async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = authenticate(request.headers(), state.jwt_secret())?;

    User::provision(
        &state.db,
        ProvisionUser {
            id: auth.user_id,
            email: auth.email.clone(),
            initial_credits: state.config.credits.daily_free_credits,
        },
    )
    .await?;

    tracing::debug!(user_id = %auth.user_id, "Request authenticated");
    request.extensions_mut().insert(auth);

    Ok(next.run(request).await)
}
