use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Auth Router Module
///
/// The single credential-facing endpoint. Everything else on the API either needs
/// no identity at all or expects the bearer token this route hands out.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        // POST /api/v1/auth/login
        // Verifies username/password and issues a signed, expiring access token.
        // Unknown user and wrong password are deliberately indistinguishable.
        .route("/api/v1/auth/login", post(handlers::login))
}
