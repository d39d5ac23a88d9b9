use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use uuid::Uuid;

use crate::{
    config::AppConfig, error::ApiError, repository::RepositoryState,
    security::decode_access_token,
};

/// AuthUser Extractor Result
///
/// This struct represents the resolved identity of an authenticated request.
/// Handlers use it to retrieve the user's ID and verify permissions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The unique identifier of the user, mapped to users.id.
    pub id: Uuid,
    pub username: String,
    /// The RBAC flag. Checked by `require_admin`, never inside handlers directly.
    pub is_admin: bool,
}

/// AuthUser Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making AuthUser usable as a function
/// argument in any authenticated handler. This cleanly separates authentication
/// (extractor) from business logic (the handler).
///
/// The process:
/// 1. Dependency Resolution: Accessing Repository and AppConfig from the app state.
/// 2. Token Extraction: Standard Bearer token extraction from the Authorization header.
/// 3. Token Validation: JWT signature and expiry verification.
/// 4. DB Lookup: Fetching the user's record; a token whose subject was deleted is
///    rejected exactly like an invalid token, so existence is never leaked.
///
/// Rejection: `ApiError::Unauthenticated` (401) on any of the above failing. A
/// database failure during the lookup propagates as an internal error instead —
/// a storage outage is not an authentication verdict.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthenticated)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthenticated)?;

        // Bad signature, malformed structure, and expired tokens are one failure class.
        let claims =
            decode_access_token(token, &config.jwt_secret).map_err(|_| ApiError::Unauthenticated)?;

        let user = repo
            .get_user(claims.sub)
            .await?
            .ok_or(ApiError::Unauthenticated)?;

        Ok(AuthUser {
            id: user.id,
            username: user.username,
            is_admin: user.is_admin,
        })
    }
}

/// Passes the user through unchanged when it holds the admin role, rejects with
/// `Forbidden` otherwise. Composes with `AuthUser`: authenticate first, then
/// authorize.
pub fn require_admin(user: AuthUser) -> Result<AuthUser, ApiError> {
    if user.is_admin {
        Ok(user)
    } else {
        Err(ApiError::Forbidden)
    }
}

/// AdminUser
///
/// The composed guard for admin-only handlers: resolves the identity via
/// `AuthUser`, then applies `require_admin`. Declaring this extractor in a handler
/// signature is what gates the route — there is no hidden role state anywhere else.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        require_admin(user).map(AdminUser)
    }
}
