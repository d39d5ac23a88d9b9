use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// ApiError
///
/// The single error type shared by the extractors, the handlers, and the repository.
/// Every variant maps onto exactly one HTTP status, and the JSON body is a stable
/// `{"detail": "..."}` object so clients never see internal detail.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Login failed. Unknown username and wrong password intentionally share this
    /// variant so the response does not reveal which of the two was wrong.
    #[error("Incorrect username or password")]
    InvalidCredentials,

    /// Missing, malformed, or expired bearer token, or a token whose subject no
    /// longer resolves to a user.
    #[error("Could not validate credentials")]
    Unauthenticated,

    /// A valid identity without the admin role.
    #[error("Admin privileges required")]
    Forbidden,

    /// The referenced post does not exist.
    #[error("post not found")]
    NotFound,

    /// Another post already owns the target slug.
    #[error("slug already exists")]
    SlugConflict,

    /// Malformed input shape (field length, empty required field).
    #[error("{0}")]
    Validation(String),

    /// Any storage-layer failure. Not retried; surfaces as a generic internal error.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Token encoding failure during issuance.
    #[error("token error")]
    Token(#[from] jsonwebtoken::errors::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidCredentials => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::SlugConflict => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) | ApiError::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal failures are logged with their cause but never leaked to the client.
        let detail = match &self {
            ApiError::Database(e) => {
                tracing::error!("database error: {:?}", e);
                "internal server error".to_string()
            }
            ApiError::Token(e) => {
                tracing::error!("token error: {:?}", e);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Maps a unique-constraint violation onto `SlugConflict`.
///
/// The application-level slug pre-check is advisory only; the UNIQUE index on
/// `posts.slug` is what actually prevents two concurrent creates from both
/// succeeding, and its violation must surface as the same conflict error.
pub fn slug_conflict_on_unique(err: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(ref db) = err {
        if db.is_unique_violation() {
            return ApiError::SlugConflict;
        }
    }
    ApiError::Database(err)
}
