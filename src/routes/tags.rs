use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Tags Router Module
///
/// Read-only tag data for anonymous clients (tag clouds, filter pickers).
pub fn tag_routes() -> Router<AppState> {
    Router::new()
        // GET /api/v1/tags
        // Every tag with the count of posts currently linked to it. Orphan tags
        // (zero posts) are omitted by the inner join.
        .route("/api/v1/tags", get(handlers::list_tags))
}
