use crate::{AppState, handlers};
use axum::{
    Router,
    routing::get,
};

/// Posts Router Module
///
/// Read endpoints are anonymous; every mutation handler carries the `AdminUser`
/// guard and rejects with 401/403 before any business logic runs.
pub fn post_routes() -> Router<AppState> {
    Router::new()
        // GET  /api/v1/posts — filtered, paginated listing (q, tag, offset, limit, sort).
        // POST /api/v1/posts — admin: create a post with its tag set.
        .route(
            "/api/v1/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        // GET    /api/v1/posts/{slug} — single post by slug.
        // PUT    /api/v1/posts/{id}   — admin: overwrite a post and replace its tags.
        // DELETE /api/v1/posts/{id}   — admin: remove a post and its tag links.
        //
        // The three share one path segment, so axum requires a single registration;
        // the mutation handlers parse the captured value as a Uuid.
        .route(
            "/api/v1/posts/{slug}",
            get(handlers::get_post_by_slug)
                .put(handlers::update_post)
                .delete(handlers::delete_post),
        )
}
