use crate::{
    AppState,
    auth::AdminUser,
    error::ApiError,
    models::{LoginRequest, PostFilter, PostIn, PostList, PostOut, TagCount, TokenOut},
    security::{create_access_token, verify_password},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

// --- Handlers ---

/// login
///
/// [Public Route] Verifies the credentials and issues an access token bound to the
/// user's id with the configured lifetime.
///
/// *Security*: an unknown username and a wrong password produce the same error, so
/// the response never confirms whether an account exists.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenOut),
        (status = 400, description = "Bad credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenOut>, ApiError> {
    let user = state
        .repo
        .find_user_by_username(&payload.username)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(&payload.password, &user.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    let token = create_access_token(user.id, state.config.token_ttl_minutes, &state.config.jwt_secret)?;
    Ok(Json(TokenOut::bearer(token)))
}

/// create_post
///
/// [Admin Route] Creates a post with its tag set. The slug is taken from the
/// payload or derived from the title; tag rows are created on first reference.
#[utoipa::path(
    post,
    path = "/api/v1/posts",
    request_body = PostIn,
    responses(
        (status = 201, description = "Created", body = PostOut),
        (status = 400, description = "Slug conflict or invalid payload")
    )
)]
pub async fn create_post(
    AdminUser(actor): AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<PostIn>,
) -> Result<(StatusCode, Json<PostOut>), ApiError> {
    payload.validate()?;
    let post = state.repo.create_post(payload).await?;
    tracing::debug!("post '{}' created by {}", post.slug, actor.username);
    Ok((StatusCode::CREATED, Json(post)))
}

/// update_post
///
/// [Admin Route] Overwrites every field of an existing post and fully replaces its
/// tag set. The recomputed slug must not collide with a different post.
#[utoipa::path(
    put,
    path = "/api/v1/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = PostIn,
    responses(
        (status = 200, description = "Updated", body = PostOut),
        (status = 400, description = "Slug conflict or invalid payload"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_post(
    AdminUser(actor): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostIn>,
) -> Result<Json<PostOut>, ApiError> {
    payload.validate()?;
    let post = state.repo.update_post(id, payload).await?;
    tracing::debug!("post '{}' updated by {}", post.slug, actor.username);
    Ok(Json(post))
}

/// delete_post
///
/// [Admin Route] Removes a post and its tag links. A second delete of the same id
/// is a 404 — the operation is not idempotent past the first call.
#[utoipa::path(
    delete,
    path = "/api/v1/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_post(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.repo.delete_post(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// list_posts
///
/// [Public Route] Filtered, paginated listing. `total` counts every match before
/// pagination; `items` is the requested page, newest-first unless `sort=oldest`.
#[utoipa::path(
    get,
    path = "/api/v1/posts",
    params(PostFilter),
    responses((status = 200, description = "Filtered page of posts", body = PostList))
)]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(filter): Query<PostFilter>,
) -> Result<Json<PostList>, ApiError> {
    let page = state.repo.list_posts(filter).await?;
    Ok(Json(page))
}

/// get_post_by_slug
///
/// [Public Route] Exact slug lookup. Publication status does not gate visibility:
/// unpublished posts remain readable by direct slug.
#[utoipa::path(
    get,
    path = "/api/v1/posts/{slug}",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Found", body = PostOut),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_post_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostOut>, ApiError> {
    let post = state.repo.get_post_by_slug(&slug).await?;
    Ok(Json(post))
}

/// list_tags
///
/// [Public Route] Every tag currently linked to at least one post, with its count.
#[utoipa::path(
    get,
    path = "/api/v1/tags",
    responses((status = 200, description = "Tags with post counts", body = [TagCount]))
)]
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagCount>>, ApiError> {
    let tags = state.repo.list_tags().await?;
    Ok(Json(tags))
}
