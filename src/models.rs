use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;

// Field limits enforced on write payloads. The schema carries matching VARCHAR
// widths, so rejecting here keeps oversized input out of the transaction entirely.
pub const TITLE_MAX_LEN: usize = 200;
pub const SLUG_MAX_LEN: usize = 220;
pub const EXCERPT_MAX_LEN: usize = 300;
pub const TAG_NAME_MAX_LEN: usize = 50;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Represents the canonical identity record stored in the `users` table. Rows are
/// created by the out-of-band seeding binary and are read-only during API operation.
/// Not a wire model: the password hash never leaves the process.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    // Argon2id PHC string. Skipped on serialization so it can never leak into a body.
    #[serde(skip_serializing)]
    pub password_hash: String,
    // The RBAC flag gating every post mutation.
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Post
///
/// A post row from the `posts` table. Tag names live in `tags`/`post_tags` and are
/// resolved separately; this struct carries only the scalar columns.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    // URL-safe unique identifier. Mutable through updates, but the new value must
    // not collide with another post.
    pub slug: String,
    pub content_md: String,
    pub excerpt: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tag
///
/// A tag row. Created implicitly the first time a post references the name and
/// never deleted, so rows may outlive their last post link.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// Input payload for POST /api/v1/auth/login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// PostIn
///
/// Input payload for creating and updating posts. The same shape serves both
/// operations: an update overwrites every field with the payload's values.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PostIn {
    pub title: String,
    /// Explicit slug. When absent the slug is derived from the title.
    #[serde(default)]
    pub slug: Option<String>,
    pub content_md: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default = "default_published")]
    pub is_published: bool,
    /// Tag names. Duplicates collapse to a single reference; matching against
    /// existing tags is exact and case-sensitive.
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_published() -> bool {
    true
}

impl Default for PostIn {
    fn default() -> Self {
        Self {
            title: String::new(),
            slug: None,
            content_md: String::new(),
            excerpt: None,
            is_published: true,
            tags: vec![],
        }
    }
}

impl PostIn {
    /// Enforces the payload shape limits before any storage work happens.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.title.trim().is_empty() {
            return Err(ApiError::Validation("title must not be empty".to_string()));
        }
        if self.title.chars().count() > TITLE_MAX_LEN {
            return Err(ApiError::Validation(format!(
                "title must be at most {TITLE_MAX_LEN} characters"
            )));
        }
        if let Some(slug) = &self.slug {
            if slug.chars().count() > SLUG_MAX_LEN {
                return Err(ApiError::Validation(format!(
                    "slug must be at most {SLUG_MAX_LEN} characters"
                )));
            }
        }
        if let Some(excerpt) = &self.excerpt {
            if excerpt.chars().count() > EXCERPT_MAX_LEN {
                return Err(ApiError::Validation(format!(
                    "excerpt must be at most {EXCERPT_MAX_LEN} characters"
                )));
            }
        }
        for tag in &self.tags {
            if tag.trim().is_empty() {
                return Err(ApiError::Validation(
                    "tag names must not be empty".to_string(),
                ));
            }
            if tag.chars().count() > TAG_NAME_MAX_LEN {
                return Err(ApiError::Validation(format!(
                    "tag names must be at most {TAG_NAME_MAX_LEN} characters"
                )));
            }
        }
        Ok(())
    }
}

// --- Response Schemas (Output) ---

/// TokenOut
///
/// Output schema for a successful login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TokenOut {
    pub access_token: String,
    pub token_type: String,
}

impl TokenOut {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// PostOut
///
/// A post as it appears on the wire: the row's scalar fields plus its resolved
/// tag names.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostOut {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content_md: String,
    pub excerpt: Option<String>,
    pub is_published: bool,
    pub tags: Vec<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl PostOut {
    /// Joins a post row with its resolved tag names.
    pub fn from_row(post: Post, tags: Vec<String>) -> Self {
        Self {
            id: post.id,
            title: post.title,
            slug: post.slug,
            content_md: post.content_md,
            excerpt: post.excerpt,
            is_published: post.is_published,
            tags,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

/// PostList
///
/// Output schema for the paginated listing: `total` counts every post matching the
/// filters before pagination, `items` is the requested page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostList {
    pub total: i64,
    pub items: Vec<PostOut>,
}

/// TagCount
///
/// One entry of GET /api/v1/tags: a tag name and the number of posts currently
/// linked to it. Tags with zero posts are never present (inner-join semantics).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct TagCount {
    pub name: String,
    pub count: i64,
}

// --- Filter Structs ---

/// PostFilter
///
/// Accepted query parameters for the public post listing endpoint. Used by Axum's
/// Query extractor to safely bind HTTP query parameters for filtering and search.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
pub struct PostFilter {
    /// Case-insensitive substring match against the title.
    pub q: Option<String>,
    /// Exact tag name filter.
    pub tag: Option<String>,
    #[serde(default)]
    pub offset: i64,
    /// Page size. Caller-controlled; no server-side cap is applied.
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// "oldest" sorts by creation time ascending; anything else means newest-first.
    pub sort: Option<String>,
}

fn default_limit() -> i64 {
    10
}

impl Default for PostFilter {
    fn default() -> Self {
        Self {
            q: None,
            tag: None,
            offset: 0,
            limit: default_limit(),
            sort: None,
        }
    }
}

impl PostFilter {
    /// True when the caller asked for oldest-first ordering.
    pub fn oldest_first(&self) -> bool {
        self.sort.as_deref() == Some("oldest")
    }
}
