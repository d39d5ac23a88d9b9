use crate::error::{ApiError, slug_conflict_on_unique};
use crate::models::{Post, PostFilter, PostIn, PostList, PostOut, Tag, TagCount, User};
use crate::slug::slugify;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction, query_builder::QueryBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations. This is the core
/// of the Repository Abstraction pattern, allowing the handlers to interact with
/// the data layer without knowing the specific implementation (Postgres, Mock, etc.).
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable and usable across Axum's asynchronous
/// task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    // Login path. A miss is reported as None, never as an error, so the caller can
    // collapse it with a failed password check into one indistinguishable failure.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ApiError>;
    // Identity resolution: maps a token subject back to a user record.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError>;
    // Used by the seeding binary only; no API route creates users.
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<User, ApiError>;

    // --- Posts ---
    // Creates the post and its tag links in one transaction. `SlugConflict` if the
    // (supplied or derived) slug is already taken.
    async fn create_post(&self, input: PostIn) -> Result<PostOut, ApiError>;
    // Overwrites every field and fully replaces the tag set. `NotFound` when the id
    // is absent, `SlugConflict` when another post owns the target slug.
    async fn update_post(&self, id: Uuid, input: PostIn) -> Result<PostOut, ApiError>;
    // Removes the post and its tag links; the tags themselves persist as orphans.
    async fn delete_post(&self, id: Uuid) -> Result<(), ApiError>;
    // Filtered, paginated listing. `total` counts matches before pagination.
    async fn list_posts(&self, filter: PostFilter) -> Result<PostList, ApiError>;
    // Exact slug lookup. Publication status does not gate visibility here.
    async fn get_post_by_slug(&self, slug: &str) -> Result<PostOut, ApiError>;

    // --- Tags ---
    // Every tag with its current post count; zero-post tags are omitted.
    async fn list_tags(&self) -> Result<Vec<TagCount>, ApiError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

const POST_COLUMNS: &str = "id, title, slug, content_md, excerpt, is_published, created_at, updated_at";

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// init_schema
    ///
    /// Idempotently creates the schema. Run at startup when
    /// `AppConfig.auto_create_tables` is set, and by the seeding binary.
    /// The UNIQUE constraints on `posts.slug`, `tags.name`, and `users.username`
    /// are the actual race-safety mechanism behind the application-level
    /// duplicate pre-checks.
    pub async fn init_schema(&self) -> Result<(), ApiError> {
        let statements = [
            r#"CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                username VARCHAR(50) NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                is_admin BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
            r#"CREATE TABLE IF NOT EXISTS posts (
                id UUID PRIMARY KEY,
                title VARCHAR(200) NOT NULL,
                slug VARCHAR(220) NOT NULL UNIQUE,
                content_md TEXT NOT NULL,
                excerpt VARCHAR(300),
                is_published BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
            r#"CREATE TABLE IF NOT EXISTS tags (
                id UUID PRIMARY KEY,
                name VARCHAR(50) NOT NULL UNIQUE
            )"#,
            r#"CREATE TABLE IF NOT EXISTS post_tags (
                post_id UUID NOT NULL REFERENCES posts(id),
                tag_id UUID NOT NULL REFERENCES tags(id),
                PRIMARY KEY (post_id, tag_id)
            )"#,
        ];

        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Resolves tag names for a page of posts in a single round trip.
    async fn tags_for_posts(
        &self,
        post_ids: Vec<Uuid>,
    ) -> Result<HashMap<Uuid, Vec<String>>, ApiError> {
        let mut by_post: HashMap<Uuid, Vec<String>> = HashMap::new();
        if post_ids.is_empty() {
            return Ok(by_post);
        }

        let rows: Vec<(Uuid, String)> = sqlx::query_as(
            "SELECT pt.post_id, t.name FROM post_tags pt \
             JOIN tags t ON t.id = pt.tag_id \
             WHERE pt.post_id = ANY($1) ORDER BY t.name",
        )
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await?;

        for (post_id, name) in rows {
            by_post.entry(post_id).or_default().push(name);
        }
        Ok(by_post)
    }
}

/// Resolves the effective slug for a write payload: the explicit slug when one was
/// supplied, otherwise the title normalized.
fn effective_slug(input: &PostIn) -> String {
    match &input.slug {
        Some(slug) if !slug.trim().is_empty() => slug.clone(),
        _ => slugify(&input.title),
    }
}

/// Upserts and links the payload's tag set to a post inside the caller's
/// transaction, returning the resolved names.
///
/// Duplicate names in the input collapse to a single link, preserving first-seen
/// order. Lookup is exact and case-sensitive: "Go" and "go" are distinct tags.
async fn link_tags(
    tx: &mut Transaction<'_, Postgres>,
    post_id: Uuid,
    names: &[String],
) -> Result<Vec<String>, ApiError> {
    let mut deduped: Vec<&String> = Vec::new();
    for name in names {
        if !deduped.iter().any(|seen| *seen == name) {
            deduped.push(name);
        }
    }

    let mut resolved = Vec::with_capacity(deduped.len());
    for name in deduped {
        let tag = match sqlx::query_as::<_, Tag>("SELECT id, name FROM tags WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut **tx)
            .await?
        {
            Some(tag) => tag,
            None => {
                sqlx::query_as::<_, Tag>(
                    "INSERT INTO tags (id, name) VALUES ($1, $2) RETURNING id, name",
                )
                .bind(Uuid::new_v4())
                .bind(name)
                .fetch_one(&mut **tx)
                .await?
            }
        };

        sqlx::query("INSERT INTO post_tags (post_id, tag_id) VALUES ($1, $2)")
            .bind(post_id)
            .bind(tag.id)
            .execute(&mut **tx)
            .await?;
        resolved.push(tag.name);
    }
    Ok(resolved)
}

/// Appends the shared join/filter clauses used by both the count query and the
/// page query, so the two can never disagree about what "matching" means.
fn push_filter_clauses(builder: &mut QueryBuilder<'_, Postgres>, filter: &PostFilter) {
    if filter.tag.is_some() {
        builder.push(" JOIN post_tags pt ON pt.post_id = p.id JOIN tags t ON t.id = pt.tag_id");
    }

    builder.push(" WHERE TRUE");
    if let Some(q) = &filter.q {
        builder.push(" AND p.title ILIKE ");
        builder.push_bind(format!("%{}%", q));
    }
    if let Some(tag) = &filter.tag {
        builder.push(" AND t.name = ");
        builder.push_bind(tag.clone());
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, is_admin, created_at \
             FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, is_admin, created_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<User, ApiError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, password_hash, is_admin, created_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             RETURNING id, username, password_hash, is_admin, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(password_hash)
        .bind(is_admin)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    /// create_post
    ///
    /// Post row and tag links are written in one transaction; nothing is observable
    /// if any step fails. The slug pre-check is advisory only — a concurrent create
    /// racing past it hits the UNIQUE index and is mapped to the same conflict.
    async fn create_post(&self, input: PostIn) -> Result<PostOut, ApiError> {
        let slug = effective_slug(&input);
        let mut tx = self.pool.begin().await?;

        let taken: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM posts WHERE slug = $1")
            .bind(&slug)
            .fetch_optional(&mut *tx)
            .await?;
        if taken.is_some() {
            return Err(ApiError::SlugConflict);
        }

        let post = sqlx::query_as::<_, Post>(&format!(
            "INSERT INTO posts (id, title, slug, content_md, excerpt, is_published, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&input.title)
        .bind(&slug)
        .bind(&input.content_md)
        .bind(&input.excerpt)
        .bind(input.is_published)
        .fetch_one(&mut *tx)
        .await
        .map_err(slug_conflict_on_unique)?;

        let tags = link_tags(&mut tx, post.id, &input.tags).await?;
        tx.commit().await?;

        Ok(PostOut::from_row(post, tags))
    }

    /// update_post
    ///
    /// Overwrites title, slug, content, excerpt, and publish flag, bumps
    /// `updated_at`, and replaces the tag set entirely. Tags dropped from the set
    /// are left behind as orphans, not deleted.
    async fn update_post(&self, id: Uuid, input: PostIn) -> Result<PostOut, ApiError> {
        let slug = effective_slug(&input);
        let mut tx = self.pool.begin().await?;

        let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_none() {
            return Err(ApiError::NotFound);
        }

        // Conflict check excludes the post being updated so it may keep its own slug.
        let taken: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM posts WHERE slug = $1 AND id <> $2")
                .bind(&slug)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if taken.is_some() {
            return Err(ApiError::SlugConflict);
        }

        let post = sqlx::query_as::<_, Post>(&format!(
            "UPDATE posts SET title = $2, slug = $3, content_md = $4, excerpt = $5, \
             is_published = $6, updated_at = NOW() \
             WHERE id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.title)
        .bind(&slug)
        .bind(&input.content_md)
        .bind(&input.excerpt)
        .bind(input.is_published)
        .fetch_one(&mut *tx)
        .await
        .map_err(slug_conflict_on_unique)?;

        sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let tags = link_tags(&mut tx, id, &input.tags).await?;
        tx.commit().await?;

        Ok(PostOut::from_row(post, tags))
    }

    /// delete_post
    ///
    /// `NotFound` when the id does not exist — including on a second delete of the
    /// same id. Linked tags persist as orphans.
    async fn delete_post(&self, id: Uuid) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            // Dropping the transaction rolls the link delete back.
            return Err(ApiError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    /// list_posts
    ///
    /// Implements flexible search/filtering using QueryBuilder for safe
    /// parameterization. The count query and the page query share their filter
    /// clauses, so `total` is always the pre-pagination count of the same match set.
    async fn list_posts(&self, filter: PostFilter) -> Result<PostList, ApiError> {
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM posts p");
        push_filter_clauses(&mut count_builder, &filter);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT p.id, p.title, p.slug, p.content_md, p.excerpt, p.is_published, \
             p.created_at, p.updated_at FROM posts p",
        );
        push_filter_clauses(&mut builder, &filter);
        // Secondary id ordering keeps pages stable when creation times tie.
        builder.push(if filter.oldest_first() {
            " ORDER BY p.created_at ASC, p.id ASC"
        } else {
            " ORDER BY p.created_at DESC, p.id DESC"
        });
        builder.push(" LIMIT ");
        builder.push_bind(filter.limit);
        builder.push(" OFFSET ");
        builder.push_bind(filter.offset);

        let rows: Vec<Post> = builder.build_query_as().fetch_all(&self.pool).await?;

        let mut tags_by_post = self
            .tags_for_posts(rows.iter().map(|p| p.id).collect())
            .await?;
        let items = rows
            .into_iter()
            .map(|post| {
                let tags = tags_by_post.remove(&post.id).unwrap_or_default();
                PostOut::from_row(post, tags)
            })
            .collect();

        Ok(PostList { total, items })
    }

    async fn get_post_by_slug(&self, slug: &str) -> Result<PostOut, ApiError> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ApiError::NotFound)?;

        let tags: Vec<String> = sqlx::query_scalar(
            "SELECT t.name FROM post_tags pt \
             JOIN tags t ON t.id = pt.tag_id \
             WHERE pt.post_id = $1 ORDER BY t.name",
        )
        .bind(post.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(PostOut::from_row(post, tags))
    }

    /// list_tags
    ///
    /// Inner join: a tag appears exactly when at least one post links to it, with
    /// the live link count.
    async fn list_tags(&self) -> Result<Vec<TagCount>, ApiError> {
        let tags = sqlx::query_as::<_, TagCount>(
            "SELECT t.name, COUNT(pt.post_id) AS count FROM tags t \
             JOIN post_tags pt ON pt.tag_id = t.id \
             GROUP BY t.name ORDER BY t.name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }
}
