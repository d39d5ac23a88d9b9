use async_trait::async_trait;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use std::sync::Arc;
use study_notes_api::{
    ApiError, AppState,
    auth::{AdminUser, AuthUser},
    config::AppConfig,
    handlers,
    models::{LoginRequest, PostFilter, PostIn, PostList, PostOut, TagCount, TokenOut, User},
    repository::Repository,
    security::{decode_access_token, hash_password},
};
use tokio::test;
use uuid::Uuid;

// --- MOCK REPOSITORY IMPLEMENTATION ---

// The central control point for testing handler logic. Handlers rely on the
// Repository trait, so the mock's fields script each method's outcome.
struct MockRepoControl {
    user_to_return: Option<User>,
    post_to_return: PostOut,
    slug_taken: bool,
    post_missing: bool,
    page_to_return: PostList,
    tags_to_return: Vec<TagCount>,
}

impl Default for MockRepoControl {
    fn default() -> Self {
        MockRepoControl {
            user_to_return: None,
            post_to_return: PostOut::default(),
            slug_taken: false,
            post_missing: false,
            page_to_return: PostList::default(),
            tags_to_return: vec![],
        }
    }
}

#[async_trait]
impl Repository for MockRepoControl {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ApiError> {
        Ok(self
            .user_to_return
            .clone()
            .filter(|user| user.username == username))
    }
    async fn get_user(&self, _id: Uuid) -> Result<Option<User>, ApiError> {
        Ok(self.user_to_return.clone())
    }
    async fn create_user(
        &self,
        _username: &str,
        _password_hash: &str,
        _is_admin: bool,
    ) -> Result<User, ApiError> {
        Ok(User::default())
    }

    async fn create_post(&self, input: PostIn) -> Result<PostOut, ApiError> {
        if self.slug_taken {
            return Err(ApiError::SlugConflict);
        }
        let mut post = self.post_to_return.clone();
        post.title = input.title;
        Ok(post)
    }
    async fn update_post(&self, _id: Uuid, input: PostIn) -> Result<PostOut, ApiError> {
        if self.post_missing {
            return Err(ApiError::NotFound);
        }
        if self.slug_taken {
            return Err(ApiError::SlugConflict);
        }
        let mut post = self.post_to_return.clone();
        post.title = input.title;
        Ok(post)
    }
    async fn delete_post(&self, _id: Uuid) -> Result<(), ApiError> {
        if self.post_missing {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }
    async fn list_posts(&self, _filter: PostFilter) -> Result<PostList, ApiError> {
        Ok(self.page_to_return.clone())
    }
    async fn get_post_by_slug(&self, slug: &str) -> Result<PostOut, ApiError> {
        if self.post_missing || self.post_to_return.slug != slug {
            return Err(ApiError::NotFound);
        }
        Ok(self.post_to_return.clone())
    }
    async fn list_tags(&self) -> Result<Vec<TagCount>, ApiError> {
        Ok(self.tags_to_return.clone())
    }
}

// --- TEST UTILITIES ---

const TEST_ID: Uuid = Uuid::from_u128(123);
const TEST_ADMIN_ID: Uuid = Uuid::from_u128(456);

fn create_test_state(repo_control: MockRepoControl) -> AppState {
    AppState {
        repo: Arc::new(repo_control),
        config: AppConfig::default(),
    }
}

fn admin_user() -> AdminUser {
    AdminUser(AuthUser {
        id: TEST_ADMIN_ID,
        username: "admin".to_string(),
        is_admin: true,
    })
}

fn stored_user(password: &str) -> User {
    User {
        id: TEST_ID,
        username: "admin".to_string(),
        password_hash: hash_password(password).unwrap(),
        is_admin: true,
        created_at: Utc::now(),
    }
}

async fn response_bytes(response: axum::response::Response) -> (StatusCode, Vec<u8>) {
    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    (parts.status, bytes.to_vec())
}

// --- LOGIN ---

#[test]
async fn test_login_success_issues_token_bound_to_user() {
    let state = create_test_state(MockRepoControl {
        user_to_return: Some(stored_user("hunter2!")),
        ..MockRepoControl::default()
    });

    let result = handlers::login(
        State(state),
        Json(LoginRequest {
            username: "admin".to_string(),
            password: "hunter2!".to_string(),
        }),
    )
    .await;

    assert!(result.is_ok());
    let Json(TokenOut {
        access_token,
        token_type,
    }) = result.unwrap();
    assert_eq!(token_type, "bearer");

    // The token must verify with the state's secret and carry the user's id.
    let claims =
        decode_access_token(&access_token, &AppConfig::default().jwt_secret).unwrap();
    assert_eq!(claims.sub, TEST_ID);
}

#[test]
async fn test_login_failures_are_indistinguishable() {
    // Unknown username.
    let state = create_test_state(MockRepoControl::default());
    let unknown = handlers::login(
        State(state),
        Json(LoginRequest {
            username: "ghost".to_string(),
            password: "whatever".to_string(),
        }),
    )
    .await
    .unwrap_err();

    // Known username, wrong password.
    let state = create_test_state(MockRepoControl {
        user_to_return: Some(stored_user("hunter2!")),
        ..MockRepoControl::default()
    });
    let wrong_password = handlers::login(
        State(state),
        Json(LoginRequest {
            username: "admin".to_string(),
            password: "not-hunter2".to_string(),
        }),
    )
    .await
    .unwrap_err();

    let (unknown_status, unknown_body) = response_bytes(unknown.into_response()).await;
    let (wrong_status, wrong_body) = response_bytes(wrong_password.into_response()).await;

    assert_eq!(unknown_status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_status, StatusCode::BAD_REQUEST);
    // Byte-identical bodies: the response must not reveal which check failed.
    assert_eq!(unknown_body, wrong_body);
}

// --- POST MUTATIONS ---

#[test]
async fn test_create_post_returns_created() {
    let state = create_test_state(MockRepoControl::default());

    let payload = PostIn {
        title: "Hello World".to_string(),
        content_md: "# hi".to_string(),
        tags: vec!["go".to_string(), "web".to_string()],
        ..PostIn::default()
    };

    let result = handlers::create_post(admin_user(), State(state), Json(payload)).await;

    assert!(result.is_ok());
    let (status, Json(post)) = result.unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(post.title, "Hello World");
}

#[test]
async fn test_create_post_slug_conflict_maps_to_400() {
    let state = create_test_state(MockRepoControl {
        slug_taken: true,
        ..MockRepoControl::default()
    });

    let payload = PostIn {
        title: "Hello World".to_string(),
        content_md: "# hi".to_string(),
        ..PostIn::default()
    };

    let err = handlers::create_post(admin_user(), State(state), Json(payload))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::SlugConflict));

    let (status, _) = response_bytes(err.into_response()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[test]
async fn test_create_post_rejects_invalid_payload_before_storage() {
    let state = create_test_state(MockRepoControl::default());

    let payload = PostIn {
        title: "   ".to_string(),
        content_md: "body".to_string(),
        ..PostIn::default()
    };

    let err = handlers::create_post(admin_user(), State(state), Json(payload))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[test]
async fn test_update_post_not_found_maps_to_404() {
    let state = create_test_state(MockRepoControl {
        post_missing: true,
        ..MockRepoControl::default()
    });

    let payload = PostIn {
        title: "Renamed".to_string(),
        content_md: "body".to_string(),
        ..PostIn::default()
    };

    let err = handlers::update_post(admin_user(), State(state), Path(TEST_ID), Json(payload))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound));

    let (status, _) = response_bytes(err.into_response()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[test]
async fn test_delete_post_returns_no_content() {
    let state = create_test_state(MockRepoControl::default());

    let status = handlers::delete_post(admin_user(), State(state), Path(TEST_ID))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[test]
async fn test_delete_post_missing_maps_to_404() {
    let state = create_test_state(MockRepoControl {
        post_missing: true,
        ..MockRepoControl::default()
    });

    let err = handlers::delete_post(admin_user(), State(state), Path(TEST_ID))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound));
}

// --- PUBLIC READS ---

#[test]
async fn test_list_posts_passes_page_through() {
    let page = PostList {
        total: 42,
        items: vec![PostOut::default()],
    };
    let state = create_test_state(MockRepoControl {
        page_to_return: page.clone(),
        ..MockRepoControl::default()
    });

    let result = handlers::list_posts(State(state), Query(PostFilter::default())).await;

    assert!(result.is_ok());
    let Json(body) = result.unwrap();
    assert_eq!(body.total, 42);
    assert_eq!(body.items.len(), 1);
}

#[test]
async fn test_get_post_by_slug_success() {
    let post = PostOut {
        slug: "hello-world".to_string(),
        title: "Hello World".to_string(),
        ..PostOut::default()
    };
    let state = create_test_state(MockRepoControl {
        post_to_return: post,
        ..MockRepoControl::default()
    });

    let result =
        handlers::get_post_by_slug(State(state), Path("hello-world".to_string())).await;

    assert!(result.is_ok());
    assert_eq!(result.unwrap().0.title, "Hello World");
}

#[test]
async fn test_get_post_by_slug_not_found() {
    let state = create_test_state(MockRepoControl {
        post_missing: true,
        ..MockRepoControl::default()
    });

    let err = handlers::get_post_by_slug(State(state), Path("missing".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound));
}

#[test]
async fn test_list_tags_passes_counts_through() {
    let state = create_test_state(MockRepoControl {
        tags_to_return: vec![TagCount {
            name: "go".to_string(),
            count: 2,
        }],
        ..MockRepoControl::default()
    });

    let result = handlers::list_tags(State(state)).await;

    assert!(result.is_ok());
    let Json(tags) = result.unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].name, "go");
    assert_eq!(tags[0].count, 2);
}
