//! End-to-end tests for the credential lifecycle, run against the real
//! router with an in-memory identity store.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE},
        Request, StatusCode,
    },
    Router,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

use super::error::AuthError;
use super::issuer;
use super::password;
use super::state::AuthConfig;
use super::store::{IdentityStore, NewUser, SharedStore, StoreError, UserRecord};
use super::token::{self, TokenConfig};
use crate::api::router;

/// In-memory store; the single mutex serializes anchor writes the way the
/// database serializes row updates.
struct MemoryStore {
    users: Mutex<HashMap<Uuid, UserRecord>>,
}

impl MemoryStore {
    fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    async fn seed(&self, username: &str, email: &str, password: &str) -> UserRecord {
        let record = UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            full_name: format!("{username} example"),
            password_hash: password::hash_password(password).unwrap(),
            refresh_token: None,
        };
        self.users
            .lock()
            .await
            .insert(record.id, record.clone());
        record
    }

    async fn anchor_of(&self, id: Uuid) -> Option<String> {
        self.users
            .lock()
            .await
            .get(&id)
            .and_then(|user| user.refresh_token.clone())
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.lock().await.get(&id).cloned())
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|user| {
                (!username.is_empty() && user.username == username)
                    || (!email.is_empty() && user.email == email)
            })
            .cloned())
    }

    async fn create(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let mut users = self.users.lock().await;
        if users
            .values()
            .any(|existing| existing.username == user.username || existing.email == user.email)
        {
            return Err(StoreError::Duplicate);
        }
        let record = UserRecord {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            password_hash: user.password_hash,
            refresh_token: None,
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_anchor(&self, id: Uuid, token: &str) -> Result<(), StoreError> {
        let mut users = self.users.lock().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("no such user")))?;
        user.refresh_token = Some(token.to_string());
        Ok(())
    }

    async fn swap_anchor(
        &self,
        id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.lock().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("no such user")))?;
        if user.refresh_token.as_deref() != Some(expected) {
            return Ok(false);
        }
        user.refresh_token = Some(replacement.to_string());
        Ok(true)
    }

    async fn clear_anchor(&self, id: Uuid) -> Result<(), StoreError> {
        if let Some(user) = self.users.lock().await.get_mut(&id) {
            user.refresh_token = None;
        }
        Ok(())
    }
}

fn test_config() -> Arc<AuthConfig> {
    Arc::new(
        AuthConfig::new(
            TokenConfig::new(SecretString::from("access-secret".to_string()), 900),
            TokenConfig::new(SecretString::from("refresh-secret".to_string()), 864_000),
        )
        .unwrap(),
    )
}

fn app(store: &Arc<MemoryStore>, config: &Arc<AuthConfig>) -> Router {
    let shared: SharedStore = store.clone();
    router(shared, config.clone())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn set_cookies(response: &axum::response::Response) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(ToString::to_string)
        .collect()
}

#[tokio::test]
async fn login_issues_pair_sets_cookies_and_persists_anchor() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config();
    let alice = store.seed("alice", "alice@example.com", "secret123").await;

    let response = app(&store, &config)
        .oneshot(post_json(
            "/api/v1/users/login",
            json!({"username": "alice", "password": "secret123"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with("accessToken=")));
    assert!(cookies.iter().any(|c| c.starts_with("refreshToken=")));
    assert!(cookies.iter().all(|c| c.contains("HttpOnly")));

    let body = body_json(response).await;
    let access = body["access_token"].as_str().unwrap();
    let refresh = body["refresh_token"].as_str().unwrap();
    assert_eq!(body["user"]["username"], "alice");
    assert!(body["user"].get("password_hash").is_none());

    // Issue then immediate verify resolves the same subject.
    let claims = token::verify_access(access, config.access()).unwrap();
    assert_eq!(claims.sub, alice.id);

    // The anchor is exactly the refresh token that was handed out.
    assert_eq!(store.anchor_of(alice.id).await.as_deref(), Some(refresh));
}

#[tokio::test]
async fn login_failures_are_uniform_unauthorized() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config();
    store.seed("alice", "alice@example.com", "secret123").await;

    for body in [
        json!({"username": "alice", "password": "wrong"}),
        json!({"username": "nobody", "password": "secret123"}),
    ] {
        let response = app(&store, &config)
            .oneshot(post_json("/api/v1/users/login", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
        assert_eq!(body["error"]["message"], "invalid credentials");
    }
}

#[tokio::test]
async fn register_validates_creates_and_conflicts() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config();

    let missing = app(&store, &config)
        .oneshot(post_json(
            "/api/v1/users/register",
            json!({"username": "  ", "email": "bob@example.com", "password": "pw", "full_name": "Bob"}),
        ))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let created = app(&store, &config)
        .oneshot(post_json(
            "/api/v1/users/register",
            json!({"username": "Bob", "email": "Bob@Example.com", "password": "secret123", "full_name": "Bob Example"}),
        ))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = body_json(created).await;
    // Stored lowercase, and the hash never leaves the service.
    assert_eq!(body["username"], "bob");
    assert_eq!(body["email"], "bob@example.com");
    assert!(body.get("password_hash").is_none());

    let duplicate = app(&store, &config)
        .oneshot(post_json(
            "/api/v1/users/register",
            json!({"username": "bob", "email": "bob@example.com", "password": "secret123", "full_name": "Bob Example"}),
        ))
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn protected_route_rejects_missing_and_forged_tokens() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config();
    let alice = store.seed("alice", "alice@example.com", "secret123").await;

    // No token at all.
    let response = app(&store, &config)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Correctly shaped token signed with the wrong secret.
    let forged_config = TokenConfig::new(SecretString::from("wrong-secret".to_string()), 900);
    let forged = token::mint_access(&alice.public(), &forged_config).unwrap();
    let response = app(&store, &config)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/logout")
                .header(AUTHORIZATION, format!("Bearer {forged}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "invalid token signature");
}

#[tokio::test]
async fn logout_clears_anchor_and_expires_cookies() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config();
    let alice = store.seed("alice", "alice@example.com", "secret123").await;
    let pair = issuer::issue(store.as_ref(), &config, &alice).await.unwrap();
    assert!(store.anchor_of(alice.id).await.is_some());

    let response = app(&store, &config)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/logout")
                .header(COOKIE, format!("accessToken={}", pair.access_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(store.anchor_of(alice.id).await.is_none());
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));

    // The previously valid refresh token is now rejected outright.
    let response = app(&store, &config)
        .oneshot(post_json(
            "/api/v1/users/refresh-token",
            json!({"refresh_token": pair.refresh_token}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rotation_replaces_anchor_and_detects_reuse() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config();
    let alice = store.seed("alice", "alice@example.com", "secret123").await;
    let first = issuer::issue(store.as_ref(), &config, &alice).await.unwrap();

    // Rotate with the refresh cookie, as a browser would.
    let response = app(&store, &config)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/refresh-token")
                .header(COOKIE, format!("refreshToken={}", first.refresh_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let second_refresh = body["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(second_refresh, first.refresh_token);
    assert_eq!(
        store.anchor_of(alice.id).await.as_deref(),
        Some(second_refresh.as_str())
    );

    // The spent token still verifies cryptographically but no longer matches
    // the anchor: reuse detection, not silent acceptance.
    let response = app(&store, &config)
        .oneshot(post_json(
            "/api/v1/users/refresh-token",
            json!({"refresh_token": first.refresh_token}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "TOKEN_REUSE");
}

#[tokio::test]
async fn refresh_without_token_is_unauthorized() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config();

    let response = app(&store, &config)
        .oneshot(post_json("/api/v1/users/refresh-token", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "missing refresh token");
}

#[tokio::test]
async fn expired_refresh_token_fails_as_expired() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config();
    let alice = store.seed("alice", "alice@example.com", "secret123").await;

    let expired_config =
        TokenConfig::new(SecretString::from("refresh-secret".to_string()), -60);
    let expired = token::mint_refresh(alice.id, &expired_config).unwrap();

    let response = app(&store, &config)
        .oneshot(post_json(
            "/api/v1/users/refresh-token",
            json!({"refresh_token": expired}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "token expired");
}

#[tokio::test(flavor = "multi_thread")]
async fn racing_rotations_produce_exactly_one_winner() {
    let store = Arc::new(MemoryStore::new());
    let config = test_config();
    let alice = store.seed("alice", "alice@example.com", "secret123").await;
    let pair = issuer::issue(store.as_ref(), &config, &alice).await.unwrap();
    let user = store.find_by_id(alice.id).await.unwrap().unwrap();

    // Both rotations start from the same valid anchor; the conditional swap
    // lets exactly one through.
    let (first, second) = tokio::join!(
        issuer::issue_replacing(store.as_ref(), &config, &user, &pair.refresh_token),
        issuer::issue_replacing(store.as_ref(), &config, &user, &pair.refresh_token),
    );

    let (winner, loser) = match (first, second) {
        (Ok(pair), Err(err)) | (Err(err), Ok(pair)) => (pair, err),
        (Ok(_), Ok(_)) => panic!("both rotations succeeded"),
        (Err(_), Err(_)) => panic!("both rotations failed"),
    };
    assert!(matches!(loser, AuthError::TokenReuse));

    // The surviving anchor belongs to the winning pair.
    assert_eq!(
        store.anchor_of(alice.id).await.as_deref(),
        Some(winner.refresh_token.as_str())
    );
}
