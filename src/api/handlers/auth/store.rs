//! Identity store contract and its Postgres adapter.
//!
//! The store owns the user record and the revocation anchor. Anchor writes
//! (`update_anchor`, `swap_anchor`, `clear_anchor`) touch only the anchor
//! column; they can never re-hash a password or mutate profile fields.
//! `swap_anchor` is the serialization point for rotation: a single
//! conditional `UPDATE` that either observes the expected prior anchor or
//! reports the swap as lost.

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::Instrument;
use utoipa::ToSchema;
use uuid::Uuid;

/// Shared handle used for dependency injection via axum extensions.
pub type SharedStore = Arc<dyn IdentityStore>;

/// Full user row as persisted. Never serialized; responses use
/// [`PublicUser`].
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    /// The revocation anchor: raw value of the last-issued refresh token,
    /// or `None` when the user has no active session.
    pub refresh_token: Option<String>,
}

impl UserRecord {
    /// The user shape that leaves the service: no hash, no anchor.
    #[must_use]
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
        }
    }
}

/// User fields safe to expose in responses and access-token claims.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
}

/// Input for creating a user; the password arrives already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
}

/// Store failures. Not-found is `Ok(None)` on lookups, never an error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user with this username or email already exists")]
    Duplicate,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Contract for the user-record store backing the credential lifecycle.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<UserRecord>, StoreError>;

    /// Create a user; duplicate username or email fails with
    /// [`StoreError::Duplicate`].
    async fn create(&self, user: NewUser) -> Result<UserRecord, StoreError>;

    /// Unconditionally set the anchor (login path). Anchor-only write.
    async fn update_anchor(&self, id: Uuid, token: &str) -> Result<(), StoreError>;

    /// Replace the anchor only if it still equals `expected` (rotation path).
    /// Returns `false` when the swap was lost to a concurrent rotation or a
    /// logout; the caller must fail the rotation.
    async fn swap_anchor(
        &self,
        id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, StoreError>;

    /// Clear the anchor (logout path). Idempotent.
    async fn clear_anchor(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Postgres-backed identity store.
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, username, email, full_name, password_hash, refresh_token";

fn row_to_record(row: &sqlx::postgres::PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        full_name: row.get("full_name"),
        password_hash: row.get("password_hash"),
        refresh_token: row.get("refresh_token"),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn query_span(operation: &str, statement: &str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to lookup user by id")?;

        Ok(row.as_ref().map(row_to_record))
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $2 LIMIT 1"
        );
        let row = sqlx::query(&query)
            .bind(username)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to lookup user by username or email")?;

        Ok(row.as_ref().map(row_to_record))
    }

    async fn create(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let query = format!(
            "INSERT INTO users (username, email, full_name, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.full_name)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", &query))
            .await;

        match row {
            Ok(row) => Ok(row_to_record(&row)),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Duplicate),
            Err(err) => Err(StoreError::Backend(
                anyhow::Error::new(err).context("failed to insert user"),
            )),
        }
    }

    async fn update_anchor(&self, id: Uuid, token: &str) -> Result<(), StoreError> {
        // Anchor-only write: profile columns and the password hash stay put.
        let query = "UPDATE users SET refresh_token = $2, updated_at = NOW() WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to update refresh token anchor")?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Backend(anyhow::anyhow!(
                "anchor update matched no user"
            )));
        }

        Ok(())
    }

    async fn swap_anchor(
        &self,
        id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, StoreError> {
        // Atomic compare-and-swap at the row level: two rotations racing on
        // the same prior anchor cannot both observe a changed row.
        let query = "UPDATE users SET refresh_token = $3, updated_at = NOW() \
                     WHERE id = $1 AND refresh_token = $2";
        let result = sqlx::query(query)
            .bind(id)
            .bind(expected)
            .bind(replacement)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to swap refresh token anchor")?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_anchor(&self, id: Uuid) -> Result<(), StoreError> {
        // Clearing an already-empty anchor is not an error.
        let query = "UPDATE users SET refresh_token = NULL, updated_at = NOW() WHERE id = $1";
        sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to clear refresh token anchor")?;

        Ok(())
    }
}
