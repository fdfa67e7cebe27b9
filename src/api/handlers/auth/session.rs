//! Login, rotation, and logout endpoints.

use anyhow::Context;
use axum::{
    extract::Extension,
    http::{
        header::{HeaderValue, InvalidHeaderValue, SET_COOKIE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::instrument;

use super::error::AuthError;
use super::issuer::{self, CredentialPair};
use super::middleware::{CurrentUser, ACCESS_COOKIE_NAME};
use super::password;
use super::state::AuthConfig;
use super::store::{PublicUser, SharedStore};
use super::token;
use super::types::{LoginRequest, LogoutResponse, RefreshRequest, SessionResponse};
use super::utils::{bearer_token, cookie_value, normalize_email, normalize_username};

pub(crate) const REFRESH_COOKIE_NAME: &str = "refreshToken";

#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credential pair issued, cookies set", body = SessionResponse),
        (status = 400, description = "Missing fields", body = super::error::ErrorResponse),
        (status = 401, description = "Unknown user or wrong password", body = super::error::ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn login(
    Extension(store): Extension<SharedStore>,
    Extension(config): Extension<Arc<AuthConfig>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("missing payload".to_string()));
    };

    let username = normalize_username(request.username.as_deref().unwrap_or_default());
    let email = normalize_email(request.email.as_deref().unwrap_or_default());
    if username.is_empty() && email.is_empty() {
        return Err(AuthError::Validation(
            "username or email is required".to_string(),
        ));
    }

    // Unknown user and wrong password fail identically; the response never
    // reveals which one it was.
    let user = store
        .find_by_username_or_email(&username, &email)
        .await?
        .ok_or(AuthError::Unauthorized("invalid credentials"))?;

    if !password::verify_password(&request.password, &user.password_hash)? {
        return Err(AuthError::Unauthorized("invalid credentials"));
    }

    let pair = issuer::issue(store.as_ref(), &config, &user).await?;

    session_response(user.public(), pair, &config)
}

#[utoipa::path(
    post,
    path = "/api/v1/users/refresh-token",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Rotated credential pair, cookies set", body = SessionResponse),
        (status = 400, description = "Refresh token reuse detected", body = super::error::ErrorResponse),
        (status = 401, description = "Missing, invalid, or expired refresh token", body = super::error::ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn refresh(
    headers: HeaderMap,
    Extension(store): Extension<SharedStore>,
    Extension(config): Extension<Arc<AuthConfig>>,
    payload: Option<Json<RefreshRequest>>,
) -> Result<Response, AuthError> {
    let presented = cookie_value(&headers, REFRESH_COOKIE_NAME)
        .or_else(|| payload.and_then(|Json(body)| body.refresh_token))
        .or_else(|| bearer_token(&headers));
    let Some(presented) = presented else {
        return Err(AuthError::Unauthorized("missing refresh token"));
    };

    // Signature and expiry first; the underlying reason is surfaced.
    let claims = token::verify_refresh(&presented, config.refresh())?;

    let user = store
        .find_by_id(claims.sub)
        .await?
        .ok_or(AuthError::Unauthorized("invalid refresh token"))?;

    // Cryptographic validity alone does not authorize rotation: the raw
    // value must still match the persisted anchor. A mismatch means the
    // token was already rotated or the session was revoked.
    let anchor = user
        .refresh_token
        .as_deref()
        .ok_or(AuthError::Unauthorized("invalid refresh token"))?;
    if !anchor_matches(&presented, anchor) {
        return Err(AuthError::TokenReuse);
    }

    let pair = issuer::issue_replacing(store.as_ref(), &config, &user, anchor).await?;

    session_response(user.public(), pair, &config)
}

#[utoipa::path(
    post,
    path = "/api/v1/users/logout",
    responses(
        (status = 200, description = "Anchor cleared, cookies expired", body = LogoutResponse),
        (status = 401, description = "Not authenticated", body = super::error::ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn logout(
    Extension(store): Extension<SharedStore>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Response, AuthError> {
    // Idempotent: clearing an already-empty anchor succeeds.
    store.clear_anchor(user.id).await?;

    let mut headers = HeaderMap::new();
    for name in [ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME] {
        headers.append(
            SET_COOKIE,
            clear_cookie(name).context("failed to build cookie header")?,
        );
    }

    Ok((
        StatusCode::OK,
        headers,
        Json(LogoutResponse {
            message: "logged out".to_string(),
        }),
    )
        .into_response())
}

/// Byte-for-byte anchor comparison, constant-time.
fn anchor_matches(presented: &str, stored: &str) -> bool {
    presented.as_bytes().ct_eq(stored.as_bytes()).into()
}

/// Assemble the login/rotation response: both cookies plus the JSON echo of
/// the pair, so browser and non-browser clients can each pick their channel.
fn session_response(
    user: PublicUser,
    pair: CredentialPair,
    config: &AuthConfig,
) -> Result<Response, AuthError> {
    let mut headers = HeaderMap::new();
    headers.append(
        SET_COOKIE,
        set_cookie(
            ACCESS_COOKIE_NAME,
            &pair.access_token,
            config.access().ttl_seconds(),
        )
        .context("failed to build cookie header")?,
    );
    headers.append(
        SET_COOKIE,
        set_cookie(
            REFRESH_COOKIE_NAME,
            &pair.refresh_token,
            config.refresh().ttl_seconds(),
        )
        .context("failed to build cookie header")?,
    );

    let body = SessionResponse {
        user,
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    };

    Ok((StatusCode::OK, headers, Json(body)).into_response())
}

fn set_cookie(name: &str, value: &str, max_age: i64) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{name}={value}; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age={max_age}"
    ))
}

fn clear_cookie(name: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{name}=; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age=0"
    ))
}
