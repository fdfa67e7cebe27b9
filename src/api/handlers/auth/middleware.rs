//! Access-token gate for protected routes.
//!
//! Extracts an access token from the `accessToken` cookie (preferred) or an
//! `Authorization: Bearer` header, verifies it, resolves the subject to an
//! existing user, and attaches the sanitized record to the request. Any
//! failure halts the chain with 401 before a downstream handler runs. The
//! gate is read-only; it has no side effects.

use axum::{
    extract::{Extension, Request},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::error::AuthError;
use super::state::AuthConfig;
use super::store::{PublicUser, SharedStore};
use super::token;
use super::utils::{bearer_token, cookie_value};

pub(crate) const ACCESS_COOKIE_NAME: &str = "accessToken";

/// The authenticated identity, attached to the request by the gate and
/// consumed by downstream handlers via `Extension<CurrentUser>`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub PublicUser);

pub async fn require_access_token(
    Extension(config): Extension<Arc<AuthConfig>>,
    Extension(store): Extension<SharedStore>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_access_token(request.headers()) else {
        return AuthError::Unauthorized("missing access token").into_response();
    };

    let claims = match token::verify_access(&token, config.access()) {
        Ok(claims) => claims,
        Err(err) => return AuthError::from(err).into_response(),
    };

    // A verified signature is not enough: the subject must still resolve to
    // an existing user.
    let user = match store.find_by_id(claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => return AuthError::Unauthorized("invalid access token").into_response(),
        Err(err) => return AuthError::from(err).into_response(),
    };

    request.extensions_mut().insert(CurrentUser(user.public()));

    next.run(request).await
}

fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    // Cookie wins over the Authorization header.
    cookie_value(headers, ACCESS_COOKIE_NAME).or_else(|| bearer_token(headers))
}
