//! Typed error taxonomy for the auth endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use super::store::StoreError;
use super::token::TokenError;

/// Error body returned by every failing auth endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Failure modes of the credential lifecycle.
///
/// Every failure path halts the request with one of these; nothing is
/// swallowed, and no partial token pair or identity data leaves the service
/// on an error.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing or malformed input fields.
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid, or expired credential, or an unresolvable subject.
    #[error("{0}")]
    Unauthorized(&'static str),

    /// A cryptographically valid refresh token that no longer matches the
    /// revocation anchor: it was already rotated or the session was revoked.
    #[error("refresh token already used")]
    TokenReuse,

    /// Duplicate identity at creation.
    #[error("user with this username or email already exists")]
    Conflict,

    /// Hashing, signing, or store failure not attributable to the caller.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::TokenReuse => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::TokenReuse => "TOKEN_REUSE",
            Self::Conflict => "CONFLICT",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // Internal details are logged, never serialized to the caller.
        let message = match &self {
            Self::Internal(err) => {
                error!("internal error: {err:?}");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.code().to_string(),
                message,
            },
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        // Expired stays distinct from a bad signature so clients can prompt
        // re-login instead of treating the token as forged.
        match err {
            TokenError::Expired => Self::Unauthorized("token expired"),
            TokenError::SignatureInvalid => Self::Unauthorized("invalid token signature"),
            TokenError::Malformed => Self::Unauthorized("malformed token"),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => Self::Conflict,
            StoreError::Backend(err) => Self::Internal(err),
        }
    }
}
