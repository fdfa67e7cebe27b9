//! Signed, expiring credential minting and verification.
//!
//! Two token classes share the same HS256 machinery but never a secret:
//! access tokens carry the identity claims handlers need, refresh tokens
//! carry only the subject. Verification always checks signature and expiry,
//! with zero leeway, and reports expiry distinctly from a bad signature.

use anyhow::{Context, Result};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, get_current_timestamp, Algorithm, DecodingKey, EncodingKey,
    Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use super::store::PublicUser;

/// Claims schema version; bump when claim shapes change so older tokens can
/// still be recognized during a migration window.
pub const CLAIMS_VERSION: u8 = 1;

/// Secret and TTL for one token class.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    secret: SecretString,
    ttl_seconds: i64,
}

impl TokenConfig {
    #[must_use]
    pub fn new(secret: SecretString, ttl_seconds: i64) -> Self {
        Self {
            secret,
            ttl_seconds,
        }
    }

    #[must_use]
    pub fn secret(&self) -> &SecretString {
        &self.secret
    }

    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }
}

/// Claims embedded in access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub iat: i64,
    pub exp: i64,
    pub ver: u8,
}

/// Claims embedded in refresh tokens: subject only, since refresh tokens are
/// compared by raw value against the anchor, never decoded for authorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
    pub ver: u8,
}

/// Verification failures, in decreasing order of trust.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token signature")]
    SignatureInvalid,
    #[error("malformed token")]
    Malformed,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::SignatureInvalid,
            _ => Self::Malformed,
        }
    }
}

/// Mint an access token carrying the user's public claims.
pub fn mint_access(user: &PublicUser, config: &TokenConfig) -> Result<String> {
    let (iat, exp) = lifetime(config.ttl_seconds());
    let claims = AccessClaims {
        sub: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        full_name: user.full_name.clone(),
        iat,
        exp,
        ver: CLAIMS_VERSION,
    };

    sign(&claims, config).context("failed to sign access token")
}

/// Mint a refresh token for the given subject.
pub fn mint_refresh(subject: Uuid, config: &TokenConfig) -> Result<String> {
    let (iat, exp) = lifetime(config.ttl_seconds());
    let claims = RefreshClaims {
        sub: subject,
        iat,
        exp,
        ver: CLAIMS_VERSION,
    };

    sign(&claims, config).context("failed to sign refresh token")
}

/// Verify an access token's signature and expiry and return its claims.
pub fn verify_access(token: &str, config: &TokenConfig) -> Result<AccessClaims, TokenError> {
    verify(token, config)
}

/// Verify a refresh token's signature and expiry and return its claims.
pub fn verify_refresh(token: &str, config: &TokenConfig) -> Result<RefreshClaims, TokenError> {
    verify(token, config)
}

fn lifetime(ttl_seconds: i64) -> (i64, i64) {
    // u64 -> i64 is safe until the year 292 billion or so.
    #[allow(clippy::cast_possible_wrap)]
    let now = get_current_timestamp() as i64;
    (now, now + ttl_seconds)
}

fn sign<T: Serialize>(claims: &T, config: &TokenConfig) -> jsonwebtoken::errors::Result<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(config.secret().expose_secret().as_bytes()),
    )
}

fn verify<T: DeserializeOwned>(token: &str, config: &TokenConfig) -> Result<T, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Expiry is exact; a token is either live or expired, no grace window.
    validation.leeway = 0;

    decode::<T>(
        token,
        &DecodingKey::from_secret(config.secret().expose_secret().as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(TokenError::from)
}
