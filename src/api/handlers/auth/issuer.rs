//! Credential issuance: mint a pair, persist the refresh anchor.

use super::error::AuthError;
use super::state::AuthConfig;
use super::store::{IdentityStore, UserRecord};
use super::token;
use serde::Serialize;
use utoipa::ToSchema;

/// An access/refresh pair, always produced together.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Mint a fresh pair and persist the refresh token as the user's anchor,
/// unconditionally overwriting any prior session (login path).
///
/// Issuance is all-or-nothing: if the anchor write fails after minting, the
/// whole operation fails and neither token is returned.
pub async fn issue(
    store: &dyn IdentityStore,
    config: &AuthConfig,
    user: &UserRecord,
) -> Result<CredentialPair, AuthError> {
    let access_token = token::mint_access(&user.public(), config.access())?;
    let refresh_token = token::mint_refresh(user.id, config.refresh())?;

    store.update_anchor(user.id, &refresh_token).await?;

    Ok(CredentialPair {
        access_token,
        refresh_token,
    })
}

/// Mint a fresh pair and swap it for the expected prior anchor (rotation
/// path). Losing the swap means another rotation or a logout got there
/// first; the presented token is then stale and the rotation fails as
/// reuse.
pub async fn issue_replacing(
    store: &dyn IdentityStore,
    config: &AuthConfig,
    user: &UserRecord,
    prior_anchor: &str,
) -> Result<CredentialPair, AuthError> {
    let access_token = token::mint_access(&user.public(), config.access())?;
    let refresh_token = token::mint_refresh(user.id, config.refresh())?;

    if !store
        .swap_anchor(user.id, prior_anchor, &refresh_token)
        .await?
    {
        return Err(AuthError::TokenReuse);
    }

    Ok(CredentialPair {
        access_token,
        refresh_token,
    })
}
