//! Auth configuration shared across handlers.

use anyhow::{bail, Result};
use secrecy::ExposeSecret;

use super::token::TokenConfig;

/// Signing configuration for both token classes.
///
/// Access and refresh tokens use independent secrets and TTLs so compromise
/// of one class does not compromise the other.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    access: TokenConfig,
    refresh: TokenConfig,
}

impl AuthConfig {
    /// # Errors
    /// Fails if both token classes share a signing secret.
    pub fn new(access: TokenConfig, refresh: TokenConfig) -> Result<Self> {
        if access.secret().expose_secret() == refresh.secret().expose_secret() {
            bail!("access and refresh token secrets must differ");
        }

        Ok(Self { access, refresh })
    }

    #[must_use]
    pub fn access(&self) -> &TokenConfig {
        &self.access
    }

    #[must_use]
    pub fn refresh(&self) -> &TokenConfig {
        &self.refresh
    }
}
