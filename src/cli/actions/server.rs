use crate::api;
use crate::api::handlers::auth::{AuthConfig, TokenConfig};
use crate::cli::actions::Action;
use anyhow::Result;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            access_secret,
            access_ttl_seconds,
            refresh_secret,
            refresh_ttl_seconds,
        } => {
            let auth_config = AuthConfig::new(
                TokenConfig::new(access_secret, access_ttl_seconds),
                TokenConfig::new(refresh_secret, refresh_ttl_seconds),
            )?;

            api::new(port, dsn, auth_config).await?;
        }
    }

    Ok(())
}
