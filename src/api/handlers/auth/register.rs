//! User registration.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use tracing::{debug, instrument};

use super::error::AuthError;
use super::password;
use super::store::{NewUser, SharedStore};
use super::types::RegisterRequest;
use super::utils::{normalize_email, normalize_username, valid_email};

#[utoipa::path(
    post,
    path = "/api/v1/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = super::store::PublicUser),
        (status = 400, description = "Missing or malformed fields", body = super::error::ErrorResponse),
        (status = 409, description = "Username or email already taken", body = super::error::ErrorResponse),
    ),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn register(
    Extension(store): Extension<SharedStore>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::Validation("missing payload".to_string()));
    };

    let username = normalize_username(&request.username);
    let email = normalize_email(&request.email);
    let full_name = request.full_name.trim().to_string();

    if username.is_empty()
        || email.is_empty()
        || full_name.is_empty()
        || request.password.trim().is_empty()
    {
        return Err(AuthError::Validation("all fields are required".to_string()));
    }
    if !valid_email(&email) {
        return Err(AuthError::Validation("invalid email".to_string()));
    }

    let password_hash = password::hash_password(&request.password)?;

    // Duplicates surface as a unique violation from the store rather than a
    // separate lookup, so concurrent registrations cannot both pass a check.
    let user = store
        .create(NewUser {
            username,
            email,
            full_name,
            password_hash,
        })
        .await?;

    debug!("registered user {}", user.id);

    Ok((StatusCode::CREATED, Json(user.public())))
}
