//! Request/response types for the user endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::store::PublicUser;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Body returned on login and rotation: the sanitized user plus both token
/// values, mirroring the cookies set on the same response.
#[derive(ToSchema, Serialize, Debug)]
pub struct SessionResponse {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct LogoutResponse {
    pub message: String,
}
