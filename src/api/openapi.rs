use crate::api::handlers::{auth, health};
use utoipa::OpenApi;

/// `OpenAPI` document for the VidGate API.
///
/// Served by the swagger UI mounted at `/docs`; add new endpoints here so
/// they show up in the generated spec.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "vidgate",
        description = "Authentication and session management for the VidGate video platform"
    ),
    paths(
        health::health,
        auth::register::register,
        auth::session::login,
        auth::session::refresh,
        auth::session::logout,
    ),
    components(schemas(
        auth::types::RegisterRequest,
        auth::types::LoginRequest,
        auth::types::RefreshRequest,
        auth::types::SessionResponse,
        auth::types::LogoutResponse,
        auth::error::ErrorResponse,
        auth::error::ErrorDetail,
        auth::store::PublicUser,
    )),
    tags(
        (name = "users", description = "Registration, login, and session rotation"),
        (name = "health", description = "Service health and build metadata")
    )
)]
pub struct ApiDoc;
