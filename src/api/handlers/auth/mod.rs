//! Credential lifecycle: issuance, verification, rotation, and revocation.
//!
//! The service hands every logged-in user a pair of signed tokens:
//!
//! - an **access token** (short TTL, full identity claims) checked by the
//!   [`middleware`] gate on protected routes, and
//! - a **refresh token** (long TTL, subject-only claims) whose raw value is
//!   persisted on the user row as the *revocation anchor*.
//!
//! Rotation ([`session::refresh`]) requires both cryptographic validity and a
//! byte-for-byte match against the anchor, then swaps the anchor with a
//! conditional update. A token that verifies but no longer matches the anchor
//! has already been rotated; presenting it is treated as reuse and rejected.
//! Logout clears the anchor, ending the session server-side.

pub(crate) mod error;
pub(crate) mod issuer;
pub(crate) mod middleware;
pub(crate) mod password;
pub(crate) mod register;
pub(crate) mod session;
mod state;
pub(crate) mod store;
pub(crate) mod token;
pub(crate) mod types;
mod utils;

pub use error::AuthError;
pub use middleware::CurrentUser;
pub use state::AuthConfig;
pub use store::{IdentityStore, PgIdentityStore, SharedStore};
pub use token::TokenConfig;

#[cfg(test)]
mod tests;
