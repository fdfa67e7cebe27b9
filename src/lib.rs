//! # VidGate (Authentication & Session Core)
//!
//! `vidgate` is the authentication and session management service for the
//! VidGate video platform. It issues, verifies, and rotates a paired
//! short-lived access token and long-lived refresh token, backed by a
//! persisted per-user revocation anchor.
//!
//! ## Credential Model
//!
//! - **Access token:** short TTL (minutes), stateless, carries identity
//!   claims, verified on every request by the access gate.
//! - **Refresh token:** long TTL (days), minimal claims, single persisted
//!   copy per user (the *revocation anchor*). Presented tokens must match
//!   the anchor byte-for-byte in addition to passing signature and expiry
//!   checks; a cryptographically valid token that no longer matches the
//!   anchor is treated as reuse and rejected.
//!
//! Access and refresh tokens are signed with independent secrets so that
//! compromise of one class does not compromise the other. Rotation replaces
//! the anchor with a conditional update, so two rotations racing on the same
//! anchor cannot both succeed.
//!
//! ## Single-Session Model
//!
//! The anchor is a scalar: issuing a new refresh token invalidates the prior
//! one, which makes sessions single-device. Multi-session support would
//! replace the scalar with a set of independently revocable token ids.

pub mod api;
pub mod cli;
