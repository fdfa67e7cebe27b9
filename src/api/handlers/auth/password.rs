//! One-way password hashing with Argon2id.
//!
//! Hashing is deliberately CPU-bound; it runs only when a password is being
//! set or changed, never on anchor writes or other profile updates.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordVerifier, SaltString},
    Argon2, PasswordHasher,
};

/// Hash a plaintext password into a salted PHC-encoded string.
///
/// # Errors
/// Fails only on internal randomness or hasher failure, never on the
/// password's content.
pub fn hash_password(plain: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("password hashing failed: {err}"))
}

/// Verify a plaintext password against a stored PHC string.
///
/// Returns `Ok(false)` on mismatch; errors only when the stored hash itself
/// is malformed, which indicates store corruption rather than a bad caller.
pub fn verify_password(plain: &str, stored: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|err| anyhow!("malformed password hash: {err}"))?;

    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}
