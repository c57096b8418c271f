//! Password hashing and verification.
//!
//! Digests use Argon2id with a per-password random salt, stored in PHC
//! string format. Verification re-reads the parameters from the stored
//! digest, so tuning changes only affect digests written afterwards.

use anyhow::{anyhow, Result};
use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;

/// Hashes a clear-text password into a PHC digest string.
///
/// # Errors
/// Returns an error if hashing fails.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let digest = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| anyhow!("failed to hash password"))?
        .to_string();
    Ok(digest)
}

/// Verifies a clear-text password against a stored digest in constant time.
/// An unparseable digest verifies as false rather than erroring.
#[must_use]
pub fn verify_password(password: &str, digest: &str) -> bool {
    PasswordHash::new(digest)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
