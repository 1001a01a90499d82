//! Password strength policy and Argon2id hashing.
//!
//! Secrets are persisted as PHC strings (`$argon2id$v=19$...`), which carry
//! their own salt and parameters.

use crate::error::{CoreError, CoreResult, ValidationError};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use subtle::ConstantTimeEq;

/// Minimum number of characters in a password.
pub const MIN_LENGTH: usize = 8;

/// Checks a plaintext password against the strength policy.
///
/// A password needs at least [`MIN_LENGTH`] characters and at least one
/// uppercase letter, lowercase letter, digit and ASCII punctuation mark.
///
/// # Errors
///
/// Returns a `ValidationError` on `field` naming the first unmet requirement.
pub fn check_strength(field: &str, password: &str) -> Result<(), ValidationError> {
    let requirements: [(&str, bool); 5] = [
        (
            "must be at least 8 characters long",
            password.chars().count() >= MIN_LENGTH,
        ),
        (
            "must contain an uppercase letter",
            password.chars().any(char::is_uppercase),
        ),
        (
            "must contain a lowercase letter",
            password.chars().any(char::is_lowercase),
        ),
        (
            "must contain a digit",
            password.chars().any(|c| c.is_ascii_digit()),
        ),
        (
            "must contain a special character",
            password.chars().any(|c| c.is_ascii_punctuation()),
        ),
    ];

    match requirements.iter().find(|(_, met)| !met) {
        Some((reason, _)) => Err(ValidationError::new(field, *reason)),
        None => Ok(()),
    }
}

/// Checks a caller-supplied replacement for the stored secret.
///
/// The new password must be strong and must not match `stored`, whether
/// `stored` is a hash or a legacy plaintext value.
///
/// # Errors
///
/// Returns a `ValidationError` on `field`.
pub fn check_replacement(
    field: &str,
    password: &str,
    stored: Option<&str>,
) -> Result<(), ValidationError> {
    check_strength(field, password)?;
    let reused = stored.is_some_and(|stored| {
        bool::from(stored.as_bytes().ct_eq(password.as_bytes())) || verify(password, stored)
    });
    if reused {
        return Err(ValidationError::new(
            field,
            "must differ from the current password",
        ));
    }
    Ok(())
}

/// Hashes `password` with Argon2id and a fresh random salt.
///
/// # Errors
///
/// `PasswordHash` when the hasher rejects the input.
pub fn hash(password: &str) -> CoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CoreError::PasswordHash(e.to_string()))
}

/// Whether `value` is a parseable PHC hash string.
#[must_use]
pub fn is_hashed(value: &str) -> bool {
    PasswordHash::new(value).is_ok()
}

/// Whether `password` hashes to `stored`.
#[must_use]
pub fn verify(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
