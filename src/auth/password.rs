//! Password hashing and validation for Teahouse.
//!
//! Uses Argon2id with the crate's default parameters.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::OnceLock;

use rand_core::OsRng;
use thiserror::Error;

use crate::TeahouseError;

/// Maximum password length.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Password-related errors.
#[derive(Error, Debug)]
pub enum PasswordError {
    /// Password is empty.
    #[error("password must not be empty")]
    Empty,

    /// Password is too long.
    #[error("password must be at most {MAX_PASSWORD_LENGTH} characters")]
    TooLong,

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    HashError(String),

    /// Stored hash is not a PHC string.
    #[error("invalid password hash format")]
    InvalidHash,

    /// Wrong password.
    #[error("password verification failed")]
    VerificationFailed,
}

impl From<PasswordError> for TeahouseError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::Empty | PasswordError::TooLong => TeahouseError::Validation(e.to_string()),
            PasswordError::VerificationFailed => TeahouseError::InvalidCredentials,
            PasswordError::HashError(_) | PasswordError::InvalidHash => {
                TeahouseError::Storage(e.to_string())
            }
        }
    }
}

/// Hash a password using Argon2id.
///
/// Returns a PHC-formatted hash string that includes the salt and parameters.
///
/// # Examples
///
/// ```
/// use teahouse::auth::hash_password;
///
/// let hash = hash_password("my_secure_password").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    validate_password(password)?;

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verify a password against a stored hash.
///
/// The parameters are taken from the parsed hash, so hashes written with
/// other settings still verify.
pub fn verify_password(password: &str, hash: &str) -> Result<(), PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHash)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| PasswordError::VerificationFailed)
}

/// Hash checked when the account does not exist, so a failed login costs the
/// same whether or not the username is known.
fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("teahouse-dummy-password").ok())
        .as_deref()
}

/// Verify a password against a stored hash, or against a throwaway hash when
/// there is none.
///
/// A missing hash always fails with [`PasswordError::VerificationFailed`],
/// after the same Argon2 work a real mismatch takes.
pub fn verify_password_or_dummy(password: &str, hash: Option<&str>) -> Result<(), PasswordError> {
    match hash {
        Some(hash) => verify_password(password, hash),
        None => {
            if let Some(dummy) = dummy_hash() {
                let _ = verify_password(password, dummy);
            }
            Err(PasswordError::VerificationFailed)
        }
    }
}

/// Validate password requirements: non-empty, at most 128 characters.
pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::Empty);
    }
    if password.chars().count() > MAX_PASSWORD_LENGTH {
        return Err(PasswordError::TooLong);
    }
    Ok(())
}
