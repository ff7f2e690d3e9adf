//! Input validation for account registration.

use thiserror::Error;
use validator::ValidateEmail;

use crate::db::{MAX_EMAIL_LENGTH, MAX_USERNAME_LENGTH};
use crate::TeahouseError;

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Username is empty.
    #[error("username cannot be empty")]
    UsernameEmpty,

    /// Username is too long.
    #[error("username must be at most {MAX_USERNAME_LENGTH} characters")]
    UsernameTooLong,

    /// Username contains invalid characters.
    #[error("username can only contain letters, digits, '_', '-' and '.'")]
    UsernameInvalidChars,

    /// Email is too long.
    #[error("email must be at most {MAX_EMAIL_LENGTH} characters")]
    EmailTooLong,

    /// Email format is invalid.
    #[error("invalid email format")]
    EmailInvalidFormat,
}

impl From<ValidationError> for TeahouseError {
    fn from(e: ValidationError) -> Self {
        TeahouseError::Validation(e.to_string())
    }
}

/// Validate a username.
///
/// # Examples
///
/// ```
/// use teahouse::auth::validation::validate_username;
///
/// assert!(validate_username("alice").is_ok());
/// assert!(validate_username("").is_err());
/// assert!(validate_username("no spaces").is_err());
/// ```
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::UsernameEmpty);
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::UsernameTooLong);
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(ValidationError::UsernameInvalidChars);
    }
    Ok(())
}

/// Validate an email address.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.chars().count() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::EmailTooLong);
    }
    if !email.validate_email() {
        return Err(ValidationError::EmailInvalidFormat);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_usernames() {
        for name in ["alice", "Bob_2", "x", "first.last", "a-b"] {
            assert!(validate_username(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_invalid_usernames() {
        assert_eq!(validate_username(""), Err(ValidationError::UsernameEmpty));
        assert_eq!(
            validate_username(&"a".repeat(MAX_USERNAME_LENGTH + 1)),
            Err(ValidationError::UsernameTooLong)
        );
        assert_eq!(
            validate_username("al ice"),
            Err(ValidationError::UsernameInvalidChars)
        );
        assert_eq!(
            validate_username("alice/admin"),
            Err(ValidationError::UsernameInvalidChars)
        );
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@x.com").is_ok());
        assert_eq!(
            validate_email("not-an-email"),
            Err(ValidationError::EmailInvalidFormat)
        );
        let long = format!("{}@x.com", "a".repeat(MAX_EMAIL_LENGTH));
        assert_eq!(validate_email(&long), Err(ValidationError::EmailTooLong));
    }

    #[test]
    fn test_conversion_to_crate_error() {
        let err: TeahouseError = ValidationError::UsernameEmpty.into();
        assert!(matches!(err, TeahouseError::Validation(_)));
    }
}
