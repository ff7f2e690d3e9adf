//! Request DTOs for Web API.
//!
//! Mutating requests may also carry a `session_id` field. It is consumed by
//! the authorization middleware and ignored here.

use serde::Deserialize;
use validator::Validate;

use crate::auth::PermissionChanges;
use crate::news::DEFAULT_LANGUAGE;

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

/// User registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        email(message = "invalid email format"),
        length(max = 120, message = "email must be at most 120 characters")
    )]
    pub email: String,
    #[validate(length(min = 1, max = 64, message = "username must be 1 to 64 characters"))]
    pub username: String,
    #[validate(length(min = 1, max = 128, message = "password must be 1 to 128 characters"))]
    pub password: String,
}

/// Login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    /// Issue a session without expiry.
    #[serde(default)]
    pub remember_me: bool,
}

/// Password change request for the caller's own account.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "current password is required"))]
    pub old_password: String,
    #[validate(length(min = 1, max = 128, message = "new password must be 1 to 128 characters"))]
    pub new_password: String,
}

/// Permission update request.
#[derive(Debug, Deserialize)]
pub struct SetPermissionsRequest {
    /// Flags to change; absent flags keep their value.
    pub permissions: PermissionChanges,
}

/// Query string carrying a session token.
#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    pub session_id: Option<String>,
}

/// Query string of localized news reads.
#[derive(Debug, Default, Deserialize)]
pub struct LanguageQuery {
    pub language: Option<String>,
}

/// New news post.
#[derive(Debug, Deserialize, Validate)]
pub struct PostNewsRequest {
    #[validate(length(min = 1, max = 1000, message = "title must be 1 to 1000 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "body is required"))]
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[validate(length(max = 1024, message = "media URL must be at most 1024 characters"))]
    pub media: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

/// Replacement content for a news post.
#[derive(Debug, Deserialize, Validate)]
pub struct EditNewsRequest {
    #[validate(length(min = 1, max = 1000, message = "title must be 1 to 1000 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "body is required"))]
    pub body: String,
    #[validate(length(max = 1024, message = "media URL must be at most 1024 characters"))]
    pub media: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

/// Translation of a news post.
#[derive(Debug, Deserialize, Validate)]
pub struct TranslateRequest {
    #[validate(length(min = 1, message = "language is required"))]
    pub language: String,
    #[validate(length(min = 1, max = 1000, message = "title must be 1 to 1000 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "body is required"))]
    pub body: String,
}

/// New or edited comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1, max = 10000, message = "comment must be 1 to 10000 characters"))]
    pub body: String,
}

/// New language.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLanguageRequest {
    #[validate(length(min = 1, max = 16, message = "code must be 1 to 16 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 64, message = "name must be 1 to 64 characters"))]
    pub name: String,
}
