//! User model for Teahouse.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use crate::datetime;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 64;

/// Maximum email length.
pub const MAX_EMAIL_LENGTH: usize = 120;

/// User entity representing a registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Login username (unique, case-insensitive).
    pub username: String,
    /// Email address (unique, case-insensitive).
    pub email: String,
    /// Password hash (Argon2 PHC string).
    pub password: String,
    /// Account creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for User {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let created_at: String = row.try_get("created_at")?;
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password: row.try_get("password")?,
            created_at: datetime::from_storage(&created_at)
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        })
    }
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login username.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Password hash (must already be hashed with Argon2).
    pub password: String,
}

impl NewUser {
    /// Create a new user record.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}
