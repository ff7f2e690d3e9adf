//! Session records and their repository.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use super::DbPool;
use crate::{datetime, Result};

/// A login session.
///
/// Valid from `valid_after` (inclusive) up to `valid_before` (exclusive).
/// Without `valid_before` the session never expires ("remember me").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque UUID token handed to the client.
    pub token: String,
    /// Owning user.
    pub user_id: i64,
    /// Creation instant; the session is not valid before it.
    pub valid_after: DateTime<Utc>,
    /// Expiry instant, if any.
    pub valid_before: Option<DateTime<Utc>>,
}

impl Session {
    /// Check validity at the given instant.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_after <= now && self.valid_before.map_or(true, |before| now < before)
    }

    /// Whether the session was created with "remember me".
    pub fn is_persistent(&self) -> bool {
        self.valid_before.is_none()
    }
}

impl<'r> FromRow<'r, SqliteRow> for Session {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        let decode = |s: &str| {
            datetime::from_storage(s).map_err(|e| sqlx::Error::Decode(Box::new(e)))
        };

        let valid_after: String = row.try_get("valid_after")?;
        let valid_before: Option<String> = row.try_get("valid_before")?;

        Ok(Self {
            token: row.try_get("token")?,
            user_id: row.try_get("user_id")?,
            valid_after: decode(&valid_after)?,
            valid_before: valid_before.as_deref().map(decode).transpose()?,
        })
    }
}

/// Repository for session rows.
pub struct SessionRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> SessionRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Persist a new session.
    pub async fn create(&self, session: &Session) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (token, user_id, valid_after, valid_before) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(datetime::to_storage(&session.valid_after))
        .bind(session.valid_before.as_ref().map(datetime::to_storage))
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Point lookup by token.
    pub async fn get_by_token(&self, token: &str) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT token, user_id, valid_after, valid_before FROM sessions WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(session)
    }

    /// Delete one session. Returns `false` if it did not exist.
    pub async fn delete(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every session owned by a user in one statement.
    pub async fn delete_all_for_user(&self, user_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete sessions that expired at or before `now`.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM sessions WHERE valid_before IS NOT NULL AND valid_before <= ?",
        )
        .bind(datetime::to_storage(&now))
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Count sessions owned by a user.
    pub async fn count_for_user(&self, user_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }
}
