//! Permission records for Teahouse.
//!
//! Each user owns exactly one row of capability flags. `master` is only ever
//! written by [`PermissionsRepository::set_master`], a direct administrative
//! action; the regular update path leaves it untouched.

use serde::Serialize;

use super::DbPool;
use crate::Result;

/// Capability flags owned by one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Permissions {
    pub master: bool,
    pub admin: bool,
    pub team: bool,
    pub wiki: bool,
    pub news: bool,
    pub translate: bool,
    pub comment: bool,
}

impl Default for Permissions {
    /// New accounts may comment and nothing else.
    fn default() -> Self {
        Self {
            master: false,
            admin: false,
            team: false,
            wiki: false,
            news: false,
            translate: false,
            comment: true,
        }
    }
}

/// Flag writes for one permission row. `None` leaves the stored value as is.
///
/// `master` is deliberately absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissionsUpdate {
    pub admin: Option<bool>,
    pub team: Option<bool>,
    pub wiki: Option<bool>,
    pub news: Option<bool>,
    pub translate: Option<bool>,
    pub comment: Option<bool>,
}

/// Repository for permission rows.
pub struct PermissionsRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> PermissionsRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Get the permissions owned by a user.
    pub async fn get_for_user(&self, user_id: i64) -> Result<Option<Permissions>> {
        let permissions = sqlx::query_as::<_, Permissions>(
            "SELECT master, admin, team, wiki, news, translate, comment
             FROM permissions WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(permissions)
    }

    /// Write the requested flags in one statement.
    ///
    /// Flags left as `None` keep their stored value, so concurrent updates of
    /// different flags do not undo each other. The row is only touched while
    /// the owner is not a master, so a target promoted concurrently is never
    /// modified. Returns `false` when no row was updated.
    pub async fn update_unless_master(
        &self,
        user_id: i64,
        update: &PermissionsUpdate,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE permissions
             SET admin = COALESCE(?, admin),
                 team = COALESCE(?, team),
                 wiki = COALESCE(?, wiki),
                 news = COALESCE(?, news),
                 translate = COALESCE(?, translate),
                 comment = COALESCE(?, comment)
             WHERE user_id = ? AND master = 0",
        )
        .bind(update.admin)
        .bind(update.team)
        .bind(update.wiki)
        .bind(update.news)
        .bind(update.translate)
        .bind(update.comment)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set or clear the master flag directly.
    pub async fn set_master(&self, user_id: i64, master: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE permissions SET master = ? WHERE user_id = ?")
            .bind(master)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
