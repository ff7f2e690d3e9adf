//! User repository for Teahouse.
//!
//! This module provides CRUD operations for users in the database.

use super::permission::Permissions;
use super::user::{NewUser, User};
use super::{map_unique_violation, DbPool};
use crate::{datetime, Result, TeahouseError};

/// Repository for user CRUD operations.
pub struct UserRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new user together with its default permission row.
    ///
    /// Both inserts share one transaction, so a user never exists without
    /// permissions. Duplicate usernames or emails yield
    /// [`TeahouseError::Conflict`].
    pub async fn create(&self, new_user: &NewUser) -> Result<(User, Permissions)> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (username, email, password, created_at)
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password)
        .bind(datetime::to_storage(&datetime::now()))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            map_unique_violation(e, |msg| {
                if msg.contains("users.email") {
                    "email already registered".to_string()
                } else {
                    "username already taken".to_string()
                }
            })
        })?;

        let defaults = Permissions::default();
        sqlx::query(
            "INSERT INTO permissions (user_id, master, admin, team, wiki, news, translate, comment)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(defaults.master)
        .bind(defaults.admin)
        .bind(defaults.team)
        .bind(defaults.wiki)
        .bind(defaults.news)
        .bind(defaults.translate)
        .bind(defaults.comment)
        .execute(&mut *tx)
        .await?;

        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((user, defaults))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let result = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(result)
    }

    /// Get a user by username (case-insensitive).
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let result = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(result)
    }

    /// Replace a user's password hash.
    pub async fn update_password(&self, id: i64, password_hash: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET password = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(TeahouseError::NotFound("user".to_string()));
        }
        Ok(())
    }

    /// Count all users.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::PermissionsRepository;
    use crate::Database;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_create_user() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let (user, permissions) = repo
            .create(&NewUser::new("alice", "a@x.com", "hashedpw"))
            .await
            .unwrap();

        assert_eq!(user.id, 1);
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.password, "hashedpw");
        assert_eq!(permissions, Permissions::default());
    }

    #[tokio::test]
    async fn test_create_user_creates_permission_row() {
        let db = setup_db().await;
        let (user, _) = UserRepository::new(db.pool())
            .create(&NewUser::new("alice", "a@x.com", "hashedpw"))
            .await
            .unwrap();

        let stored = PermissionsRepository::new(db.pool())
            .get_for_user(user.id)
            .await
            .unwrap();
        assert_eq!(stored, Some(Permissions::default()));
    }

    #[tokio::test]
    async fn test_create_duplicate_username() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        repo.create(&NewUser::new("alice", "a@x.com", "pw"))
            .await
            .unwrap();
        let result = repo.create(&NewUser::new("ALICE", "b@x.com", "pw")).await;

        match result {
            Err(TeahouseError::Conflict(msg)) => assert_eq!(msg, "username already taken"),
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_duplicate_email() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        repo.create(&NewUser::new("alice", "a@x.com", "pw"))
            .await
            .unwrap();
        let result = repo.create(&NewUser::new("bob", "A@X.com", "pw")).await;

        match result {
            Err(TeahouseError::Conflict(msg)) => assert_eq!(msg, "email already registered"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_by_username_case_insensitive() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());
        repo.create(&NewUser::new("Alice", "a@x.com", "pw"))
            .await
            .unwrap();

        let user = repo.get_by_username("alice").await.unwrap().unwrap();
        assert_eq!(user.username, "Alice");
        assert!(repo.get_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());
        let (created, _) = repo
            .create(&NewUser::new("alice", "a@x.com", "pw"))
            .await
            .unwrap();

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(repo.get_by_id(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_password() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());
        let (user, _) = repo
            .create(&NewUser::new("alice", "a@x.com", "old"))
            .await
            .unwrap();

        repo.update_password(user.id, "new").await.unwrap();
        let fetched = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.password, "new");
    }

    #[tokio::test]
    async fn test_update_password_unknown_user() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let result = repo.update_password(7, "new").await;
        assert!(matches!(result, Err(TeahouseError::NotFound(_))));
    }
}
