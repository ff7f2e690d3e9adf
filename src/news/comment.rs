//! Comment repository.

use chrono::{DateTime, Utc};

use super::types::Comment;
use crate::db::DbPool;
use crate::{datetime, Result};

const SELECT_COMMENT: &str = "SELECT c.id, c.news_id, c.author_id, u.username AS author,
            c.body, c.created, c.last_edit
     FROM comments c JOIN users u ON u.id = c.author_id";

/// Repository for comments on news posts.
pub struct CommentRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> CommentRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Add a comment and return it.
    pub async fn create(&self, news_id: i64, author_id: i64, body: &str) -> Result<Comment> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO comments (news_id, author_id, body, created)
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(news_id)
        .bind(author_id)
        .bind(body)
        .bind(datetime::to_storage(&datetime::now()))
        .fetch_one(self.pool)
        .await?;

        let comment = sqlx::query_as::<_, Comment>(&format!("{SELECT_COMMENT} WHERE c.id = ?"))
            .bind(id)
            .fetch_one(self.pool)
            .await?;
        Ok(comment)
    }

    /// Get a comment by ID.
    pub async fn get(&self, id: i64) -> Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(&format!("{SELECT_COMMENT} WHERE c.id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(comment)
    }

    /// Comments on a post, oldest first.
    pub async fn list_for_news(&self, news_id: i64) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "{SELECT_COMMENT} WHERE c.news_id = ? ORDER BY c.created, c.id"
        ))
        .bind(news_id)
        .fetch_all(self.pool)
        .await?;

        Ok(comments)
    }

    /// Replace a comment's body. Returns `false` if it does not exist.
    pub async fn update_body(&self, id: i64, body: &str, edited: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query("UPDATE comments SET body = ?, last_edit = ? WHERE id = ?")
            .bind(body)
            .bind(datetime::to_storage(&edited))
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a comment. Returns `false` if it did not exist.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::news::repository::{NewsRecord, NewsRepository};
    use crate::Database;

    async fn setup() -> (Database, i64, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let (user, _) = UserRepository::new(db.pool())
            .create(&NewUser::new("alice", "a@x.com", "hash"))
            .await
            .unwrap();
        let news_id = NewsRepository::new(db.pool())
            .create(&NewsRecord {
                post_short: "2024-01-01-Hello",
                title: "Hello",
                media: None,
                author_id: user.id,
                created: datetime::now(),
                language_id: 1,
                body: "body",
                tags: &[],
            })
            .await
            .unwrap();
        (db, user.id, news_id)
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let (db, author, news_id) = setup().await;
        let repo = CommentRepository::new(db.pool());

        let first = repo.create(news_id, author, "first").await.unwrap();
        repo.create(news_id, author, "second").await.unwrap();

        assert_eq!(first.author, "alice");
        assert!(first.last_edit.is_none());

        let bodies: Vec<String> = repo
            .list_for_news(news_id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.body)
            .collect();
        assert_eq!(bodies, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (db, author, news_id) = setup().await;
        let repo = CommentRepository::new(db.pool());
        let comment = repo.create(news_id, author, "typo").await.unwrap();

        assert!(repo
            .update_body(comment.id, "fixed", datetime::now())
            .await
            .unwrap());
        let updated = repo.get(comment.id).await.unwrap().unwrap();
        assert_eq!(updated.body, "fixed");
        assert!(updated.last_edit.is_some());

        assert!(repo.delete(comment.id).await.unwrap());
        assert!(!repo.delete(comment.id).await.unwrap());
        assert!(repo.get(comment.id).await.unwrap().is_none());
        assert!(!repo
            .update_body(comment.id, "gone", datetime::now())
            .await
            .unwrap());
    }
}
