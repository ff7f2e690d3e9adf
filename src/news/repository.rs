//! News post repository: posts, localized titles and bodies, tags.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};

use super::types::NewsPost;
use crate::db::{map_unique_violation, DbPool};
use crate::{datetime, Result};

const SELECT_NEWS: &str = "SELECT n.id, n.post_short, n.title, n.media, n.author_id,
            u.username AS author, n.created, n.last_edit
     FROM news n JOIN users u ON u.id = n.author_id";

/// Row data for a new post.
#[derive(Debug, Clone)]
pub struct NewsRecord<'s> {
    pub post_short: &'s str,
    pub title: &'s str,
    pub media: Option<&'s str>,
    pub author_id: i64,
    pub created: DateTime<Utc>,
    pub language_id: i64,
    pub body: &'s str,
    pub tags: &'s [String],
}

/// Repository for news posts.
pub struct NewsRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> NewsRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a post with its first title, body and tags in one transaction.
    ///
    /// Unknown tags are created on demand.
    pub async fn create(&self, record: &NewsRecord<'_>) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let news_id: i64 = sqlx::query_scalar(
            "INSERT INTO news (post_short, title, media, author_id, created)
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(record.post_short)
        .bind(record.title)
        .bind(record.media)
        .bind(record.author_id)
        .bind(datetime::to_storage(&record.created))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, |_| "a post with this title already exists".into()))?;

        upsert_title(&mut tx, news_id, record.language_id, record.title).await?;
        upsert_body(&mut tx, news_id, record.language_id, record.body).await?;

        for name in record.tags {
            let tag_id = get_or_create_tag(&mut tx, name).await?;
            sqlx::query("INSERT OR IGNORE INTO news_tags (news_id, tag_id) VALUES (?, ?)")
                .bind(news_id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(news_id)
    }

    /// Look up a post by its public identifier.
    pub async fn get_by_short(&self, post_short: &str) -> Result<Option<NewsPost>> {
        let post = sqlx::query_as::<_, NewsPost>(&format!("{SELECT_NEWS} WHERE n.post_short = ?"))
            .bind(post_short)
            .fetch_optional(self.pool)
            .await?;

        Ok(post)
    }

    /// All posts, newest first.
    pub async fn list(&self) -> Result<Vec<NewsPost>> {
        let posts =
            sqlx::query_as::<_, NewsPost>(&format!("{SELECT_NEWS} ORDER BY n.created DESC, n.id DESC"))
                .fetch_all(self.pool)
                .await?;

        Ok(posts)
    }

    /// Posts carrying `tag_id`, newest first.
    pub async fn list_tagged(&self, tag_id: i64) -> Result<Vec<NewsPost>> {
        let posts = sqlx::query_as::<_, NewsPost>(&format!(
            "{SELECT_NEWS} JOIN news_tags nt ON nt.news_id = n.id
             WHERE nt.tag_id = ? ORDER BY n.created DESC, n.id DESC"
        ))
        .bind(tag_id)
        .fetch_all(self.pool)
        .await?;

        Ok(posts)
    }

    /// Id of a tag by name.
    pub async fn tag_id(&self, name: &str) -> Result<Option<i64>> {
        let id = sqlx::query_scalar("SELECT id FROM tags WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool)
            .await?;

        Ok(id)
    }

    /// Tag names of a post, alphabetically.
    pub async fn tags(&self, news_id: i64) -> Result<Vec<String>> {
        let tags = sqlx::query_scalar(
            "SELECT t.name FROM tags t JOIN news_tags nt ON nt.tag_id = t.id
             WHERE nt.news_id = ? ORDER BY t.name",
        )
        .bind(news_id)
        .fetch_all(self.pool)
        .await?;

        Ok(tags)
    }

    /// Localized title of a post.
    pub async fn title(&self, news_id: i64, language_id: i64) -> Result<Option<String>> {
        let title = sqlx::query_scalar(
            "SELECT title FROM news_titles WHERE news_id = ? AND language_id = ?",
        )
        .bind(news_id)
        .bind(language_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(title)
    }

    /// Body of a post in one language.
    pub async fn body(&self, news_id: i64, language_id: i64) -> Result<Option<String>> {
        let body = sqlx::query_scalar(
            "SELECT body FROM news_bodies WHERE news_id = ? AND language_id = ?",
        )
        .bind(news_id)
        .bind(language_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(body)
    }

    /// Number of comments on a post.
    pub async fn comment_count(&self, news_id: i64) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE news_id = ?")
            .bind(news_id)
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }

    /// Replace the canonical title, media and the content in one language.
    pub async fn update(
        &self,
        news_id: i64,
        language_id: i64,
        title: &str,
        body: &str,
        media: Option<&str>,
        edited: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE news SET title = ?, media = ?, last_edit = ? WHERE id = ?")
            .bind(title)
            .bind(media)
            .bind(datetime::to_storage(&edited))
            .bind(news_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                map_unique_violation(e, |_| "a post with this title already exists".into())
            })?;
        upsert_title(&mut tx, news_id, language_id, title).await?;
        upsert_body(&mut tx, news_id, language_id, body).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Store a translation. Returns `true` if the title translation is new.
    pub async fn translate(
        &self,
        news_id: i64,
        language_id: i64,
        title: &str,
        body: &str,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let existed: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM news_titles WHERE news_id = ? AND language_id = ?)",
        )
        .bind(news_id)
        .bind(language_id)
        .fetch_one(&mut *tx)
        .await?;
        upsert_title(&mut tx, news_id, language_id, title).await?;
        upsert_body(&mut tx, news_id, language_id, body).await?;

        tx.commit().await?;
        Ok(!existed)
    }
}

async fn upsert_title(
    tx: &mut Transaction<'_, Sqlite>,
    news_id: i64,
    language_id: i64,
    title: &str,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO news_titles (news_id, language_id, title) VALUES (?, ?, ?)
         ON CONFLICT (news_id, language_id) DO UPDATE SET title = excluded.title",
    )
    .bind(news_id)
    .bind(language_id)
    .bind(title)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn upsert_body(
    tx: &mut Transaction<'_, Sqlite>,
    news_id: i64,
    language_id: i64,
    body: &str,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO news_bodies (news_id, language_id, body) VALUES (?, ?, ?)
         ON CONFLICT (news_id, language_id) DO UPDATE SET body = excluded.body",
    )
    .bind(news_id)
    .bind(language_id)
    .bind(body)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn get_or_create_tag(tx: &mut Transaction<'_, Sqlite>, name: &str) -> Result<i64> {
    sqlx::query("INSERT OR IGNORE INTO tags (name) VALUES (?)")
        .bind(name)
        .execute(&mut **tx)
        .await?;

    let id = sqlx::query_scalar("SELECT id FROM tags WHERE name = ?")
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::{Database, TeahouseError};
    use chrono::Duration;

    const EN: i64 = 1;

    async fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let (user, _) = UserRepository::new(db.pool())
            .create(&NewUser::new("alice", "a@x.com", "hash"))
            .await
            .unwrap();
        (db, user.id)
    }

    fn record<'s>(
        post_short: &'s str,
        title: &'s str,
        author_id: i64,
        tags: &'s [String],
    ) -> NewsRecord<'s> {
        NewsRecord {
            post_short,
            title,
            media: None,
            author_id,
            created: datetime::now(),
            language_id: EN,
            body: "body",
            tags,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (db, author) = setup().await;
        let repo = NewsRepository::new(db.pool());
        let tags = vec!["release".to_string(), "game".to_string()];

        let id = repo
            .create(&record("2024-01-01-Hello", "Hello", author, &tags))
            .await
            .unwrap();

        let post = repo.get_by_short("2024-01-01-Hello").await.unwrap().unwrap();
        assert_eq!(post.id, id);
        assert_eq!(post.title, "Hello");
        assert_eq!(post.author, "alice");
        assert!(post.last_edit.is_none());
        assert_eq!(repo.tags(id).await.unwrap(), vec!["game", "release"]);
        assert_eq!(repo.title(id, EN).await.unwrap().as_deref(), Some("Hello"));
        assert_eq!(repo.body(id, EN).await.unwrap().as_deref(), Some("body"));
        assert!(repo.get_by_short("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tags_are_shared() {
        let (db, author) = setup().await;
        let repo = NewsRepository::new(db.pool());
        let tags = vec!["game".to_string()];

        repo.create(&record("a", "A", author, &tags)).await.unwrap();
        repo.create(&record("b", "B", author, &tags)).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);

        let tag_id = repo.tag_id("game").await.unwrap().unwrap();
        assert_eq!(repo.list_tagged(tag_id).await.unwrap().len(), 2);
        assert!(repo.tag_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_title_conflicts() {
        let (db, author) = setup().await;
        let repo = NewsRepository::new(db.pool());

        repo.create(&record("a", "Same", author, &[])).await.unwrap();
        let result = repo.create(&record("b", "Same", author, &[])).await;
        assert!(matches!(result, Err(TeahouseError::Conflict(_))));
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (db, author) = setup().await;
        let repo = NewsRepository::new(db.pool());

        let mut old = record("old", "Old", author, &[]);
        old.created = datetime::now() - Duration::days(1);
        repo.create(&old).await.unwrap();
        repo.create(&record("new", "New", author, &[])).await.unwrap();

        let shorts: Vec<String> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.post_short)
            .collect();
        assert_eq!(shorts, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn test_update() {
        let (db, author) = setup().await;
        let repo = NewsRepository::new(db.pool());
        let id = repo.create(&record("a", "A", author, &[])).await.unwrap();

        repo.update(id, EN, "A2", "new body", Some("http://img"), datetime::now())
            .await
            .unwrap();

        let post = repo.get_by_short("a").await.unwrap().unwrap();
        assert_eq!(post.title, "A2");
        assert_eq!(post.media.as_deref(), Some("http://img"));
        assert!(post.last_edit.is_some());
        assert_eq!(repo.body(id, EN).await.unwrap().as_deref(), Some("new body"));
        assert_eq!(repo.title(id, EN).await.unwrap().as_deref(), Some("A2"));
    }

    #[tokio::test]
    async fn test_translate() {
        let (db, author) = setup().await;
        let repo = NewsRepository::new(db.pool());
        let id = repo.create(&record("a", "A", author, &[])).await.unwrap();
        sqlx::query("INSERT INTO languages (code, name) VALUES ('ja_JP', 'Japanese')")
            .execute(db.pool())
            .await
            .unwrap();
        let ja = 2;

        assert!(repo.translate(id, ja, "エー", "本文").await.unwrap());
        assert!(!repo.translate(id, ja, "エー2", "本文2").await.unwrap());

        assert_eq!(repo.title(id, ja).await.unwrap().as_deref(), Some("エー2"));
        assert_eq!(repo.body(id, ja).await.unwrap().as_deref(), Some("本文2"));
        assert_eq!(repo.body(id, EN).await.unwrap().as_deref(), Some("body"));
    }
}
