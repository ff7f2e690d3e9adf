//! Types for news posts, comments and languages.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use crate::datetime;

/// Code of the language every post is written in first.
pub const DEFAULT_LANGUAGE: &str = "en_US";

fn decode_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    let value: String = row.try_get(column)?;
    datetime::from_storage(&value).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn decode_optional_timestamp(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    let value: Option<String> = row.try_get(column)?;
    value
        .as_deref()
        .map(datetime::from_storage)
        .transpose()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

/// A language posts can be translated into.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Language {
    pub id: i64,
    /// Locale code, e.g. `en_US`.
    pub code: String,
    /// Human readable name.
    pub name: String,
}

/// A news post row joined with its author's username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsPost {
    pub id: i64,
    /// Public identifier: `YYYY-MM-DD-` followed by the dashed title.
    pub post_short: String,
    /// Canonical title.
    pub title: String,
    pub media: Option<String>,
    pub author_id: i64,
    pub author: String,
    pub created: DateTime<Utc>,
    pub last_edit: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, SqliteRow> for NewsPost {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            post_short: row.try_get("post_short")?,
            title: row.try_get("title")?,
            media: row.try_get("media")?,
            author_id: row.try_get("author_id")?,
            author: row.try_get("author")?,
            created: decode_timestamp(row, "created")?,
            last_edit: decode_optional_timestamp(row, "last_edit")?,
        })
    }
}

/// A comment row joined with its author's username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: i64,
    pub news_id: i64,
    pub author_id: i64,
    pub author: String,
    pub body: String,
    pub created: DateTime<Utc>,
    pub last_edit: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, SqliteRow> for Comment {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            news_id: row.try_get("news_id")?,
            author_id: row.try_get("author_id")?,
            author: row.try_get("author")?,
            body: row.try_get("body")?,
            created: decode_timestamp(row, "created")?,
            last_edit: decode_optional_timestamp(row, "last_edit")?,
        })
    }
}

/// Data for a new post.
#[derive(Debug, Clone)]
pub struct NewNews {
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub media: Option<String>,
    /// Language of `title` and `body`.
    pub language: String,
}

/// Replacement content for an existing post.
#[derive(Debug, Clone)]
pub struct EditNews {
    pub title: String,
    pub body: String,
    pub media: Option<String>,
    /// Language of `body`.
    pub language: String,
}

/// A post as listed, localized for one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsSummary {
    pub post_id: String,
    pub title: String,
    pub author: String,
    pub is_author: bool,
    pub created: DateTime<Utc>,
    pub last_edit: Option<DateTime<Utc>>,
    pub media: Option<String>,
    pub tags: Vec<String>,
    pub comment_count: i64,
}

/// A comment as shown to a (possibly anonymous) reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentView {
    pub id: i64,
    pub author: String,
    pub body: String,
    pub is_author: bool,
    pub created: DateTime<Utc>,
    pub last_edit: Option<DateTime<Utc>>,
}

impl CommentView {
    /// Build the view of `comment` for the reader with id `reader`.
    pub fn from_comment(comment: Comment, reader: Option<i64>) -> Self {
        Self {
            is_author: reader == Some(comment.author_id),
            id: comment.id,
            author: comment.author,
            body: comment.body,
            created: comment.created,
            last_edit: comment.last_edit,
        }
    }
}

/// A full post with body and comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsDetail {
    pub summary: NewsSummary,
    pub body: String,
    pub comments: Vec<CommentView>,
}
