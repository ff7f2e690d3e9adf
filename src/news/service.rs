//! News service for Teahouse.
//!
//! High-level operations on posts, translations and comments. Capability
//! checks happen in front of this service; what remains here is ownership
//! (only the author edits a post or comment) and input validation.

use tracing::{info, warn};

use super::comment::CommentRepository;
use super::language::LanguageRepository;
use super::repository::{NewsRecord, NewsRepository};
use super::types::{
    CommentView, EditNews, Language, NewNews, NewsDetail, NewsPost, NewsSummary,
    DEFAULT_LANGUAGE,
};
use crate::db::{Database, Permissions, User};
use crate::{datetime, Result, TeahouseError};

/// Maximum length for post titles (in characters).
pub const MAX_TITLE_LENGTH: usize = 1000;

/// Maximum length for comment bodies (in characters).
pub const MAX_COMMENT_LENGTH: usize = 10_000;

/// Maximum length for media URLs.
pub const MAX_MEDIA_LENGTH: usize = 1024;

/// Maximum length for tag names.
pub const MAX_TAG_LENGTH: usize = 64;

/// Maximum length of the title part of a post identifier.
pub const MAX_SHORT_TITLE_LENGTH: usize = 53;

/// Maximum length for language codes.
pub const MAX_LANGUAGE_CODE_LENGTH: usize = 16;

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(TeahouseError::Validation("title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(TeahouseError::Validation(format!(
            "title must be at most {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_body(body: &str) -> Result<()> {
    if body.trim().is_empty() {
        return Err(TeahouseError::Validation("body is required".to_string()));
    }
    Ok(())
}

fn validate_comment(body: &str) -> Result<()> {
    validate_body(body)?;
    if body.chars().count() > MAX_COMMENT_LENGTH {
        return Err(TeahouseError::Validation(format!(
            "comment must be at most {MAX_COMMENT_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_media(media: Option<&str>) -> Result<()> {
    match media {
        Some(url) if url.chars().count() > MAX_MEDIA_LENGTH => {
            Err(TeahouseError::Validation(format!(
                "media URL must be at most {MAX_MEDIA_LENGTH} characters"
            )))
        }
        _ => Ok(()),
    }
}

fn validate_tags(tags: &[String]) -> Result<()> {
    for tag in tags {
        let len = tag.chars().count();
        if len == 0 || len > MAX_TAG_LENGTH {
            return Err(TeahouseError::Validation(format!(
                "tag names must be 1 to {MAX_TAG_LENGTH} characters"
            )));
        }
    }
    Ok(())
}

/// Convert line breaks to HTML breaks.
pub fn sanitize_body(body: &str) -> String {
    body.replace('\n', "<br />")
}

/// Public identifier of a post: its creation date, then the title with
/// spaces turned into dashes, cut to [`MAX_SHORT_TITLE_LENGTH`] characters.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use teahouse::news::post_short;
///
/// let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
/// assert_eq!(post_short(&created, "Hello World"), "2024-03-01-Hello-World");
/// ```
pub fn post_short(created: &chrono::DateTime<chrono::Utc>, title: &str) -> String {
    let dashed: String = title
        .replace(' ', "-")
        .chars()
        .take(MAX_SHORT_TITLE_LENGTH)
        .collect();
    format!("{}-{}", datetime::date_prefix(created), dashed)
}

/// Service for news posts, translations and comments.
#[derive(Clone)]
pub struct NewsService {
    db: Database,
}

impl NewsService {
    /// Create a new NewsService.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// All posts, newest first, localized for `language`.
    pub async fn list(&self, language: &str) -> Result<Vec<NewsSummary>> {
        let lang = self.resolve_language(language).await?;
        let posts = NewsRepository::new(self.db.pool()).list().await?;
        self.summarize_all(posts, &lang).await
    }

    /// Posts carrying `tag`, newest first.
    pub async fn tagged(&self, tag: &str, language: &str) -> Result<Vec<NewsSummary>> {
        let lang = self.resolve_language(language).await?;
        let repo = NewsRepository::new(self.db.pool());
        let tag_id = repo
            .tag_id(tag)
            .await?
            .ok_or_else(|| TeahouseError::NotFound(format!("tag {tag}")))?;

        let posts = repo.list_tagged(tag_id).await?;
        self.summarize_all(posts, &lang).await
    }

    /// A full post with comments. `reader` decides the `is_author` flags.
    pub async fn get(
        &self,
        post_id: &str,
        reader: Option<&User>,
        language: &str,
    ) -> Result<NewsDetail> {
        let lang = self.resolve_language(language).await?;
        let post = self.find_post(post_id).await?;
        self.detail(post, reader.map(|u| u.id), &lang).await
    }

    /// Publish a post written by `author`.
    pub async fn post(&self, author: &User, news: &NewNews) -> Result<NewsDetail> {
        validate_title(&news.title)?;
        validate_body(&news.body)?;
        validate_media(news.media.as_deref())?;
        validate_tags(&news.tags)?;

        let lang = self.resolve_language(&news.language).await?;
        let created = datetime::now();
        let short = post_short(&created, &news.title);
        let body = sanitize_body(&news.body);

        let repo = NewsRepository::new(self.db.pool());
        let news_id = repo
            .create(&NewsRecord {
                post_short: &short,
                title: &news.title,
                media: news.media.as_deref(),
                author_id: author.id,
                created,
                language_id: lang.id,
                body: &body,
                tags: &news.tags,
            })
            .await?;

        info!(news_id, post_id = %short, author = author.id, "News posted");
        let post = self.find_post(&short).await?;
        self.detail(post, Some(author.id), &lang).await
    }

    /// Replace a post's title, body and media. Only its author may do this.
    pub async fn edit(&self, caller: &User, post_id: &str, edit: &EditNews) -> Result<NewsDetail> {
        validate_title(&edit.title)?;
        validate_body(&edit.body)?;
        validate_media(edit.media.as_deref())?;

        let post = self.find_post(post_id).await?;
        if post.author_id != caller.id {
            warn!(user_id = caller.id, post_id = %post_id, "Edit refused: not the author");
            return Err(TeahouseError::Forbidden(
                "only the author can edit this post".to_string(),
            ));
        }

        let lang = self.resolve_language(&edit.language).await?;
        NewsRepository::new(self.db.pool())
            .update(
                post.id,
                lang.id,
                &edit.title,
                &sanitize_body(&edit.body),
                edit.media.as_deref(),
                datetime::now(),
            )
            .await?;

        info!(news_id = post.id, user_id = caller.id, "News edited");
        let post = self.find_post(post_id).await?;
        self.detail(post, Some(caller.id), &lang).await
    }

    /// Store a translation of a post.
    ///
    /// Returns `true` if this language had no title for the post before.
    pub async fn translate(
        &self,
        post_id: &str,
        language: &str,
        title: &str,
        body: &str,
    ) -> Result<bool> {
        validate_title(title)?;
        validate_body(body)?;

        let post = self.find_post(post_id).await?;
        let lang = LanguageRepository::new(self.db.pool())
            .get_by_code(language)
            .await?
            .ok_or_else(|| TeahouseError::NotFound(format!("language {language}")))?;

        let created = NewsRepository::new(self.db.pool())
            .translate(post.id, lang.id, title, &sanitize_body(body))
            .await?;

        info!(news_id = post.id, language = %lang.code, created, "News translated");
        Ok(created)
    }

    /// Comment on a post.
    pub async fn post_comment(
        &self,
        author: &User,
        post_id: &str,
        body: &str,
    ) -> Result<CommentView> {
        validate_comment(body)?;
        let post = self.find_post(post_id).await?;

        let comment = CommentRepository::new(self.db.pool())
            .create(post.id, author.id, &sanitize_body(body))
            .await?;

        info!(comment_id = comment.id, news_id = post.id, "Comment posted");
        Ok(CommentView::from_comment(comment, Some(author.id)))
    }

    /// Replace a comment's body. Only its author may do this.
    pub async fn edit_comment(&self, caller: &User, id: i64, body: &str) -> Result<CommentView> {
        validate_comment(body)?;
        let repo = CommentRepository::new(self.db.pool());
        let comment = repo
            .get(id)
            .await?
            .ok_or_else(|| TeahouseError::NotFound("comment".to_string()))?;

        if comment.author_id != caller.id {
            warn!(user_id = caller.id, comment_id = id, "Edit refused: not the author");
            return Err(TeahouseError::Forbidden(
                "only the author can edit this comment".to_string(),
            ));
        }

        if !repo
            .update_body(id, &sanitize_body(body), datetime::now())
            .await?
        {
            return Err(TeahouseError::NotFound("comment".to_string()));
        }

        let comment = repo
            .get(id)
            .await?
            .ok_or_else(|| TeahouseError::NotFound("comment".to_string()))?;
        Ok(CommentView::from_comment(comment, Some(caller.id)))
    }

    /// Delete a comment. Its author, admins and masters may do this.
    pub async fn delete_comment(
        &self,
        caller: &User,
        permissions: &Permissions,
        id: i64,
    ) -> Result<()> {
        let repo = CommentRepository::new(self.db.pool());
        let comment = repo
            .get(id)
            .await?
            .ok_or_else(|| TeahouseError::NotFound("comment".to_string()))?;

        if comment.author_id != caller.id && !permissions.is_elevated() {
            warn!(user_id = caller.id, comment_id = id, "Delete refused");
            return Err(TeahouseError::Forbidden(
                "only the author or an admin can delete this comment".to_string(),
            ));
        }

        repo.delete(id).await?;
        info!(comment_id = id, user_id = caller.id, "Comment deleted");
        Ok(())
    }

    /// Add a language posts can be translated into.
    pub async fn create_language(&self, code: &str, name: &str) -> Result<Language> {
        let code = code.trim();
        if code.is_empty() || code.len() > MAX_LANGUAGE_CODE_LENGTH {
            return Err(TeahouseError::Validation(format!(
                "language code must be 1 to {MAX_LANGUAGE_CODE_LENGTH} characters"
            )));
        }
        if name.trim().is_empty() {
            return Err(TeahouseError::Validation(
                "language name is required".to_string(),
            ));
        }

        let language = LanguageRepository::new(self.db.pool())
            .create(code, name.trim())
            .await?;
        info!(code = %language.code, "Language added");
        Ok(language)
    }

    /// All languages.
    pub async fn list_languages(&self) -> Result<Vec<Language>> {
        LanguageRepository::new(self.db.pool()).list().await
    }

    async fn resolve_language(&self, code: &str) -> Result<Language> {
        let repo = LanguageRepository::new(self.db.pool());
        if let Some(language) = repo.get_by_code(code).await? {
            return Ok(language);
        }

        warn!(code = %code, "Unrecognized language code, using default");
        repo.get_by_code(DEFAULT_LANGUAGE)
            .await?
            .ok_or_else(|| TeahouseError::NotFound(format!("language {DEFAULT_LANGUAGE}")))
    }

    async fn find_post(&self, post_id: &str) -> Result<NewsPost> {
        NewsRepository::new(self.db.pool())
            .get_by_short(post_id)
            .await?
            .ok_or_else(|| TeahouseError::NotFound("news post".to_string()))
    }

    async fn summarize_all(
        &self,
        posts: Vec<NewsPost>,
        lang: &Language,
    ) -> Result<Vec<NewsSummary>> {
        let mut summaries = Vec::with_capacity(posts.len());
        for post in posts {
            summaries.push(self.summarize(post, None, lang).await?);
        }
        Ok(summaries)
    }

    async fn summarize(
        &self,
        post: NewsPost,
        reader: Option<i64>,
        lang: &Language,
    ) -> Result<NewsSummary> {
        let repo = NewsRepository::new(self.db.pool());
        let title = repo.title(post.id, lang.id).await?.unwrap_or(post.title);

        Ok(NewsSummary {
            is_author: reader == Some(post.author_id),
            tags: repo.tags(post.id).await?,
            comment_count: repo.comment_count(post.id).await?,
            post_id: post.post_short,
            title,
            author: post.author,
            created: post.created,
            last_edit: post.last_edit,
            media: post.media,
        })
    }

    async fn detail(
        &self,
        post: NewsPost,
        reader: Option<i64>,
        lang: &Language,
    ) -> Result<NewsDetail> {
        let repo = NewsRepository::new(self.db.pool());
        let news_id = post.id;

        let body = match repo.body(news_id, lang.id).await? {
            Some(body) => body,
            None => {
                let default = self.resolve_language(DEFAULT_LANGUAGE).await?;
                repo.body(news_id, default.id).await?.unwrap_or_default()
            }
        };

        let comments = CommentRepository::new(self.db.pool())
            .list_for_news(news_id)
            .await?
            .into_iter()
            .map(|c| CommentView::from_comment(c, reader))
            .collect();

        Ok(NewsDetail {
            summary: self.summarize(post, reader, lang).await?,
            body,
            comments,
        })
    }
}
