//! News content for Teahouse.
//!
//! Posts carry a canonical title plus per-language titles and bodies, a set
//! of tags and a flat list of comments.

mod comment;
mod language;
mod repository;
mod service;
mod types;

pub use comment::CommentRepository;
pub use language::LanguageRepository;
pub use repository::{NewsRecord, NewsRepository};
pub use service::{
    post_short, sanitize_body, NewsService, MAX_COMMENT_LENGTH, MAX_MEDIA_LENGTH,
    MAX_TAG_LENGTH, MAX_TITLE_LENGTH,
};
pub use types::{
    Comment, CommentView, EditNews, Language, NewNews, NewsDetail, NewsPost, NewsSummary,
    DEFAULT_LANGUAGE,
};
