//! Response DTOs for Web API.
//!
//! Timestamps go out as milliseconds since the Unix epoch.

use serde::Serialize;

use crate::auth::{PermissionsView, SessionDescriptor, SessionStatus};
use crate::datetime::to_epoch_millis;
use crate::news::{CommentView, Language, NewsDetail, NewsSummary};

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// A user and their permissions.
#[derive(Debug, Serialize)]
pub struct UserPermissionsResponse {
    pub username: String,
    pub permissions: PermissionsView,
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Token to send back as `session_id`.
    pub session_id: String,
    pub permissions: PermissionsView,
    /// `null` for "remember me" sessions.
    pub expiration: Option<i64>,
}

impl From<SessionDescriptor> for LoginResponse {
    fn from(d: SessionDescriptor) -> Self {
        Self {
            session_id: d.token,
            permissions: d.permissions,
            expiration: d.expires_at.as_ref().map(to_epoch_millis),
        }
    }
}

/// Session status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub username: String,
    /// Granted flags only.
    pub permissions: PermissionsView,
    pub expiration: Option<i64>,
}

impl From<SessionStatus> for StatusResponse {
    fn from(s: SessionStatus) -> Self {
        Self {
            username: s.username,
            permissions: s.permissions,
            expiration: s.expires_at.as_ref().map(to_epoch_millis),
        }
    }
}

/// News post in listings.
#[derive(Debug, Serialize)]
pub struct NewsSummaryResponse {
    pub post_id: String,
    pub title: String,
    pub author: String,
    pub is_author: bool,
    pub created: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_edit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    pub tags: Vec<String>,
    pub comment_count: i64,
}

impl From<NewsSummary> for NewsSummaryResponse {
    fn from(s: NewsSummary) -> Self {
        Self {
            post_id: s.post_id,
            title: s.title,
            author: s.author,
            is_author: s.is_author,
            created: to_epoch_millis(&s.created),
            last_edit: s.last_edit.as_ref().map(to_epoch_millis),
            media: s.media,
            tags: s.tags,
            comment_count: s.comment_count,
        }
    }
}

/// Comment response.
#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: i64,
    pub author: String,
    pub body: String,
    pub is_author: bool,
    pub created: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_edit: Option<i64>,
}

impl From<CommentView> for CommentResponse {
    fn from(c: CommentView) -> Self {
        Self {
            id: c.id,
            author: c.author,
            body: c.body,
            is_author: c.is_author,
            created: to_epoch_millis(&c.created),
            last_edit: c.last_edit.as_ref().map(to_epoch_millis),
        }
    }
}

/// Full news post.
#[derive(Debug, Serialize)]
pub struct NewsDetailResponse {
    #[serde(flatten)]
    pub summary: NewsSummaryResponse,
    pub body: String,
    pub comments: Vec<CommentResponse>,
}

impl From<NewsDetail> for NewsDetailResponse {
    fn from(d: NewsDetail) -> Self {
        Self {
            summary: d.summary.into(),
            body: d.body,
            comments: d.comments.into_iter().map(Into::into).collect(),
        }
    }
}

/// Translation result.
#[derive(Debug, Serialize)]
pub struct TranslateResponse {
    /// `true` if this is the first translation into the language.
    pub created: bool,
}

/// Language response.
#[derive(Debug, Serialize)]
pub struct LanguageResponse {
    pub code: String,
    pub name: String,
}

impl From<Language> for LanguageResponse {
    fn from(l: Language) -> Self {
        Self {
            code: l.code,
            name: l.name,
        }
    }
}
