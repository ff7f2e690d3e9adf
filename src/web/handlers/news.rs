//! News, comment and language handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::news::{EditNews, NewNews};
use crate::web::dto::{
    ApiResponse, CommentRequest, CommentResponse, CreateLanguageRequest, EditNewsRequest,
    LanguageQuery, LanguageResponse, NewsDetailResponse, NewsSummaryResponse, PostNewsRequest,
    TranslateRequest, TranslateResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::{Authenticated, OptionalSession};
use crate::web::state::AppState;

fn required_language(query: LanguageQuery) -> Result<String, ApiError> {
    query
        .language
        .filter(|l| !l.is_empty())
        .ok_or_else(|| ApiError::bad_request("language is required"))
}

/// GET /api/news - All posts, newest first.
pub async fn list_news(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LanguageQuery>,
) -> Result<Json<ApiResponse<Vec<NewsSummaryResponse>>>, ApiError> {
    let language = required_language(query)?;
    let news = state.news.list(&language).await?;
    Ok(Json(ApiResponse::new(
        news.into_iter().map(Into::into).collect(),
    )))
}

/// GET /api/news/tags/{tag} - Posts carrying a tag.
pub async fn tagged_news(
    State(state): State<Arc<AppState>>,
    Path(tag): Path<String>,
    Query(query): Query<LanguageQuery>,
) -> Result<Json<ApiResponse<Vec<NewsSummaryResponse>>>, ApiError> {
    let language = required_language(query)?;
    let news = state.news.tagged(&tag, &language).await?;
    Ok(Json(ApiResponse::new(
        news.into_iter().map(Into::into).collect(),
    )))
}

/// GET /api/news/{post_id} - One post with its body and comments.
pub async fn get_news(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
    OptionalSession(reader): OptionalSession,
    Query(query): Query<LanguageQuery>,
) -> Result<Json<ApiResponse<NewsDetailResponse>>, ApiError> {
    let language = required_language(query)?;
    let detail = state
        .news
        .get(&post_id, reader.as_ref().map(|auth| &auth.user), &language)
        .await?;
    Ok(Json(ApiResponse::new(detail.into())))
}

/// POST /api/news - Publish a post.
pub async fn post_news(
    State(state): State<Arc<AppState>>,
    Authenticated(auth): Authenticated,
    ValidatedJson(req): ValidatedJson<PostNewsRequest>,
) -> Result<(StatusCode, Json<ApiResponse<NewsDetailResponse>>), ApiError> {
    let news = NewNews {
        title: req.title,
        body: req.body,
        tags: req.tags,
        media: req.media,
        language: req.language,
    };
    let detail = state.news.post(&auth.user, &news).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(detail.into()))))
}

/// PUT /api/news/{post_id} - Edit one's own post.
pub async fn edit_news(
    State(state): State<Arc<AppState>>,
    Authenticated(auth): Authenticated,
    Path(post_id): Path<String>,
    ValidatedJson(req): ValidatedJson<EditNewsRequest>,
) -> Result<Json<ApiResponse<NewsDetailResponse>>, ApiError> {
    let edit = EditNews {
        title: req.title,
        body: req.body,
        media: req.media,
        language: req.language,
    };
    let detail = state.news.edit(&auth.user, &post_id, &edit).await?;
    Ok(Json(ApiResponse::new(detail.into())))
}

/// PUT /api/news/{post_id}/translation - Add or replace a translation.
pub async fn translate_news(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
    ValidatedJson(req): ValidatedJson<TranslateRequest>,
) -> Result<Json<ApiResponse<TranslateResponse>>, ApiError> {
    let created = state
        .news
        .translate(&post_id, &req.language, &req.title, &req.body)
        .await?;
    Ok(Json(ApiResponse::new(TranslateResponse { created })))
}

/// POST /api/news/{post_id}/comments - Comment on a post.
pub async fn post_comment(
    State(state): State<Arc<AppState>>,
    Authenticated(auth): Authenticated,
    Path(post_id): Path<String>,
    ValidatedJson(req): ValidatedJson<CommentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CommentResponse>>), ApiError> {
    let comment = state
        .news
        .post_comment(&auth.user, &post_id, &req.body)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(comment.into()))))
}

/// PUT /api/comments/{id} - Edit one's own comment.
pub async fn edit_comment(
    State(state): State<Arc<AppState>>,
    Authenticated(auth): Authenticated,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<CommentRequest>,
) -> Result<Json<ApiResponse<CommentResponse>>, ApiError> {
    let comment = state.news.edit_comment(&auth.user, id, &req.body).await?;
    Ok(Json(ApiResponse::new(comment.into())))
}

/// DELETE /api/comments/{id} - Delete a comment.
pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    Authenticated(auth): Authenticated,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .news
        .delete_comment(&auth.user, &auth.permissions, id)
        .await?;
    Ok(Json(ApiResponse::new(())))
}

/// GET /api/languages - All languages.
pub async fn list_languages(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<LanguageResponse>>>, ApiError> {
    let languages = state.news.list_languages().await?;
    Ok(Json(ApiResponse::new(
        languages.into_iter().map(Into::into).collect(),
    )))
}

/// POST /api/languages - Add a language.
pub async fn create_language(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateLanguageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LanguageResponse>>), ApiError> {
    let language = state.news.create_language(&req.code, &req.name).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(language.into()))))
}
