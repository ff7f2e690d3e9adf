//! Authentication and account handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::auth::{PermissionsView, Registration};
use crate::web::dto::{
    ApiResponse, ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest,
    SessionQuery, SetPermissionsRequest, StatusResponse, UserPermissionsResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::Authenticated;
use crate::web::state::AppState;

/// POST /api/auth/register - Create an account.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserPermissionsResponse>>), ApiError> {
    let principal = state
        .accounts
        .register(&Registration::new(req.email, req.username, req.password))
        .await?;

    let response = UserPermissionsResponse {
        username: principal.user.username,
        permissions: PermissionsView::full(&principal.permissions),
    };
    Ok((StatusCode::CREATED, Json(ApiResponse::new(response))))
}

/// POST /api/auth/login - Start a session.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let descriptor = state
        .accounts
        .login(&req.username, &req.password, req.remember_me)
        .await?;

    Ok(Json(ApiResponse::new(descriptor.into())))
}

/// POST /api/auth/logout - End the caller's session.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Authenticated(auth): Authenticated,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.accounts.logout(&auth.session.token).await?;
    Ok(Json(ApiResponse::new(())))
}

/// GET /api/auth/status - Describe the session named by `session_id`.
pub async fn status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<ApiResponse<StatusResponse>>, ApiError> {
    let token = query
        .session_id
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let status = state.accounts.status(&token).await?;
    Ok(Json(ApiResponse::new(status.into())))
}

/// PUT /api/auth/password - Change the caller's own password.
///
/// Every session of the account ends, including the one used here.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Authenticated(auth): Authenticated,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .accounts
        .change_password(&auth.user.username, &req.old_password, &req.new_password)
        .await?;
    Ok(Json(ApiResponse::new(())))
}

/// GET /api/auth/users/{username}/permissions - Full permission set of a user.
pub async fn get_permissions(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<UserPermissionsResponse>>, ApiError> {
    let permissions = state.accounts.get_permissions(&username).await?;
    Ok(Json(ApiResponse::new(UserPermissionsResponse {
        username,
        permissions,
    })))
}

/// PUT /api/auth/users/{username}/permissions - Change another user's flags.
pub async fn set_permissions(
    State(state): State<Arc<AppState>>,
    Authenticated(auth): Authenticated,
    Path(username): Path<String>,
    payload: Result<Json<SetPermissionsRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UserPermissionsResponse>>, ApiError> {
    // Unknown flag names surface here as deserialization errors.
    let Json(req) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let permissions = state
        .accounts
        .set_permissions(&auth, &username, &req.permissions)
        .await?;
    Ok(Json(ApiResponse::new(UserPermissionsResponse {
        username,
        permissions,
    })))
}
