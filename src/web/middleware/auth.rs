//! Session authorization middleware.
//!
//! Body-less methods (GET, HEAD, DELETE) carry the session token in the
//! `session_id` query parameter; every other method carries it as the
//! `session_id` field of its JSON body. The body is buffered to read the
//! token and handed on unchanged.

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Query, Request},
    http::{request::Parts, Method, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::auth::{AuthContext, RequestContext, Requirement};
use crate::web::dto::SessionQuery;
use crate::web::error::ApiError;
use crate::web::state::AppState;

/// Name of the token parameter and body field.
pub const SESSION_PARAM: &str = "session_id";

/// Whether requests with `method` carry the token in the query string.
fn token_in_query(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::DELETE)
}

fn token_from_query(uri: &Uri) -> Option<String> {
    Query::<SessionQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(query)| query.session_id)
}

fn token_from_json(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get(SESSION_PARAM)?.as_str().map(str::to_owned)
}

/// Split the session token off a request.
///
/// Returns the request ready to be passed on, with its body restored.
pub async fn extract_request_context(
    request: Request,
    max_body_bytes: usize,
) -> Result<(RequestContext, Request), ApiError> {
    if token_in_query(request.method()) {
        let token = token_from_query(request.uri());
        return Ok((RequestContext::new(token), request));
    }

    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, max_body_bytes)
        .await
        .map_err(|_| ApiError::payload_too_large("Request body too large"))?;
    let token = token_from_json(&bytes);

    Ok((
        RequestContext::new(token),
        Request::from_parts(parts, Body::from(bytes)),
    ))
}

/// Guard the rest of the stack behind `requirement`.
///
/// On success the resolved [`AuthContext`] is stored in the request
/// extensions for the [`Authenticated`] extractor.
pub async fn require(
    state: Arc<AppState>,
    requirement: Requirement,
    request: Request,
    next: Next,
) -> Response {
    let (ctx, request) = match extract_request_context(request, state.max_body_bytes).await {
        Ok(split) => split,
        Err(e) => return e.into_response(),
    };

    let result = state
        .gate
        .guard(&ctx, requirement, |auth| async move {
            let mut request = request;
            request.extensions_mut().insert(auth);
            Ok(next.run(request).await)
        })
        .await;

    match result {
        Ok(response) => response,
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Caller resolved by [`require`].
#[derive(Debug, Clone)]
pub struct Authenticated(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(Authenticated)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Caller of a public read, if a usable `session_id` was given.
///
/// Absent, unknown or expired tokens all resolve to an anonymous reader.
#[derive(Debug, Clone)]
pub struct OptionalSession(pub Option<AuthContext>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for OptionalSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let ctx = RequestContext::new(token_from_query(&parts.uri));
        if ctx.token().is_none() {
            return Ok(OptionalSession(None));
        }

        let auth = state
            .gate
            .resolve(&ctx, Requirement::Authenticated)
            .await
            .ok();
        Ok(OptionalSession(auth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Capability, Registration};
    use crate::{Config, Database};
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::routing::get;
    use axum::{middleware, Json, Router};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[test]
    fn test_token_location_by_method() {
        assert!(token_in_query(&Method::GET));
        assert!(token_in_query(&Method::HEAD));
        assert!(token_in_query(&Method::DELETE));
        assert!(!token_in_query(&Method::POST));
        assert!(!token_in_query(&Method::PUT));
    }

    #[test]
    fn test_token_from_query() {
        let uri: Uri = "/api/x?language=en_US&session_id=abc".parse().unwrap();
        assert_eq!(token_from_query(&uri).as_deref(), Some("abc"));

        let uri: Uri = "/api/x?language=en_US".parse().unwrap();
        assert!(token_from_query(&uri).is_none());
    }

    #[test]
    fn test_token_from_json() {
        assert_eq!(
            token_from_json(br#"{"session_id": "abc", "body": "x"}"#).as_deref(),
            Some("abc")
        );
        assert!(token_from_json(br#"{"session_id": 5}"#).is_none());
        assert!(token_from_json(b"not json").is_none());
        assert!(token_from_json(b"").is_none());
    }

    async fn setup() -> (Arc<AppState>, String) {
        let db = Database::open_in_memory().await.unwrap();
        let state = Arc::new(AppState::new(db, &Config::default()));
        state
            .accounts
            .register(&Registration::new("a@x.com", "alice", "pw1"))
            .await
            .unwrap();
        let token = state
            .accounts
            .login("alice", "pw1", false)
            .await
            .unwrap()
            .token;
        (state, token)
    }

    fn router(state: Arc<AppState>, requirement: Requirement) -> Router {
        async fn whoami(Authenticated(auth): Authenticated) -> String {
            auth.user.username
        }

        async fn echo(
            Authenticated(auth): Authenticated,
            Json(body): Json<serde_json::Value>,
        ) -> String {
            format!("{}:{}", auth.user.username, body["text"].as_str().unwrap_or(""))
        }

        Router::new()
            .route("/", get(whoami).post(echo))
            .layer(middleware::from_fn(move |req, next| {
                require(state.clone(), requirement, req, next)
            }))
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_query_token_accepted_for_get() {
        let (state, token) = setup().await;
        let app = router(state, Requirement::Authenticated);

        let response = app
            .oneshot(
                HttpRequest::get(format!("/?session_id={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "alice");
    }

    #[tokio::test]
    async fn test_body_token_and_body_preserved_for_post() {
        let (state, token) = setup().await;
        let app = router(state, Requirement::Capability(Capability::Comment));

        let body = serde_json::json!({ "session_id": token, "text": "hi" }).to_string();
        let response = app
            .oneshot(
                HttpRequest::post("/")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "alice:hi");
    }

    #[tokio::test]
    async fn test_query_token_ignored_for_post() {
        let (state, token) = setup().await;
        let app = router(state, Requirement::Authenticated);

        let response = app
            .oneshot(
                HttpRequest::post(format!("/?session_id={token}"))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"text": "hi"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_capability_is_forbidden() {
        let (state, token) = setup().await;
        let app = router(state, Requirement::Capability(Capability::News));

        let response = app
            .oneshot(
                HttpRequest::get(format!("/?session_id={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_oversized_body_is_payload_too_large() {
        let db = Database::open_in_memory().await.unwrap();
        let mut config = Config::default();
        config.server.max_body_bytes = 16;
        let app = router(
            Arc::new(AppState::new(db, &config)),
            Requirement::Authenticated,
        );

        let body = serde_json::json!({ "session_id": "t", "text": "x".repeat(64) }).to_string();
        let response = app
            .oneshot(
                HttpRequest::post("/")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body_text(response).await.contains("PAYLOAD_TOO_LARGE"));
    }
}
