//! Router configuration for Web API.

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    change_password, create_language, delete_comment, edit_comment, edit_news, get_news,
    get_permissions, list_languages, list_news, login, logout, post_comment, post_news, register,
    set_permissions, status, tagged_news, translate_news,
};
use super::middleware::{create_cors_layer, require};
use super::state::AppState;
use crate::auth::{Capability, Requirement};

/// Guard every route of `router` behind `requirement`.
fn guarded(
    app_state: &Arc<AppState>,
    requirement: Requirement,
    router: Router<Arc<AppState>>,
) -> Router<Arc<AppState>> {
    let state = app_state.clone();
    router.route_layer(middleware::from_fn(move |req, next| {
        require(state.clone(), requirement, req, next)
    }))
}

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    // Auth routes (no session required)
    let auth_public_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/status", get(status));

    // Auth routes (any valid session)
    let auth_session_routes = guarded(
        &app_state,
        Requirement::Authenticated,
        Router::new()
            .route("/logout", post(logout))
            .route("/password", put(change_password)),
    );

    // Permission management
    let auth_admin_routes = guarded(
        &app_state,
        Requirement::Capability(Capability::Admin),
        Router::new().route(
            "/users/:username/permissions",
            get(get_permissions).put(set_permissions),
        ),
    );

    let auth_routes = Router::new()
        .merge(auth_public_routes)
        .merge(auth_session_routes)
        .merge(auth_admin_routes);

    // News reads are public; a session only marks the reader's own content
    let news_public_routes = Router::new()
        .route("/news", get(list_news))
        .route("/news/tags/:tag", get(tagged_news))
        .route("/news/:post_id", get(get_news))
        .route("/languages", get(list_languages));

    let news_writer_routes = guarded(
        &app_state,
        Requirement::Capability(Capability::News),
        Router::new()
            .route("/news", post(post_news))
            .route("/news/:post_id", put(edit_news)),
    );

    let translator_routes = guarded(
        &app_state,
        Requirement::Capability(Capability::Translate),
        Router::new().route("/news/:post_id/translation", put(translate_news)),
    );

    let comment_routes = guarded(
        &app_state,
        Requirement::Capability(Capability::Comment),
        Router::new()
            .route("/news/:post_id/comments", post(post_comment))
            .route("/comments/:id", put(edit_comment).delete(delete_comment)),
    );

    let language_admin_routes = guarded(
        &app_state,
        Requirement::Capability(Capability::Admin),
        Router::new().route("/languages", post(create_language)),
    );

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(news_public_routes)
        .merge(news_writer_routes)
        .merge(translator_routes)
        .merge(comment_routes)
        .merge(language_admin_routes);

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;

    #[tokio::test]
    async fn test_health_router() {
        let server = TestServer::new(create_health_router()).unwrap();
        let response = server.get("/health").await;
        response.assert_status_ok();
        response.assert_text("OK");
    }
}
