//! Middleware for Web API.

pub mod auth;
pub mod cors;

pub use auth::{extract_request_context, require, Authenticated, OptionalSession, SESSION_PARAM};
pub use cors::create_cors_layer;
