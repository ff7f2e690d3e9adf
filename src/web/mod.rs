//! Web API module for Teahouse.
//!
//! JSON over HTTP. Successful responses are wrapped as `{"data": ...}`,
//! failures as `{"error": {"code", "message", "details?"}}`.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use router::{create_health_router, create_router};
pub use server::WebServer;
pub use state::AppState;
