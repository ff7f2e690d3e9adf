//! API handlers.

pub mod auth;
pub mod news;

pub use auth::*;
pub use news::*;
