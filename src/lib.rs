//! Teahouse - news and blog backend
//!
//! Accounts with capability flags, server-side sessions, and multilingual
//! news posts with tags and comments, served over a JSON HTTP API.

pub mod auth;
pub mod cache;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod logging;
pub mod news;
pub mod web;

pub use auth::{
    AccountService, AuthContext, AuthorizationGate, Capability, CredentialStore,
    PermissionChanges, RequestContext, Requirement, SessionManager,
};
pub use config::Config;
pub use db::{Database, Permissions, Session, User};
pub use error::{Result, TeahouseError};
pub use news::NewsService;
pub use web::{AppState, WebServer};
