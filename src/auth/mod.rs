//! Authentication and authorization for Teahouse.
//!
//! This module provides password hashing, the credential store, session
//! management, capability checks and the authorization gate that combines
//! them.

mod credentials;
mod gate;
mod password;
pub mod permission;
mod service;
mod session;
pub mod validation;

pub use credentials::{CredentialStore, Principal, Registration};
pub use gate::{AuthContext, AuthorizationGate, RequestContext, Requirement};
pub use password::{hash_password, validate_password, verify_password, PasswordError};
pub use permission::{
    check, check_at, check_elevated, check_named, Capability, PermissionChanges, PermissionsView,
};
pub use service::{AccountService, SessionDescriptor, SessionStatus};
pub use session::{SessionManager, DEFAULT_SESSION_LIFETIME_HOURS, MAX_SESSION_LIFETIME_HOURS};
pub use validation::ValidationError;
