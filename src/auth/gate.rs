//! Authorization gate.
//!
//! Composes the session manager and the permission evaluator in front of a
//! protected operation. The gate only decides; it never formats a response.
//!
//! ```text
//! token present? --no--> Unauthenticated
//!      | yes
//! session found and valid? --no--> Unauthenticated
//!      | yes
//! capability granted? --no--> Forbidden
//!      | yes
//! run the operation, return its result unchanged
//! ```

use std::future::Future;

use tracing::{debug, error};

use super::credentials::{CredentialStore, Principal};
use super::permission::{check_at, Capability};
use super::session::SessionManager;
use crate::db::{Permissions, Session, User};
use crate::{datetime, Result, TeahouseError};

/// What the transport layer extracted from one request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: Option<String>,
}

impl RequestContext {
    /// A context carrying `token` (empty tokens count as absent).
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()),
        }
    }

    /// A context without a session token.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The session token, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

/// One consistent snapshot of the caller: its session, user and permissions.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub session: Session,
    pub user: User,
    pub permissions: Permissions,
}

/// What a guarded operation requires of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Any valid session.
    Authenticated,
    /// A valid session granting this capability.
    Capability(Capability),
}

/// Authentication then authorization, as one evaluation.
#[derive(Clone)]
pub struct AuthorizationGate {
    sessions: SessionManager,
    credentials: CredentialStore,
}

impl AuthorizationGate {
    /// Create a gate.
    pub fn new(sessions: SessionManager, credentials: CredentialStore) -> Self {
        Self {
            sessions,
            credentials,
        }
    }

    /// Resolve the request's session, failing with
    /// [`TeahouseError::Unauthenticated`] if it is absent, unknown or expired.
    pub async fn authenticate(&self, ctx: &RequestContext) -> Result<Session> {
        let (session, _) = self.fetch_session(ctx).await?;
        Ok(session)
    }

    /// Resolve the caller and require `capability`.
    pub async fn authorize(
        &self,
        ctx: &RequestContext,
        capability: Capability,
    ) -> Result<AuthContext> {
        self.resolve(ctx, Requirement::Capability(capability)).await
    }

    /// Resolve the caller against a requirement.
    ///
    /// The session is fetched once, and validity and capability are both
    /// evaluated against that snapshot at one instant.
    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        requirement: Requirement,
    ) -> Result<AuthContext> {
        let (session, now) = self.fetch_session(ctx).await?;

        let principal = match self.credentials.principal(session.user_id).await {
            Ok(principal) => principal,
            Err(TeahouseError::NotFound(_)) => {
                debug!(user_id = session.user_id, "Session owner no longer exists");
                return Err(TeahouseError::Unauthenticated);
            }
            Err(e) => {
                error!(error = %e, "Principal lookup failed");
                return Err(TeahouseError::Unauthenticated);
            }
        };
        let Principal { user, permissions } = principal;

        if let Requirement::Capability(capability) = requirement {
            if !check_at(&session, &permissions, capability, now) {
                debug!(user_id = user.id, capability = %capability, "Capability denied");
                return Err(TeahouseError::Forbidden(format!(
                    "{capability} permission required"
                )));
            }
        }

        Ok(AuthContext {
            session,
            user,
            permissions,
        })
    }

    /// Guard `next` behind `requirement`.
    ///
    /// `next` only runs when the requirement holds; its result is returned
    /// unchanged.
    pub async fn guard<F, Fut, T>(
        &self,
        ctx: &RequestContext,
        requirement: Requirement,
        next: F,
    ) -> Result<T>
    where
        F: FnOnce(AuthContext) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let auth = self.resolve(ctx, requirement).await?;
        next(auth).await
    }

    async fn fetch_session(
        &self,
        ctx: &RequestContext,
    ) -> Result<(Session, chrono::DateTime<chrono::Utc>)> {
        let token = ctx.token().ok_or(TeahouseError::Unauthenticated)?;

        let session = match self.sessions.lookup(token).await {
            Ok(session) => session,
            Err(TeahouseError::NotFound(_)) => {
                debug!("Unknown session token");
                return Err(TeahouseError::Unauthenticated);
            }
            Err(e) => {
                error!(error = %e, "Session lookup failed");
                return Err(TeahouseError::Unauthenticated);
            }
        };

        let now = datetime::now();
        if !self.sessions.is_valid_at(&session, now) {
            debug!(user_id = session.user_id, "Session outside its validity window");
            return Err(TeahouseError::Unauthenticated);
        }

        Ok((session, now))
    }
}
