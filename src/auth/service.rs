//! Account operations exposed to the HTTP layer.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::credentials::{CredentialStore, Principal, Registration};
use super::gate::AuthContext;
use super::permission::{check_elevated, PermissionChanges, PermissionsView};
use super::session::SessionManager;
use crate::{Result, TeahouseError};

/// What a successful login hands back to the client.
#[derive(Debug, Clone)]
pub struct SessionDescriptor {
    pub token: String,
    pub permissions: PermissionsView,
    /// Absent for "remember me" sessions.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Status of a session token as reported to its holder.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub username: String,
    /// Granted flags only.
    pub permissions: PermissionsView,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Registration, login and permission management.
#[derive(Clone)]
pub struct AccountService {
    credentials: CredentialStore,
    sessions: SessionManager,
}

impl AccountService {
    /// Create the service.
    pub fn new(credentials: CredentialStore, sessions: SessionManager) -> Self {
        Self {
            credentials,
            sessions,
        }
    }

    /// Register a new account.
    pub async fn register(&self, registration: &Registration) -> Result<Principal> {
        self.credentials.register(registration).await
    }

    /// Verify credentials and issue a session.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<SessionDescriptor> {
        let principal = self.credentials.verify(username, password).await?;
        let session = self.sessions.create(&principal.user, remember_me).await?;

        info!(
            user_id = principal.user.id,
            username = %principal.user.username,
            "Login successful"
        );
        Ok(SessionDescriptor {
            token: session.token,
            permissions: PermissionsView::full(&principal.permissions),
            expires_at: session.valid_before,
        })
    }

    /// End a session. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) -> Result<()> {
        self.sessions.revoke(token).await
    }

    /// Describe a token's session, failing with
    /// [`TeahouseError::Unauthenticated`] if it is not usable.
    pub async fn status(&self, token: &str) -> Result<SessionStatus> {
        let session = match self.sessions.lookup(token).await {
            Ok(session) => session,
            Err(TeahouseError::NotFound(_)) => return Err(TeahouseError::Unauthenticated),
            Err(e) => return Err(e),
        };
        if !self.sessions.is_valid(&session) {
            return Err(TeahouseError::Unauthenticated);
        }

        let principal = match self.credentials.principal(session.user_id).await {
            Ok(principal) => principal,
            Err(TeahouseError::NotFound(_)) => return Err(TeahouseError::Unauthenticated),
            Err(e) => return Err(e),
        };
        Ok(SessionStatus {
            username: principal.user.username,
            permissions: PermissionsView::visible(&principal.permissions),
            expires_at: session.valid_before,
        })
    }

    /// Change a password after checking the old one, then revoke every
    /// session of the account.
    pub async fn change_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let principal = self.credentials.verify(username, old_password).await?;
        self.credentials
            .update_password(principal.user.id, new_password)
            .await?;
        let revoked = self.sessions.revoke_all(principal.user.id).await?;

        info!(
            user_id = principal.user.id,
            revoked_sessions = revoked,
            "Password changed"
        );
        Ok(())
    }

    /// Full permission set of a user.
    pub async fn get_permissions(&self, username: &str) -> Result<PermissionsView> {
        let principal = self.credentials.principal_by_username(username).await?;
        Ok(PermissionsView::full(&principal.permissions))
    }

    /// Apply `changes` to another user's permissions on behalf of `caller`.
    ///
    /// The caller's rank is checked before the target is even looked up.
    pub async fn set_permissions(
        &self,
        caller: &AuthContext,
        target_username: &str,
        changes: &PermissionChanges,
    ) -> Result<PermissionsView> {
        if !caller.permissions.is_elevated() {
            warn!(
                user_id = caller.user.id,
                target = %target_username,
                "Permission change refused: caller is not an admin"
            );
            return Err(TeahouseError::Forbidden(
                "admin permission required".to_string(),
            ));
        }

        let target = self.credentials.principal_by_username(target_username).await?;
        check_elevated(&caller.permissions, &target.permissions, changes)?;

        // Only the requested flags are written, against the current row.
        if !self
            .credentials
            .store_permissions(target.user.id, &changes.mutable_flags())
            .await?
        {
            return Err(TeahouseError::Forbidden(
                "master permissions cannot be modified".to_string(),
            ));
        }

        info!(
            caller = caller.user.id,
            target = target.user.id,
            "Permissions updated"
        );
        let updated = self.credentials.principal(target.user.id).await?;
        Ok(PermissionsView::full(&updated.permissions))
    }

    /// Make a user master. There is no HTTP route for this; it is how the
    /// first administrator comes to exist.
    pub async fn grant_master(&self, username: &str) -> Result<()> {
        let principal = self.credentials.principal_by_username(username).await?;
        self.credentials.set_master(principal.user.id, true).await?;

        info!(user_id = principal.user.id, username = %username, "Master granted");
        Ok(())
    }
}
