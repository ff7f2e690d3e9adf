//! Credential store: user accounts, password checks and permission records.
//!
//! User and permission rows are read through a principal cache keyed by user
//! id. Every write here invalidates the affected entry.

use std::sync::Arc;

use tracing::{info, warn};

use super::password::{
    hash_password, validate_password, verify_password_or_dummy, PasswordError,
};
use super::validation::{validate_email, validate_username};
use crate::cache::TtlCache;
use crate::db::{
    NewUser, Permissions, PermissionsRepository, PermissionsUpdate, User, UserRepository,
};
use crate::{Database, Result, TeahouseError};

/// A user together with its permission record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user: User,
    pub permissions: Permissions,
}

/// Registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
}

impl Registration {
    /// Create a registration request.
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Owns user records and their permissions.
#[derive(Clone)]
pub struct CredentialStore {
    db: Database,
    principals: Arc<TtlCache<i64, Principal>>,
}

impl CredentialStore {
    /// Create a store over `db` using `principals` as read-through cache.
    pub fn new(db: Database, principals: Arc<TtlCache<i64, Principal>>) -> Self {
        Self { db, principals }
    }

    /// Register a new account with default permissions.
    pub async fn register(&self, registration: &Registration) -> Result<Principal> {
        validate_username(&registration.username)?;
        validate_email(&registration.email)?;
        validate_password(&registration.password)?;

        let hash = hash_password(&registration.password)?;
        let new_user = NewUser::new(&registration.username, &registration.email, hash);
        let (user, permissions) = UserRepository::new(self.db.pool())
            .create(&new_user)
            .await?;

        info!(user_id = user.id, username = %user.username, "User registered");
        Ok(Principal { user, permissions })
    }

    /// Verify a username/password pair.
    ///
    /// Unknown users and wrong passwords both fail with
    /// [`TeahouseError::InvalidCredentials`].
    pub async fn verify(&self, username: &str, password: &str) -> Result<Principal> {
        let user = UserRepository::new(self.db.pool())
            .get_by_username(username)
            .await?;

        // Unknown users still pay for a full hash check.
        match verify_password_or_dummy(password, user.as_ref().map(|u| u.password.as_str())) {
            Ok(()) => {}
            Err(PasswordError::VerificationFailed) => {
                if user.is_some() {
                    warn!(username = %username, "Login failed: wrong password");
                } else {
                    warn!(username = %username, "Login failed: unknown user");
                }
                return Err(TeahouseError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        }

        let Some(user) = user else {
            return Err(TeahouseError::InvalidCredentials);
        };
        self.principal(user.id).await
    }

    /// Load a user and its permissions by id.
    pub async fn principal(&self, user_id: i64) -> Result<Principal> {
        self.principals
            .get_or_load(&user_id, || self.load_principal(user_id))
            .await?
            .ok_or_else(|| TeahouseError::NotFound("user".to_string()))
    }

    /// Load a user and its permissions by username.
    pub async fn principal_by_username(&self, username: &str) -> Result<Principal> {
        let user = UserRepository::new(self.db.pool())
            .get_by_username(username)
            .await?
            .ok_or_else(|| TeahouseError::NotFound("user".to_string()))?;
        self.principal(user.id).await
    }

    async fn load_principal(&self, user_id: i64) -> Result<Option<Principal>> {
        let Some(user) = UserRepository::new(self.db.pool())
            .get_by_id(user_id)
            .await?
        else {
            return Ok(None);
        };

        let permissions = PermissionsRepository::new(self.db.pool())
            .get_for_user(user_id)
            .await?
            .ok_or_else(|| {
                TeahouseError::Storage(format!("user {user_id} has no permission record"))
            })?;

        Ok(Some(Principal { user, permissions }))
    }

    /// Hash and store a new password.
    pub async fn update_password(&self, user_id: i64, new_password: &str) -> Result<()> {
        let hash = hash_password(new_password)?;
        let result = UserRepository::new(self.db.pool())
            .update_password(user_id, &hash)
            .await;
        self.principals.invalidate(&user_id);
        result
    }

    /// Write the flags named in `update`; the others keep their stored value.
    ///
    /// Returns `false` if the user is (now) a master or has no record.
    pub async fn store_permissions(
        &self,
        user_id: i64,
        update: &PermissionsUpdate,
    ) -> Result<bool> {
        let result = PermissionsRepository::new(self.db.pool())
            .update_unless_master(user_id, update)
            .await;
        self.principals.invalidate(&user_id);
        result
    }

    /// Grant or clear master directly. Administrative bootstrap only.
    pub async fn set_master(&self, user_id: i64, master: bool) -> Result<()> {
        let updated = PermissionsRepository::new(self.db.pool())
            .set_master(user_id, master)
            .await;
        self.principals.invalidate(&user_id);

        if !updated? {
            return Err(TeahouseError::NotFound("user".to_string()));
        }
        info!(user_id = user_id, master = master, "Master flag changed");
        Ok(())
    }
}
