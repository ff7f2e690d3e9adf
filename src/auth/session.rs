//! Session management for Teahouse.
//!
//! Sessions are stored rows looked up by their UUID token. Validity is
//! decided lazily at lookup time from the wall clock; nothing sweeps expired
//! rows unless [`SessionManager::purge_expired`] is called.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::cache::TtlCache;
use crate::db::{Session, SessionRepository, User};
use crate::{datetime, Database, Result, TeahouseError};

/// Lifetime of a session created without "remember me".
pub const DEFAULT_SESSION_LIFETIME_HOURS: i64 = 24;

/// Longest accepted session lifetime: one hundred years.
pub const MAX_SESSION_LIFETIME_HOURS: i64 = 100 * 365 * 24;

/// Issues, looks up and revokes session tokens.
#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    cache: Arc<TtlCache<String, Session>>,
    lifetime: Duration,
}

impl SessionManager {
    /// Create a manager with the default one day lifetime.
    pub fn new(db: Database, cache: Arc<TtlCache<String, Session>>) -> Self {
        Self {
            db,
            cache,
            lifetime: Duration::hours(DEFAULT_SESSION_LIFETIME_HOURS),
        }
    }

    /// Override the lifetime of non-remembered sessions.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Lifetime of non-remembered sessions.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issue a new session for `user`.
    ///
    /// Storage failures surface as [`TeahouseError::Storage`] and are not
    /// retried.
    pub async fn create(&self, user: &User, remember_me: bool) -> Result<Session> {
        let now = datetime::now();
        let valid_before = if remember_me {
            None
        } else {
            let expiry = now.checked_add_signed(self.lifetime).ok_or_else(|| {
                TeahouseError::Config("session lifetime is out of range".to_string())
            })?;
            Some(expiry)
        };
        let session = Session {
            token: Uuid::new_v4().to_string(),
            user_id: user.id,
            valid_after: now,
            valid_before,
        };

        SessionRepository::new(self.db.pool())
            .create(&session)
            .await?;

        info!(
            user_id = user.id,
            remember_me = remember_me,
            "Session created"
        );
        Ok(session)
    }

    /// Fetch a session by exact token.
    pub async fn lookup(&self, token: &str) -> Result<Session> {
        let key = token.to_string();
        self.cache
            .get_or_load(&key, || async {
                SessionRepository::new(self.db.pool())
                    .get_by_token(token)
                    .await
            })
            .await?
            .ok_or_else(|| TeahouseError::NotFound("session".to_string()))
    }

    /// Check a session against the current wall clock.
    pub fn is_valid(&self, session: &Session) -> bool {
        session.is_valid_at(datetime::now())
    }

    /// Check a session against an explicit instant.
    pub fn is_valid_at(&self, session: &Session, now: DateTime<Utc>) -> bool {
        session.is_valid_at(now)
    }

    /// Revoke one session. Revoking an unknown token is a no-op.
    pub async fn revoke(&self, token: &str) -> Result<()> {
        let deleted = SessionRepository::new(self.db.pool())
            .delete(token)
            .await?;
        self.cache.invalidate(&token.to_string());

        debug!(deleted = deleted, "Session revoked");
        Ok(())
    }

    /// Revoke every session owned by `user_id`.
    ///
    /// A single delete statement removes every row that exists when it runs.
    /// A session created concurrently may or may not survive.
    pub async fn revoke_all(&self, user_id: i64) -> Result<u64> {
        let deleted = SessionRepository::new(self.db.pool())
            .delete_all_for_user(user_id)
            .await?;
        self.cache
            .invalidate_where(|_, session| session.user_id == user_id);

        info!(user_id = user_id, count = deleted, "All sessions revoked");
        Ok(deleted)
    }

    /// Delete sessions whose expiry has passed.
    pub async fn purge_expired(&self) -> Result<u64> {
        let now = datetime::now();
        let purged = SessionRepository::new(self.db.pool())
            .delete_expired(now)
            .await?;
        self.cache
            .invalidate_where(|_, session| !session.is_valid_at(now));
        self.cache.evict_expired();

        if purged > 0 {
            info!(count = purged, "Expired sessions purged");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};

    async fn setup() -> (SessionManager, User, Database) {
        let db = Database::open_in_memory().await.unwrap();
        let (user, _) = UserRepository::new(db.pool())
            .create(&NewUser::new("alice", "a@x.com", "hash"))
            .await
            .unwrap();
        let cache = Arc::new(TtlCache::new(std::time::Duration::from_secs(60)));
        (SessionManager::new(db.clone(), cache), user, db)
    }

    async fn insert_session(db: &Database, session: &Session) {
        SessionRepository::new(db.pool())
            .create(session)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_session_expires_after_one_day() {
        let (manager, user, _db) = setup().await;
        let before = datetime::now();

        let session = manager.create(&user, false).await.unwrap();

        assert_eq!(session.user_id, user.id);
        assert!(session.valid_after >= before);
        assert_eq!(
            session.valid_before,
            Some(session.valid_after + Duration::days(1))
        );
        assert!(manager.is_valid(&session));
    }

    #[tokio::test]
    async fn test_create_remembered_session_never_expires() {
        let (manager, user, _db) = setup().await;

        let session = manager.create(&user, true).await.unwrap();

        assert!(session.is_persistent());
        assert!(manager.is_valid_at(&session, session.valid_after + Duration::days(10_000)));
    }

    #[tokio::test]
    async fn test_tokens_are_unique_uuids() {
        let (manager, user, _db) = setup().await;

        let a = manager.create(&user, false).await.unwrap();
        let b = manager.create(&user, false).await.unwrap();

        assert_ne!(a.token, b.token);
        assert!(Uuid::parse_str(&a.token).is_ok());
    }

    #[tokio::test]
    async fn test_custom_lifetime() {
        let (manager, user, _db) = setup().await;
        let manager = manager.with_lifetime(Duration::hours(2));

        let session = manager.create(&user, false).await.unwrap();
        assert_eq!(
            session.valid_before,
            Some(session.valid_after + Duration::hours(2))
        );
    }

    #[tokio::test]
    async fn test_out_of_range_lifetime_is_an_error() {
        let (manager, user, db) = setup().await;
        let manager = manager.with_lifetime(Duration::MAX);

        let result = manager.create(&user, false).await;
        assert!(matches!(result, Err(TeahouseError::Config(_))));
        assert_eq!(
            SessionRepository::new(db.pool())
                .count_for_user(user.id)
                .await
                .unwrap(),
            0
        );

        // Remembered sessions never expire, so the lifetime is not used.
        assert!(manager.create(&user, true).await.is_ok());
    }

    #[tokio::test]
    async fn test_lookup() {
        let (manager, user, _db) = setup().await;
        let created = manager.create(&user, false).await.unwrap();

        let found = manager.lookup(&created.token).await.unwrap();
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn test_lookup_unknown_token() {
        let (manager, _user, _db) = setup().await;

        let result = manager.lookup("no-such-token").await;
        assert!(matches!(result, Err(TeahouseError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_lookup_expired_session_is_found_but_invalid() {
        let (manager, user, db) = setup().await;
        let now = datetime::now();
        let expired = Session {
            token: "expired".to_string(),
            user_id: user.id,
            valid_after: now - Duration::days(2),
            valid_before: Some(now - Duration::days(1)),
        };
        insert_session(&db, &expired).await;

        let found = manager.lookup("expired").await.unwrap();
        assert!(!manager.is_valid(&found));
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let (manager, user, _db) = setup().await;
        let session = manager.create(&user, false).await.unwrap();
        manager.lookup(&session.token).await.unwrap();

        manager.revoke(&session.token).await.unwrap();
        manager.revoke(&session.token).await.unwrap();
        manager.revoke("never-existed").await.unwrap();

        let result = manager.lookup(&session.token).await;
        assert!(matches!(result, Err(TeahouseError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_revoke_all() {
        let (manager, user, db) = setup().await;
        let (other, _) = UserRepository::new(db.pool())
            .create(&NewUser::new("bob", "b@x.com", "hash"))
            .await
            .unwrap();

        let a = manager.create(&user, false).await.unwrap();
        let b = manager.create(&user, true).await.unwrap();
        let c = manager.create(&other, false).await.unwrap();
        // Warm the cache so revocation has to evict.
        manager.lookup(&a.token).await.unwrap();
        manager.lookup(&b.token).await.unwrap();

        assert_eq!(manager.revoke_all(user.id).await.unwrap(), 2);

        assert!(manager.lookup(&a.token).await.is_err());
        assert!(manager.lookup(&b.token).await.is_err());
        assert!(manager.lookup(&c.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (manager, user, db) = setup().await;
        let now = datetime::now();
        insert_session(
            &db,
            &Session {
                token: "stale".to_string(),
                user_id: user.id,
                valid_after: now - Duration::days(2),
                valid_before: Some(now - Duration::days(1)),
            },
        )
        .await;
        let live = manager.create(&user, false).await.unwrap();

        assert_eq!(manager.purge_expired().await.unwrap(), 1);
        assert!(manager.lookup("stale").await.is_err());
        assert!(manager.lookup(&live.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_works_without_cache() {
        let db = Database::open_in_memory().await.unwrap();
        let (user, _) = UserRepository::new(db.pool())
            .create(&NewUser::new("alice", "a@x.com", "hash"))
            .await
            .unwrap();
        let manager = SessionManager::new(db, Arc::new(TtlCache::disabled()));

        let session = manager.create(&user, false).await.unwrap();
        assert_eq!(manager.lookup(&session.token).await.unwrap(), session);
        manager.revoke(&session.token).await.unwrap();
        assert!(manager.lookup(&session.token).await.is_err());
    }
}
