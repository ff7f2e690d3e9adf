//! Shared application state.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::auth::{AccountService, AuthorizationGate, CredentialStore, SessionManager};
use crate::cache::TtlCache;
use crate::config::Config;
use crate::news::NewsService;
use crate::Database;

/// Services shared across handlers.
///
/// Every component receives its storage and cache handles here; nothing is
/// global.
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub sessions: SessionManager,
    pub gate: AuthorizationGate,
    pub news: NewsService,
    /// Largest request body the token extractor will buffer.
    pub max_body_bytes: usize,
}

impl AppState {
    /// Wire up every service over `db`.
    pub fn new(db: Database, config: &Config) -> Self {
        let mut sessions = SessionManager::new(db.clone(), cache(config));
        match chrono::Duration::try_hours(config.session.lifetime_hours) {
            Some(lifetime) => sessions = sessions.with_lifetime(lifetime),
            None => warn!(
                lifetime_hours = config.session.lifetime_hours,
                "Session lifetime out of range, keeping the default"
            ),
        }
        let credentials = CredentialStore::new(db.clone(), cache(config));

        Self {
            accounts: AccountService::new(credentials.clone(), sessions.clone()),
            gate: AuthorizationGate::new(sessions.clone(), credentials),
            sessions,
            news: NewsService::new(db),
            max_body_bytes: config.server.max_body_bytes,
        }
    }
}

fn cache<K, V>(config: &Config) -> Arc<TtlCache<K, V>>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    if config.cache.enabled {
        Arc::new(TtlCache::new(Duration::from_secs(config.cache.ttl_secs)))
    } else {
        Arc::new(TtlCache::disabled())
    }
}
