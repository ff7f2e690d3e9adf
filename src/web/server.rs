//! Web server for Teahouse.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use crate::auth::SessionManager;
use crate::config::Config;
use crate::{Database, Result, TeahouseError};

use super::router::{create_health_router, create_router};
use super::state::AppState;

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Allowed CORS origins.
    cors_origins: Vec<String>,
    /// Seconds between expired-session purges; 0 disables the task.
    purge_interval_secs: u64,
}

impl WebServer {
    /// Create a new web server over `db`.
    pub fn new(config: &Config, db: Database) -> Result<Self> {
        config.validate()?;

        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| TeahouseError::Config(format!("invalid server address: {e}")))?;

        Ok(Self {
            addr,
            app_state: Arc::new(AppState::new(db, config)),
            cors_origins: config.web.cors_origins.clone(),
            purge_interval_secs: config.session.purge_interval_secs,
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shared application state.
    pub fn state(&self) -> Arc<AppState> {
        self.app_state.clone()
    }

    fn router(&self) -> Router {
        create_router(self.app_state.clone(), &self.cors_origins).merge(create_health_router())
    }

    /// Start the expired session purge task.
    ///
    /// Expiry is enforced lazily on every lookup; this only reclaims rows.
    fn start_session_purge_task(sessions: SessionManager, interval_secs: u64) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;

                match sessions.purge_expired().await {
                    Ok(0) => tracing::debug!("No expired sessions to purge"),
                    Ok(count) => tracing::info!(deleted_count = count, "Purged expired sessions"),
                    Err(e) => tracing::warn!(error = %e, "Failed to purge expired sessions"),
                }
            }
        });
    }

    async fn bind(&self) -> std::io::Result<(TcpListener, SocketAddr)> {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        if self.purge_interval_secs > 0 {
            Self::start_session_purge_task(
                self.app_state.sessions.clone(),
                self.purge_interval_secs,
            );
            tracing::info!(
                interval_secs = self.purge_interval_secs,
                "Session purge task started"
            );
        }

        tracing::info!("Web server listening on http://{}", local_addr);
        Ok((listener, local_addr))
    }

    /// Run the web server.
    pub async fn run(self) -> std::io::Result<()> {
        let router = self.router();
        let (listener, _) = self.bind().await?;
        axum::serve(listener, router).await
    }

    /// Run the server in the background and return the bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let router = self.router();
        let (listener, local_addr) = self.bind().await?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
