//! HTTP server wiring the OAuth engine to the login flow.
//!
//! - [`routes`]: axum router and handlers
//! - [`session`]: cookie-backed in-memory sessions
//! - [`pages`]: login and consent HTML
//! - [`dump`]: request dumping middleware

pub mod dump;
pub mod pages;
pub mod routes;
pub mod session;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Config;
use routes::AppState;

/// The demo authorization server.
pub struct AuthServer {
    state: Arc<AppState>,
}

impl AuthServer {
    /// Create a server with the configured client registered.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self { state: Arc::new(AppState::new(config)) })
    }

    #[must_use]
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Run the HTTP server until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns error on bind or server failure.
    pub async fn run_http(self) -> anyhow::Result<()> {
        let config = &self.state.config;
        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

        Arc::clone(self.state.oauth.manager().tokens()).start_cleanup_task();

        tracing::info!(port = config.port, "Server is running at {} port", config.port);
        tracing::info!("Point your OAuth client Auth endpoint to {}", config.endpoint("/oauth/authorize"));
        tracing::info!("Point your OAuth client Token endpoint to {}", config.endpoint("/oauth/token"));

        let router = routes::create_router(Arc::clone(&self.state));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

        tracing::info!("HTTP server shut down");
        Ok(())
    }
}

impl std::fmt::Debug for AuthServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthServer").field("port", &self.state.config.port).finish()
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for CTRL+C");
        return;
    }
    tracing::info!("Received shutdown signal");
}
