//! Configuration for the OAuth demo server.

use std::time::Duration;

use crate::error::ConfigError;
use crate::oauth::ManagerConfig;

/// Default settings, matching the flags of the demo binary.
pub mod defaults {
    use std::time::Duration;

    /// Client id registered at startup.
    pub const CLIENT_ID: &str = "222222";

    /// Client secret registered at startup.
    pub const CLIENT_SECRET: &str = "22222222";

    /// Base URL the client's redirect URIs must live under.
    pub const CLIENT_DOMAIN: &str = "http://localhost:9094";

    /// Listen port.
    pub const PORT: u16 = 9096;

    /// Name of the session cookie.
    pub const SESSION_COOKIE: &str = "oauth_session";

    /// Sessions idle longer than this are dropped (2 hours).
    pub const SESSION_TTL: Duration = Duration::from_secs(2 * 3600);

    /// Upper bound on live sessions held in memory.
    pub const SESSION_MAX_CAPACITY: u64 = 10_000;
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Dump `/auth`, `/oauth/authorize` and `/oauth/token` requests.
    pub dump_requests: bool,

    /// Id of the single registered client.
    pub client_id: String,

    /// Secret of the single registered client.
    pub client_secret: String,

    /// Redirect domain of the single registered client.
    pub client_domain: String,

    /// Listen port.
    pub port: u16,

    /// Public base URL used in metadata and startup logs.
    pub base_url: String,

    /// Session cookie name.
    pub session_cookie_name: String,

    /// Session idle expiry.
    pub session_ttl: Duration,

    /// Token and code lifetimes.
    pub manager: ManagerConfig,
}

impl Config {
    /// Create a configuration for the given client and port.
    ///
    /// The base URL defaults to `http://localhost:{port}`.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        client_domain: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            dump_requests: true,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            client_domain: client_domain.into(),
            port,
            base_url: format!("http://localhost:{port}"),
            session_cookie_name: defaults::SESSION_COOKIE.to_string(),
            session_ttl: defaults::SESSION_TTL,
            manager: ManagerConfig::default(),
        }
    }

    /// Create a test configuration: default client, request dumping off.
    #[must_use]
    pub fn for_testing() -> Self {
        Self { dump_requests: false, ..Self::default() }
    }

    /// Override the public base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Check that the registered client is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.is_empty() {
            return Err(ConfigError::Empty { field: "client_id" });
        }
        if self.client_secret.is_empty() {
            return Err(ConfigError::Empty { field: "client_secret" });
        }

        let domain = url::Url::parse(&self.client_domain).map_err(|e| {
            ConfigError::InvalidDomain { domain: self.client_domain.clone(), reason: e.to_string() }
        })?;
        if !matches!(domain.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidDomain {
                domain: self.client_domain.clone(),
                reason: format!("unsupported scheme '{}'", domain.scheme()),
            });
        }
        if domain.host_str().is_none() {
            return Err(ConfigError::InvalidDomain {
                domain: self.client_domain.clone(),
                reason: "missing host".to_string(),
            });
        }
        Ok(())
    }

    /// Full URL of an endpoint path under the base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(defaults::CLIENT_ID, defaults::CLIENT_SECRET, defaults::CLIENT_DOMAIN, defaults::PORT)
    }
}
