//! OAuth 2.0 Demo Authorization Server
//!
//! A small authorization server for trying out OAuth clients locally: one
//! client registered from the command line, a username-only login page, a
//! consent page, and the standard authorize / token endpoints.
//!
//! # Features
//!
//! - **Grants**: authorization code (with optional PKCE), implicit, client credentials, refresh
//! - **Sessions**: cookie-backed, in memory, idle expiry
//! - **Request dumps**: optional logging of every OAuth request
//!
//! # Example
//!
//! ```no_run
//! use oauth_server::{config::Config, server::AuthServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = AuthServer::new(Config::default())?;
//!     server.run_http().await
//! }
//! ```

pub mod config;
pub mod error;
pub mod oauth;
pub mod server;

pub use config::Config;
pub use error::{ConfigError, OAuthError};
