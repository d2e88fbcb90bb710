//! OAuth 2.0 authorization engine.
//!
//! Self-contained: the HTTP glue in [`crate::server`] talks to it only through
//! [`OAuthServer`] and [`Manager`].
//!
//! ## Supported Standards
//! - RFC 6749: Authorization Code, Implicit, Client Credentials and Refresh Token grants
//! - RFC 6750: Bearer token usage
//! - RFC 7636: PKCE (`plain` and `S256`)
//! - RFC 8414: Authorization Server Metadata

pub mod clients;
pub mod generate;
pub mod manager;
pub mod pkce;
pub mod server;
pub mod store;
mod types;

pub use clients::ClientStore;
pub use manager::{Manager, ManagerConfig, TokenConfig};
pub use server::{AuthorizeRejection, AuthorizeRequest, OAuthServer, ServerConfig};
pub use store::TokenStore;
pub use types::{AccessTokenInfo, Client, CodeChallenge, FormValues, GrantType, ResponseType, TokenGrant};
