//! Error types for the OAuth demo server.
//!
//! Uses `thiserror` for structured error handling. `OAuthError` variants map
//! one-to-one onto the error codes of RFC 6749 §4.1.2.1 and §5.2.

use axum::http::StatusCode;

/// Errors raised by the OAuth engine.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OAuthError {
    /// Missing or malformed request parameter.
    #[error("invalid_request: {0}")]
    InvalidRequest(String),

    /// Client authentication failed or the client is unknown.
    #[error("invalid_client: {0}")]
    InvalidClient(String),

    /// Authorization code or refresh token is invalid, expired or revoked.
    #[error("invalid_grant: {0}")]
    InvalidGrant(String),

    /// The client may not use this grant.
    #[error("unauthorized_client: {0}")]
    UnauthorizedClient(String),

    /// Grant type is not supported by this server.
    #[error("unsupported_grant_type: {0}")]
    UnsupportedGrantType(String),

    /// Response type is not supported by this server.
    #[error("unsupported_response_type: {0}")]
    UnsupportedResponseType(String),

    /// Requested scope exceeds what was granted.
    #[error("invalid_scope: {0}")]
    InvalidScope(String),

    /// The resource owner denied the request.
    #[error("access_denied: {0}")]
    AccessDenied(String),

    /// Redirect URI does not match the client's registered domain.
    #[error("invalid_redirect_uri: {0}")]
    InvalidRedirectUri(String),

    /// Bearer token is missing, unknown or expired.
    #[error("invalid_access_token: {0}")]
    InvalidAccessToken(String),

    /// Unexpected internal failure.
    #[error("server_error: {0}")]
    ServerError(String),
}

impl OAuthError {
    #[must_use]
    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self::InvalidRequest(detail.into())
    }

    #[must_use]
    pub fn invalid_client(detail: impl Into<String>) -> Self {
        Self::InvalidClient(detail.into())
    }

    #[must_use]
    pub fn invalid_grant(detail: impl Into<String>) -> Self {
        Self::InvalidGrant(detail.into())
    }

    /// The RFC 6749 `error` code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidClient(_) => "invalid_client",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::UnauthorizedClient(_) => "unauthorized_client",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::UnsupportedResponseType(_) => "unsupported_response_type",
            Self::InvalidScope(_) => "invalid_scope",
            Self::AccessDenied(_) => "access_denied",
            Self::InvalidRedirectUri(_) => "invalid_redirect_uri",
            Self::InvalidAccessToken(_) => "invalid_access_token",
            Self::ServerError(_) => "server_error",
        }
    }

    /// The human-readable `error_description`.
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::InvalidRequest(d)
            | Self::InvalidClient(d)
            | Self::InvalidGrant(d)
            | Self::UnauthorizedClient(d)
            | Self::UnsupportedGrantType(d)
            | Self::UnsupportedResponseType(d)
            | Self::InvalidScope(d)
            | Self::AccessDenied(d)
            | Self::InvalidRedirectUri(d)
            | Self::InvalidAccessToken(d)
            | Self::ServerError(d) => d,
        }
    }

    /// HTTP status used when the error is returned directly to the caller.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidClient(_) | Self::InvalidAccessToken(_) => StatusCode::UNAUTHORIZED,
            Self::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Invalid startup configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A required value is empty.
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the offending setting
        field: &'static str,
    },

    /// The client redirect domain is not a usable absolute URL.
    #[error("invalid redirect domain {domain:?}: {reason}")]
    InvalidDomain {
        /// The configured domain
        domain: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Result type alias for engine operations.
pub type OAuthResult<T> = Result<T, OAuthError>;
