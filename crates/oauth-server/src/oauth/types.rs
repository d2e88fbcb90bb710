//! OAuth 2.0 data types.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::pkce::CodeChallengeMethod;
use crate::error::OAuthError;

/// A registered OAuth client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub id: String,
    pub secret: String,
    /// Base URL every redirect URI of this client must live under.
    pub domain: String,
    pub user_id: Option<String>,
}

impl Client {
    #[must_use]
    pub fn new(id: impl Into<String>, secret: impl Into<String>, domain: impl Into<String>) -> Self {
        Self { id: id.into(), secret: secret.into(), domain: domain.into(), user_id: None }
    }
}

/// `response_type` values of the authorization endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    /// Authorization code grant.
    Code,
    /// Implicit grant.
    Token,
}

impl ResponseType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Token => "token",
        }
    }
}

impl FromStr for ResponseType {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code" => Ok(Self::Code),
            "token" => Ok(Self::Token),
            other => Err(OAuthError::UnsupportedResponseType(format!(
                "response_type '{other}' is not supported"
            ))),
        }
    }
}

/// `grant_type` values of the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    AuthorizationCode,
    ClientCredentials,
    RefreshToken,
}

impl GrantType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrantType {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authorization_code" => Ok(Self::AuthorizationCode),
            "client_credentials" => Ok(Self::ClientCredentials),
            "refresh_token" => Ok(Self::RefreshToken),
            other => Err(OAuthError::UnsupportedGrantType(format!(
                "grant_type '{other}' is not supported"
            ))),
        }
    }
}

/// A PKCE challenge recorded with an authorization code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeChallenge {
    pub challenge: String,
    pub method: CodeChallengeMethod,
}

/// An authorization code issued after user approval.
pub struct AuthCode {
    pub client_id: String,
    pub user_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub challenge: Option<CodeChallenge>,
    pub created_at: Instant,
    pub expires_in: Duration,
}

/// An access token for API authentication.
pub struct AccessToken {
    pub client_id: String,
    pub user_id: String,
    pub scope: String,
    pub created_at: Instant,
    pub expires_in: Duration,
}

/// A refresh token for obtaining new access tokens.
pub struct RefreshToken {
    pub client_id: String,
    pub user_id: String,
    pub scope: String,
    /// Access token issued alongside, revoked on refresh.
    pub access_token: String,
    pub created_at: Instant,
    pub expires_in: Duration,
}

impl AuthCode {
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.expires_in
    }
}

impl AccessToken {
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.expires_in
    }

    /// Seconds left before expiry, zero once expired.
    pub fn remaining_secs(&self) -> u64 {
        self.expires_in.saturating_sub(self.created_at.elapsed()).as_secs()
    }
}

impl RefreshToken {
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.expires_in
    }
}

/// Tokens issued by a grant, serialized as the RFC 6749 §5.1 response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub scope: String,
}

/// What a valid bearer token grants, returned from validation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AccessTokenInfo {
    pub client_id: String,
    pub user_id: String,
    pub scope: String,
    pub expires_in: u64,
}

/// Ordered form parameters, as decoded from a query string or urlencoded body.
///
/// Lookups return the first value for a key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormValues(Vec<(String, String)>);

impl FormValues {
    /// Decode `application/x-www-form-urlencoded` bytes.
    #[must_use]
    pub fn parse(input: &[u8]) -> Self {
        Self(url::form_urlencoded::parse(input).into_owned().collect())
    }

    /// Append all pairs of `other` after the existing ones.
    pub fn extend(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// First value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// First non-empty value for `key`.
    #[must_use]
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
