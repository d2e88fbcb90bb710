//! Token manager: issues, exchanges, refreshes and validates tokens.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::clients::ClientStore;
use super::generate::{TokenKind, generate};
use super::pkce;
use super::store::TokenStore;
use super::types::{AccessToken, AccessTokenInfo, AuthCode, Client, CodeChallenge, RefreshToken, TokenGrant};
use crate::error::{OAuthError, OAuthResult};

/// Token type announced in every token response.
pub const TOKEN_TYPE: &str = "Bearer";

/// Lifetimes for one grant type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenConfig {
    pub access_token_exp: Duration,
    pub refresh_token_exp: Duration,
    pub generate_refresh: bool,
}

/// Lifetimes for every grant type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Authorization code lifetime (10 minutes).
    pub authorize_code_exp: Duration,
    /// Authorization code grant: 2 hour access, 72 hour refresh.
    pub authorize_code_token: TokenConfig,
    /// Implicit grant: 1 hour access, no refresh.
    pub implicit_token: TokenConfig,
    /// Client credentials grant: 2 hour access, no refresh.
    pub client_credentials_token: TokenConfig,
    /// Refresh grant: rotated pair, refresh lifetime restarts.
    pub refresh_token: TokenConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        const HOUR: u64 = 3600;
        Self {
            authorize_code_exp: Duration::from_secs(600),
            authorize_code_token: TokenConfig {
                access_token_exp: Duration::from_secs(2 * HOUR),
                refresh_token_exp: Duration::from_secs(72 * HOUR),
                generate_refresh: true,
            },
            implicit_token: TokenConfig {
                access_token_exp: Duration::from_secs(HOUR),
                refresh_token_exp: Duration::ZERO,
                generate_refresh: false,
            },
            client_credentials_token: TokenConfig {
                access_token_exp: Duration::from_secs(2 * HOUR),
                refresh_token_exp: Duration::ZERO,
                generate_refresh: false,
            },
            refresh_token: TokenConfig {
                access_token_exp: Duration::from_secs(2 * HOUR),
                refresh_token_exp: Duration::from_secs(72 * HOUR),
                generate_refresh: true,
            },
        }
    }
}

/// Owns the client registry and token storage.
#[derive(Debug, Clone)]
pub struct Manager {
    config: ManagerConfig,
    clients: ClientStore,
    tokens: Arc<TokenStore>,
}

impl Manager {
    #[must_use]
    pub fn new(config: ManagerConfig, clients: ClientStore) -> Self {
        Self { config, clients, tokens: Arc::new(TokenStore::new()) }
    }

    #[must_use]
    pub const fn config(&self) -> &ManagerConfig {
        &self.config
    }

    #[must_use]
    pub const fn clients(&self) -> &ClientStore {
        &self.clients
    }

    #[must_use]
    pub const fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    pub async fn get_client(&self, client_id: &str) -> OAuthResult<Client> {
        self.clients
            .get(client_id)
            .await
            .ok_or_else(|| OAuthError::invalid_client(format!("Unknown client_id '{client_id}'")))
    }

    /// Look up a client and check its secret.
    pub async fn authenticate_client(&self, client_id: &str, client_secret: &str) -> OAuthResult<Client> {
        let client = self.get_client(client_id).await?;
        if client.secret != client_secret {
            return Err(OAuthError::invalid_client("Client authentication failed"));
        }
        Ok(client)
    }

    /// Issue an authorization code for an approved request.
    pub async fn issue_code(
        &self,
        client_id: &str,
        user_id: &str,
        redirect_uri: &str,
        scope: &str,
        challenge: Option<CodeChallenge>,
    ) -> String {
        let code = generate(TokenKind::Code, client_id, user_id);

        self.tokens
            .insert_code(
                code.clone(),
                AuthCode {
                    client_id: client_id.to_owned(),
                    user_id: user_id.to_owned(),
                    redirect_uri: redirect_uri.to_owned(),
                    scope: scope.to_owned(),
                    challenge,
                    created_at: Instant::now(),
                    expires_in: self.config.authorize_code_exp,
                },
            )
            .await;

        code
    }

    /// Issue an access token directly from the authorization endpoint.
    pub async fn issue_implicit_token(&self, client_id: &str, user_id: &str, scope: &str) -> TokenGrant {
        self.issue_tokens(&self.config.implicit_token, client_id, user_id, scope).await
    }

    /// Exchange an authorization code for tokens.
    ///
    /// The code is consumed even when a later check fails.
    pub async fn exchange_code(
        &self,
        client: &Client,
        code: &str,
        redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> OAuthResult<TokenGrant> {
        let Some(auth_code) = self.tokens.take_code(code).await else {
            return Err(OAuthError::invalid_grant("Invalid or expired authorization code"));
        };

        if auth_code.client_id != client.id {
            return Err(OAuthError::invalid_grant("Authorization code was issued to another client"));
        }
        if auth_code.redirect_uri != redirect_uri {
            return Err(OAuthError::invalid_grant("redirect_uri mismatch"));
        }

        if let Some(ref challenge) = auth_code.challenge {
            let Some(verifier) = code_verifier else {
                return Err(OAuthError::invalid_grant("Missing code_verifier"));
            };
            if !pkce::verify(challenge.method, verifier, &challenge.challenge) {
                return Err(OAuthError::invalid_grant("PKCE verification failed"));
            }
        }

        Ok(self
            .issue_tokens(
                &self.config.authorize_code_token,
                &auth_code.client_id,
                &auth_code.user_id,
                &auth_code.scope,
            )
            .await)
    }

    /// Issue an access token to an authenticated client acting on its own behalf.
    pub async fn client_credentials(&self, client: &Client, scope: &str) -> TokenGrant {
        let user_id = client.user_id.as_deref().unwrap_or_default();
        self.issue_tokens(&self.config.client_credentials_token, &client.id, user_id, scope).await
    }

    /// Rotate a refresh token: revoke the old pair and issue a new one.
    ///
    /// A requested scope must be a subset of the originally granted scope.
    pub async fn refresh(
        &self,
        client: &Client,
        refresh_token: &str,
        scope: Option<&str>,
    ) -> OAuthResult<TokenGrant> {
        let Some(old) = self.tokens.take_refresh(refresh_token).await else {
            return Err(OAuthError::invalid_grant("Invalid or expired refresh token"));
        };

        if old.client_id != client.id {
            self.tokens.restore_refresh(refresh_token.to_owned(), old).await;
            return Err(OAuthError::invalid_grant("Refresh token was issued to another client"));
        }

        let scope = match scope.filter(|s| !s.is_empty()) {
            Some(requested) if !is_scope_subset(requested, &old.scope) => {
                let granted = old.scope.clone();
                self.tokens.restore_refresh(refresh_token.to_owned(), old).await;
                return Err(OAuthError::InvalidScope(format!(
                    "Requested scope '{requested}' exceeds granted scope '{granted}'"
                )));
            }
            Some(requested) => requested.to_owned(),
            None => old.scope.clone(),
        };

        self.tokens.remove_access(&old.access_token).await;

        Ok(self.issue_tokens(&self.config.refresh_token, &old.client_id, &old.user_id, &scope).await)
    }

    /// Resolve a bearer token to what it grants.
    pub async fn load_access_token(&self, token: &str) -> OAuthResult<AccessTokenInfo> {
        self.tokens
            .with_access(token, |access| AccessTokenInfo {
                client_id: access.client_id.clone(),
                user_id: access.user_id.clone(),
                scope: access.scope.clone(),
                expires_in: access.remaining_secs(),
            })
            .await
            .ok_or_else(|| OAuthError::InvalidAccessToken("Invalid or expired access token".to_string()))
    }

    async fn issue_tokens(&self, cfg: &TokenConfig, client_id: &str, user_id: &str, scope: &str) -> TokenGrant {
        let access = generate(TokenKind::Access, client_id, user_id);
        let now = Instant::now();

        self.tokens
            .insert_access(
                access.clone(),
                AccessToken {
                    client_id: client_id.to_owned(),
                    user_id: user_id.to_owned(),
                    scope: scope.to_owned(),
                    created_at: now,
                    expires_in: cfg.access_token_exp,
                },
            )
            .await;

        let refresh = if cfg.generate_refresh {
            let refresh = generate(TokenKind::Refresh, client_id, user_id);
            self.tokens
                .insert_refresh(
                    refresh.clone(),
                    RefreshToken {
                        client_id: client_id.to_owned(),
                        user_id: user_id.to_owned(),
                        scope: scope.to_owned(),
                        access_token: access.clone(),
                        created_at: now,
                        expires_in: cfg.refresh_token_exp,
                    },
                )
                .await;
            Some(refresh)
        } else {
            None
        };

        TokenGrant {
            access_token: access,
            token_type: TOKEN_TYPE.to_string(),
            expires_in: cfg.access_token_exp.as_secs(),
            refresh_token: refresh,
            scope: scope.to_owned(),
        }
    }
}

/// Check that a redirect URI lives under a client's registered domain.
///
/// Scheme and port must match; the host must equal the domain host or be a
/// subdomain of it.
pub fn validate_redirect_uri(domain: &str, redirect_uri: &str) -> OAuthResult<()> {
    let invalid = |reason: &str| OAuthError::InvalidRedirectUri(format!("{redirect_uri}: {reason}"));

    let base = url::Url::parse(domain).map_err(|_| invalid("client domain is not a valid URL"))?;
    let redirect = url::Url::parse(redirect_uri).map_err(|_| invalid("not a valid absolute URL"))?;

    if redirect.fragment().is_some() {
        return Err(invalid("must not contain a fragment"));
    }
    if base.scheme() != redirect.scheme() {
        return Err(invalid("scheme does not match the client domain"));
    }
    if base.port_or_known_default() != redirect.port_or_known_default() {
        return Err(invalid("port does not match the client domain"));
    }

    let (Some(base_host), Some(host)) = (base.host_str(), redirect.host_str()) else {
        return Err(invalid("missing host"));
    };
    let base_host = base_host.to_ascii_lowercase();
    let host = host.to_ascii_lowercase();
    let is_subdomain = host.strip_suffix(base_host.as_str()).is_some_and(|prefix| prefix.ends_with('.'));
    if host != base_host && !is_subdomain {
        return Err(invalid("host is outside the client domain"));
    }

    Ok(())
}

/// Whether every space-separated scope in `requested` appears in `granted`.
pub fn is_scope_subset(requested: &str, granted: &str) -> bool {
    requested.split_whitespace().all(|s| granted.split_whitespace().any(|g| g == s))
}
