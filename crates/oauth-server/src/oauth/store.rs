//! In-memory token store for codes, access tokens and refresh tokens.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use super::types::{AccessToken, AuthCode, RefreshToken};

/// Cleanup interval: 5 minutes.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// In-memory token state.
#[derive(Clone, Default)]
pub struct TokenStore {
    codes: Arc<RwLock<HashMap<String, AuthCode>>>,
    access_tokens: Arc<RwLock<HashMap<String, AccessToken>>>,
    refresh_tokens: Arc<RwLock<HashMap<String, RefreshToken>>>,
}

impl TokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_code(&self, code: String, auth_code: AuthCode) {
        self.codes.write().await.insert(code, auth_code);
    }

    /// Remove and return an authorization code (one-time use).
    ///
    /// Expired codes are removed but not returned.
    pub async fn take_code(&self, code: &str) -> Option<AuthCode> {
        let auth_code = self.codes.write().await.remove(code)?;
        if auth_code.is_expired() {
            return None;
        }
        Some(auth_code)
    }

    pub async fn insert_access(&self, token: String, access: AccessToken) {
        self.access_tokens.write().await.insert(token, access);
    }

    /// Run `f` against a live access token.
    pub async fn with_access<T>(&self, token: &str, f: impl FnOnce(&AccessToken) -> T) -> Option<T> {
        let tokens = self.access_tokens.read().await;
        let access = tokens.get(token)?;
        if access.is_expired() {
            return None;
        }
        Some(f(access))
    }

    pub async fn remove_access(&self, token: &str) {
        self.access_tokens.write().await.remove(token);
    }

    pub async fn insert_refresh(&self, token: String, refresh: RefreshToken) {
        self.refresh_tokens.write().await.insert(token, refresh);
    }

    /// Remove and return a refresh token. Expired tokens are removed but not returned.
    pub async fn take_refresh(&self, token: &str) -> Option<RefreshToken> {
        let refresh = self.refresh_tokens.write().await.remove(token)?;
        if refresh.is_expired() {
            return None;
        }
        Some(refresh)
    }

    /// Put back a refresh token taken by [`Self::take_refresh`].
    pub async fn restore_refresh(&self, token: String, refresh: RefreshToken) {
        self.insert_refresh(token, refresh).await;
    }

    /// Start background cleanup task for expired tokens and codes.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                self.cleanup_expired().await;
            }
        });
    }

    pub async fn cleanup_expired(&self) {
        {
            let mut codes = self.codes.write().await;
            let before = codes.len();
            codes.retain(|_, code| !code.is_expired());
            let removed = before - codes.len();
            if removed > 0 {
                tracing::debug!(count = removed, "Cleaned up expired authorization codes");
            }
        }

        {
            let mut tokens = self.access_tokens.write().await;
            let before = tokens.len();
            tokens.retain(|_, token| !token.is_expired());
            let removed = before - tokens.len();
            if removed > 0 {
                tracing::debug!(count = removed, "Cleaned up expired access tokens");
            }
        }

        {
            let mut tokens = self.refresh_tokens.write().await;
            let before = tokens.len();
            tokens.retain(|_, token| !token.is_expired());
            let removed = before - tokens.len();
            if removed > 0 {
                tracing::debug!(count = removed, "Cleaned up expired refresh tokens");
            }
        }
    }

    /// Number of live entries as `(codes, access, refresh)`.
    pub async fn counts(&self) -> (usize, usize, usize) {
        (
            self.codes.read().await.len(),
            self.access_tokens.read().await.len(),
            self.refresh_tokens.read().await.len(),
        )
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish()
    }
}
