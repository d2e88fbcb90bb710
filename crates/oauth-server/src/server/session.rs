//! Cookie-backed in-memory sessions.
//!
//! Session data lives in a `moka` cache keyed by a random id; the id travels
//! in an `HttpOnly` cookie. Idle sessions expire after the configured TTL.

use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use moka::future::Cache;

use crate::config::defaults;
use crate::oauth::FormValues;

/// Per-browser state kept between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionData {
    /// User who logged in and has not yet completed an authorization.
    pub logged_in_user_id: Option<String>,
    /// Authorization request parameters stashed while the user logs in.
    pub return_form: Option<FormValues>,
}

/// Store of all live sessions.
#[derive(Clone)]
pub struct SessionStore {
    cache: Cache<String, SessionData>,
    cookie_name: String,
}

impl SessionStore {
    #[must_use]
    pub fn new(cookie_name: impl Into<String>, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(defaults::SESSION_MAX_CAPACITY).time_to_idle(ttl).build();
        Self { cache, cookie_name: cookie_name.into() }
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Load the session named by the request cookie, or start a new one.
    ///
    /// An unknown or expired id is never adopted: a fresh id is minted and the
    /// cookie in the returned jar is replaced.
    pub async fn start(&self, jar: CookieJar) -> (CookieJar, Session) {
        if let Some(id) = jar.get(&self.cookie_name).map(|c| c.value().to_owned()) {
            if let Some(data) = self.cache.get(&id).await {
                return (jar, Session { id, data, cache: self.cache.clone() });
            }
        }

        let id = uuid::Uuid::new_v4().simple().to_string();
        let cookie = Cookie::build((self.cookie_name.clone(), id.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax);

        let session = Session { id, data: SessionData::default(), cache: self.cache.clone() };
        session.save().await;

        tracing::debug!(session_id = %session.id, "Started new session");

        (jar.add(cookie), session)
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").field("cookie_name", &self.cookie_name).finish()
    }
}

/// A loaded session. Changes are local until [`Session::save`].
pub struct Session {
    id: String,
    data: SessionData,
    cache: Cache<String, SessionData>,
}

impl Session {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn data(&self) -> &SessionData {
        &self.data
    }

    #[must_use]
    pub fn logged_in_user(&self) -> Option<&str> {
        self.data.logged_in_user_id.as_deref()
    }

    pub fn set_logged_in_user(&mut self, user_id: impl Into<String>) {
        self.data.logged_in_user_id = Some(user_id.into());
    }

    pub fn take_logged_in_user(&mut self) -> Option<String> {
        self.data.logged_in_user_id.take()
    }

    /// Client id of the stashed authorization request, if any.
    #[must_use]
    pub fn pending_client_id(&self) -> Option<&str> {
        self.data.return_form.as_ref().and_then(|form| form.get_non_empty("client_id"))
    }

    pub fn set_return_form(&mut self, form: FormValues) {
        self.data.return_form = Some(form);
    }

    pub fn take_return_form(&mut self) -> Option<FormValues> {
        self.data.return_form.take()
    }

    /// Persist the session data.
    pub async fn save(&self) {
        self.cache.insert(self.id.clone(), self.data.clone()).await;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("id", &self.id).field("data", &self.data).finish()
    }
}
