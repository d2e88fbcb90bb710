//! HTTP routes: login flow, consent page and the OAuth endpoints.

use std::sync::Arc;

use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::{RawQuery, State},
    http::{HeaderMap, Method, StatusCode, header},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use super::dump;
use super::pages;
use super::session::SessionStore;
use crate::config::Config;
use crate::oauth::{Client, ClientStore, FormValues, Manager, OAuthServer, ServerConfig};

/// Shared state for HTTP handlers.
pub struct AppState {
    pub oauth: OAuthServer,
    pub sessions: SessionStore,
    pub config: Config,
}

impl AppState {
    /// Build the OAuth engine with the configured client registered.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let clients: ClientStore =
            std::iter::once(Client::new(&config.client_id, &config.client_secret, &config.client_domain))
                .collect();
        let manager = Manager::new(config.manager.clone(), clients);
        let oauth = OAuthServer::new(manager, ServerConfig::default());
        let sessions = SessionStore::new(&config.session_cookie_name, config.session_ttl);

        Self { oauth, sessions, config }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").field("config", &self.config).finish()
    }
}

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let dumped = Router::new()
        .route("/auth", get(handle_auth))
        .route("/oauth/authorize", get(handle_authorize).post(handle_authorize))
        .route("/oauth/token", post(handle_token));
    let dumped = if state.config.dump_requests {
        dumped.route_layer(middleware::from_fn(dump::dump_request))
    } else {
        dumped
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/login", get(handle_login_page).post(handle_login))
        .route("/oauth/validate", get(handle_validate))
        .route("/.well-known/oauth-authorization-server", get(handle_metadata))
        .merge(dumped)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "oauth-server",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.sessions.session_count().await
    }))
}

/// `GET /.well-known/oauth-authorization-server`
async fn handle_metadata(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.oauth.metadata(&state.config.base_url))
}

/// `GET /login`
async fn handle_login_page(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    let (jar, _) = state.sessions.start(jar).await;
    (jar, Html(pages::render_login_page(None)))
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
}

/// `POST /login`
///
/// Accepts any non-empty username, marks the session as logged in and sends
/// the browser on to the consent page.
async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let (jar, mut session) = state.sessions.start(jar).await;

    let username = form.username.trim();
    if username.is_empty() {
        let page = Html(pages::render_login_page(Some("Username is required")));
        return (jar, (StatusCode::BAD_REQUEST, page)).into_response();
    }

    session.set_logged_in_user(username);
    session.save().await;

    tracing::info!(user_id = username, "User logged in");

    (jar, found("/auth")).into_response()
}

/// `GET /auth`
async fn handle_auth(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let (jar, session) = state.sessions.start(jar).await;

    let Some(username) = session.logged_in_user() else {
        return (jar, found("/login")).into_response();
    };

    let page = pages::render_consent_page(username, session.pending_client_id());
    (jar, Html(page)).into_response()
}

/// `GET|POST /oauth/authorize`
///
/// Resumes a request stashed in the session before login, if any. Without a
/// logged-in user the request is stashed and the browser sent to `/login`.
/// A login authorizes exactly one request.
async fn handle_authorize(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    method: Method,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    let (jar, mut session) = state.sessions.start(jar).await;

    let form = match session.take_return_form() {
        Some(form) => form,
        None => request_form(&method, query.as_deref(), &body),
    };
    session.save().await;

    let request = match state.oauth.validate_authorize_request(&form).await {
        Ok(request) => request,
        Err(rejection) => {
            tracing::warn!(error = %rejection.error(), "Authorization request rejected");
            return (jar, rejection).into_response();
        }
    };

    let Some(user_id) = session.take_logged_in_user() else {
        session.set_return_form(form);
        session.save().await;
        tracing::debug!(client_id = %request.client_id, "No logged-in user, redirecting to login");
        return (jar, found("/login")).into_response();
    };
    session.save().await;

    (jar, state.oauth.authorize(&request, &user_id).await).into_response()
}

/// `POST /oauth/token`
async fn handle_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    let form = request_form(&Method::POST, query.as_deref(), &body);
    state.oauth.handle_token_request(&headers, &form).await
}

/// `GET /oauth/validate`
///
/// Reports what the request's bearer token grants.
async fn handle_validate(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    match state.oauth.validate_bearer(&headers).await {
        Ok(info) => Json(info).into_response(),
        Err(err) => crate::oauth::server::error_response(&err),
    }
}

/// Form parameters of a request: body first (POST only), then query string.
fn request_form(method: &Method, query: Option<&str>, body: &[u8]) -> FormValues {
    let mut form = if *method == Method::POST { FormValues::parse(body) } else { FormValues::default() };
    if let Some(query) = query {
        form.extend(FormValues::parse(query.as_bytes()));
    }
    form
}

fn found(location: &'static str) -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, location)])
}
