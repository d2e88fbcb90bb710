//! End-to-end tests of the browser flow: authorize → login → consent → code → token.
//!
//! Drives the axum router directly, carrying the session cookie between
//! requests the way a browser would.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header, request};
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use tower::ServiceExt;

use oauth_server::config::Config;
use oauth_server::server::routes::{AppState, create_router};

const CLIENT_ID: &str = "222222";
const CLIENT_SECRET: &str = "22222222";
const REDIRECT_URI: &str = "http://localhost:9094/oauth2";

/// A router plus the session cookie it handed out.
struct Browser {
    app: Router,
    cookie: Option<String>,
}

impl Browser {
    fn new() -> Self {
        let state = Arc::new(AppState::new(Config::for_testing()));
        Self { app: create_router(state), cookie: None }
    }

    async fn send(&mut self, builder: request::Builder, body: Body) -> Response {
        let builder = match self.cookie {
            Some(ref cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        };
        let response = self.app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();

        if let Some(cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
        {
            self.cookie = Some(cookie.to_string());
        }
        response
    }

    async fn get(&mut self, uri: &str) -> Response {
        self.send(Request::get(uri), Body::empty()).await
    }

    async fn post_form(&mut self, uri: &str, body: &str) -> Response {
        let builder = Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        self.send(builder, Body::from(body.to_string())).await
    }
}

async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

fn location(response: &Response) -> &str {
    response.headers().get(header::LOCATION).unwrap().to_str().unwrap()
}

fn query_pairs(location: &str) -> HashMap<String, String> {
    url::Url::parse(location).unwrap().query_pairs().into_owned().collect()
}

fn authorize_uri(extra: &str) -> String {
    format!(
        "/oauth/authorize?client_id={CLIENT_ID}&redirect_uri={}&response_type=code&state=xyz&scope=all{extra}",
        url_encode(REDIRECT_URI)
    )
}

/// Walk the browser through authorize, login and consent; return the code.
async fn obtain_code(browser: &mut Browser, extra: &str) -> String {
    let response = browser.get(&authorize_uri(extra)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");

    let response = browser.post_form("/login", "username=alice").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/auth");

    let response = browser.get("/auth").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = browser.post_form("/oauth/authorize", "").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let redirect = location(&response).to_string();
    assert!(redirect.starts_with(REDIRECT_URI));

    let pairs = query_pairs(&redirect);
    assert_eq!(pairs["state"], "xyz");
    pairs["code"].clone()
}

async fn exchange_code(browser: &mut Browser, code: &str, extra: &[(&str, &str)]) -> Response {
    let mut params = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", REDIRECT_URI),
        ("client_id", CLIENT_ID),
        ("client_secret", CLIENT_SECRET),
    ];
    params.extend_from_slice(extra);
    let body = serde_urlencoded::to_string(params).unwrap();
    browser.post_form("/oauth/token", &body).await
}

// ─── Login pages ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_auth_without_session_redirects_to_login() {
    let mut browser = Browser::new();

    let response = browser.get("/auth").await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");
    assert!(browser.cookie.as_deref().unwrap().starts_with("oauth_session="));
}

#[tokio::test]
async fn test_login_then_auth_renders_consent() {
    let mut browser = Browser::new();

    let response = browser.get("/login").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains(r#"name="username""#));

    let response = browser.post_form("/login", "username=alice").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/auth");

    let response = browser.get("/auth").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("alice"));
    assert!(html.contains(r#"action="/oauth/authorize""#));
}

#[tokio::test]
async fn test_login_rejects_empty_username() {
    let mut browser = Browser::new();

    let response = browser.post_form("/login", "username=+").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("Username is required"));

    let response = browser.get("/auth").await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_sessions_are_per_cookie() {
    let mut alice = Browser::new();
    alice.post_form("/login", "username=alice").await;

    let mut stranger = Browser { app: alice.app.clone(), cookie: None };
    let response = stranger.get("/auth").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");
    assert_ne!(stranger.cookie, alice.cookie);
}

// ─── Authorization code flow ─────────────────────────────────────────────────

#[tokio::test]
async fn test_full_authorization_code_flow() {
    let mut browser = Browser::new();
    let code = obtain_code(&mut browser, "").await;

    // Exchange
    let response = exchange_code(&mut browser, &code, &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), "no-store");
    assert_eq!(response.headers().get(header::PRAGMA).unwrap(), "no-cache");
    let token = body_json(response).await;
    assert_eq!(token["token_type"], "Bearer");
    assert_eq!(token["expires_in"], 7200);
    assert_eq!(token["scope"], "all");
    let access_token = token["access_token"].as_str().unwrap().to_string();
    let refresh_token = token["refresh_token"].as_str().unwrap().to_string();

    // Validate
    let response = browser
        .send(
            Request::get("/oauth/validate").header(header::AUTHORIZATION, format!("Bearer {access_token}")),
            Body::empty(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let info = body_json(response).await;
    assert_eq!(info["client_id"], CLIENT_ID);
    assert_eq!(info["user_id"], "alice");
    assert_eq!(info["scope"], "all");

    // Refresh
    let body = serde_urlencoded::to_string([
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token.as_str()),
        ("client_id", CLIENT_ID),
        ("client_secret", CLIENT_SECRET),
    ])
    .unwrap();
    let response = browser.post_form("/oauth/token", &body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let refreshed = body_json(response).await;
    assert_ne!(refreshed["access_token"].as_str().unwrap(), access_token);

    // Old access token revoked by the refresh
    let response = browser
        .send(
            Request::get("/oauth/validate").header(header::AUTHORIZATION, format!("Bearer {access_token}")),
            Body::empty(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Code is single use
    let response = exchange_code(&mut browser, &code, &[]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_grant");
}

#[tokio::test]
async fn test_login_is_consumed_by_authorization() {
    let mut browser = Browser::new();
    obtain_code(&mut browser, "").await;

    // The logged-in flag was spent on the authorization
    let response = browser.get("/auth").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");

    // A new authorization request must log in again
    let response = browser.get(&authorize_uri("")).await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_logged_in_user_is_authorized_directly() {
    let mut browser = Browser::new();
    browser.post_form("/login", "username=bob").await;

    let response = browser.get(&authorize_uri("")).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(location(&response).starts_with(REDIRECT_URI));
    assert!(query_pairs(location(&response)).contains_key("code"));
}

#[tokio::test]
async fn test_consent_page_shows_pending_client() {
    let mut browser = Browser::new();
    browser.get(&authorize_uri("")).await;
    browser.post_form("/login", "username=alice").await;

    let html = body_string(browser.get("/auth").await).await;
    assert!(html.contains(CLIENT_ID));
}

#[tokio::test]
async fn test_exchange_with_wrong_redirect_uri() {
    let mut browser = Browser::new();
    let code = obtain_code(&mut browser, "").await;

    let body = serde_urlencoded::to_string([
        ("grant_type", "authorization_code"),
        ("code", code.as_str()),
        ("redirect_uri", "http://localhost:9094/elsewhere"),
        ("client_id", CLIENT_ID),
        ("client_secret", CLIENT_SECRET),
    ])
    .unwrap();
    let response = browser.post_form("/oauth/token", &body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_grant");
}

#[tokio::test]
async fn test_exchange_with_wrong_secret() {
    let mut browser = Browser::new();
    let code = obtain_code(&mut browser, "").await;

    let body = serde_urlencoded::to_string([
        ("grant_type", "authorization_code"),
        ("code", code.as_str()),
        ("redirect_uri", REDIRECT_URI),
        ("client_id", CLIENT_ID),
        ("client_secret", "wrong"),
    ])
    .unwrap();
    let response = browser.post_form("/oauth/token", &body).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::WWW_AUTHENTICATE).is_some());
    assert_eq!(body_json(response).await["error"], "invalid_client");
}

// ─── PKCE ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_pkce_s256_flow() {
    let code_verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    let code_challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(code_verifier.as_bytes()));
    let extra = format!("&code_challenge={code_challenge}&code_challenge_method=S256");

    let mut browser = Browser::new();
    let code = obtain_code(&mut browser, &extra).await;
    let response = exchange_code(&mut browser, &code, &[("code_verifier", code_verifier)]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let code = obtain_code(&mut browser, &extra).await;
    let response = exchange_code(&mut browser, &code, &[]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error_description"], "Missing code_verifier");
}

// ─── Rejected authorization requests ─────────────────────────────────────────

#[tokio::test]
async fn test_authorize_unknown_client_is_bad_request() {
    let mut browser = Browser::new();

    let uri = format!(
        "/oauth/authorize?client_id=unknown&redirect_uri={}&response_type=code",
        url_encode(REDIRECT_URI)
    );
    let response = browser.get(&uri).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(header::LOCATION).is_none());
    assert!(body_string(response).await.contains("invalid_client"));
}

#[tokio::test]
async fn test_authorize_foreign_redirect_is_bad_request() {
    let mut browser = Browser::new();

    let uri = format!(
        "/oauth/authorize?client_id={CLIENT_ID}&redirect_uri={}&response_type=code",
        url_encode("https://evil.com/steal")
    );
    let response = browser.get(&uri).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("invalid_redirect_uri"));
}

#[tokio::test]
async fn test_authorize_missing_params_is_bad_request() {
    let mut browser = Browser::new();

    let response = browser.get("/oauth/authorize").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("Missing client_id"));

    // Consent posted without a pending request
    browser.post_form("/login", "username=alice").await;
    let response = browser.post_form("/oauth/authorize", "").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_authorize_unsupported_response_type_redirects_with_error() {
    let mut browser = Browser::new();

    let uri = format!(
        "/oauth/authorize?client_id={CLIENT_ID}&redirect_uri={}&response_type=id_token&state=s1",
        url_encode(REDIRECT_URI)
    );
    let response = browser.get(&uri).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    let pairs = query_pairs(location(&response));
    assert_eq!(pairs["error"], "unsupported_response_type");
    assert_eq!(pairs["state"], "s1");
}

// ─── Implicit flow ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_implicit_flow_returns_token_in_fragment() {
    let mut browser = Browser::new();
    browser.post_form("/login", "username=alice").await;

    let uri = format!(
        "/oauth/authorize?client_id={CLIENT_ID}&redirect_uri={}&response_type=token&state=abc",
        url_encode(REDIRECT_URI)
    );
    let response = browser.get(&uri).await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let url = url::Url::parse(location(&response)).unwrap();
    let fragment: HashMap<String, String> =
        url::form_urlencoded::parse(url.fragment().unwrap().as_bytes()).into_owned().collect();
    assert_eq!(fragment["token_type"], "Bearer");
    assert_eq!(fragment["expires_in"], "3600");
    assert_eq!(fragment["state"], "abc");
    assert!(!fragment.contains_key("refresh_token"));
}

/// Percent-encode a string for use in URL query parameters.
fn url_encode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}
