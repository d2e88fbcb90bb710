//! HTTP-facing OAuth server: request validation and response shaping over the
//! [`Manager`].
//!
//! Implements:
//! - RFC 6749 §4.1 / §4.2: authorization endpoint (`code` and `token`)
//! - RFC 6749 §4.1.3 / §4.4 / §6: token endpoint
//! - RFC 6750 §2.1: bearer token validation
//! - RFC 8414: authorization server metadata

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::manager::{Manager, validate_redirect_uri};
use super::pkce::{self, CodeChallengeMethod};
use super::types::{AccessTokenInfo, CodeChallenge, FormValues, GrantType, ResponseType, TokenGrant};
use crate::error::{OAuthError, OAuthResult};

/// Which response and grant types the server accepts.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub allowed_response_types: Vec<ResponseType>,
    pub allowed_grant_types: Vec<GrantType>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_response_types: vec![ResponseType::Code, ResponseType::Token],
            allowed_grant_types: vec![
                GrantType::AuthorizationCode,
                GrantType::ClientCredentials,
                GrantType::RefreshToken,
            ],
        }
    }
}

/// A validated authorization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizeRequest {
    pub client_id: String,
    pub redirect_uri: String,
    pub response_type: ResponseType,
    pub scope: String,
    pub state: Option<String>,
    pub challenge: Option<CodeChallenge>,
}

/// Why an authorization request was refused.
#[derive(Debug)]
pub enum AuthorizeRejection {
    /// The redirect URI cannot be trusted, so the error goes to the user agent.
    Direct(OAuthError),
    /// The error is delivered to the client through its redirect URI.
    Redirect {
        redirect_uri: String,
        state: Option<String>,
        error: OAuthError,
        /// Deliver in the URI fragment (implicit grant) instead of the query.
        fragment: bool,
    },
}

impl AuthorizeRejection {
    #[must_use]
    pub const fn error(&self) -> &OAuthError {
        match self {
            Self::Direct(error) | Self::Redirect { error, .. } => error,
        }
    }
}

impl IntoResponse for AuthorizeRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Direct(error) => (StatusCode::BAD_REQUEST, error.to_string()).into_response(),
            Self::Redirect { redirect_uri, state, error, fragment } => {
                let mut params = vec![("error", error.code()), ("error_description", error.description())];
                if let Some(ref state) = state {
                    params.push(("state", state.as_str()));
                }
                redirect_with(&redirect_uri, &params, fragment)
            }
        }
    }
}

/// OAuth protocol endpoints backed by a [`Manager`].
#[derive(Debug, Clone)]
pub struct OAuthServer {
    manager: Manager,
    config: ServerConfig,
}

impl OAuthServer {
    #[must_use]
    pub fn new(manager: Manager, config: ServerConfig) -> Self {
        Self { manager, config }
    }

    #[must_use]
    pub const fn manager(&self) -> &Manager {
        &self.manager
    }

    /// Validate the parameters of an authorization request.
    ///
    /// Client and redirect URI problems are returned as
    /// [`AuthorizeRejection::Direct`]; everything checked after the redirect
    /// URI is trusted becomes [`AuthorizeRejection::Redirect`].
    pub async fn validate_authorize_request(
        &self,
        form: &FormValues,
    ) -> Result<AuthorizeRequest, AuthorizeRejection> {
        let Some(client_id) = form.get_non_empty("client_id") else {
            return Err(AuthorizeRejection::Direct(OAuthError::invalid_request("Missing client_id")));
        };
        let Some(redirect_uri) = form.get_non_empty("redirect_uri") else {
            return Err(AuthorizeRejection::Direct(OAuthError::invalid_request("Missing redirect_uri")));
        };

        let client = self.manager.get_client(client_id).await.map_err(AuthorizeRejection::Direct)?;
        validate_redirect_uri(&client.domain, redirect_uri).map_err(AuthorizeRejection::Direct)?;

        let state = form.get_non_empty("state").map(str::to_owned);
        let reject = |error: OAuthError, fragment: bool| AuthorizeRejection::Redirect {
            redirect_uri: redirect_uri.to_owned(),
            state: state.clone(),
            error,
            fragment,
        };

        let Some(response_type) = form.get_non_empty("response_type") else {
            return Err(reject(OAuthError::invalid_request("Missing response_type"), false));
        };
        let response_type: ResponseType = response_type.parse().map_err(|e| reject(e, false))?;
        let fragment = response_type == ResponseType::Token;
        if !self.config.allowed_response_types.contains(&response_type) {
            return Err(reject(
                OAuthError::UnsupportedResponseType(format!(
                    "response_type '{}' is not allowed",
                    response_type.as_str()
                )),
                fragment,
            ));
        }

        let challenge = match response_type {
            ResponseType::Code => parse_challenge(form).map_err(|e| reject(e, false))?,
            ResponseType::Token => None,
        };

        Ok(AuthorizeRequest {
            client_id: client_id.to_owned(),
            redirect_uri: redirect_uri.to_owned(),
            response_type,
            scope: form.get("scope").unwrap_or_default().to_owned(),
            state,
            challenge,
        })
    }

    /// Issue the grant for an approved request and redirect back to the client.
    pub async fn authorize(&self, request: &AuthorizeRequest, user_id: &str) -> Response {
        match request.response_type {
            ResponseType::Code => {
                let code = self
                    .manager
                    .issue_code(
                        &request.client_id,
                        user_id,
                        &request.redirect_uri,
                        &request.scope,
                        request.challenge.clone(),
                    )
                    .await;

                tracing::info!(client_id = %request.client_id, user_id, "Issued authorization code");

                let mut params = vec![("code", code.as_str())];
                if let Some(ref state) = request.state {
                    params.push(("state", state.as_str()));
                }
                redirect_with(&request.redirect_uri, &params, false)
            }
            ResponseType::Token => {
                let grant =
                    self.manager.issue_implicit_token(&request.client_id, user_id, &request.scope).await;

                tracing::info!(client_id = %request.client_id, user_id, "Issued implicit access token");

                let expires_in = grant.expires_in.to_string();
                let mut params = vec![
                    ("access_token", grant.access_token.as_str()),
                    ("token_type", grant.token_type.as_str()),
                    ("expires_in", expires_in.as_str()),
                ];
                if !grant.scope.is_empty() {
                    params.push(("scope", grant.scope.as_str()));
                }
                if let Some(ref state) = request.state {
                    params.push(("state", state.as_str()));
                }
                redirect_with(&request.redirect_uri, &params, true)
            }
        }
    }

    /// Handle a token endpoint request, producing the JSON response.
    pub async fn handle_token_request(&self, headers: &HeaderMap, form: &FormValues) -> Response {
        match self.token(headers, form).await {
            Ok(grant) => token_success(&grant),
            Err(err) => {
                tracing::warn!(error = %err, "Token request rejected");
                error_response(&err)
            }
        }
    }

    /// Authenticate the client and run the requested grant.
    pub async fn token(&self, headers: &HeaderMap, form: &FormValues) -> OAuthResult<TokenGrant> {
        let Some(grant_type) = form.get_non_empty("grant_type") else {
            return Err(OAuthError::invalid_request("Missing grant_type"));
        };
        let grant_type: GrantType = grant_type.parse()?;
        if !self.config.allowed_grant_types.contains(&grant_type) {
            return Err(OAuthError::UnsupportedGrantType(format!("grant_type '{grant_type}' is not allowed")));
        }

        let (client_id, client_secret) = client_credentials(headers, form)?;
        let client = self.manager.authenticate_client(&client_id, &client_secret).await?;

        let grant = match grant_type {
            GrantType::AuthorizationCode => {
                let Some(code) = form.get_non_empty("code") else {
                    return Err(OAuthError::invalid_request("Missing code"));
                };
                let Some(redirect_uri) = form.get_non_empty("redirect_uri") else {
                    return Err(OAuthError::invalid_request("Missing redirect_uri"));
                };
                self.manager
                    .exchange_code(&client, code, redirect_uri, form.get_non_empty("code_verifier"))
                    .await?
            }
            GrantType::ClientCredentials => {
                self.manager.client_credentials(&client, form.get("scope").unwrap_or_default()).await
            }
            GrantType::RefreshToken => {
                let Some(refresh_token) = form.get_non_empty("refresh_token") else {
                    return Err(OAuthError::invalid_request("Missing refresh_token"));
                };
                self.manager.refresh(&client, refresh_token, form.get("scope")).await?
            }
        };

        tracing::info!(client_id = %client.id, grant_type = %grant_type, "Issued access token");
        Ok(grant)
    }

    /// Resolve the `Authorization: Bearer` token of a request.
    pub async fn validate_bearer(&self, headers: &HeaderMap) -> OAuthResult<AccessTokenInfo> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| OAuthError::InvalidAccessToken("Missing bearer token".to_string()))?;

        self.manager.load_access_token(token).await
    }

    /// RFC 8414 metadata document for `issuer`.
    #[must_use]
    pub fn metadata(&self, issuer: &str) -> serde_json::Value {
        let response_types: Vec<_> = self.config.allowed_response_types.iter().map(|r| r.as_str()).collect();
        let grant_types: Vec<_> = self.config.allowed_grant_types.iter().map(|g| g.as_str()).collect();

        serde_json::json!({
            "issuer": issuer,
            "authorization_endpoint": format!("{issuer}/oauth/authorize"),
            "token_endpoint": format!("{issuer}/oauth/token"),
            "response_types_supported": response_types,
            "grant_types_supported": grant_types,
            "token_endpoint_auth_methods_supported": ["client_secret_basic", "client_secret_post"],
            "code_challenge_methods_supported": ["plain", "S256"]
        })
    }
}

fn parse_challenge(form: &FormValues) -> OAuthResult<Option<CodeChallenge>> {
    let method = form.get_non_empty("code_challenge_method");
    let Some(challenge) = form.get_non_empty("code_challenge") else {
        if method.is_some() {
            return Err(OAuthError::invalid_request("code_challenge_method without code_challenge"));
        }
        return Ok(None);
    };

    let method = method.map_or(Ok(CodeChallengeMethod::Plain), |m| m.parse::<CodeChallengeMethod>())?;
    if !pkce::is_well_formed(challenge) {
        return Err(OAuthError::invalid_request("code_challenge must be 43-128 unreserved characters"));
    }

    Ok(Some(CodeChallenge { challenge: challenge.to_owned(), method }))
}

/// Client id and secret from HTTP Basic auth, else from the form body.
fn client_credentials(headers: &HeaderMap, form: &FormValues) -> OAuthResult<(String, String)> {
    let basic = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("basic"));

    if let Some((_, encoded)) = basic {
        let malformed = || OAuthError::invalid_client("Malformed Basic authorization header");
        let decoded = STANDARD.decode(encoded.trim()).map_err(|_| malformed())?;
        let decoded = String::from_utf8(decoded).map_err(|_| malformed())?;
        let (id, secret) = decoded.split_once(':').ok_or_else(malformed)?;
        return Ok((form_unescape(id), form_unescape(secret)));
    }

    let Some(client_id) = form.get_non_empty("client_id") else {
        return Err(OAuthError::invalid_client("Missing client credentials"));
    };
    let client_secret = form.get("client_secret").unwrap_or_default();
    Ok((client_id.to_owned(), client_secret.to_owned()))
}

/// Undo the `application/x-www-form-urlencoded` encoding RFC 6749 §2.3.1
/// applies to Basic credentials. Stray `&` and `=` are kept literally.
fn form_unescape(component: &str) -> String {
    let escaped = component.replace('&', "%26").replace('=', "%3D");
    url::form_urlencoded::parse(escaped.as_bytes()).map(|(key, _)| key).collect()
}

/// Build a `302 Found` to `redirect_uri` carrying `params` in the query or fragment.
fn redirect_with(redirect_uri: &str, params: &[(&str, &str)], fragment: bool) -> Response {
    let Ok(mut url) = url::Url::parse(redirect_uri) else {
        return (StatusCode::BAD_REQUEST, "invalid_request: redirect_uri is not a valid URL").into_response();
    };

    if fragment {
        let encoded = url::form_urlencoded::Serializer::new(String::new()).extend_pairs(params).finish();
        url.set_fragment(Some(&encoded));
    } else {
        url.query_pairs_mut().extend_pairs(params);
    }

    (StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response()
}

/// Build a token response with required OAuth 2.0 cache headers (RFC 6749 §5.1).
fn token_success(grant: &TokenGrant) -> Response {
    let mut response = Json(grant).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}

/// RFC 6749 §5.2 error body with the error's status code.
pub fn error_response(err: &OAuthError) -> Response {
    let mut response = (
        err.status_code(),
        Json(serde_json::json!({
            "error": err.code(),
            "error_description": err.description()
        })),
    )
        .into_response();

    let challenge = match err {
        OAuthError::InvalidClient(_) => Some(r#"Basic realm="oauth""#),
        OAuthError::InvalidAccessToken(_) => Some(r#"Bearer error="invalid_token""#),
        _ => None,
    };
    if let Some(challenge) = challenge {
        response.headers_mut().insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
    }
    response.headers_mut().insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
