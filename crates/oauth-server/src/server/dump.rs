//! Request dumping for the `-d` flag.

use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{MatchedPath, Request},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Largest body buffered for a dump. Matches axum's default body limit, so a
/// request the handler would accept is never refused here.
const MAX_DUMP_BODY: usize = 2 * 1024 * 1024;

/// Log a full dump of the request, then pass it on with its body intact.
///
/// Bodies known to exceed [`MAX_DUMP_BODY`] are not buffered: the request is
/// dumped without its body and forwarded untouched.
pub async fn dump_request(request: Request, next: Next) -> Response {
    let label = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| dump_label(path.as_str()).to_owned())
        .unwrap_or_else(|| "request".to_owned());

    let oversized = !usize::try_from(request.body().size_hint().lower()).is_ok_and(|len| len <= MAX_DUMP_BODY);
    if oversized {
        let (parts, body) = request.into_parts();
        let omitted = Bytes::from_static(b"<body omitted>");
        tracing::info!(target: "oauth_server::dump", "{}", render_dump(&label, &parts, &omitted));
        return next.run(Request::from_parts(parts, body)).await;
    }

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_DUMP_BODY).await {
        Ok(bytes) => bytes,
        Err(err) => return (StatusCode::PAYLOAD_TOO_LARGE, err.to_string()).into_response(),
    };

    tracing::info!(target: "oauth_server::dump", "{}", render_dump(&label, &parts, &bytes));

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

/// Dump label for a route: its last path segment.
fn dump_label(path: &str) -> &str {
    path.rsplit('/').find(|s| !s.is_empty()).unwrap_or("request")
}

/// Render a request as `label:` followed by its HTTP/1.x wire form.
fn render_dump(label: &str, parts: &Parts, body: &Bytes) -> String {
    let mut out = format!("\n{label}: \n{} {} {:?}\r\n", parts.method, parts.uri, parts.version);
    for (name, value) in &parts.headers {
        out.push_str(&format!("{}: {}\r\n", name, String::from_utf8_lossy(value.as_bytes())));
    }
    out.push_str("\r\n");
    out.push_str(&String::from_utf8_lossy(body));
    out
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    #[test]
    fn test_dump_label() {
        assert_eq!(dump_label("/auth"), "auth");
        assert_eq!(dump_label("/oauth/authorize"), "authorize");
        assert_eq!(dump_label("/oauth/token"), "token");
        assert_eq!(dump_label("/"), "request");
    }

    #[test]
    fn test_render_dump() {
        let (parts, ()) = Request::post("/oauth/token?x=1")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(())
            .unwrap()
            .into_parts();

        let dump = render_dump("token", &parts, &Bytes::from_static(b"grant_type=client_credentials"));
        assert!(dump.starts_with("\ntoken: \nPOST /oauth/token?x=1 HTTP/1.1\r\n"));
        assert!(dump.contains("content-type: application/x-www-form-urlencoded\r\n"));
        assert!(dump.ends_with("\r\n\r\ngrant_type=client_credentials"));
    }
}
