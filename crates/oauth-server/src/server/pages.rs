//! HTML login and consent pages.

const STYLE: &str = r#"<style>
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; background: #f5f5f5; margin: 0; display: flex; justify-content: center; align-items: center; min-height: 100vh; }
.card { background: #fff; border-radius: 8px; box-shadow: 0 2px 8px rgba(0,0,0,0.1); padding: 32px; max-width: 400px; width: 100%; }
h1 { font-size: 20px; margin: 0 0 8px; color: #333; }
.subtitle { color: #666; font-size: 14px; margin: 0 0 24px; }
label { display: block; font-size: 14px; font-weight: 500; margin-bottom: 6px; color: #333; }
input[type="text"] { width: 100%; padding: 10px; border: 1px solid #ddd; border-radius: 4px; font-size: 14px; box-sizing: border-box; }
button { width: 100%; padding: 10px; background: #4a90d9; color: #fff; border: none; border-radius: 4px; font-size: 14px; font-weight: 500; cursor: pointer; margin-top: 16px; }
button:hover { background: #357abd; }
.error { background: #fee; border: 1px solid #c00; color: #c00; padding: 10px; border-radius: 4px; margin-bottom: 16px; }
</style>"#;

/// Render the login page. Any username is accepted.
pub fn render_login_page(error_message: Option<&str>) -> String {
    let error_html = error_message
        .map(|msg| format!(r#"<div class="error">{}</div>"#, html_escape(msg)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>Login - OAuth Server</title>
{STYLE}
</head>
<body>
<div class="card">
<h1>Login</h1>
<p class="subtitle">Sign in to continue</p>
{error_html}
<form method="POST" action="/login">
<label for="username">Username</label>
<input type="text" id="username" name="username" placeholder="Enter any username" required autofocus>
<button type="submit">Login</button>
</form>
</div>
</body>
</html>"#
    )
}

/// Render the consent page for a logged-in user.
///
/// The form posts back to `/oauth/authorize`, which resumes the stashed request.
pub fn render_consent_page(username: &str, client_id: Option<&str>) -> String {
    let requester = client_id.map_or_else(
        || "An application".to_string(),
        |id| format!("Client <strong>{}</strong>", html_escape(id)),
    );

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>Authorize - OAuth Server</title>
{STYLE}
</head>
<body>
<div class="card">
<h1>Authorize</h1>
<p class="subtitle">Signed in as <strong>{username}</strong></p>
<p>{requester} is requesting access to your account.</p>
<form method="POST" action="/oauth/authorize">
<button type="submit">Allow</button>
</form>
</div>
</body>
</html>"#,
        username = html_escape(username),
    )
}

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
