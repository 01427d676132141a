//! The two HTML pages next to the API
//!
//! A static login form, which echoes what was posted, and an about page naming the server and
//! the caller

use std::collections::BTreeMap;

use axum::Form;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::http::header::HOST;
use axum::response::Html;
use axum::response::IntoResponse;
use axum::response::Response;
use serde::Serialize;
use serde_json::Serializer;
use serde_json::ser::PrettyFormatter;

use crate::api::CurrentUser;
use crate::storage::Storage;

const LOGIN_TEMPLATE: &str = include_str!("../templates/login.html");
const ABOUT_TEMPLATE: &str = include_str!("../templates/about.html");

/// Name used for callers without (valid) token
const ANONYMOUS: &str = "anonymous";

/// The login form
pub async fn login_page() -> Html<&'static str> {
    Html(LOGIN_TEMPLATE)
}

/// Echo the posted form fields as JSON, indented with 4 spaces
///
/// Request:
/// ```sh
/// curl -v -d 'username=admin&password=verysecret' http://localhost:6000/login/
/// ```
pub async fn login(
    Form(fields): Form<BTreeMap<String, String>>,
) -> Result<Response, (StatusCode, String)> {
    tracing::debug!("Echoing {} login field(s)", fields.len());

    let mut body = Vec::new();
    let mut serializer =
        Serializer::with_formatter(&mut body, PrettyFormatter::with_indent(b"    "));

    fields.serialize(&mut serializer).map_err(internal_error)?;

    Ok(([(CONTENT_TYPE, "application/json")], body).into_response())
}

/// Show the server and the current user
pub async fn about<S: Storage>(
    current_user: Option<CurrentUser<S>>,
    headers: HeaderMap,
) -> Html<String> {
    let server = headers
        .get(HOST)
        .and_then(|host| host.to_str().ok())
        .unwrap_or("unknown");

    let user = current_user
        .as_ref()
        .map_or(ANONYMOUS, |current_user| current_user.username.as_str());

    Html(render(
        ABOUT_TEMPLATE,
        &[
            ("server", escape(server).as_str()),
            ("user", escape(user).as_str()),
        ],
    ))
}

/// Fill the `{name}` placeholders of a template in one pass
///
/// Substituted values are never scanned again, unknown placeholders stay as they are
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        rendered.push_str(&rest[..start]);
        rest = &rest[start..];

        let value = rest.find('}').and_then(|end| {
            values
                .iter()
                .find(|(name, _)| *name == &rest[1..end])
                .map(|(_, value)| (end, *value))
        });

        if let Some((end, value)) = value {
            rendered.push_str(value);
            rest = &rest[end + 1..];
        } else {
            rendered.push('{');
            rest = &rest[1..];
        }
    }

    rendered.push_str(rest);

    rendered
}

/// Escape text to be placed in HTML
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }

    escaped
}

/// Utility function for mapping any error into a `500 Internal Server Error` response
fn internal_error<E>(err: E) -> (StatusCode, String)
where
    E: std::error::Error,
{
    tracing::error!("Internal server error: {err}");

    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}
