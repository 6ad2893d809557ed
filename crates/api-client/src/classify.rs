//! Response classification
//!
//! Turns a completed HTTP exchange into a [`Verdict`]. This module only
//! decides; the client performs the recovery side effects a verdict implies
//! (session invalidation, CSRF reset, guarded reload).

use reqwest::StatusCode;
use serde_json::Value;

/// Login endpoint path
pub const LOGIN_ENDPOINT: &str = "/auth/login";

/// Profile endpoint path
pub const PROFILE_ENDPOINT: &str = "/auth/me";

/// How an endpoint participates in authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// The login call itself
    Login,
    /// Other `/auth/...` calls and the CSRF token endpoint
    Auth,
    /// Any resource call
    Resource,
}

impl EndpointKind {
    /// Classify an endpoint path (query strings are ignored)
    #[must_use]
    pub fn of(endpoint: &str) -> Self {
        let path = endpoint.split('?').next().unwrap_or_default();
        let path = format!("/{}", path.trim_start_matches('/'));
        let path = path.trim_end_matches('/');

        if path == LOGIN_ENDPOINT {
            Self::Login
        } else if path.starts_with("/auth/") || path == "/csrf-token" {
            Self::Auth
        } else {
            Self::Resource
        }
    }
}

/// What a response means for the caller and the session
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// 2xx with a JSON (or empty) body
    Success(Value),
    /// 401 from the login endpoint
    InvalidCredentials(String),
    /// Authenticated session rejected (401, or an HTML page in place of JSON)
    SessionLost,
    /// 401 without any session to recover
    Unauthorized,
    /// 403 caused by the CSRF token
    CsrfRejected,
    /// Any other non-success status
    Http {
        /// Status code
        status: u16,
        /// Best-effort message
        message: String,
        /// Best-effort structured detail
        detail: Option<Value>,
    },
    /// 2xx whose body is not JSON
    InvalidBody(String),
}

/// Classify a completed response
///
/// `had_token` is whether a bearer token was attached to the request.
#[must_use]
pub fn classify(kind: EndpointKind, had_token: bool, status: StatusCode, body: &str) -> Verdict {
    let parsed = serde_json::from_str::<Value>(body).ok();

    if status == StatusCode::UNAUTHORIZED {
        return match kind {
            EndpointKind::Login => Verdict::InvalidCredentials(
                error_message(parsed.as_ref())
                    .unwrap_or_else(|| "Invalid email or password".into()),
            ),
            _ if had_token => Verdict::SessionLost,
            _ => Verdict::Unauthorized,
        };
    }

    if status == StatusCode::FORBIDDEN && is_csrf_rejection(parsed.as_ref()) {
        return Verdict::CsrfRejected;
    }

    if !status.is_success() {
        return Verdict::Http {
            status: status.as_u16(),
            message: error_message(parsed.as_ref()).unwrap_or_else(|| {
                format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                )
            }),
            detail: parsed.as_ref().and_then(error_detail),
        };
    }

    if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
        return Verdict::Success(Value::Null);
    }

    if kind == EndpointKind::Resource && looks_like_html(body) {
        return if had_token {
            Verdict::SessionLost
        } else {
            Verdict::Unauthorized
        };
    }

    match parsed {
        Some(value) => Verdict::Success(value),
        None => Verdict::InvalidBody(snippet(body)),
    }
}

/// Whether a body is an HTML document rather than JSON
#[must_use]
pub fn looks_like_html(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(15).collect::<String>().to_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}

fn is_csrf_rejection(body: Option<&Value>) -> bool {
    body.and_then(|b| b.get("error"))
        .and_then(Value::as_str)
        .is_some_and(|e| e.to_uppercase().contains("CSRF"))
}

fn error_message(body: Option<&Value>) -> Option<String> {
    let body = body?;
    ["error", "message"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(String::from)
}

fn error_detail(body: &Value) -> Option<Value> {
    ["details", "detail"]
        .iter()
        .find_map(|key| body.get(key))
        .filter(|v| !v.is_null())
        .cloned()
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() > 80 {
        format!("{}...", trimmed.chars().take(80).collect::<String>())
    } else {
        trimmed.to_string()
    }
}
