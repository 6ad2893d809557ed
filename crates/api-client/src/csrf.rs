//! CSRF token cache
//!
//! One slot per client. The token is fetched lazily on the first mutating
//! request and reused until logout or a CSRF rejection clears it.
//!
//! Fetch failures are soft: [`CsrfTokenCache::get_token`] returns an empty
//! string and the request goes out without `X-XSRF-TOKEN`. The server rejects
//! it with a 403 if it needed the token; the client never blocks a request
//! pre-emptively because the token endpoint is unreachable. Nothing is cached
//! on failure, so the next mutating call tries again.

use crate::transport::{HttpRequest, Transport, TransportBody};
use reqwest::Method;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Deserialize;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

/// Token endpoint, relative to the API base
pub const CSRF_ENDPOINT: &str = "csrf-token";

#[derive(Debug, Deserialize)]
struct CsrfTokenResponse {
    #[serde(rename = "csrfToken", default)]
    csrf_token: String,
}

/// Single-slot CSRF token cache
#[derive(Debug, Default)]
pub struct CsrfTokenCache {
    slot: RwLock<Option<String>>,
}

impl CsrfTokenCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current token without fetching
    #[must_use]
    pub fn peek(&self) -> Option<String> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forget the token
    pub fn clear(&self) {
        let previous = self
            .slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            debug!("CSRF token cleared");
        }
    }

    fn store(&self, token: String) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    /// Cached token, fetching it once if the slot is empty
    ///
    /// Returns an empty string when the token cannot be obtained.
    pub async fn get_token(&self, transport: &dyn Transport, base_url: &str) -> String {
        if let Some(token) = self.peek() {
            return token;
        }

        let url = format!("{}/{CSRF_ENDPOINT}", base_url.trim_end_matches('/'));
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let request = HttpRequest {
            method: Method::GET,
            url,
            headers,
            body: TransportBody::Empty,
        };

        let response = match transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "CSRF token fetch failed, continuing without token");
                return String::new();
            }
        };

        if !response.status.is_success() {
            warn!(
                status = response.status.as_u16(),
                "CSRF token endpoint refused, continuing without token"
            );
            return String::new();
        }

        match serde_json::from_str::<CsrfTokenResponse>(&response.body) {
            Ok(parsed) if !parsed.csrf_token.is_empty() => {
                debug!("CSRF token fetched");
                // Concurrent fetches may both land here; the later token wins.
                self.store(parsed.csrf_token.clone());
                parsed.csrf_token
            }
            Ok(_) => {
                warn!("CSRF token endpoint returned no token");
                String::new()
            }
            Err(e) => {
                warn!(error = %e, "CSRF token response unreadable");
                String::new()
            }
        }
    }
}
