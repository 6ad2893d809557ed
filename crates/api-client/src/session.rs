//! Session lifecycle: bearer token and principal
//!
//! The session is either empty or holds both a token and a user. Writers are
//! private to this module; the dispatcher only reads the token and asks for
//! [`SessionManager::invalidate_token`] during recovery.

use crate::client::WecareClient;
use crate::error::{ApiError, ApiResult};
use crate::principal::Principal;
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, instrument, warn};
use wecare_core::storage::{KeyValueStore, keys};

/// Snapshot of the current session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    bearer_token: Option<String>,
    user: Option<Principal>,
}

impl Session {
    /// Whether a token (and therefore a user) is held
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.bearer_token.is_some()
    }

    /// Bearer token, if any
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    /// Signed-in user, if any
    #[must_use]
    pub fn user(&self) -> Option<&Principal> {
        self.user.as_ref()
    }
}

/// In-memory session mirrored to persistent storage
pub(crate) struct SessionState {
    current: RwLock<Session>,
    storage: Arc<dyn KeyValueStore>,
}

impl SessionState {
    pub(crate) fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            current: RwLock::new(Session::default()),
            storage,
        }
    }

    pub(crate) fn snapshot(&self) -> Session {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn token(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .bearer_token
            .clone()
    }

    fn establish(&self, token: String, user: Principal) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        self.storage.set(keys::TOKEN, &token);
        self.persist_user(&user);
        current.bearer_token = Some(token);
        current.user = Some(user);
    }

    /// Replace the user of a live session; false when there is no session
    fn update_user(&self, user: Principal) -> bool {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if current.bearer_token.is_none() {
            return false;
        }
        self.persist_user(&user);
        current.user = Some(user);
        true
    }

    /// Drop the session everywhere; returns whether a token was held
    fn clear(&self) -> bool {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        self.remove_persisted();
        let had_token = current.bearer_token.is_some();
        *current = Session::default();
        had_token
    }

    /// Drop the session only while `expected` is still the current token
    fn clear_if(&self, expected: Option<&str>) -> bool {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if current.bearer_token.as_deref() != expected {
            return false;
        }
        self.remove_persisted();
        *current = Session::default();
        true
    }

    fn remove_persisted(&self) {
        self.storage.remove(keys::TOKEN);
        self.storage.remove(keys::USER);
        self.storage.remove(keys::LEGACY_JWT);
    }

    fn persist_user(&self, user: &Principal) {
        match serde_json::to_string(user) {
            Ok(json) => self.storage.set(keys::USER, &json),
            Err(e) => warn!(error = %e, "Failed to serialize user for storage"),
        }
    }

    fn persisted(&self) -> (Option<String>, Option<String>) {
        (self.storage.get(keys::TOKEN), self.storage.get(keys::USER))
    }
}

#[derive(Debug, Default, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<Value>,
}

/// Login, logout, rehydration and profile refresh
#[derive(Clone)]
pub struct SessionManager {
    client: WecareClient,
}

impl SessionManager {
    pub(crate) fn new(client: WecareClient) -> Self {
        Self { client }
    }

    fn state(&self) -> &SessionState {
        self.client.session_state()
    }

    /// Current session snapshot
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.state().snapshot()
    }

    /// Whether a session is held
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state().token().is_some()
    }

    /// Bearer token of the current session
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.state().token()
    }

    /// User of the current session
    #[must_use]
    pub fn user(&self) -> Option<Principal> {
        self.state().snapshot().user
    }

    /// Restore a persisted session and verify it with the server
    ///
    /// Never fails: any problem leaves the client logged out. Returns whether
    /// a verified session is held afterwards. The persisted token is only
    /// adopted once `/auth/me` accepts it, so a rejection never counts as a
    /// lost session and never triggers the reload.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> bool {
        let (token, user) = match self.state().persisted() {
            (Some(token), Some(user)) if !token.is_empty() => (token, user),
            (None, None) => {
                debug!("No persisted session");
                return false;
            }
            _ => {
                warn!("Incomplete persisted session, clearing");
                self.state().clear();
                return false;
            }
        };

        let principal = serde_json::from_str::<Value>(&user)
            .ok()
            .and_then(|value| Principal::from_value(&value, ""));
        let Some(principal) = principal else {
            warn!("Persisted user is unreadable, clearing session");
            self.state().clear();
            return false;
        };

        let verified = self
            .client
            .auth()
            .me_with_token(&token)
            .await
            .and_then(|body| {
                parse_profile(&body, &principal.email).ok_or_else(|| {
                    ApiError::InvalidResponseBody("profile response has no user object".into())
                })
            });

        match verified {
            Ok(user) => {
                info!(email = %user.email, role = %user.role, "Session restored");
                // Re-persisting upgrades legacy role names in storage.
                self.state().establish(token, user);
                true
            }
            Err(e) => {
                warn!(error = %e, "Persisted session rejected");
                // A login that finished meanwhile owns the storage now.
                self.state().clear_if(None);
                false
            }
        }
    }

    /// Log in with email and password
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<Principal> {
        let body = match self.client.auth().login(email, password).await {
            Ok(body) => body,
            Err(ApiError::InvalidResponseBody(snippet)) => {
                self.state().clear();
                return Err(ApiError::InvalidLoginResponse(format!(
                    "response is not JSON: {snippet}"
                )));
            }
            Err(e) => return Err(e),
        };
        let response: LoginResponse = serde_json::from_value(body).unwrap_or_default();

        let token = response.token.filter(|t| !t.is_empty());
        let user = response
            .user
            .as_ref()
            .and_then(|u| Principal::from_value(u, email));

        match (token, user) {
            (Some(token), Some(user)) => {
                self.state().establish(token, user.clone());
                info!(role = %user.role, "Logged in");
                Ok(user)
            }
            (token, _) => {
                self.state().clear();
                let missing = if token.is_none() { "token" } else { "user" };
                Err(ApiError::InvalidLoginResponse(format!(
                    "response has no {missing}"
                )))
            }
        }
    }

    /// Forget the session and the CSRF token; no network call
    pub fn logout(&self) {
        self.state().clear();
        self.client.csrf().clear();
        info!("Logged out");
    }

    /// Re-fetch the signed-in user from `/auth/me`
    ///
    /// Any failure clears the session before the error is returned.
    pub async fn refresh_profile(&self) -> ApiResult<Principal> {
        let fallback_email = self.user().map(|u| u.email).unwrap_or_default();

        let result = self.client.auth().me().await.and_then(|body| {
            parse_profile(&body, &fallback_email).ok_or_else(|| {
                ApiError::InvalidResponseBody("profile response has no user object".into())
            })
        });

        match result {
            Ok(user) if self.state().update_user(user.clone()) => Ok(user),
            Ok(_) => Err(ApiError::Unauthorized),
            Err(e) => {
                self.state().clear();
                Err(e)
            }
        }
    }

    /// Clear the session during recovery
    pub(crate) fn invalidate(&self) {
        if self.state().clear() {
            warn!("Session invalidated");
        }
    }

    /// Clear the session only if `token` is still its bearer token
    pub(crate) fn invalidate_token(&self, token: &str) -> bool {
        let cleared = self.state().clear_if(Some(token));
        if cleared {
            warn!("Session invalidated");
        }
        cleared
    }
}

fn parse_profile(body: &Value, fallback_email: &str) -> Option<Principal> {
    let user = body
        .get("user")
        .filter(|u| u.is_object())
        .unwrap_or(body);
    Principal::from_value(user, fallback_email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::UserRole;
    use crate::testing::Fixture;
    use reqwest::Method;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn officer() -> Value {
        json!({"id": 1, "name": "Officer One", "email": "officer1@wecare.dev", "role": "OFFICER"})
    }

    #[tokio::test]
    async fn test_initialize_without_persisted_session() {
        let fx = Fixture::new();

        assert!(!fx.client.session().initialize().await);
        assert!(fx.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_initialize_with_partial_state_clears() {
        let fx = Fixture::new();
        fx.storage.set(keys::TOKEN, "orphan");

        assert!(!fx.client.session().initialize().await);
        assert!(fx.storage.get(keys::TOKEN).is_none());
        assert!(fx.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_initialize_verifies_with_server() {
        let fx = Fixture::with_persisted_session("token-abc", officer());
        fx.transport
            .respond_json(Method::GET, "/auth/me", 200, json!({"user": officer()}));

        let session = fx.client.session();
        assert!(session.initialize().await);
        assert_eq!(session.token().as_deref(), Some("token-abc"));
        assert_eq!(session.user().unwrap().role, UserRole::Officer);

        let call = &fx.transport.calls_to(Method::GET, "/auth/me")[0];
        assert_eq!(call.headers["authorization"], "Bearer token-abc");
    }

    #[tokio::test]
    async fn test_initialize_rejected_token_degrades_to_logged_out() {
        let fx = Fixture::with_persisted_session("expired", officer());
        fx.transport.respond(Method::GET, "/auth/me", 401, "");

        let session = fx.client.session();
        assert!(!session.initialize().await);
        assert!(!session.is_authenticated());
        assert!(fx.storage.get(keys::TOKEN).is_none());
        assert!(fx.storage.get(keys::USER).is_none());
        assert_eq!(fx.reload.count(), 0);
        assert!(!fx.client.reload_guard().is_tripped());
    }

    #[tokio::test]
    async fn test_rejected_initialize_keeps_reload_for_later_session_loss() {
        let fx = Fixture::with_persisted_session("expired", officer());
        fx.transport.respond(Method::GET, "/auth/me", 401, "");
        assert!(!fx.client.session().initialize().await);

        fx.transport
            .respond_json(Method::GET, "/csrf-token", 200, json!({"csrfToken": "c"}));
        fx.transport.respond_json(
            Method::POST,
            "/auth/login",
            200,
            json!({"token": "fresh", "user": officer()}),
        );
        assert_ok!(fx.client.session().login("officer1@wecare.dev", "pw").await);

        fx.transport.respond(Method::GET, "/patients", 401, "");
        let err = assert_err!(fx.client.get::<Value>("/patients").await);
        assert!(matches!(err, ApiError::Unauthorized));
        assert_eq!(fx.reload.count(), 1);
    }

    #[tokio::test]
    async fn test_initialize_html_profile_is_plain_failure() {
        let fx = Fixture::with_persisted_session("token-abc", officer());
        fx.transport
            .respond(Method::GET, "/auth/me", 200, "<!DOCTYPE html><html></html>");

        assert!(!fx.client.session().initialize().await);
        assert!(fx.storage.get(keys::TOKEN).is_none());
        assert_eq!(fx.reload.count(), 0);
    }

    #[tokio::test]
    async fn test_initialize_upgrades_legacy_role() {
        let legacy = json!({"id": 3, "name": "Radio Desk", "email": "radio@wecare.dev", "role": "radio"});
        let fx = Fixture::with_persisted_session("token-r", legacy.clone());
        fx.transport.respond_json(Method::GET, "/auth/me", 200, legacy);

        assert!(fx.client.session().initialize().await);
        let stored: Value = serde_json::from_str(&fx.storage.get(keys::USER).unwrap()).unwrap();
        assert_eq!(stored["role"], "RADIO_CENTER");
    }

    #[tokio::test]
    async fn test_login_persists_token_and_user() {
        let fx = Fixture::new();
        fx.transport
            .respond_json(Method::GET, "/csrf-token", 200, json!({"csrfToken": "c1"}));
        fx.transport.respond_json(
            Method::POST,
            "/auth/login",
            200,
            json!({"token": "token-abc", "user": officer()}),
        );

        let user = assert_ok!(
            fx.client
                .session()
                .login("officer1@wecare.dev", "password123")
                .await
        );
        assert_eq!(user.name, "Officer One");
        assert_eq!(fx.storage.get(keys::TOKEN).as_deref(), Some("token-abc"));
        assert!(fx.storage.get(keys::USER).is_some());
        assert!(fx.client.session().is_authenticated());

        let call = &fx.transport.calls_to(Method::POST, "/auth/login")[0];
        assert_eq!(call.headers["x-xsrf-token"], "c1");
    }

    #[tokio::test]
    async fn test_login_invalid_credentials() {
        let fx = Fixture::new();
        fx.transport.respond_json(
            Method::POST,
            "/auth/login",
            401,
            json!({"error": "Invalid email or password"}),
        );

        let err = assert_err!(fx.client.session().login("x@y.z", "wrong").await);
        assert!(matches!(err, ApiError::InvalidCredentials(ref m) if m == "Invalid email or password"));
        assert!(!fx.client.session().is_authenticated());
        assert_eq!(fx.reload.count(), 0);
        assert!(!fx.client.reload_guard().is_tripped());
    }

    #[tokio::test]
    async fn test_login_without_token_is_invalid_response() {
        let fx = Fixture::new();
        fx.storage.set(keys::LEGACY_JWT, "old");
        fx.transport.respond_json(
            Method::POST,
            "/auth/login",
            200,
            json!({"user": officer()}),
        );

        let err = assert_err!(fx.client.session().login("officer1@wecare.dev", "pw").await);
        assert!(matches!(err, ApiError::InvalidLoginResponse(_)));
        assert!(!fx.client.session().is_authenticated());
        assert!(fx.storage.get(keys::LEGACY_JWT).is_none());
    }

    #[tokio::test]
    async fn test_login_non_json_body_clears_state() {
        let fx = Fixture::with_persisted_session("old-token", officer());
        fx.storage.set(keys::LEGACY_JWT, "old");
        fx.transport.respond(
            Method::POST,
            "/auth/login",
            200,
            "<html><body>Gateway maintenance</body></html>",
        );

        let err = assert_err!(fx.client.session().login("officer1@wecare.dev", "pw").await);
        assert!(matches!(err, ApiError::InvalidLoginResponse(_)));
        assert!(fx.storage.get(keys::TOKEN).is_none());
        assert!(fx.storage.get(keys::USER).is_none());
        assert!(fx.storage.get(keys::LEGACY_JWT).is_none());
        assert_eq!(fx.reload.count(), 0);
    }

    #[tokio::test]
    async fn test_login_without_user_is_invalid_response() {
        let fx = Fixture::new();
        fx.transport
            .respond_json(Method::POST, "/auth/login", 200, json!({"token": "t"}));

        let err = assert_err!(fx.client.session().login("a@b.c", "pw").await);
        assert!(matches!(err, ApiError::InvalidLoginResponse(_)));
        assert!(fx.storage.get(keys::TOKEN).is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let fx = Fixture::with_persisted_session("token-abc", officer());
        fx.storage.set(keys::LEGACY_JWT, "legacy");
        fx.transport
            .respond_json(Method::GET, "/auth/me", 200, officer());
        fx.transport
            .respond_json(Method::GET, "/csrf-token", 200, json!({"csrfToken": "c"}));
        fx.transport.respond(Method::POST, "/rides", 201, "{}");

        let session = fx.client.session();
        assert!(session.initialize().await);
        let _: Value = assert_ok!(fx.client.post("/rides", &json!({})).await);
        assert!(fx.client.csrf().peek().is_some());

        session.logout();
        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
        assert!(fx.storage.get(keys::TOKEN).is_none());
        assert!(fx.storage.get(keys::USER).is_none());
        assert!(fx.storage.get(keys::LEGACY_JWT).is_none());
        assert!(fx.client.csrf().peek().is_none());
    }

    #[tokio::test]
    async fn test_refresh_profile_updates_user() {
        let fx = Fixture::with_persisted_session("token-abc", officer());
        fx.transport
            .respond_json(Method::GET, "/auth/me", 200, officer());
        fx.transport.respond_json(
            Method::GET,
            "/auth/me",
            200,
            json!({"user": {"id": 1, "full_name": "Officer Renamed", "role": "ADMIN"}}),
        );

        let session = fx.client.session();
        assert!(session.initialize().await);

        let user = assert_ok!(session.refresh_profile().await);
        assert_eq!(user.name, "Officer Renamed");
        assert_eq!(user.email, "officer1@wecare.dev");
        assert_eq!(user.role, UserRole::Admin);
        assert_eq!(session.user(), Some(user));
    }

    #[tokio::test]
    async fn test_refresh_profile_failure_clears_session() {
        let fx = Fixture::with_persisted_session("token-abc", officer());
        fx.transport
            .respond_json(Method::GET, "/auth/me", 200, officer());
        fx.transport
            .respond_json(Method::GET, "/auth/me", 500, json!({"error": "boom"}));

        let session = fx.client.session();
        assert!(session.initialize().await);

        let err = assert_err!(session.refresh_profile().await);
        assert!(matches!(err, ApiError::Http { status: 500, .. }));
        assert!(!session.is_authenticated());
        assert!(fx.storage.get(keys::TOKEN).is_none());
    }

    #[tokio::test]
    async fn test_session_survives_restart_with_file_store() {
        use crate::config::ClientConfig;
        use crate::testing::{ScriptedTransport, TEST_BASE};
        use wecare_core::storage::FileStore;

        let dir = tempfile::TempDir::new().unwrap();
        let transport = ScriptedTransport::new();
        let start = || {
            WecareClient::builder(ClientConfig::default().with_base_url(TEST_BASE))
                .transport(transport.clone())
                .storage(Arc::new(FileStore::open(dir.path()).unwrap()))
                .build()
                .unwrap()
        };

        transport.respond_json(
            Method::POST,
            "/auth/login",
            200,
            json!({"token": "token-file", "user": officer()}),
        );
        assert_ok!(start().session().login("officer1@wecare.dev", "pw").await);

        transport.respond_json(Method::GET, "/auth/me", 200, officer());
        let restarted = start();
        assert!(restarted.session().initialize().await);
        assert_eq!(restarted.session().token().as_deref(), Some("token-file"));
    }

    #[test]
    fn test_parse_profile_shapes() {
        let bare = parse_profile(&officer(), "").unwrap();
        let wrapped = parse_profile(&json!({"user": officer()}), "").unwrap();
        assert_eq!(bare, wrapped);
        assert!(parse_profile(&json!(null), "").is_none());
    }
}
