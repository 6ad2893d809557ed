//! Main API client implementation

use crate::classify::{EndpointKind, Verdict, classify};
use crate::config::ClientConfig;
use crate::csrf::CsrfTokenCache;
use crate::endpoints::{AuthApi, DriversApi, PatientsApi, RidesApi, TeamsApi};
use crate::error::{ApiError, ApiResult, ErrorContext};
use crate::reload::{LogOnlyReload, ReloadGuard, ReloadHandler};
use crate::request::RequestDescriptor;
use crate::session::{SessionManager, SessionState};
use crate::transport::{HttpRequest, HttpResponse, MultipartForm, ReqwestTransport, Transport};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, instrument, warn};
use uuid::Uuid;
use wecare_core::storage::{KeyValueStore, MemoryStore};

/// WeCare API client with session, CSRF and throttling handling
///
/// Cheap to clone; clones share the session, the CSRF slot and the reload
/// guard. Every facade call goes through [`WecareClient::request`], which:
/// - Attaches the bearer token and, on mutating calls, the CSRF token
/// - Retries 429 responses with exponential backoff (bounded)
/// - Classifies the response and runs session recovery when needed
#[derive(Clone)]
pub struct WecareClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    session: SessionState,
    csrf: CsrfTokenCache,
    reload_guard: ReloadGuard,
    reload_handler: Arc<dyn ReloadHandler>,
}

/// Builder for [`WecareClient`]
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    storage: Option<Arc<dyn KeyValueStore>>,
    session_storage: Option<Arc<dyn KeyValueStore>>,
    reload_handler: Option<Arc<dyn ReloadHandler>>,
}

impl ClientBuilder {
    /// Use a custom transport instead of `reqwest`
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Persistent storage for the token and user
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Session-scoped storage for the reload marker
    #[must_use]
    pub fn session_storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.session_storage = Some(storage);
        self
    }

    /// Host hook invoked for the one-time forced reload
    #[must_use]
    pub fn reload_handler(mut self, handler: Arc<dyn ReloadHandler>) -> Self {
        self.reload_handler = Some(handler);
        self
    }

    /// Validate the configuration and build the client
    pub fn build(self) -> ApiResult<WecareClient> {
        self.config.validate()?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.config)?),
        };
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let session_storage = self
            .session_storage
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let reload_handler = self
            .reload_handler
            .unwrap_or_else(|| Arc::new(LogOnlyReload));

        Ok(WecareClient {
            inner: Arc::new(ClientInner {
                config: self.config,
                transport,
                session: SessionState::new(storage),
                csrf: CsrfTokenCache::new(),
                reload_guard: ReloadGuard::new(session_storage),
                reload_handler,
            }),
        })
    }
}

impl WecareClient {
    /// Create a new client with configuration from environment
    pub fn new() -> ApiResult<Self> {
        Self::with_config(ClientConfig::from_env()?)
    }

    /// Create a new client with specific configuration and default collaborators
    pub fn with_config(config: ClientConfig) -> ApiResult<Self> {
        Self::builder(config).build()
    }

    /// Start building a client
    #[must_use]
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder {
            config,
            transport: None,
            storage: None,
            session_storage: None,
            reload_handler: None,
        }
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.config.base_url
    }

    /// CSRF token cache of this client
    #[must_use]
    pub fn csrf(&self) -> &CsrfTokenCache {
        &self.inner.csrf
    }

    /// Reload guard of this client
    #[must_use]
    pub fn reload_guard(&self) -> &ReloadGuard {
        &self.inner.reload_guard
    }

    pub(crate) fn session_state(&self) -> &SessionState {
        &self.inner.session
    }

    // -------------------------------------------------------------------------
    // Session and endpoint accessors
    // -------------------------------------------------------------------------

    /// Session lifecycle operations
    #[must_use]
    pub fn session(&self) -> SessionManager {
        SessionManager::new(self.clone())
    }

    /// Access authentication endpoints
    #[must_use]
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    /// Access patient endpoints
    #[must_use]
    pub fn patients(&self) -> PatientsApi {
        PatientsApi::new(self.clone())
    }

    /// Access driver endpoints
    #[must_use]
    pub fn drivers(&self) -> DriversApi {
        DriversApi::new(self.clone())
    }

    /// Access ride endpoints
    #[must_use]
    pub fn rides(&self) -> RidesApi {
        RidesApi::new(self.clone())
    }

    /// Access team endpoints
    #[must_use]
    pub fn teams(&self) -> TeamsApi {
        TeamsApi::new(self.clone())
    }

    // -------------------------------------------------------------------------
    // Typed HTTP verbs
    // -------------------------------------------------------------------------

    /// Perform a GET request
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> ApiResult<T> {
        self.send(RequestDescriptor::get(endpoint)).await
    }

    /// Perform a POST request with a JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.send(RequestDescriptor::new(Method::POST, endpoint).json(body)?)
            .await
    }

    /// Perform a PUT request with a JSON body
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.send(RequestDescriptor::new(Method::PUT, endpoint).json(body)?)
            .await
    }

    /// Perform a PATCH request with a JSON body
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.send(RequestDescriptor::new(Method::PATCH, endpoint).json(body)?)
            .await
    }

    /// Perform a DELETE request
    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> ApiResult<T> {
        self.send(RequestDescriptor::delete(endpoint)).await
    }

    /// Upload a multipart form with POST
    pub async fn upload<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        form: MultipartForm,
    ) -> ApiResult<T> {
        self.send(RequestDescriptor::new(Method::POST, endpoint).multipart(form))
            .await
    }

    /// Dispatch a descriptor and decode the JSON result
    pub async fn send<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> ApiResult<T> {
        let value = self.request(descriptor).await?;
        serde_json::from_value(value).map_err(|e| ApiError::InvalidResponseBody(e.to_string()))
    }

    // -------------------------------------------------------------------------
    // Dispatcher
    // -------------------------------------------------------------------------

    /// Dispatch a descriptor and return the parsed JSON body
    ///
    /// A 204 or empty body yields `Value::Null`.
    #[instrument(
        skip(self, descriptor),
        fields(
            method = %descriptor.method,
            endpoint = %descriptor.endpoint,
            request_id = tracing::field::Empty
        )
    )]
    pub async fn request(&self, descriptor: RequestDescriptor) -> ApiResult<Value> {
        let request_id = Uuid::new_v4().to_string();
        Span::current().record("request_id", request_id.as_str());

        let context = ErrorContext {
            request_id: Some(request_id.clone()),
            endpoint: descriptor.endpoint.clone(),
            method: descriptor.method.to_string(),
        };

        let result = self.dispatch(&descriptor, &request_id).await;
        if let Err(ref e) = result {
            debug!(context = %context, error = %e, "Request failed");
        }
        result
    }

    async fn dispatch(&self, descriptor: &RequestDescriptor, request_id: &str) -> ApiResult<Value> {
        if descriptor.is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        // Only a token taken from the session is eligible for session recovery.
        let (bearer, session_token) = match &descriptor.bearer {
            Some(token) => (Some(token.clone()), None),
            None => {
                let token = self.inner.session.token();
                (token.clone(), token)
            }
        };
        let csrf = if descriptor.is_mutating() {
            Some(
                self.inner
                    .csrf
                    .get_token(&*self.inner.transport, &self.inner.config.base_url)
                    .await,
            )
        } else {
            None
        };

        let request = HttpRequest {
            method: descriptor.method.clone(),
            url: self.inner.config.url_for(&descriptor.endpoint),
            headers: descriptor.build_headers(bearer.as_deref(), csrf.as_deref(), request_id)?,
            body: descriptor.body.to_transport()?,
        };

        let response = self
            .execute_with_retry(request, descriptor.cancel.as_ref())
            .await?;

        let verdict = classify(
            EndpointKind::of(&descriptor.endpoint),
            bearer.is_some(),
            response.status,
            &response.body,
        );
        self.apply_verdict(verdict, session_token.as_deref())
    }

    /// Send, retrying throttled responses with backoff
    ///
    /// Strictly sequential. Cancellation is checked before every attempt and
    /// interrupts a backoff sleep.
    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        cancel: Option<&CancellationToken>,
    ) -> ApiResult<HttpResponse> {
        let retry = &self.inner.config.retry;
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(ApiError::Cancelled);
            }

            let response = self.inner.transport.send(request.clone()).await?;
            if response.status != StatusCode::TOO_MANY_REQUESTS {
                debug!(
                    status = response.status.as_u16(),
                    retries = attempt,
                    "Response received"
                );
                return Ok(response);
            }

            if !retry.should_retry(attempt) {
                warn!(retries = attempt, "Rate limited, retry budget exhausted");
                return Err(ApiError::RetryBudgetExhausted { attempts: attempt });
            }

            let delay = retry.delay_for_retry(attempt);
            debug!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis(),
                "Rate limited, retrying after delay"
            );

            match cancel {
                Some(token) => {
                    tokio::select! {
                        () = token.cancelled() => return Err(ApiError::Cancelled),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                None => tokio::time::sleep(delay).await,
            }

            attempt += 1;
        }
    }

    /// Perform the recovery a verdict implies and produce the call's result
    ///
    /// `session_token` is the session token the request carried, if any.
    fn apply_verdict(&self, verdict: Verdict, session_token: Option<&str>) -> ApiResult<Value> {
        match verdict {
            Verdict::Success(value) => Ok(value),
            Verdict::InvalidCredentials(message) => {
                self.session().invalidate();
                Err(ApiError::InvalidCredentials(message))
            }
            Verdict::SessionLost => Err(match session_token {
                Some(token) => self.recover_lost_session(token),
                None => ApiError::Unauthorized,
            }),
            Verdict::Unauthorized => Err(ApiError::Unauthorized),
            Verdict::CsrfRejected => {
                warn!("CSRF token rejected by server");
                self.inner.csrf.clear();
                Err(ApiError::SecurityTokenExpired)
            }
            Verdict::Http {
                status,
                message,
                detail,
            } => Err(ApiError::http(status, message, detail)),
            Verdict::InvalidBody(snippet) => Err(ApiError::InvalidResponseBody(snippet)),
        }
    }

    /// Clear the session and decide between the one-time reload and giving up
    ///
    /// Nothing is touched when `rejected` is no longer the current token: the
    /// session it belonged to is already gone.
    fn recover_lost_session(&self, rejected: &str) -> ApiError {
        if !self.session().invalidate_token(rejected) {
            debug!("Rejected token is no longer current, leaving session alone");
            return ApiError::Unauthorized;
        }
        self.inner.csrf.clear();

        if self.inner.reload_guard.try_trip() {
            warn!("Session rejected, forcing one-time reload");
            self.inner.reload_handler.reload();
            ApiError::Unauthorized
        } else {
            warn!("Session rejected again after reload, not reloading");
            ApiError::SessionExpired
        }
    }
}
