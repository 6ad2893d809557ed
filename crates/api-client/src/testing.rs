//! Scripted transport and fixtures for unit tests

use crate::client::WecareClient;
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::reload::ReloadHandler;
use crate::transport::{HttpRequest, HttpResponse, Transport, TransportBody};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::time::Instant;
use wecare_core::storage::MemoryStore;

pub(crate) const TEST_BASE: &str = "http://wecare.test/api";

enum Scripted {
    Respond(u16, String),
    /// Held until the gate is notified
    Gated(u16, String, Arc<Notify>),
    Fail(String),
}

/// A request the scripted transport received
#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: TransportBody,
    pub at: Instant,
}

/// Answers each `METHOD path` from a FIFO queue; unscripted calls get a 404
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

fn route_key(method: &Method, path: &str) -> String {
    format!("{method} {path}")
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, method: Method, path: &str, scripted: Scripted) {
        self.routes
            .lock()
            .unwrap()
            .entry(route_key(&method, path))
            .or_default()
            .push_back(scripted);
    }

    pub fn respond(&self, method: Method, path: &str, status: u16, body: &str) {
        self.push(method, path, Scripted::Respond(status, body.to_string()));
    }

    pub fn respond_json(&self, method: Method, path: &str, status: u16, body: Value) {
        self.push(method, path, Scripted::Respond(status, body.to_string()));
    }

    /// Script a response that is held back until the returned gate is notified
    pub fn respond_gated(
        &self,
        method: Method,
        path: &str,
        status: u16,
        body: &str,
    ) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.push(
            method,
            path,
            Scripted::Gated(status, body.to_string(), gate.clone()),
        );
        gate
    }

    pub fn fail(&self, method: Method, path: &str, message: &str) {
        self.push(method, path, Scripted::Fail(message.to_string()));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: Method, path: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method && c.path == path)
            .collect()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.calls_to(method, path).len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> ApiResult<HttpResponse> {
        let path = request
            .url
            .strip_prefix(TEST_BASE)
            .unwrap_or(&request.url)
            .to_string();

        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method.clone(),
            path: path.clone(),
            headers: request.headers.clone(),
            body: request.body.clone(),
            at: Instant::now(),
        });

        let next = self
            .routes
            .lock()
            .unwrap()
            .get_mut(&route_key(&request.method, &path))
            .and_then(VecDeque::pop_front);

        match next {
            Some(Scripted::Respond(status, body)) => Ok(HttpResponse::new(
                StatusCode::from_u16(status).unwrap(),
                body,
            )),
            Some(Scripted::Gated(status, body, gate)) => {
                gate.notified().await;
                Ok(HttpResponse::new(StatusCode::from_u16(status).unwrap(), body))
            }
            Some(Scripted::Fail(message)) => Err(ApiError::Network(message)),
            None => Ok(HttpResponse::new(
                StatusCode::NOT_FOUND,
                r#"{"error":"no scripted response"}"#,
            )),
        }
    }
}

/// Reload handler that counts invocations
#[derive(Default)]
pub(crate) struct RecordingReload {
    count: AtomicUsize,
}

impl RecordingReload {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl ReloadHandler for RecordingReload {
    fn reload(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Everything a client test needs to poke at
pub(crate) struct Fixture {
    pub client: WecareClient,
    pub transport: Arc<ScriptedTransport>,
    pub storage: Arc<MemoryStore>,
    pub session_storage: Arc<MemoryStore>,
    pub reload: Arc<RecordingReload>,
}

impl Fixture {
    pub fn new() -> Self {
        let transport = ScriptedTransport::new();
        let storage = Arc::new(MemoryStore::new());
        let session_storage = Arc::new(MemoryStore::new());
        let reload = Arc::new(RecordingReload::default());

        let client = WecareClient::builder(ClientConfig::default().with_base_url(TEST_BASE))
            .transport(transport.clone())
            .storage(storage.clone())
            .session_storage(session_storage.clone())
            .reload_handler(reload.clone())
            .build()
            .unwrap();

        Self {
            client,
            transport,
            storage,
            session_storage,
            reload,
        }
    }

    /// Fixture whose persisted storage already holds a session
    pub fn with_persisted_session(token: &str, user: Value) -> Self {
        use wecare_core::storage::{KeyValueStore, keys};

        let fixture = Self::new();
        fixture.storage.set(keys::TOKEN, token);
        fixture.storage.set(keys::USER, &user.to_string());
        fixture
    }
}
