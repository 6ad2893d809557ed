//! HTTP transport seam
//!
//! The dispatcher never talks to `reqwest` directly. It hands a fully built
//! [`HttpRequest`] to a [`Transport`] and gets back the status and body text,
//! which keeps classification independent of the HTTP stack and lets tests
//! script responses.

use crate::config::ClientConfig;
use crate::error::ApiResult;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, StatusCode};

/// A request ready to go on the wire
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// Final header set
    pub headers: HeaderMap,
    /// Body
    pub body: TransportBody,
}

/// Body of an outgoing request
#[derive(Debug, Clone, Default)]
pub enum TransportBody {
    /// No body
    #[default]
    Empty,
    /// Serialized text (JSON)
    Text(String),
    /// Multipart form; the transport sets the boundary header
    Multipart(MultipartForm),
}

/// Cloneable multipart form description
///
/// `reqwest::multipart::Form` is consumed on send, so the form is kept as data
/// and rebuilt for every attempt of a retried request.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    parts: Vec<MultipartPart>,
}

#[derive(Debug, Clone)]
enum MultipartPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: Option<String>,
        data: Vec<u8>,
    },
}

impl MultipartForm {
    /// Create an empty form
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(MultipartPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Add a file field
    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: Option<&str>,
        data: Vec<u8>,
    ) -> Self {
        self.parts.push(MultipartPart::File {
            name: name.into(),
            file_name: file_name.into(),
            mime: mime.map(String::from),
            data,
        });
        self
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the form has no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Names of the fields, in insertion order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| match p {
            MultipartPart::Text { name, .. } | MultipartPart::File { name, .. } => name.as_str(),
        })
    }

    fn to_reqwest(&self) -> ApiResult<Form> {
        let mut form = Form::new();
        for part in &self.parts {
            form = match part {
                MultipartPart::Text { name, value } => form.text(name.clone(), value.clone()),
                MultipartPart::File {
                    name,
                    file_name,
                    mime,
                    data,
                } => {
                    let mut file = Part::bytes(data.clone()).file_name(file_name.clone());
                    if let Some(mime) = mime {
                        file = file.mime_str(mime)?;
                    }
                    form.part(name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}

/// What came back from the server
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code
    pub status: StatusCode,
    /// Body as text (possibly empty)
    pub body: String,
}

impl HttpResponse {
    /// Construct a response
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Executes one HTTP exchange
///
/// Implementations must include credentials (cookies) with every request;
/// the CSRF double-submit check on the server depends on them.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and read the whole body
    async fn send(&self, request: HttpRequest) -> ApiResult<HttpResponse>;
}

/// `reqwest`-backed transport with a cookie store
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: Client,
}

impl ReqwestTransport {
    /// Build a transport honouring the configured timeout
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            reqwest::header::HeaderValue::from_static("wecare-api-client/1.0"),
        );

        let inner = Client::builder()
            .timeout(config.timeout)
            .cookie_store(true)
            .default_headers(default_headers)
            .build()?;

        Ok(Self { inner })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> ApiResult<HttpResponse> {
        let mut builder = self
            .inner
            .request(request.method, &request.url)
            .headers(request.headers);

        builder = match request.body {
            TransportBody::Empty => builder,
            TransportBody::Text(text) => builder.body(text),
            TransportBody::Multipart(form) => builder.multipart(form.to_reqwest()?),
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        Ok(HttpResponse { status, body })
    }
}
