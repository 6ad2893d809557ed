//! Request descriptors and header assembly

use crate::error::{ApiError, ApiResult};
use crate::transport::{MultipartForm, TransportBody};
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Header carrying the CSRF token on mutating requests
pub const CSRF_HEADER: &str = "X-XSRF-TOKEN";

/// Request correlation ID header
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Body of a [`RequestDescriptor`]
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    /// No body
    #[default]
    None,
    /// JSON payload, serialized to text on send
    Json(Value),
    /// Multipart upload; never carries an explicit content type
    Multipart(MultipartForm),
}

impl RequestBody {
    /// Whether the body is multipart
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart(_))
    }

    pub(crate) fn to_transport(&self) -> ApiResult<TransportBody> {
        Ok(match self {
            Self::None => TransportBody::Empty,
            Self::Json(value) => TransportBody::Text(serde_json::to_string(value)?),
            Self::Multipart(form) => TransportBody::Multipart(form.clone()),
        })
    }
}

/// One outgoing call: endpoint, method, caller headers, body
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// Endpoint path relative to the API base (e.g. `/patients`)
    pub endpoint: String,
    /// HTTP method
    pub method: Method,
    /// Caller-supplied headers
    pub headers: HeaderMap,
    /// Body
    pub body: RequestBody,
    /// Optional cancellation, checked before every attempt
    pub cancel: Option<CancellationToken>,
    /// Token sent in place of the session's; see [`RequestDescriptor::with_bearer`]
    pub(crate) bearer: Option<String>,
}

impl RequestDescriptor {
    /// Create a descriptor with no body
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            headers: HeaderMap::new(),
            body: RequestBody::None,
            cancel: None,
            bearer: None,
        }
    }

    /// GET descriptor
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    /// DELETE descriptor
    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::DELETE, endpoint)
    }

    /// Attach a JSON body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> ApiResult<Self> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Attach a multipart body
    #[must_use]
    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    /// Add a caller header (caller wins over defaults)
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Make the request cancellable
    #[must_use]
    pub fn cancellable(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Send with this bearer token instead of the session's
    ///
    /// A rejection fails the call with `Unauthorized` and leaves the session
    /// and the reload guard untouched.
    #[must_use]
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Whether the method changes server state and needs a CSRF token
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        is_mutating(&self.method)
    }

    /// Whether the caller has already cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Assemble the final header set
    ///
    /// JSON content type unless multipart, then caller headers, then the
    /// bearer token and (when non-empty) the CSRF token. A caller content type
    /// is dropped for multipart bodies so the transport can set the boundary.
    pub fn build_headers(
        &self,
        bearer: Option<&str>,
        csrf: Option<&str>,
        request_id: &str,
    ) -> ApiResult<HeaderMap> {
        let multipart = self.body.is_multipart();
        let mut headers = HeaderMap::new();

        if !multipart {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        for (name, value) in &self.headers {
            if multipart && *name == CONTENT_TYPE {
                continue;
            }
            headers.insert(name.clone(), value.clone());
        }

        if let Some(token) = bearer.filter(|t| !t.is_empty()) {
            headers.insert(AUTHORIZATION, header_value(&format!("Bearer {token}"))?);
        }

        if let Some(token) = csrf.filter(|t| !t.is_empty()) {
            headers.insert(HeaderName::from_static("x-xsrf-token"), header_value(token)?);
        }

        headers.insert(
            HeaderName::from_static("x-request-id"),
            header_value(request_id)?,
        );

        Ok(headers)
    }
}

/// Whether a method is one of POST, PUT, PATCH, DELETE
#[must_use]
pub fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn header_value(value: &str) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| ApiError::config(format!("value cannot be sent as a header: {value:?}")))
}
