//! Error types for the API client

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// API client errors
///
/// Every failed call ends in exactly one of these. Recovery side effects
/// (session invalidation, CSRF reset, forced reload) have already happened by
/// the time the error reaches the caller.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport failed before a response existed
    #[error("Network error: {0}")]
    Network(String),

    /// Login endpoint rejected the credentials
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Authentication required and nothing to recover
    #[error("Unauthorized - please log in")]
    Unauthorized,

    /// Session lost again after a recovery reload already happened
    #[error("Session expired, please log in again")]
    SessionExpired,

    /// Server rejected the CSRF token
    #[error("Security token expired - refresh the page and try again")]
    SecurityTokenExpired,

    /// Success status with a body that is not JSON
    #[error("Invalid response body: {0}")]
    InvalidResponseBody(String),

    /// Login succeeded without both a token and a user
    #[error("Invalid login response: {0}")]
    InvalidLoginResponse(String),

    /// Any other non-success status
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Error message from the body, or the status reason
        message: String,
        /// Structured detail from the body, if any
        detail: Option<Value>,
    },

    /// Still throttled after the whole retry budget
    #[error("Rate limited - gave up after {attempts} retries")]
    RetryBudgetExhausted {
        /// Number of retries issued
        attempts: u32,
    },

    /// Caller cancelled the request
    #[error("Request cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization of a request body failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl ApiError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP status error
    pub fn http(status: u16, message: impl Into<String>, detail: Option<Value>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            detail,
        }
    }

    /// HTTP status associated with the error, when one is implied
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::InvalidCredentials(_) | Self::Unauthorized | Self::SessionExpired => Some(401),
            Self::SecurityTokenExpired => Some(403),
            Self::RetryBudgetExhausted { .. } => Some(429),
            _ => None,
        }
    }

    /// Whether the failure concerns authentication or the security token
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials(_)
                | Self::Unauthorized
                | Self::SessionExpired
                | Self::SecurityTokenExpired
        )
    }

    /// Check if this is a client error (4xx)
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|s| (400..500).contains(&s))
    }

    /// Check if this is a server error (5xx)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| s >= 500)
    }

    /// Message suitable for a toast or banner
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Cannot reach the server. Check your connection.".to_string(),
            Self::InvalidCredentials(_) => "Invalid email or password.".to_string(),
            Self::Unauthorized | Self::SessionExpired => {
                "Session expired, please log in again.".to_string()
            }
            Self::Http { status, .. } if *status >= 500 => {
                "The server had a problem. Please try again.".to_string()
            }
            Self::Http { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Error context for better debugging
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Request ID for correlation
    pub request_id: Option<String>,
    /// Endpoint that was called
    pub endpoint: String,
    /// HTTP method used
    pub method: String,
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.endpoint)?;
        if let Some(ref id) = self.request_id {
            write!(f, " (request_id: {id})")?;
        }
        Ok(())
    }
}
