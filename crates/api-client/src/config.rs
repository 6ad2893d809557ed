//! Configuration for the WeCare API client
//!
//! Built once at startup and injected into [`WecareClient`](crate::WecareClient).
//! Nothing on the request path reads the environment.

use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use wecare_core::config::ApiSection;
use wecare_core::retry::RetryConfig;

/// Default backend when nothing else is configured
const DEFAULT_API_BASE_URL: &str = "http://localhost:3001/api";

/// Path appended to a runtime base to reach the dev proxy
const API_PROXY_SUFFIX: &str = "/api-proxy";

/// Environment types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development behind the dev proxy
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    #[default]
    Production,
}

impl Environment {
    /// Parse an environment name; unknown names mean production
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "development" | "dev" | "local" => Self::Development,
            "staging" | "stage" => Self::Staging,
            _ => Self::Production,
        }
    }

    /// Read `WECARE_ENV`
    #[must_use]
    pub fn from_env() -> Self {
        Self::parse(&env::var("WECARE_ENV").unwrap_or_default())
    }
}

/// Pick the API base URL
///
/// Development prefers the runtime proxy base over an explicit API URL;
/// staging and production prefer the explicit URL. Blank values are ignored.
#[must_use]
pub fn resolve_base_url(
    environment: Environment,
    api_base_url: Option<&str>,
    runtime_base: Option<&str>,
) -> String {
    let explicit = api_base_url
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('/').to_string());
    let proxied = runtime_base
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("{}{API_PROXY_SUFFIX}", s.trim_end_matches('/')));

    let chosen = match environment {
        Environment::Development => proxied.or(explicit),
        Environment::Staging | Environment::Production => explicit.or(proxied),
    };

    chosen.unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API base URL, without a trailing slash
    pub base_url: String,
    /// Per-request timeout applied by the transport
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Backoff policy for throttled (429) responses
    pub retry: RetryConfig,
    /// Current environment
    pub environment: Environment,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            environment: Environment::default(),
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables
    ///
    /// Reads the following environment variables:
    /// - `WECARE_ENV`: Environment (development/staging/production)
    /// - `WECARE_API_BASE_URL`: Absolute API base URL
    /// - `WECARE_RUNTIME_BASE`: Dev proxy origin; `/api-proxy` is appended
    /// - `WECARE_TIMEOUT_SECS`: Request timeout in seconds
    pub fn from_env() -> ApiResult<Self> {
        Self::from_section_and_env(&ApiSection::default())
    }

    /// Layer environment variables over a `[api]` file section
    ///
    /// A variable that is set and non-empty wins over the file value.
    pub fn from_section_and_env(section: &ApiSection) -> ApiResult<Self> {
        let var = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());

        let merged = ApiSection {
            base_url: var("WECARE_API_BASE_URL").or_else(|| section.base_url.clone()),
            runtime_base: var("WECARE_RUNTIME_BASE").or_else(|| section.runtime_base.clone()),
            environment: var("WECARE_ENV").or_else(|| section.environment.clone()),
            timeout_secs: var("WECARE_TIMEOUT_SECS")
                .and_then(|s| s.trim().parse().ok())
                .or(section.timeout_secs),
        };
        Self::from_section(&merged)
    }

    /// Create configuration from a `[api]` file section
    pub fn from_section(section: &ApiSection) -> ApiResult<Self> {
        let environment = section
            .environment
            .as_deref()
            .map_or_else(Environment::default, Environment::parse);

        let config = Self {
            base_url: resolve_base_url(
                environment,
                section.base_url.as_deref(),
                section.runtime_base.as_deref(),
            ),
            timeout: section
                .timeout_secs
                .map_or(Duration::from_secs(30), Duration::from_secs),
            retry: RetryConfig::default(),
            environment,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create development configuration (local backend)
    #[must_use]
    pub fn development() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
            environment: Environment::Development,
        }
    }

    /// Builder-style method to set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Builder-style method to set timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder-style method to set retry config
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Absolute URL for an endpoint path
    #[must_use]
    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.base_url.is_empty() {
            return Err(ApiError::config("base_url cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ApiError::config("base_url must start with http:// or https://"));
        }

        if self.timeout.is_zero() {
            return Err(ApiError::config("timeout cannot be zero"));
        }

        let multiplier = self.retry.backoff_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(ApiError::config(format!(
                "retry backoff_multiplier must be a finite number >= 1.0, got {multiplier}"
            )));
        }

        Ok(())
    }
}
