//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigSchema {
    /// `[api]` table
    #[serde(default)]
    pub api: ApiSection,

    /// `[storage]` table
    #[serde(default)]
    pub storage: StorageSection,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiSection {
    /// Absolute API base URL (e.g. `https://wecare.example/api`)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Runtime base of a dev proxy; `/api-proxy` is appended
    #[serde(default)]
    pub runtime_base: Option<String>,

    /// Environment name (development, staging, production)
    #[serde(default)]
    pub environment: Option<String>,

    /// Request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Where persistent session data lives
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageSection {
    /// Directory for the persistent store
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl StorageSection {
    /// Configured directory, or the platform data directory
    #[must_use]
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(default_storage_dir)
    }
}

fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from(".wecare"))
        .join("wecare")
}
