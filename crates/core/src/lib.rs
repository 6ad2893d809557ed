//! Core utilities for the WeCare client
//!
//! This crate provides the leaf building blocks shared by the API client and
//! the command-line host:
//!
//! - **Error handling**: Coded errors with context and recovery suggestions
//! - **Storage**: Key/value storage adapter (memory, file-backed, unavailable)
//! - **Retry**: Exponential backoff policy for throttled requests
//! - **Configuration**: TOML configuration file discovery and parsing
//!
//! # Example
//!
//! ```rust,no_run
//! use wecare_core::storage::{keys, KeyValueStore, MemoryStore};
//! use wecare_core::retry::RetryConfig;
//!
//! let store = MemoryStore::new();
//! store.set(keys::TOKEN, "abc");
//! assert_eq!(store.get(keys::TOKEN).as_deref(), Some("abc"));
//!
//! let retry = RetryConfig::default();
//! assert_eq!(retry.delay_for_retry(1).as_secs(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod retry;
pub mod storage;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, ConfigSchema};
    pub use crate::error::{Error, ErrorCode, Result, ResultExt};
    pub use crate::retry::RetryConfig;
    pub use crate::storage::{FileStore, KeyValueStore, MemoryStore, UnavailableStore};
}
