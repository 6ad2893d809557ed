//! Resilient HTTP client for the WeCare community transport back-end
//!
//! This crate owns the request/session layer shared by every WeCare front
//! end: it attaches authentication, defends against CSRF, survives rate
//! limiting, and recovers from session expiry without reload loops.
//!
//! # Features
//!
//! - **Session management**: login, logout, rehydration from storage, profile refresh
//! - **CSRF protection**: lazily fetched token attached to every mutating call
//! - **Throttling**: 429 responses retried with exponential backoff (bounded)
//! - **Session recovery**: lost sessions trigger at most one forced reload
//! - **Request correlation**: every call carries an `X-Request-ID`
//!
//! # Example
//!
//! ```rust,no_run
//! use wecare_api_client::{ClientConfig, WecareClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WecareClient::with_config(ClientConfig::from_env()?)?;
//!
//!     let user = client.session().login("officer1@wecare.dev", "password").await?;
//!     println!("Logged in as {} ({})", user.name, user.role);
//!
//!     let rides = client.drivers().my_rides().await?;
//!     println!("{rides}");
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod classify;
pub mod client;
pub mod config;
pub mod csrf;
pub mod endpoints;
pub mod error;
pub mod principal;
pub mod reload;
pub mod request;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::{ClientBuilder, WecareClient};
pub use config::{ClientConfig, Environment};
pub use error::{ApiError, ApiResult};
pub use principal::{Principal, UserRole};
pub use reload::{LogOnlyReload, ReloadGuard, ReloadHandler};
pub use request::RequestDescriptor;
pub use session::{Session, SessionManager};
pub use transport::{MultipartForm, Transport};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::client::WecareClient;
    pub use crate::config::{ClientConfig, Environment};
    pub use crate::endpoints::{AuthApi, DriversApi, PatientsApi, RideStatus, RidesApi, TeamsApi};
    pub use crate::error::{ApiError, ApiResult};
    pub use crate::principal::{Principal, UserRole};
    pub use crate::request::RequestDescriptor;
    pub use crate::session::SessionManager;
}
