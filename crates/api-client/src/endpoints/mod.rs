//! Endpoint-specific API implementations
//!
//! Each module provides a typed interface for one resource of the WeCare
//! back-end. Facades are the only callers of the dispatcher; resource
//! payloads pass through as JSON values.
//!
//! | Module | Backend routes | Description |
//! |--------|----------------|-------------|
//! | `auth` | `/auth/login`, `/auth/me`, `/auth/upload-profile-image` | Authentication and profile |
//! | `patients` | `/patients` | Patient records |
//! | `drivers` | `/drivers`, `/drivers/available`, `/drivers/my-rides` | Drivers and their rides |
//! | `rides` | `/rides` | Ride requests and status updates |
//! | `teams` | `/teams` | Volunteer teams |

pub mod auth;
pub mod drivers;
pub mod patients;
pub mod rides;
pub mod teams;

pub use auth::AuthApi;
pub use drivers::DriversApi;
pub use patients::PatientsApi;
pub use rides::{RideStatus, RidesApi};
pub use teams::TeamsApi;
