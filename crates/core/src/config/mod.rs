//! Configuration file loading and schema definitions
//!
//! File-level settings shared by the client hosts. Values found here are the
//! lowest-priority layer; environment variables and CLI flags override them.

mod loader;
mod schema;

pub use loader::Config;
pub use schema::*;
