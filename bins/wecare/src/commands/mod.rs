//! CLI command implementations

pub mod auth;
pub mod request;
pub mod status;

use anyhow::Result;
use serde_json::Value;

/// Print a JSON value, pretty in text mode and compact in json mode
pub fn print_json(value: &Value, compact: bool) -> Result<()> {
    let rendered = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{rendered}");
    Ok(())
}
