//! Configuration file loading

use super::schema::ConfigSchema;
use crate::error::{Error, Result, ResultExt};
use std::path::{Path, PathBuf};

/// Configuration wrapper
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed contents
    pub schema: ConfigSchema,
    /// File the schema was read from, if any
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from an explicit path, or discover one
    ///
    /// An explicit path must exist. Without one, the standard locations are
    /// searched and defaults are used when nothing is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) if !p.exists() => return Err(Error::config_not_found(p)),
            Some(p) => Some(p.to_path_buf()),
            None => find_config_file(),
        };

        let schema = match config_path {
            Some(ref p) => load_config_file(p)?,
            None => ConfigSchema::default(),
        };

        Ok(Self {
            schema,
            path: config_path,
        })
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(Self {
            schema: toml::from_str(content)?,
            path: None,
        })
    }
}

/// Find configuration file in standard locations
fn find_config_file() -> Option<PathBuf> {
    let mut candidates = vec![PathBuf::from(".wecare.toml"), PathBuf::from("wecare.toml")];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("wecare").join("config.toml"));
    }

    candidates.into_iter().find(|c| c.exists())
}

/// Load and parse a TOML configuration file
fn load_config_file(path: &Path) -> Result<ConfigSchema> {
    let content = std::fs::read_to_string(path)
        .map_err(Error::from)
        .context(format!("Failed to read config file {}", path.display()))?;

    toml::from_str(&content)
        .map_err(Error::from)
        .context(format!("Failed to parse config file {}", path.display()))
}
