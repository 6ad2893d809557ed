//! Client construction from config file, environment and flags

use anyhow::{Context as _, Result};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::sync::Arc;
use wecare_api_client::{ClientConfig, ReloadHandler, WecareClient};
use wecare_core::config::Config;
use wecare_core::storage::{FileStore, MemoryStore};

/// Flags shared by every command
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub base_url: Option<String>,
    pub storage_dir: Option<PathBuf>,
    pub format: String,
}

/// Everything a command needs
pub struct Context {
    pub client: WecareClient,
    pub storage_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub format: String,
}

impl Context {
    /// Build the client: file values, then environment, then flags
    pub fn build(args: GlobalArgs) -> Result<Self> {
        let file = Config::load(args.config.as_deref())?;

        let mut config = ClientConfig::from_section_and_env(&file.schema.api)?;
        if let Some(url) = args.base_url {
            config = config.with_base_url(url);
        }

        let dir = args
            .storage_dir
            .unwrap_or_else(|| file.schema.storage.resolved_dir());
        let store = FileStore::open(&dir)
            .with_context(|| format!("cannot open session storage in {}", dir.display()))?;
        let storage_path = store.path().to_path_buf();

        // One process run is one browsing session for the reload guard.
        let client = WecareClient::builder(config)
            .storage(Arc::new(store))
            .session_storage(Arc::new(MemoryStore::new()))
            .reload_handler(Arc::new(CliReload))
            .build()?;

        Ok(Self {
            client,
            storage_path,
            config_path: file.path,
            format: args.format,
        })
    }

    pub fn json(&self) -> bool {
        self.format == "json"
    }
}

/// Reload for a terminal: the session is already cleared, tell the user
struct CliReload;

impl ReloadHandler for CliReload {
    fn reload(&self) {
        eprintln!(
            "{} {}",
            "Session ended.".yellow().bold(),
            "Run `wecare login <email>` to sign in again.".dimmed()
        );
    }
}
