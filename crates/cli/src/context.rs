// Settings and store access shared by every subcommand.

use std::path::{Path, PathBuf};

use anyhow::Context;
use boardpad_session::config::SessionConfig;
use boardpad_session::storage::SqliteStorage;
use boardpad_session::store::DocumentStore;
use tracing::debug;

pub type Store = DocumentStore<SqliteStorage>;

pub struct CliContext {
    config: SessionConfig,
    storage_path: Option<PathBuf>,
}

impl CliContext {
    pub fn new(config: SessionConfig, storage_path: Option<PathBuf>) -> Self {
        Self { config, storage_path }
    }

    /// Resolve settings. An explicit config path must exist and parse; the
    /// global file falls back to defaults.
    pub fn load(config_path: Option<&Path>, storage_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let config = match config_path {
            Some(path) => SessionConfig::load_from(path)
                .with_context(|| format!("failed to load config `{}`", path.display()))?,
            None => SessionConfig::load(),
        };
        Ok(Self::new(config, storage_path))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn storage_path(&self) -> anyhow::Result<PathBuf> {
        match &self.storage_path {
            Some(path) => Ok(path.clone()),
            None => Ok(self.config.storage_path()?),
        }
    }

    pub fn open_store(&self) -> anyhow::Result<Store> {
        let path = self.storage_path()?;
        let storage = SqliteStorage::open(&path)?.with_quota(self.config.limits.quota_bytes);
        debug!(path = %path.display(), namespace = %self.config.namespace, "opened store");
        Ok(DocumentStore::new(storage, self.config.store_options()?))
    }
}
