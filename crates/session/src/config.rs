// Session configuration at `~/.boardpad/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::autosave::{AutosaveConfig, DEFAULT_AUTOSAVE_MS};
use crate::controller::ControllerOptions;
use crate::library::{CatalogLoader, VersionCatalog, DEFAULT_LIBRARY_NAMESPACE};
use crate::store::handoff::HANDOFF_KEY;
use crate::store::{StoreLimits, StoreOptions, DEFAULT_PREFIX};

/// Root directory for boardpad state: `~/.boardpad/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".boardpad"))
}

/// Path to the config file: `~/.boardpad/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

/// Default SQLite storage file: `~/.boardpad/storage.db`.
pub fn default_storage_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("storage.db"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Key prefix for document records.
    pub namespace: String,
    /// Autosave quiet period, clamped to [250, 60000].
    pub autosave_delay_ms: u64,
    /// Extension appended to exported names that have none.
    pub default_extension: String,
    pub default_name: String,
    pub default_content: String,
    /// Supported board library versions, newest last.
    pub supported_versions: Vec<String>,
    /// SQLite file holding the documents (defaults to `~/.boardpad/storage.db`).
    pub storage_path: Option<PathBuf>,
    /// Directory with one `<version>/board.js` per supported version.
    pub library_dir: Option<PathBuf>,
    pub library_namespace: String,
    pub limits: LimitsConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_PREFIX.into(),
            autosave_delay_ms: DEFAULT_AUTOSAVE_MS,
            default_extension: boardpad_common::download::DEFAULT_EXTENSION.into(),
            default_name: "untitled".into(),
            default_content: String::new(),
            supported_versions: VersionCatalog::default().versions().to_vec(),
            storage_path: None,
            library_dir: None,
            library_namespace: DEFAULT_LIBRARY_NAMESPACE.into(),
            limits: LimitsConfig::default(),
        }
    }
}

/// Storage bounds. Omitted fields keep their defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_content_bytes: Option<usize>,
    pub max_records: Option<usize>,
    /// Total bytes (keys plus values) the storage backend accepts.
    pub quota_bytes: Option<usize>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        let store = StoreLimits::default();
        Self {
            max_content_bytes: store.max_content_bytes,
            max_records: store.max_records,
            quota_bytes: Some(5 * 1024 * 1024),
        }
    }
}

impl SessionConfig {
    /// Load from `~/.boardpad/config.toml`. Returns defaults if the file
    /// doesn't exist or can't be parsed.
    pub fn load() -> Self {
        global_config_path().and_then(|p| Self::load_from(&p).ok()).unwrap_or_default()
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save to `~/.boardpad/config.toml`.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = global_config_path().ok_or(ConfigError::NoHomeDir)?;
        self.save_to(&path)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn storage_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage_path {
            Some(path) => Ok(path.clone()),
            None => default_storage_path().ok_or(ConfigError::NoHomeDir),
        }
    }

    pub fn catalog(&self) -> VersionCatalog {
        VersionCatalog::new(self.supported_versions.iter().cloned())
    }

    pub fn autosave(&self) -> AutosaveConfig {
        AutosaveConfig::with_millis(self.autosave_delay_ms)
    }

    /// Store settings. The namespace must be non-empty and must not cover
    /// the handoff key, or listings and `clear` would reach it.
    pub fn store_options(&self) -> Result<StoreOptions, ConfigError> {
        if self.namespace.is_empty() || HANDOFF_KEY.starts_with(&self.namespace) {
            return Err(ConfigError::InvalidNamespace(self.namespace.clone()));
        }
        Ok(StoreOptions {
            prefix: self.namespace.clone(),
            limits: StoreLimits {
                max_content_bytes: self.limits.max_content_bytes,
                max_records: self.limits.max_records,
            },
            default_extension: self.default_extension.clone(),
        })
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            catalog: self.catalog(),
            autosave: self.autosave(),
            default_name: self.default_name.clone(),
            default_content: self.default_content.clone(),
        }
    }

    pub fn loader(&self) -> CatalogLoader {
        let loader = CatalogLoader::new(self.catalog()).with_namespace(&self.library_namespace);
        match &self.library_dir {
            Some(dir) => loader.with_library_dir(dir),
            None => loader,
        }
    }
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("could not determine home directory")]
    NoHomeDir,
    #[error("namespace `{0}` is empty or covers the handoff key")]
    InvalidNamespace(String),
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn defaults() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.namespace, "boardpad:file:");
        assert_eq!(cfg.autosave_delay_ms, 2000);
        assert_eq!(cfg.default_extension, "js");
        assert_eq!(cfg.default_name, "untitled");
        assert_eq!(cfg.supported_versions.last().map(String::as_str), Some("0.3.1"));
        assert_eq!(cfg.limits.max_records, Some(500));
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let cfg: SessionConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, SessionConfig::default());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let toml_str = r#"
namespace = "test:"
supported_versions = ["1.0.0", "1.1.0"]

[limits]
max_records = 3
"#;
        let cfg: SessionConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.namespace, "test:");
        assert_eq!(cfg.catalog().newest(), Some("1.1.0"));
        assert_eq!(cfg.limits.max_records, Some(3));
        assert_eq!(cfg.limits.max_content_bytes, Some(1024 * 1024));
        assert_eq!(cfg.autosave_delay_ms, 2000);
    }

    #[test]
    fn autosave_delay_is_clamped() {
        let cfg = SessionConfig { autosave_delay_ms: 5, ..SessionConfig::default() };
        assert_eq!(cfg.autosave().delay, Duration::from_millis(250));
    }

    #[test]
    fn roundtrip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deep").join("config.toml");
        let cfg = SessionConfig {
            namespace: "custom:".into(),
            storage_path: Some(dir.path().join("kv.db")),
            library_dir: Some(dir.path().join("lib")),
            ..SessionConfig::default()
        };

        cfg.save_to(&path).unwrap();
        assert_eq!(SessionConfig::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = SessionConfig::load_from(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "autosave_delay_ms = \"soon\"").unwrap();
        assert!(matches!(SessionConfig::load_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn store_options_follow_config() {
        let cfg = SessionConfig {
            namespace: "x:".into(),
            default_extension: "ts".into(),
            ..SessionConfig::default()
        };
        let options = cfg.store_options().unwrap();
        assert_eq!(options.prefix, "x:");
        assert_eq!(options.default_extension, "ts");
    }

    #[test]
    fn namespace_covering_handoff_key_is_rejected() {
        for namespace in ["", "boardpad:", "boardpad:open"] {
            let cfg = SessionConfig { namespace: namespace.into(), ..SessionConfig::default() };
            let result = cfg.store_options();
            assert!(
                matches!(result, Err(ConfigError::InvalidNamespace(ref ns)) if ns == namespace),
                "namespace {namespace:?} should be rejected"
            );
        }
        let sibling =
            SessionConfig { namespace: "boardpad:open-next:".into(), ..SessionConfig::default() };
        assert!(sibling.store_options().is_ok());
    }

    #[test]
    fn explicit_storage_path_wins() {
        let cfg = SessionConfig {
            storage_path: Some(PathBuf::from("/tmp/boardpad.db")),
            ..SessionConfig::default()
        };
        assert_eq!(cfg.storage_path().unwrap(), PathBuf::from("/tmp/boardpad.db"));
    }

    #[test]
    fn global_dir_is_under_home() {
        let dir = global_dir().unwrap();
        assert!(dir.ends_with(".boardpad"));
    }
}
