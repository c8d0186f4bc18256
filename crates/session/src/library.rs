// Rendering-library versions: the supported catalog and the loader contract.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

/// Default global namespace the library installs itself under.
pub const DEFAULT_LIBRARY_NAMESPACE: &str = "Board";
/// Entry file expected inside each version directory.
pub const LIBRARY_ENTRY_FILE: &str = "board.js";

/// Ordered list of supported versions, newest last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCatalog {
    versions: Vec<String>,
}

impl Default for VersionCatalog {
    fn default() -> Self {
        Self::new(["0.2.0", "0.3.0", "0.3.1"])
    }
}

impl VersionCatalog {
    pub fn new<I, V>(versions: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self { versions: versions.into_iter().map(Into::into).collect() }
    }

    pub fn versions(&self) -> &[String] {
        &self.versions
    }

    pub fn contains(&self, version: &str) -> bool {
        self.versions.iter().any(|v| v == version)
    }

    pub fn newest(&self) -> Option<&str> {
        self.versions.last().map(String::as_str)
    }

    /// Pick the version to load for a record. Unknown or missing versions
    /// fall back to the newest; the flag reports whether a known version
    /// was replaced.
    pub fn resolve(&self, requested: Option<&str>) -> Option<(String, bool)> {
        match requested {
            Some(v) if self.contains(v) => Some((v.to_string(), false)),
            Some(_) => self.newest().map(|v| (v.to_string(), true)),
            None => self.newest().map(|v| (v.to_string(), false)),
        }
    }
}

/// A loaded library instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryHandle {
    pub version: String,
    pub namespace: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("failed to load board library {version}: {reason}")]
pub struct VersionLoadError {
    pub version: String,
    pub reason: String,
}

impl VersionLoadError {
    pub fn new(version: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { version: version.into(), reason: reason.into() }
    }
}

/// Loads and unloads rendering-library versions.
pub trait LibraryLoader: Send + Sync + 'static {
    fn load(
        &self,
        version: &str,
    ) -> impl Future<Output = Result<LibraryHandle, VersionLoadError>> + Send;

    fn unload(&self, handle: LibraryHandle);
}

/// Loader backed by the configured catalog, optionally checking that each
/// version's entry file exists under a library directory.
#[derive(Debug, Clone)]
pub struct CatalogLoader {
    catalog: VersionCatalog,
    library_dir: Option<PathBuf>,
    namespace: String,
    latency: Duration,
}

impl CatalogLoader {
    pub fn new(catalog: VersionCatalog) -> Self {
        Self {
            catalog,
            library_dir: None,
            namespace: DEFAULT_LIBRARY_NAMESPACE.to_string(),
            latency: Duration::ZERO,
        }
    }

    pub fn with_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.library_dir = Some(dir.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Simulated fetch time before each load resolves.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn entry_path(&self, version: &str) -> Option<PathBuf> {
        self.library_dir.as_ref().map(|dir| dir.join(version).join(LIBRARY_ENTRY_FILE))
    }
}

impl LibraryLoader for CatalogLoader {
    async fn load(&self, version: &str) -> Result<LibraryHandle, VersionLoadError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if !self.catalog.contains(version) {
            return Err(VersionLoadError::new(version, "version is not in the catalog"));
        }
        if let Some(path) = self.entry_path(version) {
            match tokio::fs::try_exists(&path).await {
                Ok(true) => {}
                Ok(false) => {
                    return Err(VersionLoadError::new(
                        version,
                        format!("{} not found", path.display()),
                    ))
                }
                Err(e) => return Err(VersionLoadError::new(version, e.to_string())),
            }
        }

        debug!(version, "board library loaded");
        Ok(LibraryHandle { version: version.to_string(), namespace: self.namespace.clone() })
    }

    fn unload(&self, handle: LibraryHandle) {
        debug!(version = %handle.version, namespace = %handle.namespace, "board library unloaded");
    }
}
