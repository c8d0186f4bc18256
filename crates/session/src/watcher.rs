// A file on disk acting as the editing widget.
//
// `FileEditor` writes content pushed by the controller to the file and
// caches what it last saw. `EditorFileWatcher` reports changes made to the
// file by other programs (a text editor) so they can be fed back to the
// session as content changes.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

use crate::host::{EditorSurface, SharedBuffer};

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    /// The file was written, created, or replaced.
    Changed,
    Removed,
}

/// Editor surface backed by a file. Clones share the cached text.
#[derive(Debug, Clone)]
pub struct FileEditor {
    path: PathBuf,
    buffer: SharedBuffer,
}

impl FileEditor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), buffer: SharedBuffer::default() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file. Returns the new text when it differs from the
    /// cached copy, `None` when nothing changed.
    pub async fn refresh(&self) -> Result<Option<String>> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        if text == self.buffer.text() {
            return Ok(None);
        }
        self.buffer.replace(text.clone());
        Ok(Some(text))
    }
}

impl EditorSurface for FileEditor {
    fn set_content(&mut self, content: &str) {
        self.buffer.replace(content);
        if let Err(e) = std::fs::write(&self.path, content) {
            error!(path = %self.path.display(), error = %e, "failed to write editor file");
        }
    }

    fn content(&self) -> String {
        self.buffer.text()
    }
}

/// Watches a single file for outside edits.
pub struct EditorFileWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl EditorFileWatcher {
    /// Start watching `path`. The parent directory is watched so that
    /// editors which save by replacing the file are still noticed.
    pub fn start(path: &Path) -> Result<(Self, mpsc::Receiver<FileEventKind>)> {
        let path = path
            .canonicalize()
            .with_context(|| format!("failed to canonicalize {}", path.display()))?;
        let parent = path
            .parent()
            .with_context(|| format!("{} has no parent directory", path.display()))?
            .to_path_buf();
        let file_name = path
            .file_name()
            .with_context(|| format!("{} has no file name", path.display()))?
            .to_os_string();

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Some(kind) = translate_event(&event, &file_name) {
                    if tx.blocking_send(kind).is_err() {
                        debug!("editor file channel closed");
                    }
                }
            }
            Err(e) => error!(error = %e, "editor file watcher error"),
        })
        .context("failed to create file watcher")?;

        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", parent.display()))?;
        debug!(path = %path.display(), "editor file watcher started");

        Ok((Self { _watcher: watcher, path }, rx))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Map a notify event to a change of the watched file, if it is one.
fn translate_event(event: &Event, file_name: &OsString) -> Option<FileEventKind> {
    let touches_file =
        event.paths.iter().any(|p| p.file_name().is_some_and(|name| name == file_name.as_os_str()));
    if !touches_file {
        return None;
    }

    match &event.kind {
        EventKind::Create(_) => Some(FileEventKind::Changed),
        EventKind::Modify(notify::event::ModifyKind::Metadata(_)) => {
            trace!("skipping metadata-only modify event");
            None
        }
        EventKind::Modify(_) => Some(FileEventKind::Changed),
        EventKind::Remove(_) => {
            warn!("editor file removed");
            Some(FileEventKind::Removed)
        }
        _ => None,
    }
}
