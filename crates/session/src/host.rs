// Host collaborators the session talks to: the editing widget, the
// confirmation prompt, and the download target.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// The editing widget. The controller pushes content in when a document is
/// opened and reads it back when saving.
pub trait EditorSurface: Send {
    fn set_content(&mut self, content: &str);
    fn content(&self) -> String;
}

/// In-memory editor buffer. Clones share the same text.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    text: Arc<Mutex<String>>,
}

impl SharedBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: Arc::new(Mutex::new(text.into())) }
    }

    /// Replace the text as a user edit would.
    pub fn replace(&self, text: impl Into<String>) {
        *self.text.lock().unwrap_or_else(PoisonError::into_inner) = text.into();
    }

    pub fn text(&self) -> String {
        self.text.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl EditorSurface for SharedBuffer {
    fn set_content(&mut self, content: &str) {
        self.replace(content);
    }

    fn content(&self) -> String {
        self.text()
    }
}

/// Synchronous yes/no prompt guarding destructive navigation.
pub trait ConfirmGate: Send {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> ConfirmGate for F
where
    F: FnMut(&str) -> bool + Send,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Answers every prompt the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl ConfirmGate for FixedAnswer {
    fn confirm(&mut self, _prompt: &str) -> bool {
        self.0
    }
}

/// Receives exported documents.
pub trait DownloadSink {
    fn offer(&mut self, filename: &str, content: &str) -> io::Result<()>;
}

/// Writes exported documents into a directory, remembering the last path.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    last_written: Option<PathBuf>,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), last_written: None }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn last_written(&self) -> Option<&Path> {
        self.last_written.as_deref()
    }
}

impl DownloadSink for DirectorySink {
    fn offer(&mut self, filename: &str, content: &str) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        std::fs::write(&path, content)?;
        self.last_written = Some(path);
        Ok(())
    }
}
