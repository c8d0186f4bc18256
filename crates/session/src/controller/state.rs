// In-memory session state and the views derived from it.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::autosave::AutosaveHandle;

/// Everything the controller tracks about the open document. Owned by the
/// controller; hosts read it through `SessionController::state`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Bound record, or `None` for an unsaved document.
    pub current_file_id: Option<String>,
    pub current_file_name: String,
    /// Version persisted with the next save.
    pub current_board_version: Option<String>,
    pub is_dirty: bool,
    pub is_version_loading: bool,
    pub pending_autosave: Option<AutosaveHandle>,
    /// Last version whose library loaded successfully.
    pub loaded_version: Option<String>,
    /// Version shown in the selector. Reverts to `loaded_version` when a
    /// load fails.
    pub selected_version: Option<String>,
    pub last_saved_at: Option<DateTime<Utc>>,
    /// Bumped whenever the editor's document is replaced. Load completions
    /// compare against it to detect navigation while they were in flight.
    pub binding_epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Unbound,
    BoundClean,
    BoundDirty,
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match (&self.current_file_id, self.is_dirty) {
            (None, _) => SessionPhase::Unbound,
            (Some(_), false) => SessionPhase::BoundClean,
            (Some(_), true) => SessionPhase::BoundDirty,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.current_file_id.is_some()
    }
}

/// Serializable snapshot for status bars and `--json` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub phase: SessionPhase,
    pub file_id: Option<String>,
    pub file_name: String,
    pub board_version: Option<String>,
    pub dirty: bool,
    pub version_loading: bool,
    pub autosave_pending: bool,
    pub loaded_version: Option<String>,
    pub selected_version: Option<String>,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub supported_versions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Transient user-facing message. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}
