// Session controller: the single owner of session state.
//
// Tracks which record the editor is bound to, whether it has unsaved
// edits, the debounced autosave, and the version-library load state
// machine. All methods are synchronous; timers and library loads are
// driven from outside (see `runtime`) by passing in the current instant
// and delivering load completions.

pub mod state;

use std::collections::VecDeque;

use boardpad_common::download::download_filename;
use boardpad_common::link::{self, LaunchParams};
use boardpad_common::share::{self, ShareError};
use boardpad_common::types::{FilePatch, FileRecord, SharePayload};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::autosave::{AutosaveConfig, AutosaveTimer};
use crate::host::{ConfirmGate, DownloadSink, EditorSurface};
use crate::library::{LibraryHandle, VersionCatalog, VersionLoadError};
use crate::storage::KeyValueStore;
use crate::store::{DocumentStore, StoreError};

pub use state::{Notice, NoticeLevel, SessionPhase, SessionState, SessionStatus};

/// Name given to documents opened from a share link.
pub const SHARED_DOCUMENT_NAME: &str = "shared";

const DISCARD_PROMPT: &str = "You have unsaved changes. Discard them?";
/// Oldest notices are dropped once this many are waiting to be drained.
const MAX_PENDING_NOTICES: usize = 64;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Share(#[from] ShareError),

    #[error("a board library version is still loading")]
    VersionLoading,

    #[error("no board library is loaded")]
    NoLibrary,

    #[error("failed to export document: {0}")]
    Export(String),

    #[error("failed to import `{path}`: {reason}")]
    Import { path: String, reason: String },

    #[error("session has shut down")]
    Closed,
}

/// A bundled starter document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    pub content: String,
    pub version: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub catalog: VersionCatalog,
    pub autosave: AutosaveConfig,
    /// Name of a freshly created, unsaved document.
    pub default_name: String,
    pub default_content: String,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            catalog: VersionCatalog::default(),
            autosave: AutosaveConfig::default(),
            default_name: "untitled".to_string(),
            default_content: String::new(),
        }
    }
}

/// Why a library load was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    /// The editor was bound to a document that needs this version.
    Binding,
    /// The user picked a version in the selector.
    UserSelection,
}

/// Work the host must carry out: unload `previous` (if any), then load
/// `version` and report back through `complete_version_load`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRequest {
    pub version: String,
    pub origin: LoadOrigin,
    pub previous: Option<LibraryHandle>,
}

#[derive(Debug, Clone, Copy)]
struct InFlightLoad {
    origin: LoadOrigin,
    epoch: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutosaveOutcome {
    Saved,
    /// Conditions no longer held when the timer fired.
    Skipped,
    Failed(StoreError),
}

/// Content and library namespace handed to the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub content: String,
    pub version: String,
    pub namespace: String,
}

pub struct SessionController<S> {
    store: DocumentStore<S>,
    editor: Box<dyn EditorSurface>,
    confirm: Box<dyn ConfirmGate>,
    options: ControllerOptions,
    autosave: AutosaveTimer,
    state: SessionState,
    library: Option<LibraryHandle>,
    pending_request: Option<VersionRequest>,
    in_flight: Option<(String, InFlightLoad)>,
    /// Version the bound document needs once the in-flight load settles.
    queued_binding: Option<String>,
    notices: VecDeque<Notice>,
    started: bool,
    closed: bool,
}

impl<S: KeyValueStore> SessionController<S> {
    pub fn new(
        store: DocumentStore<S>,
        editor: impl EditorSurface + 'static,
        confirm: impl ConfirmGate + 'static,
        options: ControllerOptions,
    ) -> Self {
        let autosave = AutosaveTimer::new(options.autosave);
        let state = SessionState {
            current_file_name: options.default_name.clone(),
            ..SessionState::default()
        };
        Self {
            store,
            editor: Box::new(editor),
            confirm: Box::new(confirm),
            options,
            autosave,
            state,
            library: None,
            pending_request: None,
            in_flight: None,
            queued_binding: None,
            notices: VecDeque::new(),
            started: false,
            closed: false,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn store(&self) -> &DocumentStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut DocumentStore<S> {
        &mut self.store
    }

    pub fn catalog(&self) -> &VersionCatalog {
        &self.options.catalog
    }

    pub fn library(&self) -> Option<&LibraryHandle> {
        self.library.as_ref()
    }

    pub fn editor_content(&self) -> String {
        self.editor.content()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            phase: self.state.phase(),
            file_id: self.state.current_file_id.clone(),
            file_name: self.state.current_file_name.clone(),
            board_version: self.state.current_board_version.clone(),
            dirty: self.state.is_dirty,
            version_loading: self.state.is_version_loading,
            autosave_pending: self.state.pending_autosave.is_some(),
            loaded_version: self.state.loaded_version.clone(),
            selected_version: self.state.selected_version.clone(),
            last_saved_at: self.state.last_saved_at,
            supported_versions: self.options.catalog.versions().to_vec(),
        }
    }

    /// Notices raised since the last drain, oldest first.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    // ── Startup ────────────────────────────────────────────────────

    /// Bind the initial document. A valid share token wins over a pending
    /// "open next" handoff; the handoff is consumed either way. Runs once.
    pub fn start(&mut self, params: &LaunchParams) {
        if self.started {
            debug!("session already started");
            return;
        }
        self.started = true;

        let pending = match self.store.take_pending_open() {
            Ok(pending) => pending,
            Err(error) => {
                warn!(%error, "failed to read pending open request");
                None
            }
        };

        if let Some(token) = params.share_token.as_deref() {
            match share::decode(token) {
                Ok(payload) => {
                    info!(version = %payload.version, "opening shared document");
                    let version = Some(payload.version.as_str());
                    self.bind_unsaved(SHARED_DOCUMENT_NAME, &payload.content, version);
                    return;
                }
                Err(error) => {
                    warn!(%error, "share link could not be decoded");
                    self.notify(Notice::error(format!("Could not open shared link: {error}")));
                }
            }
        }

        if let Some(id) = pending {
            match self.load_record(&id) {
                Ok(record) => {
                    self.bind_record(record);
                    return;
                }
                Err(error) => {
                    self.notify(Notice::error(format!("Could not open document: {error}")));
                }
            }
        }

        let name = self.options.default_name.clone();
        let content = self.options.default_content.clone();
        self.bind_unsaved(&name, &content, None);
    }

    // ── Editing and autosave ───────────────────────────────────────

    /// The host reports an edit.
    pub fn content_changed(&mut self) {
        self.content_changed_at(Instant::now());
    }

    /// Like `content_changed` but with a specific timestamp.
    pub fn content_changed_at(&mut self, now: Instant) {
        if !self.state.is_dirty {
            debug!("document became dirty");
            self.state.is_dirty = true;
        }
        if self.state.is_bound() && !self.state.is_version_loading {
            self.schedule_autosave(now);
        }
    }

    pub fn autosave_deadline(&self) -> Option<Instant> {
        self.autosave.deadline()
    }

    /// Run the pending autosave if its deadline has passed.
    pub fn fire_autosave_at(&mut self, now: Instant) -> Option<AutosaveOutcome> {
        self.autosave.take_due_at(now)?;
        self.state.pending_autosave = None;
        Some(self.persist())
    }

    /// Run the pending autosave immediately.
    pub fn flush_autosave(&mut self) -> Option<AutosaveOutcome> {
        self.autosave.take()?;
        self.state.pending_autosave = None;
        Some(self.persist())
    }

    fn persist(&mut self) -> AutosaveOutcome {
        let Some(id) = self.state.current_file_id.clone() else {
            return AutosaveOutcome::Skipped;
        };
        if !self.state.is_dirty || self.state.is_version_loading {
            debug!(id, "autosave skipped");
            return AutosaveOutcome::Skipped;
        }

        let mut patch = FilePatch::content(self.editor.content());
        if let Some(version) = &self.state.current_board_version {
            patch = patch.with_board_version(version.clone());
        }
        match self.store.update(&id, patch) {
            Ok(()) => {
                self.state.is_dirty = false;
                self.state.last_saved_at = self.now_utc();
                info!(id, "autosaved document");
                AutosaveOutcome::Saved
            }
            Err(error) => {
                warn!(id, %error, "autosave failed");
                self.notify(save_failure_notice(&error));
                AutosaveOutcome::Failed(error)
            }
        }
    }

    fn schedule_autosave(&mut self, now: Instant) {
        let handle = self.autosave.schedule_at(now);
        self.state.pending_autosave = Some(handle);
    }

    fn cancel_autosave(&mut self) {
        self.autosave.cancel();
        self.state.pending_autosave = None;
    }

    // ── Version loading ────────────────────────────────────────────

    /// The user picked a version. Returns whether a load was started.
    pub fn request_version(&mut self, version: &str) -> bool {
        if self.state.is_version_loading {
            warn!(version, "version change ignored while another version is loading");
            return false;
        }
        if self.state.loaded_version.as_deref() == Some(version) {
            debug!(version, "version already loaded");
            return false;
        }
        if !self.options.catalog.contains(version) {
            warn!(version, "unsupported version requested");
            self.notify(Notice::error(format!("Board version {version} is not supported")));
            return false;
        }

        self.begin_load(version, LoadOrigin::UserSelection);
        true
    }

    /// The next load the host should perform, if any.
    pub fn take_version_request(&mut self) -> Option<VersionRequest> {
        self.pending_request.take()
    }

    /// Deliver the result of a load handed out by `take_version_request`.
    pub fn complete_version_load(
        &mut self,
        version: &str,
        result: Result<LibraryHandle, VersionLoadError>,
        now: Instant,
    ) {
        let load = match self.in_flight.take() {
            Some((expected, load)) if expected == version => load,
            other => {
                warn!(version, "ignoring completion for a load that is not in flight");
                self.in_flight = other;
                return;
            }
        };
        self.state.is_version_loading = false;

        match result {
            Ok(handle) => {
                info!(version, origin = ?load.origin, "board library ready");
                self.library = Some(handle);
                self.state.loaded_version = Some(version.to_string());
                self.state.selected_version = Some(version.to_string());
                if load.epoch == self.state.binding_epoch {
                    self.state.current_board_version = Some(version.to_string());
                    if load.origin == LoadOrigin::UserSelection && self.state.is_bound() {
                        self.state.is_dirty = true;
                    }
                }
            }
            Err(error) => {
                warn!(version, %error, "board library failed to load");
                // The previous library was unloaded before this attempt.
                self.state.selected_version = self.state.loaded_version.take();
                self.notify(Notice::error(format!(
                    "Could not load board version {version}: {}",
                    error.reason
                )));
            }
        }

        if let Some(next) = self.queued_binding.take() {
            if self.state.loaded_version.as_deref() == Some(next.as_str()) {
                self.state.selected_version = Some(next);
            } else {
                self.begin_load(&next, LoadOrigin::Binding);
            }
        }

        if self.state.is_bound() && self.state.is_dirty && !self.state.is_version_loading {
            self.schedule_autosave(now);
        }
    }

    /// Make sure `version` is (or is becoming) the loaded library.
    fn ensure_version(&mut self, version: &str) {
        if self.state.is_version_loading {
            debug!(version, "load in flight; queueing version for the bound document");
            self.queued_binding = Some(version.to_string());
            return;
        }
        if self.state.loaded_version.as_deref() == Some(version) {
            self.state.selected_version = Some(version.to_string());
            return;
        }
        self.begin_load(version, LoadOrigin::Binding);
    }

    fn begin_load(&mut self, version: &str, origin: LoadOrigin) {
        debug!(version, ?origin, "requesting board library");
        self.state.is_version_loading = true;
        self.state.selected_version = Some(version.to_string());
        self.in_flight =
            Some((version.to_string(), InFlightLoad { origin, epoch: self.state.binding_epoch }));
        self.pending_request = Some(VersionRequest {
            version: version.to_string(),
            origin,
            previous: self.library.take(),
        });
    }

    /// Refuse to run while the library is missing or changing.
    pub fn prepare_run(&self) -> Result<RunRequest, SessionError> {
        if self.state.is_version_loading {
            return Err(SessionError::VersionLoading);
        }
        let library = self.library.as_ref().ok_or(SessionError::NoLibrary)?;
        Ok(RunRequest {
            content: self.editor.content(),
            version: library.version.clone(),
            namespace: library.namespace.clone(),
        })
    }

    /// Hand the library back for unloading, e.g. at shutdown.
    pub fn take_library(&mut self) -> Option<LibraryHandle> {
        self.state.loaded_version = None;
        self.library.take()
    }

    // ── Navigation ─────────────────────────────────────────────────

    /// Open a stored record. `Ok(false)` when the user declined to discard
    /// unsaved edits. On failure the session resets to a new unsaved
    /// document.
    pub fn open(&mut self, id: &str) -> Result<bool, SessionError> {
        if !self.confirm_discard() {
            return Ok(false);
        }
        match self.load_record(id) {
            Ok(record) => {
                self.bind_record(record);
                Ok(true)
            }
            Err(error) => {
                self.notify(Notice::error(format!("Could not open document: {error}")));
                let name = self.options.default_name.clone();
                let content = self.options.default_content.clone();
                self.bind_unsaved(&name, &content, None);
                Err(error.into())
            }
        }
    }

    pub fn new_document(&mut self) -> bool {
        if !self.confirm_discard() {
            return false;
        }
        let name = self.options.default_name.clone();
        let content = self.options.default_content.clone();
        self.bind_unsaved(&name, &content, None);
        true
    }

    /// Replace the editor with text from outside the store.
    pub fn load_external(&mut self, name: &str, content: &str) -> bool {
        if !self.confirm_discard() {
            return false;
        }
        self.bind_unsaved(name, content, None);
        true
    }

    pub fn load_template(&mut self, template: &Template) -> bool {
        if !self.confirm_discard() {
            return false;
        }
        self.bind_unsaved(&template.name, &template.content, template.version.as_deref());
        true
    }

    /// Flush any pending autosave, then ask before discarding what is
    /// still unsaved. Returns whether the session may end.
    pub fn close(&mut self) -> bool {
        self.flush_autosave();
        if !self.confirm_discard() {
            return false;
        }
        self.cancel_autosave();
        self.closed = true;
        info!("session closed");
        true
    }

    fn confirm_discard(&mut self) -> bool {
        if !self.state.is_dirty {
            return true;
        }
        let confirmed = self.confirm.confirm(DISCARD_PROMPT);
        if !confirmed {
            debug!("navigation cancelled to keep unsaved changes");
        }
        confirmed
    }

    fn load_record(&self, id: &str) -> Result<FileRecord, StoreError> {
        self.store.load(id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn bind_record(&mut self, record: FileRecord) {
        info!(id = %record.id, name = %record.name, "opened document");
        self.replace_document(&record.content);
        self.state.current_file_id = Some(record.id);
        self.state.current_file_name = record.name;
        self.state.current_board_version = record.board_version.clone();
        self.adopt_version(record.board_version.as_deref());
    }

    fn bind_unsaved(&mut self, name: &str, content: &str, version: Option<&str>) {
        debug!(name, "new unsaved document");
        self.replace_document(content);
        self.state.current_file_id = None;
        self.state.current_file_name = name.to_string();
        self.state.current_board_version = version.map(str::to_string);
        self.adopt_version(version);
    }

    fn replace_document(&mut self, content: &str) {
        self.cancel_autosave();
        self.editor.set_content(content);
        self.state.is_dirty = false;
        self.state.binding_epoch += 1;
    }

    fn adopt_version(&mut self, requested: Option<&str>) {
        match self.options.catalog.resolve(requested) {
            Some((version, fell_back)) => {
                if fell_back {
                    let original = requested.unwrap_or_default();
                    warn!(requested = original, fallback = %version, "unknown board version");
                    self.notify(Notice::warning(format!(
                        "Board version {original} is not available; using {version}"
                    )));
                }
                self.state.current_board_version = Some(version.clone());
                self.ensure_version(&version);
            }
            None => {
                warn!("no supported board versions configured");
                self.notify(Notice::warning("No board library versions are available"));
            }
        }
    }

    // ── Saving and exporting ───────────────────────────────────────

    /// Store the editor content as a new record and bind to it.
    pub fn save_as(&mut self, name: &str) -> Result<String, SessionError> {
        let content = self.editor.content();
        let version = self.state.current_board_version.clone();
        let id = match self.store.create(name, &content, version.as_deref()) {
            Ok(id) => id,
            Err(error) => {
                self.notify(save_failure_notice(&error));
                return Err(error.into());
            }
        };

        self.cancel_autosave();
        self.state.current_file_id = Some(id.clone());
        self.state.current_file_name = name.to_string();
        self.state.is_dirty = false;
        self.state.last_saved_at = self.now_utc();
        self.notify(Notice::info(format!("Saved as {name}")));
        Ok(id)
    }

    /// Offer the editor content to `sink`. Session state is untouched.
    pub fn save_to_file(&self, sink: &mut dyn DownloadSink) -> Result<String, SessionError> {
        let extension = &self.store.options().default_extension;
        let filename = download_filename(&self.state.current_file_name, extension);
        sink.offer(&filename, &self.editor.content())
            .map_err(|error| SessionError::Export(error.to_string()))?;
        info!(filename, "exported editor content");
        Ok(filename)
    }

    // ── Sharing ────────────────────────────────────────────────────

    fn share_payload(&self) -> SharePayload {
        let version = self
            .state
            .current_board_version
            .clone()
            .or_else(|| self.options.catalog.newest().map(str::to_string))
            .unwrap_or_default();
        SharePayload { content: self.editor.content(), version }
    }

    pub fn share_token(&self) -> Result<String, SessionError> {
        Ok(share::encode(&self.share_payload())?)
    }

    pub fn share_link(&self, base: &Url) -> Result<Url, SessionError> {
        Ok(link::share_link(base, &self.share_payload())?)
    }

    fn notify(&mut self, notice: Notice) {
        if self.notices.len() >= MAX_PENDING_NOTICES {
            self.notices.pop_front();
        }
        self.notices.push_back(notice);
    }

    fn now_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.store.clock().now_millis())
    }
}

fn save_failure_notice(error: &StoreError) -> Notice {
    match error {
        StoreError::QuotaExceeded(_) => Notice::error(
            "Storage is full. Export or delete some documents, then save again.",
        ),
        other => Notice::error(format!("Could not save document: {other}")),
    }
}
