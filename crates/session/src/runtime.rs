// Async driver for a session controller.
//
// One task owns the controller and reacts to commands from any number of
// `SessionHandle`s, version-load completions, lifecycle events, and the
// autosave deadline. Library loads run on spawned tasks and report back
// over a channel, so the controller itself never awaits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use boardpad_common::link::LaunchParams;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::controller::{
    AutosaveOutcome, Notice, SessionController, SessionError, SessionStatus, Template,
    VersionRequest,
};
use crate::host::DownloadSink;
use crate::library::{LibraryHandle, LibraryLoader, VersionLoadError};
use crate::lifecycle::{LifecycleEvent, LifecycleSubscription};
use crate::storage::KeyValueStore;

const COMMAND_CHANNEL_CAPACITY: usize = 64;
const NOTICE_CHANNEL_CAPACITY: usize = 64;
const LOAD_CHANNEL_CAPACITY: usize = 4;

type Reply<T> = oneshot::Sender<T>;

pub enum SessionCommand {
    ContentChanged,
    ChangeVersion { version: String, reply: Reply<bool> },
    Open { id: String, reply: Reply<Result<bool, SessionError>> },
    NewDocument { reply: Reply<bool> },
    ImportFile { path: PathBuf, reply: Reply<Result<bool, SessionError>> },
    LoadTemplate { template: Template, reply: Reply<bool> },
    SaveAs { name: String, reply: Reply<Result<String, SessionError>> },
    Export { sink: Box<dyn DownloadSink + Send>, reply: Reply<Result<String, SessionError>> },
    Status { reply: Reply<SessionStatus> },
    Flush { reply: Reply<Option<AutosaveOutcome>> },
    Shutdown { reply: Reply<bool> },
}

struct LoadCompletion {
    version: String,
    result: Result<LibraryHandle, VersionLoadError>,
}

/// Cloneable front door to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(build(reply)).await.map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Report an edit made in the editor surface.
    pub async fn content_changed(&self) -> Result<(), SessionError> {
        self.tx.send(SessionCommand::ContentChanged).await.map_err(|_| SessionError::Closed)
    }

    pub async fn change_version(&self, version: impl Into<String>) -> Result<bool, SessionError> {
        let version = version.into();
        self.request(|reply| SessionCommand::ChangeVersion { version, reply }).await
    }

    pub async fn open(&self, id: impl Into<String>) -> Result<bool, SessionError> {
        let id = id.into();
        self.request(|reply| SessionCommand::Open { id, reply }).await?
    }

    pub async fn new_document(&self) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::NewDocument { reply }).await
    }

    /// Replace the editor with the contents of a local file.
    pub async fn import_file(&self, path: impl Into<PathBuf>) -> Result<bool, SessionError> {
        let path = path.into();
        self.request(|reply| SessionCommand::ImportFile { path, reply }).await?
    }

    pub async fn load_template(&self, template: Template) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::LoadTemplate { template, reply }).await
    }

    pub async fn save_as(&self, name: impl Into<String>) -> Result<String, SessionError> {
        let name = name.into();
        self.request(|reply| SessionCommand::SaveAs { name, reply }).await?
    }

    pub async fn export(
        &self,
        sink: impl DownloadSink + Send + 'static,
    ) -> Result<String, SessionError> {
        let sink = Box::new(sink);
        self.request(|reply| SessionCommand::Export { sink, reply }).await?
    }

    pub async fn status(&self) -> Result<SessionStatus, SessionError> {
        self.request(|reply| SessionCommand::Status { reply }).await
    }

    /// Persist a pending autosave now.
    pub async fn flush(&self) -> Result<Option<AutosaveOutcome>, SessionError> {
        self.request(|reply| SessionCommand::Flush { reply }).await
    }

    /// End the session. `Ok(false)` when the user chose to keep unsaved
    /// changes.
    pub async fn shutdown(&self) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::Shutdown { reply }).await
    }
}

pub struct SessionRuntime<S, L> {
    controller: SessionController<S>,
    loader: Arc<L>,
    params: LaunchParams,
    commands: mpsc::Receiver<SessionCommand>,
    notices: mpsc::Sender<Notice>,
    lifecycle: Option<LifecycleSubscription>,
    loads_tx: mpsc::Sender<LoadCompletion>,
    loads_rx: mpsc::Receiver<LoadCompletion>,
}

impl<S, L> SessionRuntime<S, L>
where
    S: KeyValueStore + Send + 'static,
    L: LibraryLoader,
{
    /// Build a runtime plus the handle that drives it and the stream of
    /// user-facing notices.
    pub fn new(
        controller: SessionController<S>,
        loader: Arc<L>,
        params: LaunchParams,
    ) -> (Self, SessionHandle, mpsc::Receiver<Notice>) {
        let (tx, commands) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (notices, notice_rx) = mpsc::channel(NOTICE_CHANNEL_CAPACITY);
        let (loads_tx, loads_rx) = mpsc::channel(LOAD_CHANNEL_CAPACITY);
        let runtime = Self {
            controller,
            loader,
            params,
            commands,
            notices,
            lifecycle: None,
            loads_tx,
            loads_rx,
        };
        (runtime, SessionHandle { tx }, notice_rx)
    }

    /// Defer startup until the host is shown, and flush on hide.
    pub fn with_lifecycle(mut self, subscription: LifecycleSubscription) -> Self {
        self.lifecycle = Some(subscription);
        self
    }

    /// Run until shut down or every handle is dropped. Returns the
    /// controller for inspection.
    pub async fn run(mut self) -> SessionController<S> {
        if self.lifecycle.is_none() {
            self.controller.start(&self.params);
        }

        loop {
            self.dispatch_loads();
            self.forward_notices();
            if self.controller.is_closed() {
                break;
            }

            let deadline = self.controller.autosave_deadline();
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!("all session handles dropped");
                        self.controller.flush_autosave();
                        break;
                    }
                },
                Some(done) = self.loads_rx.recv() => {
                    let now = Instant::now();
                    self.controller.complete_version_load(&done.version, done.result, now);
                }
                event = next_lifecycle_event(&mut self.lifecycle) => self.handle_lifecycle(event),
                _ = sleep_until_deadline(deadline), if deadline.is_some() => {
                    self.controller.fire_autosave_at(Instant::now());
                }
            }
        }

        self.forward_notices();
        if let Some(library) = self.controller.take_library() {
            self.loader.unload(library);
        }
        info!("session runtime stopped");
        self.controller
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::ContentChanged => self.controller.content_changed(),
            SessionCommand::ChangeVersion { version, reply } => {
                let _ = reply.send(self.controller.request_version(&version));
            }
            SessionCommand::Open { id, reply } => {
                let _ = reply.send(self.controller.open(&id));
            }
            SessionCommand::NewDocument { reply } => {
                let _ = reply.send(self.controller.new_document());
            }
            SessionCommand::ImportFile { path, reply } => {
                let result = self.import_file(&path).await;
                let _ = reply.send(result);
            }
            SessionCommand::LoadTemplate { template, reply } => {
                let _ = reply.send(self.controller.load_template(&template));
            }
            SessionCommand::SaveAs { name, reply } => {
                let _ = reply.send(self.controller.save_as(&name));
            }
            SessionCommand::Export { mut sink, reply } => {
                let _ = reply.send(self.controller.save_to_file(sink.as_mut()));
            }
            SessionCommand::Status { reply } => {
                let _ = reply.send(self.controller.status());
            }
            SessionCommand::Flush { reply } => {
                let _ = reply.send(self.controller.flush_autosave());
            }
            SessionCommand::Shutdown { reply } => {
                let _ = reply.send(self.controller.close());
            }
        }
    }

    async fn import_file(&mut self, path: &Path) -> Result<bool, SessionError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            warn!(path = %path.display(), error = %e, "import failed");
            self.send_notice(Notice::error(format!("Could not read {}: {e}", path.display())));
            SessionError::Import { path: path.display().to_string(), reason: e.to_string() }
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(self.controller.load_external(&name, &content))
    }

    fn handle_lifecycle(&mut self, event: Option<LifecycleEvent>) {
        match event {
            Some(LifecycleEvent::Shown) => {
                if !self.controller.is_started() {
                    self.controller.start(&self.params);
                }
            }
            Some(LifecycleEvent::Hidden) => {
                if let Some(outcome) = self.controller.flush_autosave() {
                    debug!(?outcome, "flushed autosave on hide");
                }
            }
            None => {
                debug!("lifecycle bus closed");
                self.lifecycle = None;
            }
        }
    }

    fn dispatch_loads(&mut self) {
        while let Some(VersionRequest { version, previous, .. }) =
            self.controller.take_version_request()
        {
            if let Some(previous) = previous {
                self.loader.unload(previous);
            }
            let loader = Arc::clone(&self.loader);
            let tx = self.loads_tx.clone();
            tokio::spawn(async move {
                let result = loader.load(&version).await;
                let _ = tx.send(LoadCompletion { version, result }).await;
            });
        }
    }

    fn forward_notices(&mut self) {
        for notice in self.controller.drain_notices() {
            self.send_notice(notice);
        }
    }

    fn send_notice(&self, notice: Notice) {
        if self.notices.try_send(notice).is_err() {
            debug!("notice dropped: receiver full or gone");
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    if let Some(deadline) = deadline {
        tokio::time::sleep_until(deadline).await;
    }
}

async fn next_lifecycle_event(
    subscription: &mut Option<LifecycleSubscription>,
) -> Option<LifecycleEvent> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}
