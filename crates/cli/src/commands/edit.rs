// `boardpad edit`: live editing session over a local file.
//
// The document is written to a file that acts as the editor. Saves to the
// file are picked up by a watcher and autosaved after the quiet period.
// Ctrl-C ends the session, flushing any pending autosave first.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use boardpad_common::download::download_filename;
use boardpad_common::link::LaunchParams;
use boardpad_session::controller::{
    Notice, NoticeLevel, SessionController, SHARED_DOCUMENT_NAME,
};
use boardpad_session::runtime::{SessionHandle, SessionRuntime};
use boardpad_session::store::StoreError;
use boardpad_session::watcher::{EditorFileWatcher, FileEditor, FileEventKind};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;
use url::Url;

use crate::context::CliContext;
use crate::output::{self, OutputFormat};

/// How long `--board-version` waits for the startup library load.
const LIBRARY_SETTLE_TIMEOUT: Duration = Duration::from_secs(10);
const LIBRARY_POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Document id. Omit to start from a blank document.
    pub id: Option<String>,

    /// Open a share link or token instead of a stored document.
    #[arg(long, value_name = "LINK", conflicts_with = "id")]
    shared: Option<String>,

    /// File that serves as the editor (defaults to the export filename in
    /// the current directory).
    #[arg(long, value_name = "FILE")]
    path: Option<PathBuf>,

    /// Switch the document to this board library version.
    #[arg(long = "board-version", value_name = "VERSION")]
    board_version: Option<String>,

    /// Store an unsaved document under this name when the session ends.
    #[arg(long, value_name = "NAME")]
    save_as: Option<String>,

    /// Discard unsaved changes on exit without asking.
    #[arg(long)]
    discard: bool,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_version: Option<String>,
    pub path: PathBuf,
    pub saved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_saved_at: Option<DateTime<Utc>>,
}

pub fn run(args: EditArgs, ctx: &CliContext) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let result = rt.block_on(async {
        let (interrupt_tx, interrupts) = mpsc::channel(1);
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if interrupt_tx.send(()).await.is_err() {
                    break;
                }
            }
        });
        edit_session(args, ctx, format, interrupts).await
    });

    match result {
        Ok(result) => {
            output::print_output(format, &result, format_human)?;
            Ok(())
        }
        Err(error) => {
            output::print_anyhow_error(format, &error);
            Err(error)
        }
    }
}

async fn edit_session(
    args: EditArgs,
    ctx: &CliContext,
    format: OutputFormat,
    mut interrupts: mpsc::Receiver<()>,
) -> anyhow::Result<EditResult> {
    let config = ctx.config();
    let mut store = ctx.open_store()?;

    let (params, name) = match (&args.shared, &args.id) {
        (Some(link), _) => (launch_params(link), SHARED_DOCUMENT_NAME.to_string()),
        (None, Some(id)) => {
            let record = store.load(id)?.ok_or_else(|| StoreError::NotFound(id.clone()))?;
            store.request_open(id)?;
            (LaunchParams::default(), record.name)
        }
        (None, None) => (LaunchParams::default(), config.default_name.clone()),
    };
    let path = args
        .path
        .clone()
        .unwrap_or_else(|| PathBuf::from(download_filename(&name, &config.default_extension)));

    let editor = FileEditor::new(&path);
    let discard = args.discard;
    let confirm = move |prompt: &str| discard || prompt_yes_no(prompt);
    let controller =
        SessionController::new(store, editor.clone(), confirm, config.controller_options());
    let (runtime, handle, mut notices) =
        SessionRuntime::new(controller, Arc::new(config.loader()), params);
    let task = tokio::spawn(runtime.run());

    // The first reply arrives after startup has written the editor file.
    let status = handle.status().await?;
    let (_watcher, mut events) = EditorFileWatcher::start(editor.path())?;
    output::print_info(
        format,
        &format!("Editing {} in {}. Press Ctrl-C to finish.", status.file_name, path.display()),
    );

    if let Some(version) = &args.board_version {
        wait_for_library(&handle).await?;
        if !handle.change_version(version.as_str()).await? {
            output::print_warning(
                format,
                "VERSION_REJECTED",
                &format!("could not switch to board version {version}"),
            );
        }
    }

    loop {
        tokio::select! {
            Some(()) = interrupts.recv() => {
                if finish(&handle, args.save_as.as_deref()).await? {
                    break;
                }
                output::print_warning(
                    format,
                    "UNSAVED_CHANGES",
                    "Session kept open. Press Ctrl-C again to retry.",
                );
            }
            Some(event) = events.recv() => match event {
                FileEventKind::Changed => match editor.refresh().await {
                    Ok(Some(_)) => handle.content_changed().await?,
                    Ok(None) => {}
                    Err(e) => debug!(error = %format!("{e:#}"), "editor file not readable yet"),
                },
                FileEventKind::Removed => output::print_warning(
                    format,
                    "EDITOR_FILE_REMOVED",
                    &format!("{} was removed; save it again to keep editing", path.display()),
                ),
            },
            Some(notice) = notices.recv() => report_notice(format, &notice),
            else => break,
        }
    }

    let controller = task.await.context("session task failed")?;
    while let Ok(notice) = notices.try_recv() {
        report_notice(format, &notice);
    }
    let state = controller.state();
    Ok(EditResult {
        id: state.current_file_id.clone(),
        name: state.current_file_name.clone(),
        board_version: state.current_board_version.clone(),
        path,
        saved: !state.is_dirty,
        last_saved_at: state.last_saved_at,
    })
}

/// Wait until no library load is in flight, or give up after the timeout.
async fn wait_for_library(handle: &SessionHandle) -> anyhow::Result<()> {
    let deadline = tokio::time::Instant::now() + LIBRARY_SETTLE_TIMEOUT;
    while handle.status().await?.version_loading {
        if tokio::time::Instant::now() >= deadline {
            debug!("board library still loading; switching anyway");
            break;
        }
        tokio::time::sleep(LIBRARY_POLL_INTERVAL).await;
    }
    Ok(())
}

/// Save an unbound document if asked to, then try to end the session.
async fn finish(handle: &SessionHandle, save_as: Option<&str>) -> anyhow::Result<bool> {
    if let Some(name) = save_as {
        let status = handle.status().await?;
        if status.file_id.is_none() {
            handle.save_as(name).await?;
        }
    }
    Ok(handle.shutdown().await?)
}

/// A full share link or a bare token.
fn launch_params(input: &str) -> LaunchParams {
    let input = input.trim();
    match Url::parse(input) {
        Ok(url) => LaunchParams::from_url(&url),
        Err(_) => LaunchParams::with_share_token(input),
    }
}

fn prompt_yes_no(prompt: &str) -> bool {
    let mut err = io::stderr().lock();
    let _ = write!(err, "{prompt} [y/N] ");
    let _ = err.flush();
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

fn report_notice(format: OutputFormat, notice: &Notice) {
    match notice.level {
        NoticeLevel::Info => output::print_info(format, &notice.message),
        NoticeLevel::Warning => output::print_warning(format, "SESSION_WARNING", &notice.message),
        NoticeLevel::Error => output::print_error(format, "SESSION_ERROR", &notice.message),
    }
}

fn format_human(result: &EditResult) -> String {
    let target = match &result.id {
        Some(id) => format!("{} ({id})", result.name),
        None => format!("{} (not stored)", result.name),
    };
    let state = if result.saved { "saved" } else { "unsaved changes discarded" };
    format!("Session ended: {target}, {state}")
}
