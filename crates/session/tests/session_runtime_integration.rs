// Integration test: session runtime driving a controller over channels.
//
// Time is paused, so autosave deadlines and simulated library latency
// elapse only when every task is idle.

use std::sync::Arc;
use std::time::Duration;

use boardpad_common::link::LaunchParams;
use boardpad_session::controller::{
    ControllerOptions, NoticeLevel, SessionController, SessionPhase, Template,
};
use boardpad_session::host::{FixedAnswer, SharedBuffer};
use boardpad_session::library::{CatalogLoader, VersionCatalog};
use boardpad_session::lifecycle::{LifecycleBus, LifecycleEvent};
use boardpad_session::runtime::{SessionHandle, SessionRuntime};
use boardpad_session::storage::{KeyValueStore, MemoryStorage};
use boardpad_session::store::handoff::HANDOFF_KEY;
use boardpad_session::store::{DocumentStore, StoreOptions};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

// ── Test infrastructure ──────────────────────────────────────────────

struct TestHarness {
    storage: MemoryStorage,
    buffer: SharedBuffer,
    handle: SessionHandle,
    notices: mpsc::Receiver<boardpad_session::controller::Notice>,
    task: JoinHandle<SessionController<MemoryStorage>>,
}

fn build(
    storage: &MemoryStorage,
    latency: Duration,
) -> (
    SessionRuntime<MemoryStorage, CatalogLoader>,
    SessionHandle,
    mpsc::Receiver<boardpad_session::controller::Notice>,
    SharedBuffer,
) {
    let store = DocumentStore::new(storage.clone(), StoreOptions::default());
    let buffer = SharedBuffer::default();
    let controller = SessionController::new(
        store,
        buffer.clone(),
        FixedAnswer(true),
        ControllerOptions::default(),
    );
    let loader = CatalogLoader::new(VersionCatalog::default()).with_latency(latency);
    let (runtime, handle, notices) =
        SessionRuntime::new(controller, Arc::new(loader), LaunchParams::default());
    (runtime, handle, notices, buffer)
}

/// Spawn a session and let its startup load begin.
async fn spawn_session(storage: MemoryStorage, latency: Duration) -> TestHarness {
    let (runtime, handle, notices, buffer) = build(&storage, latency);
    let task = tokio::spawn(runtime.run());
    settle().await;
    TestHarness { storage, buffer, handle, notices, task }
}

/// Let the runtime drain whatever is ready.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

fn seed(storage: &MemoryStorage, name: &str, content: &str, version: &str) -> String {
    let mut store = DocumentStore::new(storage.clone(), StoreOptions::default());
    store.create(name, content, Some(version)).unwrap()
}

fn stored_content(storage: &MemoryStorage, id: &str) -> String {
    let store = DocumentStore::new(storage.clone(), StoreOptions::default());
    store.load(id).unwrap().unwrap().content
}

// ── Startup ──────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn session_starts_unbound_and_loads_newest_library() {
    let h = spawn_session(MemoryStorage::new(), Duration::ZERO).await;
    settle().await;

    let status = h.handle.status().await.unwrap();
    assert_eq!(status.phase, SessionPhase::Unbound);
    assert_eq!(status.loaded_version.as_deref(), Some("0.3.1"));
    assert!(!status.version_loading);
}

#[tokio::test(start_paused = true)]
async fn lifecycle_defers_start_until_shown() {
    let storage = MemoryStorage::new();
    let id = seed(&storage, "orbit", "v1", "0.3.0");
    let mut store = DocumentStore::new(storage.clone(), StoreOptions::default());
    store.request_open(&id).unwrap();

    let bus = LifecycleBus::new();
    let (runtime, handle, _notices, buffer) = build(&storage, Duration::ZERO);
    let task = tokio::spawn(runtime.with_lifecycle(bus.subscribe()).run());
    settle().await;

    assert!(storage.get(HANDOFF_KEY).unwrap().is_some(), "handoff consumed before shown");
    assert!(handle.status().await.unwrap().file_id.is_none());

    bus.publish(LifecycleEvent::Shown);
    settle().await;

    let status = handle.status().await.unwrap();
    assert_eq!(status.file_id.as_deref(), Some(id.as_str()));
    assert_eq!(buffer.text(), "v1");
    assert!(storage.get(HANDOFF_KEY).unwrap().is_none());

    assert!(handle.shutdown().await.unwrap());
    task.await.unwrap();
}

// ── Autosave ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn rapid_edits_produce_one_autosave_with_latest_content() {
    let storage = MemoryStorage::new();
    let id = seed(&storage, "orbit", "v1", "0.3.1");
    let h = spawn_session(storage, Duration::ZERO).await;
    assert!(h.handle.open(&id).await.unwrap());
    settle().await;
    let writes = h.storage.write_count();

    h.buffer.replace("first edit");
    h.handle.content_changed().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.buffer.replace("second edit");
    h.handle.content_changed().await.unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(h.storage.write_count(), writes, "saved before the quiet period ended");

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(h.storage.write_count(), writes + 1);
    assert_eq!(stored_content(&h.storage, &id), "second edit");
    assert!(!h.handle.status().await.unwrap().dirty);
}

#[tokio::test(start_paused = true)]
async fn hide_flushes_pending_autosave() {
    let storage = MemoryStorage::new();
    let id = seed(&storage, "orbit", "v1", "0.3.1");
    let bus = LifecycleBus::new();
    let (runtime, handle, _notices, buffer) = build(&storage, Duration::ZERO);
    let _task = tokio::spawn(runtime.with_lifecycle(bus.subscribe()).run());
    bus.publish(LifecycleEvent::Shown);
    settle().await;
    handle.open(&id).await.unwrap();
    settle().await;

    buffer.replace("hidden edit");
    handle.content_changed().await.unwrap();
    settle().await;
    bus.publish(LifecycleEvent::Hidden);
    settle().await;

    assert_eq!(stored_content(&storage, &id), "hidden edit");
    assert!(!handle.status().await.unwrap().autosave_pending);
}

#[tokio::test(start_paused = true)]
async fn shutdown_flushes_and_returns_controller() {
    let storage = MemoryStorage::new();
    let id = seed(&storage, "orbit", "v1", "0.3.1");
    let h = spawn_session(storage, Duration::ZERO).await;
    h.handle.open(&id).await.unwrap();
    h.buffer.replace("final");
    h.handle.content_changed().await.unwrap();

    assert!(h.handle.shutdown().await.unwrap());
    let controller = h.task.await.unwrap();

    assert!(controller.is_closed());
    assert!(controller.library().is_none());
    assert_eq!(stored_content(&h.storage, &id), "final");
    assert!(h.handle.status().await.is_err());
}

// ── Version changes ──────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn version_change_loads_then_autosaves_new_version() {
    let storage = MemoryStorage::new();
    let id = seed(&storage, "orbit", "v1", "0.3.1");
    let h = spawn_session(storage, Duration::from_millis(300)).await;
    h.handle.open(&id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(h.handle.change_version("0.3.0").await.unwrap());
    let status = h.handle.status().await.unwrap();
    assert!(status.version_loading);
    assert!(!h.handle.change_version("0.2.0").await.unwrap(), "second load must be rejected");

    tokio::time::sleep(Duration::from_millis(400)).await;
    let status = h.handle.status().await.unwrap();
    assert!(!status.version_loading);
    assert!(status.dirty);
    assert_eq!(status.board_version.as_deref(), Some("0.3.0"));

    tokio::time::sleep(Duration::from_millis(2100)).await;
    let store = DocumentStore::new(h.storage.clone(), StoreOptions::default());
    assert_eq!(store.load(&id).unwrap().unwrap().board_version.as_deref(), Some("0.3.0"));
}

#[tokio::test(start_paused = true)]
async fn unsupported_version_leaves_state_and_notifies() {
    let storage = MemoryStorage::new();
    let id = seed(&storage, "orbit", "v1", "0.3.1");
    let mut h = spawn_session(storage, Duration::ZERO).await;
    h.handle.open(&id).await.unwrap();
    settle().await;
    let before = h.handle.status().await.unwrap();

    assert!(!h.handle.change_version("9.9.9").await.unwrap());
    settle().await;

    let after = h.handle.status().await.unwrap();
    assert_eq!(after.board_version, before.board_version);
    assert_eq!(after.dirty, before.dirty);
    let notice = h.notices.recv().await.unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
}

// ── Navigation ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn import_file_replaces_editor_with_unsaved_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sketch.js");
    std::fs::write(&path, "sketch()").unwrap();
    let h = spawn_session(MemoryStorage::new(), Duration::ZERO).await;

    assert!(h.handle.import_file(&path).await.unwrap());

    let status = h.handle.status().await.unwrap();
    assert_eq!(status.phase, SessionPhase::Unbound);
    assert_eq!(status.file_name, "sketch.js");
    assert_eq!(h.buffer.text(), "sketch()");
}

#[tokio::test(start_paused = true)]
async fn import_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let h = spawn_session(MemoryStorage::new(), Duration::ZERO).await;
    assert!(h.handle.import_file(dir.path().join("missing.js")).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn template_then_save_as_binds_new_record() {
    let h = spawn_session(MemoryStorage::new(), Duration::ZERO).await;
    let template = Template {
        name: "pendulum".into(),
        content: "pendulum()".into(),
        version: Some("0.2.0".into()),
    };
    assert!(h.handle.load_template(template).await.unwrap());
    settle().await;

    let id = h.handle.save_as("my pendulum").await.unwrap();

    let status = h.handle.status().await.unwrap();
    assert_eq!(status.phase, SessionPhase::BoundClean);
    assert_eq!(status.file_id.as_deref(), Some(id.as_str()));
    let store = DocumentStore::new(h.storage.clone(), StoreOptions::default());
    let record = store.load(&id).unwrap().unwrap();
    assert_eq!(record.content, "pendulum()");
    assert_eq!(record.board_version.as_deref(), Some("0.2.0"));
}

#[tokio::test(start_paused = true)]
async fn export_writes_editor_content_to_sink() {
    let dir = tempfile::tempdir().unwrap();
    let h = spawn_session(MemoryStorage::new(), Duration::ZERO).await;
    h.buffer.replace("exported");

    let sink = boardpad_session::host::DirectorySink::new(dir.path());
    let filename = h.handle.export(sink).await.unwrap();

    assert_eq!(filename, "untitled.js");
    assert_eq!(std::fs::read_to_string(dir.path().join(filename)).unwrap(), "exported");
}
