// boardpad-session: document store, session controller and runtime.

pub mod autosave;
pub mod config;
pub mod controller;
pub mod host;
pub mod library;
pub mod lifecycle;
pub mod runtime;
pub mod storage;
pub mod store;
pub mod watcher;
