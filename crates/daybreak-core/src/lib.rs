//! Process-level orchestration for Daybreak.
//!
//! This crate ties the watcher pool and the store together into the `Daemon`:
//! watchers fetch on their background thread, updates cross a channel, and the
//! daemon merges them into the store on the thread that owns it. It also
//! provides the data-root instance lock and Ctrl-C handling.

pub mod concurrency;
pub mod daemon;

pub use concurrency::{install_signal_handler, shutdown_requested, InstanceLock};
pub use daemon::{is_remote, Daemon};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] daybreak_schema::ManifestError),
    #[error("store error: {0}")]
    Store(#[from] daybreak_store::StoreError),
    #[error("watch error: {0}")]
    Watch(#[from] daybreak_watch::WatchError),
    #[error("data root {0} is in use by another daybreak process")]
    Locked(String),
    #[error("not a watchable source: {0}")]
    InvalidSource(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
