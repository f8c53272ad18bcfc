//! Remote manifest polling for Daybreak.
//!
//! A [`WatcherPool`] owns one background thread on which every [`SourceWatcher`]
//! runs. Each watcher polls a single URL on a fixed interval, fingerprints the
//! response body, and emits a [`SourceUpdate`] only when the content changed
//! since the last successful fetch. Watchers are controlled through
//! [`WatcherHandle`]s; the pool acknowledges every watcher it drops so that
//! shutdown can wait for the background thread to drain instead of sleeping.

pub mod config;
pub mod fetch;
pub mod fingerprint;
pub mod lifecycle;
pub mod pool;
pub mod watcher;

pub use config::WatchConfig;
pub use fetch::{Fetcher, HttpFetcher};
pub use fingerprint::{fingerprint, Fingerprint};
pub use lifecycle::{validate_transition, WatcherState};
pub use pool::WatcherPool;
pub use watcher::{SourceWatcher, WatcherHandle};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("HTTP {code} for {url}")]
    Status { url: String, code: u16 },
    #[error("watch config error: {0}")]
    Config(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("invalid watcher transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("watcher pool has been shut down")]
    PoolShutDown,
}

/// New content observed at a watched URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUpdate {
    pub url: String,
    pub content: String,
}
