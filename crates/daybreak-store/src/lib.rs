//! Authoritative in-memory catalog and persisted user state for Daybreak.
//!
//! This crate provides the `Store`: the merged catalog of applications,
//! runtimes, and servers from every manifest source, per-item container
//! settings, the set of running items, theme selection, and the dependency
//! resolver that turns a requested id into an install/launch plan. State is
//! persisted under a `StoreLayout` root as `settings.json` plus a
//! `manifests.toml` snapshot of the merged catalog.

pub mod catalog;
pub mod layout;
pub mod settings;
pub mod store;
pub mod theme;

pub use catalog::Catalog;
pub use layout::StoreLayout;
pub use settings::{ContainerSettings, PathSettings, RecentServer, RecentServers, Settings};
pub use store::{Store, StoreEvent};
pub use theme::Theme;

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Source identifier of the store's own catalog snapshot. Manifests with this
/// source are never recorded as remote subscriptions.
pub const LOCAL_MANIFEST_SOURCE: &str = "local://manifests";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("manifest error: {0}")]
    Manifest(#[from] daybreak_schema::ManifestError),
    #[error("invalid theme: {0}")]
    InvalidTheme(String),
    #[error("'{0}' is not running")]
    NotRunning(String),
    #[error("cyclic runtime dependency: {}", chain.join(" -> "))]
    CyclicDependency { chain: Vec<String> },
}

/// Fsync a directory so that a preceding rename into it is durable.
fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

/// Replace `dest` with `content` through a temp file in the same directory.
pub(crate) fn write_atomic(dest: &Path, content: &[u8]) -> Result<(), StoreError> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| StoreError::Io(e.error))?;
    fsync_dir(dir)?;
    Ok(())
}
