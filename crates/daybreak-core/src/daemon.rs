use crate::concurrency::InstanceLock;
use crate::CoreError;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use daybreak_schema::parse_manifest_bytes;
use daybreak_store::Store;
use daybreak_watch::{Fetcher, SourceUpdate, WatchConfig, WatcherPool};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Poll granularity of [`Daemon::run_until`] while waiting for updates.
const PUMP_INTERVAL: Duration = Duration::from_millis(250);

/// Whether `url` can be polled by the HTTP fetcher.
pub fn is_remote(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

/// Owner of the store and the watcher pool for one data root.
///
/// The pool's background thread only fetches; every merge happens on the
/// thread that calls [`Daemon::pump`], so the store sees updates one at a time
/// in arrival order.
pub struct Daemon {
    store: Store,
    pool: WatcherPool,
    updates: Receiver<SourceUpdate>,
    _lock: InstanceLock,
}

impl Daemon {
    pub fn new(root: &Path, config: WatchConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self, CoreError> {
        Self::with_store(Store::new(root), config, fetcher)
    }

    /// Lock the store's data root, load persisted state, and spawn the pool.
    pub fn with_store(
        store: Store,
        config: WatchConfig,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, CoreError> {
        let root = store.layout().root().to_path_buf();
        let lock = InstanceLock::try_acquire(&store.layout().lock_file())?
            .ok_or_else(|| CoreError::Locked(root.display().to_string()))?;

        store.load()?;
        let (pool, updates) = WatcherPool::with_channel(config, fetcher)?;
        info!("daemon ready at {}", root.display());

        Ok(Self {
            store,
            pool,
            updates,
            _lock: lock,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn pool(&self) -> &WatcherPool {
        &self.pool
    }

    /// Watch every remote source recorded in settings. Returns how many.
    pub fn start(&mut self) -> Result<usize, CoreError> {
        let mut started = 0;
        for url in self.store.manifest_list() {
            if !is_remote(&url) {
                debug!("not watching local source {url}");
                continue;
            }
            self.pool.add(&url)?;
            started += 1;
        }
        info!("watching {started} manifest source(s)");
        Ok(started)
    }

    /// Merge a manifest the user supplied directly.
    ///
    /// Unlike watcher updates, content that fails to parse is an error here.
    /// Remote sources are also put under watch.
    pub fn import(&mut self, url: &str, content: &[u8]) -> Result<(), CoreError> {
        let manifest = parse_manifest_bytes(content, url)?;
        info!("importing '{}' from {url}", manifest.name);
        self.store.merge_manifest(manifest)?;
        self.store.save_manifests()?;
        if is_remote(url) {
            self.pool.add(url)?;
        }
        Ok(())
    }

    pub fn add_source(&mut self, url: &str) -> Result<(), CoreError> {
        if !is_remote(url) {
            return Err(CoreError::InvalidSource(url.to_owned()));
        }
        self.pool.add(url)?;
        Ok(())
    }

    /// Stop watching `url` and forget it. Entries it contributed stay in the
    /// catalog until another source overwrites them.
    pub fn remove_source(&mut self, url: &str) -> Result<bool, CoreError> {
        let watched = self.pool.remove(url);
        let known = self.store.remove_source(url)?;
        Ok(watched || known)
    }

    /// Wait up to `timeout` for one update and merge it. Returns whether the
    /// store changed. Updates from URLs no longer watched are dropped.
    pub fn pump(&mut self, timeout: Duration) -> Result<bool, CoreError> {
        match self.updates.recv_timeout(timeout) {
            Ok(update) if self.pool.is_watching(&update.url) => self.apply(&update),
            Ok(update) => {
                debug!("dropping update from unwatched {}", update.url);
                Ok(false)
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => Ok(false),
        }
    }

    /// Merge every update already queued. Returns how many changed the store.
    pub fn drain(&mut self) -> Result<usize, CoreError> {
        let watched: BTreeSet<String> = self.pool.watched().into_iter().collect();
        self.drain_from(&watched)
    }

    /// Merge queued updates whose URL is in `watched`; drop the rest.
    fn drain_from(&self, watched: &BTreeSet<String>) -> Result<usize, CoreError> {
        let queued: Vec<SourceUpdate> = self.updates.try_iter().collect();
        let mut merged = 0;
        for update in &queued {
            if !watched.contains(&update.url) {
                debug!("dropping update from unwatched {}", update.url);
                continue;
            }
            if self.apply(update)? {
                merged += 1;
            }
        }
        Ok(merged)
    }

    fn apply(&self, update: &SourceUpdate) -> Result<bool, CoreError> {
        debug!("update from {} ({} bytes)", update.url, update.content.len());
        if !self.store.merge(&update.url, update.content.as_bytes())? {
            return Ok(false);
        }
        self.store.save_manifests()?;
        Ok(true)
    }

    /// Pump updates until `stop` returns true, then shut down.
    pub fn run_until(&mut self, stop: impl Fn() -> bool) -> Result<(), CoreError> {
        while !stop() {
            if let Err(e) = self.pump(PUMP_INTERVAL) {
                warn!("failed to apply update: {e}");
            }
        }
        self.shutdown()
    }

    /// Stop all watchers, merge whatever they already delivered, and persist.
    pub fn shutdown(&mut self) -> Result<(), CoreError> {
        let watched: BTreeSet<String> = self.pool.watched().into_iter().collect();
        self.pool.shutdown();
        let merged = self.drain_from(&watched)?;
        if merged > 0 {
            debug!("merged {merged} queued update(s) during shutdown");
        }
        self.store.save()?;
        info!("daemon stopped");
        Ok(())
    }
}
