use crate::config::WatchConfig;
use crate::fetch::Fetcher;
use crate::watcher::{SourceWatcher, WatcherHandle};
use crate::{SourceUpdate, WatchError};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, error, info, warn};

enum Command {
    Start(SourceWatcher),
    Retire(u64),
    Shutdown,
}

/// Owns the set of watched URLs and the background thread that polls them.
///
/// All watchers run on one dedicated thread. The pool keeps a [`WatcherHandle`]
/// per URL; removing a URL stops the handle and parks it in `retiring` until
/// the thread acknowledges it has dropped the watcher. Shutdown waits for
/// every acknowledgement (bounded by `shutdown_timeout`) before joining.
pub struct WatcherPool {
    config: WatchConfig,
    fetcher: Arc<dyn Fetcher>,
    updates: Sender<SourceUpdate>,
    commands: Sender<Command>,
    acks: Receiver<u64>,
    active: BTreeMap<String, WatcherHandle>,
    retiring: HashMap<u64, WatcherHandle>,
    next_id: u64,
    worker: Option<JoinHandle<()>>,
}

impl WatcherPool {
    pub fn new(
        config: WatchConfig,
        fetcher: Arc<dyn Fetcher>,
        updates: Sender<SourceUpdate>,
    ) -> Result<Self, WatchError> {
        config.validate()?;
        let (commands, command_rx) = crossbeam_channel::unbounded();
        let (ack_tx, acks) = crossbeam_channel::unbounded();

        let worker = Worker {
            commands: command_rx,
            acks: ack_tx,
            watchers: Vec::new(),
        };
        let handle = std::thread::Builder::new()
            .name("watcher".to_owned())
            .spawn(move || worker.run())?;

        Ok(Self {
            config,
            fetcher,
            updates,
            commands,
            acks,
            active: BTreeMap::new(),
            retiring: HashMap::new(),
            next_id: 0,
            worker: Some(handle),
        })
    }

    /// Build a pool together with the receiving end of its update channel.
    pub fn with_channel(
        config: WatchConfig,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<(Self, Receiver<SourceUpdate>), WatchError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        Ok((Self::new(config, fetcher, tx)?, rx))
    }

    /// Start watching `url`, replacing any existing watcher for it.
    ///
    /// The start request is queued to the background thread. If the thread
    /// has not begun its loop yet the request simply waits in the queue.
    pub fn add(&mut self, url: &str) -> Result<(), WatchError> {
        if self.worker.is_none() {
            return Err(WatchError::PoolShutDown);
        }
        self.reap();
        if self.active.contains_key(url) {
            self.remove(url);
        }

        self.next_id += 1;
        let watcher = SourceWatcher::new(
            self.next_id,
            url,
            self.config.interval(),
            Arc::clone(&self.fetcher),
            self.updates.clone(),
        );
        let handle = watcher.handle();
        self.commands
            .send(Command::Start(watcher))
            .map_err(|_| WatchError::PoolShutDown)?;
        debug!("scheduled watcher {} for {url}", handle.id());
        self.active.insert(url.to_owned(), handle);
        Ok(())
    }

    /// Stop watching `url`. Returns `false` if it was not watched.
    pub fn remove(&mut self, url: &str) -> bool {
        self.reap();
        let Some(handle) = self.active.remove(url) else {
            return false;
        };
        if let Err(e) = handle.stop() {
            warn!("stopping watcher for {url}: {e}");
        }
        if self.commands.send(Command::Retire(handle.id())).is_err() {
            // Worker already gone; nothing left to acknowledge.
            return true;
        }
        self.retiring.insert(handle.id(), handle);
        true
    }

    pub fn is_watching(&self, url: &str) -> bool {
        self.active.contains_key(url)
    }

    /// Watched URLs in sorted order.
    pub fn watched(&self) -> Vec<String> {
        self.active.keys().cloned().collect()
    }

    /// Number of removed watchers not yet confirmed dropped.
    pub fn retiring(&mut self) -> usize {
        self.reap();
        self.retiring.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.worker.is_none()
    }

    /// Halt every watcher, wait for the background thread to drain, and join it.
    ///
    /// No update is published by any of this pool's watchers once this returns.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        let mut pending: HashSet<u64> = HashSet::new();
        for handle in self.active.values().chain(self.retiring.values()) {
            handle.shutdown();
            pending.insert(handle.id());
        }
        info!("shutting down watcher pool ({} watchers)", pending.len());

        let sent = self.commands.send(Command::Shutdown).is_ok();
        let deadline = Instant::now() + self.config.shutdown_timeout();
        let mut timed_out = false;
        while sent && !pending.is_empty() {
            match self.acks.recv_deadline(deadline) {
                Ok(id) => {
                    pending.remove(&id);
                }
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        "watcher thread did not drain within {:?}; {} watchers outstanding",
                        self.config.shutdown_timeout(),
                        pending.len()
                    );
                    timed_out = true;
                    break;
                }
            }
        }

        if timed_out {
            debug!("detaching watcher thread");
        } else if worker.join().is_err() {
            error!("watcher thread panicked");
        }

        self.active.clear();
        self.retiring.clear();
    }

    fn reap(&mut self) {
        for id in self.acks.try_iter() {
            if let Some(handle) = self.retiring.remove(&id) {
                debug!("retired watcher {id} for {}", handle.url());
            }
        }
    }
}

impl Drop for WatcherPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// State owned by the background thread.
struct Worker {
    commands: Receiver<Command>,
    acks: Sender<u64>,
    watchers: Vec<SourceWatcher>,
}

impl Worker {
    fn run(mut self) {
        debug!("watcher thread running");
        loop {
            let deadline = self.watchers.iter().filter_map(SourceWatcher::next_tick).min();
            let received = match deadline {
                Some(deadline) => self.commands.recv_deadline(deadline),
                None => self
                    .commands
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(Command::Start(watcher)) => self.start(watcher),
                Ok(Command::Retire(id)) => self.retire(id),
                Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                    self.drain();
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {}
            }

            let now = Instant::now();
            for watcher in &mut self.watchers {
                watcher.tick(now);
            }
        }
        debug!("watcher thread exiting");
    }

    fn start(&mut self, mut watcher: SourceWatcher) {
        match watcher.start() {
            Ok(()) => self.watchers.push(watcher),
            Err(e) => {
                debug!("not starting watcher for {}: {e}", watcher.url());
                self.ack(watcher.id());
            }
        }
    }

    fn retire(&mut self, id: u64) {
        if let Some(pos) = self.watchers.iter().position(|w| w.id() == id) {
            let watcher = self.watchers.swap_remove(pos);
            debug!("dropping watcher for {} ({})", watcher.url(), watcher.state());
            self.ack(id);
        }
    }

    fn drain(&mut self) {
        for watcher in std::mem::take(&mut self.watchers) {
            watcher.handle().shutdown();
            self.ack(watcher.id());
        }
    }

    fn ack(&self, id: u64) {
        // The pool may have stopped listening after a shutdown timeout.
        let _ = self.acks.send(id);
    }
}
