use crate::fetch::Fetcher;
use crate::fingerprint::{fingerprint, Fingerprint};
use crate::lifecycle::{validate_transition, WatcherState};
use crate::{SourceUpdate, WatchError};
use crossbeam_channel::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

type SharedState = Arc<Mutex<WatcherState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, WatcherState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn transition(state: &SharedState, to: WatcherState) -> Result<WatcherState, WatchError> {
    let mut current = lock(state);
    let from = *current;
    validate_transition(from, to)?;
    *current = to;
    Ok(from)
}

/// Control handle for one [`SourceWatcher`].
///
/// The handle and the watcher share the state cell. Every emit happens while
/// that cell is locked and only in `Running`, so once `stop()` or `shutdown()`
/// returns the watcher can no longer publish, even if a fetch is in flight.
#[derive(Debug, Clone)]
pub struct WatcherHandle {
    id: u64,
    url: String,
    state: SharedState,
}

impl WatcherHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> WatcherState {
        *lock(&self.state)
    }

    /// Halt future ticks. Idempotent while stopped.
    pub fn stop(&self) -> Result<(), WatchError> {
        let from = transition(&self.state, WatcherState::Stopped)?;
        if from != WatcherState::Stopped {
            info!("stopped watcher for {}", self.url);
        }
        Ok(())
    }

    /// Unconditionally halt the watcher.
    pub fn shutdown(&self) {
        let mut current = lock(&self.state);
        if *current != WatcherState::ShutDown {
            debug!("shutting down watcher for {} ({})", self.url, *current);
            *current = WatcherState::ShutDown;
        }
    }
}

/// Polls a single URL and emits its content whenever the fingerprint changes.
///
/// A watcher is driven by the pool's background thread: `start()` once, then
/// `tick()` whenever `next_tick()` has elapsed.
pub struct SourceWatcher {
    id: u64,
    url: String,
    interval: Duration,
    fetcher: Arc<dyn Fetcher>,
    updates: Sender<SourceUpdate>,
    state: SharedState,
    last: Option<Fingerprint>,
    next_tick: Option<Instant>,
}

impl SourceWatcher {
    pub fn new(
        id: u64,
        url: &str,
        interval: Duration,
        fetcher: Arc<dyn Fetcher>,
        updates: Sender<SourceUpdate>,
    ) -> Self {
        Self {
            id,
            url: url.to_owned(),
            interval,
            fetcher,
            updates,
            state: Arc::new(Mutex::new(WatcherState::Idle)),
            last: None,
            next_tick: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn handle(&self) -> WatcherHandle {
        WatcherHandle {
            id: self.id,
            url: self.url.clone(),
            state: Arc::clone(&self.state),
        }
    }

    pub fn state(&self) -> WatcherState {
        *lock(&self.state)
    }

    pub fn last_fingerprint(&self) -> Option<Fingerprint> {
        self.last
    }

    /// Deadline of the next cycle, or `None` when the watcher is not armed.
    pub fn next_tick(&self) -> Option<Instant> {
        self.next_tick
    }

    /// Arm the timer and run the first cycle immediately.
    pub fn start(&mut self) -> Result<(), WatchError> {
        transition(&self.state, WatcherState::Running)?;
        info!("started watcher for {} every {:?}", self.url, self.interval);
        self.next_tick = Some(Instant::now() + self.interval);
        self.run_cycle();
        Ok(())
    }

    /// Run one cycle if the timer is due. Returns whether an update was emitted.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(due) = self.next_tick else {
            return false;
        };
        if now < due {
            return false;
        }
        if self.state() != WatcherState::Running {
            debug!("disarming timer for {}", self.url);
            self.next_tick = None;
            return false;
        }

        // Missed ticks are coalesced rather than replayed.
        let next = due + self.interval;
        self.next_tick = Some(if next <= now { now + self.interval } else { next });
        self.run_cycle()
    }

    fn run_cycle(&mut self) -> bool {
        let body = match self.fetcher.fetch(&self.url) {
            Ok(body) => body,
            Err(e) => {
                warn!("fetch failed for {}: {e}", self.url);
                return false;
            }
        };

        let fp = fingerprint(&body);
        if self.last == Some(fp) {
            debug!("no change at {}", self.url);
            return false;
        }

        let state = lock(&self.state);
        if *state != WatcherState::Running {
            debug!("discarding fetch of {} after {}", self.url, *state);
            return false;
        }

        self.last = Some(fp);
        info!("update available from {} ({})", self.url, fp);
        let update = SourceUpdate {
            url: self.url.clone(),
            content: String::from_utf8_lossy(&body).into_owned(),
        };
        if self.updates.send(update).is_err() {
            warn!("no receiver for updates from {}", self.url);
        }
        drop(state);
        true
    }
}
