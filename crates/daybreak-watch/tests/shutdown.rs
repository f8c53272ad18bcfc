//! Pool shutdown while a fetch is blocked on the background thread.

use crossbeam_channel::{bounded, Receiver, Sender};
use daybreak_watch::{Fetcher, WatchConfig, WatchError, WatcherPool};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Blocks every fetch until the test releases it, reporting when a fetch begins.
struct GatedFetcher {
    started: Sender<String>,
    release: Mutex<Receiver<()>>,
}

impl Fetcher for GatedFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, WatchError> {
        let _ = self.started.send(url.to_owned());
        let _ = self
            .release
            .lock()
            .unwrap()
            .recv_timeout(Duration::from_secs(5));
        Ok(format!("content of {url}").into_bytes())
    }
}

fn gated() -> (Arc<GatedFetcher>, Receiver<String>, Sender<()>) {
    let (started_tx, started_rx) = bounded(16);
    let (release_tx, release_rx) = bounded(16);
    let fetcher = Arc::new(GatedFetcher {
        started: started_tx,
        release: Mutex::new(release_rx),
    });
    (fetcher, started_rx, release_tx)
}

#[test]
fn shutdown_discards_fetch_in_flight() {
    let (fetcher, started, release) = gated();
    let config = WatchConfig::default()
        .with_interval(Duration::from_millis(20))
        .with_shutdown_timeout(Duration::from_secs(10));
    let (mut pool, updates) = WatcherPool::with_channel(config, fetcher).unwrap();

    pool.add("https://example.com/a.toml").unwrap();
    let url = started.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(url, "https://example.com/a.toml");

    let releaser = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        release.send(()).unwrap();
    });

    let begun = Instant::now();
    pool.shutdown();
    assert!(begun.elapsed() >= Duration::from_millis(50));
    releaser.join().unwrap();

    assert!(pool.is_shut_down());
    assert!(pool.watched().is_empty());
    assert!(updates.try_recv().is_err());
    std::thread::sleep(Duration::from_millis(100));
    assert!(updates.try_recv().is_err());
}

#[test]
fn shutdown_times_out_on_stuck_fetch_without_emitting() {
    let (fetcher, started, _release) = gated();
    let config = WatchConfig::default()
        .with_interval(Duration::from_millis(20))
        .with_shutdown_timeout(Duration::from_millis(100));
    let (mut pool, updates) = WatcherPool::with_channel(config, fetcher).unwrap();

    pool.add("https://example.com/stuck.toml").unwrap();
    started.recv_timeout(Duration::from_secs(5)).unwrap();

    let begun = Instant::now();
    pool.shutdown();
    assert!(begun.elapsed() < Duration::from_secs(4));

    // The detached fetch finishes on its own after the gate times out.
    std::thread::sleep(Duration::from_millis(300));
    assert!(updates.try_recv().is_err());
}
