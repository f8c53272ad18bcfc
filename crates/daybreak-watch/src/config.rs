use crate::WatchError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_INTERVAL_MS: u64 = 6_000;
const DEFAULT_FETCH_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 10_000;

/// Timing knobs for the watcher pool.
///
/// `shutdown_timeout` should exceed `fetch_timeout`: shutdown waits for every
/// watcher to be dropped by the background thread, and a watcher mid-fetch is
/// only dropped once its fetch returns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

fn default_fetch_timeout_ms() -> u64 {
    DEFAULT_FETCH_TIMEOUT_MS
}

fn default_shutdown_timeout_ms() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_MS
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
        }
    }
}

impl WatchConfig {
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_ms = interval.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), WatchError> {
        if self.interval_ms == 0 {
            return Err(WatchError::Config("interval_ms must be positive".to_owned()));
        }
        if self.fetch_timeout_ms == 0 {
            return Err(WatchError::Config(
                "fetch_timeout_ms must be positive".to_owned(),
            ));
        }
        Ok(())
    }

    /// Load `~/.config/daybreak/watch.json`, or defaults when it does not exist.
    pub fn load_default() -> Result<Self, WatchError> {
        match default_config_path() {
            Ok(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self, WatchError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| WatchError::Config(format!("invalid watch config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), WatchError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| WatchError::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn default_config_path() -> Result<PathBuf, WatchError> {
    let home = std::env::var("HOME").map_err(|_| WatchError::Config("HOME not set".to_owned()))?;
    Ok(PathBuf::from(home).join(".config/daybreak/watch.json"))
}
