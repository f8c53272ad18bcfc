use crate::{write_atomic, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_THEME: &str = "default";
const MAX_RECENT_SERVERS: usize = 10;

/// Per-item container configuration, created with defaults the first time an
/// application or runtime id is seen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerSettings {
    pub id: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Sandbox prefix directory; `None` means the launcher's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<PathBuf>,
}

impl ContainerSettings {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            arguments: Vec::new(),
            environment: BTreeMap::new(),
            prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathSettings {
    pub bin: PathBuf,
    pub run: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            bin: PathBuf::from("bin"),
            run: PathBuf::from("run"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecentServer {
    pub id: String,
    pub joined_at: String,
}

/// Most-recent-first list of joined servers, without duplicates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecentServers {
    pub entries: Vec<RecentServer>,
}

impl RecentServers {
    pub fn push(&mut self, id: &str) {
        self.entries.retain(|e| e.id != id);
        self.entries.insert(
            0,
            RecentServer {
                id: id.to_owned(),
                joined_at: chrono::Utc::now().to_rfc3339(),
            },
        );
        self.entries.truncate(MAX_RECENT_SERVERS);
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Typed user settings. Missing keys in a stored file take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default = "default_auto_patch")]
    pub auto_patch: bool,
    #[serde(default)]
    pub container_settings: BTreeMap<String, ContainerSettings>,
    #[serde(default)]
    pub paths: PathSettings,
    #[serde(default)]
    pub recent_servers: RecentServers,
    #[serde(default)]
    pub hidden_servers: BTreeSet<String>,
    #[serde(default = "default_theme")]
    pub theme: String,
    /// Known remote manifest URLs, in the order they were first merged.
    #[serde(default)]
    pub manifest_list: Vec<String>,
    /// Remote manifest URL -> the name its last merged manifest declared.
    #[serde(default)]
    pub manifest_names: BTreeMap<String, String>,
}

fn default_auto_patch() -> bool {
    true
}

fn default_theme() -> String {
    DEFAULT_THEME.to_owned()
}

impl Default for Settings {
    fn default() -> Self {
        Self::with_theme(DEFAULT_THEME)
    }
}

impl Settings {
    /// First-run settings with the given theme selected.
    pub fn with_theme(theme: &str) -> Self {
        Self {
            auto_patch: true,
            container_settings: BTreeMap::new(),
            paths: PathSettings::default(),
            recent_servers: RecentServers::default(),
            hidden_servers: BTreeSet::new(),
            theme: theme.to_owned(),
            manifest_list: Vec::new(),
            manifest_names: BTreeMap::new(),
        }
    }

    /// Record `url` as a known manifest source. Returns `false` if already known.
    pub fn add_manifest(&mut self, url: &str) -> bool {
        if self.manifest_list.iter().any(|u| u == url) {
            return false;
        }
        self.manifest_list.push(url.to_owned());
        true
    }

    /// Record `url` as known and remember the name it published.
    /// Returns `false` if the URL was already known.
    pub fn record_manifest(&mut self, url: &str, name: &str) -> bool {
        self.manifest_names.insert(url.to_owned(), name.to_owned());
        self.add_manifest(url)
    }

    pub fn remove_manifest(&mut self, url: &str) -> bool {
        self.manifest_names.remove(url);
        let before = self.manifest_list.len();
        self.manifest_list.retain(|u| u != url);
        self.manifest_list.len() != before
    }

    /// Insert default container settings for `id` unless some already exist.
    pub fn ensure_container(&mut self, id: &str) -> bool {
        if self.container_settings.contains_key(id) {
            return false;
        }
        self.container_settings
            .insert(id.to_owned(), ContainerSettings::new(id));
        true
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(self)?;
        write_atomic(path, content.as_bytes())
    }
}
