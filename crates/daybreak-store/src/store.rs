use crate::catalog::Catalog;
use crate::layout::StoreLayout;
use crate::settings::{ContainerSettings, Settings, DEFAULT_THEME};
use crate::theme::Theme;
use crate::{write_atomic, StoreError, LOCAL_MANIFEST_SOURCE};
use crossbeam_channel::{Receiver, Sender};
use daybreak_schema::{parse_manifest_bytes, parse_manifest_file, Manifest, Package, Server};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error, info, warn};

/// Name given to the self-authored catalog snapshot.
const SNAPSHOT_NAME: &str = "store";

/// Change notification. Subscribers re-read whatever they display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Updated,
}

struct StoreState {
    catalog: Catalog,
    settings: Settings,
    themes: BTreeMap<String, Theme>,
}

/// The single authoritative catalog and settings owner.
///
/// All catalog and settings mutation goes through one `RwLock` write section,
/// so readers never observe a partially merged manifest and concurrent merges
/// are applied one after another.
pub struct Store {
    layout: StoreLayout,
    state: RwLock<StoreState>,
    running: Mutex<Vec<String>>,
    subscribers: Mutex<Vec<Sender<StoreEvent>>>,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_bundled_themes(root, None)
    }

    /// Create a store that also offers the themes shipped in `bundled`.
    /// User-installed themes with the same name take precedence.
    pub fn with_bundled_themes(root: impl Into<PathBuf>, bundled: Option<&Path>) -> Self {
        let layout = StoreLayout::new(root);

        let mut themes = BTreeMap::new();
        let user_themes = Theme::discover(&layout.themes_dir());
        for theme in bundled.map(Theme::discover).unwrap_or_default().into_iter().chain(user_themes) {
            themes.insert(theme.name.clone(), theme);
        }

        Self {
            layout,
            state: RwLock::new(StoreState {
                catalog: Catalog::new(),
                settings: Settings::default(),
                themes,
            }),
            running: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn running_set(&self) -> MutexGuard<'_, Vec<String>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Receive a `StoreEvent::Updated` after every catalog or settings change.
    pub fn subscribe(&self) -> Receiver<StoreEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    fn notify(&self) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|tx| tx.send(StoreEvent::Updated).is_ok());
    }

    /// Restore settings (seeding first-run defaults when absent) and the
    /// catalog snapshot. Subscribers are notified once, whatever the outcome.
    ///
    /// Both steps always run; the first error is returned.
    pub fn load(&self) -> Result<(), StoreError> {
        self.load_with(true)
    }

    /// Like [`Store::load`], but never writes to the data root: first-run
    /// defaults stay in memory and a corrupt settings file is left in place.
    /// For callers that do not hold the instance lock.
    pub fn load_read_only(&self) -> Result<(), StoreError> {
        self.load_with(false)
    }

    fn load_with(&self, persist: bool) -> Result<(), StoreError> {
        let settings = self.load_settings(persist);
        let snapshot = self.load_snapshot(persist);
        self.notify();
        settings.and(snapshot)
    }

    fn load_settings(&self, persist: bool) -> Result<(), StoreError> {
        let mut result = Ok(());
        if persist {
            if let Err(e) = self.layout.initialize() {
                warn!("failed to initialize {}: {e}", self.layout.root().display());
                result = Err(e);
            }
        }
        let path = self.layout.settings_file();
        let mut seed_on_disk = persist;

        let stored = if path.exists() {
            match Settings::load(&path) {
                Ok(settings) => Some(settings),
                Err(e) if persist => {
                    let aside = path.with_extension("json.corrupt");
                    warn!(
                        "unreadable settings {}: {e}; moving to {} and using defaults",
                        path.display(),
                        aside.display()
                    );
                    if let Err(e) = std::fs::rename(&path, &aside) {
                        seed_on_disk = false;
                        result = result.and(Err(StoreError::Io(e)));
                    }
                    None
                }
                Err(e) => {
                    warn!("unreadable settings {}: {e}; using defaults", path.display());
                    None
                }
            }
        } else {
            None
        };

        let mut state = self.write();
        match stored {
            Some(settings) => {
                debug!("restored settings from {}", path.display());
                state.settings = settings;
            }
            None => {
                let theme = state
                    .themes
                    .keys()
                    .next()
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_THEME.to_owned());
                info!("seeding default settings (theme '{theme}')");
                state.settings = Settings::with_theme(&theme);
                if seed_on_disk {
                    result = result.and(state.settings.save(&path));
                }
            }
        }
        result
    }

    fn load_snapshot(&self, persist: bool) -> Result<(), StoreError> {
        let path = self.layout.manifests_file();
        if !path.exists() {
            debug!("no catalog snapshot at {}", path.display());
            return Ok(());
        }
        match parse_manifest_file(&path, LOCAL_MANIFEST_SOURCE) {
            Ok(manifest) => self.apply(manifest, persist),
            Err(e) => {
                warn!("ignoring catalog snapshot {}: {e}", path.display());
                Ok(())
            }
        }
    }

    /// Parse and merge raw manifest content fetched from `url`.
    ///
    /// Content that does not parse is logged and leaves the store untouched;
    /// the return value says whether anything was merged.
    pub fn merge(&self, url: &str, content: &[u8]) -> Result<bool, StoreError> {
        let manifest = match parse_manifest_bytes(content, url) {
            Ok(m) => m,
            Err(e) => {
                warn!("ignoring manifest from {url}: {e}");
                return Ok(false);
            }
        };
        self.merge_manifest(manifest)?;
        Ok(true)
    }

    /// Merge an already-parsed manifest, attributed to `manifest.source`.
    pub fn merge_manifest(&self, manifest: Manifest) -> Result<(), StoreError> {
        let result = self.apply(manifest, true);
        self.notify();
        result
    }

    /// Merge `manifest` into the catalog. Settings are written only when
    /// `persist` is set.
    fn apply(&self, manifest: Manifest, persist: bool) -> Result<(), StoreError> {
        let source = manifest.source.clone();
        let name = manifest.name.clone();
        let ids: Vec<String> = manifest
            .applications
            .keys()
            .chain(manifest.runtimes.keys())
            .cloned()
            .collect();

        let mut state = self.write();
        info!("updating catalog from '{name}' ({source})");
        state.catalog.apply(manifest);

        for id in &ids {
            state.settings.ensure_container(id);
        }

        if source != LOCAL_MANIFEST_SOURCE && state.settings.record_manifest(&source, &name) {
            debug!("recorded new manifest source {source}");
        }

        if !persist {
            return Ok(());
        }
        state.settings.save(&self.layout.settings_file())?;
        debug!("committed settings for {source}");
        Ok(())
    }

    /// Install/launch plan for `id`: its runtime chain, deepest first, then `id`.
    /// Unknown ids yield an empty plan.
    pub fn resolve_download(&self, id: &str) -> Result<Vec<Package>, StoreError> {
        self.read().catalog.resolve(id)
    }

    pub fn add_running(&self, id: &str) {
        info!("adding {id} to running list");
        self.running_set().push(id.to_owned());
    }

    /// Remove one occurrence of `id`. Removing an id that is not running means
    /// the launcher and the store disagree, and is reported as an error.
    pub fn remove_running(&self, id: &str) -> Result<(), StoreError> {
        let mut running = self.running_set();
        match running.iter().position(|r| r == id) {
            Some(pos) => {
                running.remove(pos);
                info!("removed {id} from running list");
                Ok(())
            }
            None => {
                error!("asked to remove {id} from running list, but it is not running");
                Err(StoreError::NotRunning(id.to_owned()))
            }
        }
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.running_set().iter().any(|r| r == id)
    }

    pub fn running(&self) -> Vec<String> {
        self.running_set().clone()
    }

    pub fn save(&self) -> Result<(), StoreError> {
        self.save_settings()?;
        self.save_manifests()
    }

    pub fn save_settings(&self) -> Result<(), StoreError> {
        self.read().settings.save(&self.layout.settings_file())
    }

    /// Write the merged catalog as the local snapshot manifest.
    pub fn save_manifests(&self) -> Result<(), StoreError> {
        let text = self
            .read()
            .catalog
            .to_manifest(SNAPSHOT_NAME, LOCAL_MANIFEST_SOURCE)
            .to_toml_string()?;
        write_atomic(&self.layout.manifests_file(), text.as_bytes())
    }

    /// Install the theme at `path`, select it, and return its name.
    pub fn install_theme(&self, path: &Path) -> Result<String, StoreError> {
        let theme = Theme::install(path, &self.layout.themes_dir())?;
        let name = theme.name.clone();
        info!("installed theme '{name}'");

        let result = {
            let mut state = self.write();
            state.themes.insert(name.clone(), theme);
            state.settings.theme.clone_from(&name);
            state.settings.save(&self.layout.settings_file())
        };
        self.notify();
        result.map(|()| name)
    }

    pub fn select_theme(&self, name: &str) -> Result<(), StoreError> {
        if !self.read().themes.contains_key(name) {
            return Err(StoreError::InvalidTheme(format!("unknown theme '{name}'")));
        }
        self.update_settings(|s| s.theme = name.to_owned())
    }

    /// Forget a remote source: its name and its entry in the manifest list.
    /// Catalog entries it contributed stay until overwritten.
    pub fn remove_source(&self, url: &str) -> Result<bool, StoreError> {
        let removed = {
            let mut state = self.write();
            let removed = state.settings.remove_manifest(url);
            state.settings.save(&self.layout.settings_file())?;
            removed
        };
        if removed {
            info!("removed manifest source {url}");
            self.notify();
        }
        Ok(removed)
    }

    pub fn set_auto_patch(&self, enabled: bool) -> Result<(), StoreError> {
        self.update_settings(|s| s.auto_patch = enabled)
    }

    pub fn set_container_settings(&self, settings: ContainerSettings) -> Result<(), StoreError> {
        self.update_settings(|s| {
            s.container_settings.insert(settings.id.clone(), settings);
        })
    }

    pub fn note_recent_server(&self, id: &str) -> Result<(), StoreError> {
        self.update_settings(|s| s.recent_servers.push(id))
    }

    pub fn hide_server(&self, id: &str) -> Result<(), StoreError> {
        self.update_settings(|s| {
            s.hidden_servers.insert(id.to_owned());
        })
    }

    pub fn unhide_server(&self, id: &str) -> Result<(), StoreError> {
        self.update_settings(|s| {
            s.hidden_servers.remove(id);
        })
    }

    fn update_settings(&self, f: impl FnOnce(&mut Settings)) -> Result<(), StoreError> {
        let result = {
            let mut state = self.write();
            f(&mut state.settings);
            state.settings.save(&self.layout.settings_file())
        };
        self.notify();
        result
    }

    pub fn catalog(&self) -> Catalog {
        self.read().catalog.clone()
    }

    pub fn applications(&self) -> Vec<Package> {
        self.read().catalog.applications.values().cloned().collect()
    }

    pub fn runtimes(&self) -> Vec<Package> {
        self.read().catalog.runtimes.values().cloned().collect()
    }

    pub fn servers(&self) -> Vec<Server> {
        self.read().catalog.servers.values().cloned().collect()
    }

    /// Servers the user has not hidden.
    pub fn visible_servers(&self) -> Vec<Server> {
        let state = self.read();
        state
            .catalog
            .servers
            .values()
            .filter(|s| !state.settings.hidden_servers.contains(&s.id))
            .cloned()
            .collect()
    }

    /// Applications of type `mod`.
    pub fn tools(&self) -> Vec<Package> {
        self.read().catalog.applications_of_kind("mod").cloned().collect()
    }

    /// Applications of type `client`.
    pub fn clients(&self) -> Vec<Package> {
        self.read()
            .catalog
            .applications_of_kind("client")
            .cloned()
            .collect()
    }

    pub fn settings(&self) -> Settings {
        self.read().settings.clone()
    }

    pub fn container_settings(&self, id: &str) -> Option<ContainerSettings> {
        self.read().settings.container_settings.get(id).cloned()
    }

    pub fn manifest_list(&self) -> Vec<String> {
        self.read().settings.manifest_list.clone()
    }

    pub fn manifest_name(&self, url: &str) -> Option<String> {
        self.read().settings.manifest_names.get(url).cloned()
    }

    pub fn themes(&self) -> Vec<String> {
        self.read().themes.keys().cloned().collect()
    }

    pub fn current_theme(&self) -> Option<Theme> {
        let state = self.read();
        state.themes.get(&state.settings.theme).cloned()
    }
}
