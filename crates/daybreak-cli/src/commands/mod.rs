pub mod import;
pub mod list;
pub mod resolve;
pub mod settings;
pub mod sources;
pub mod theme;
pub mod watch;

use daybreak_core::{Daemon, InstanceLock};
use daybreak_store::Store;
use daybreak_watch::{Fetcher, HttpFetcher, WatchConfig};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;
pub const EXIT_STORE_ERROR: u8 = 3;

/// Options shared by every command.
pub struct Context {
    pub root: PathBuf,
    pub bundled_themes: PathBuf,
    pub json: bool,
}

impl Context {
    fn store(&self) -> Store {
        Store::with_bundled_themes(&self.root, Some(self.bundled_themes.as_path()))
    }
}

/// Load the store for reading. Does not take the instance lock, so it works
/// alongside a running `daybreak watch`, and never writes to the data root.
pub fn open_store(ctx: &Context) -> Result<Store, String> {
    let store = ctx.store();
    store.load_read_only().map_err(|e| format!("store error: {e}"))?;
    Ok(store)
}

/// Load the store for a one-shot change while holding the instance lock.
pub fn locked_store(ctx: &Context) -> Result<(InstanceLock, Store), String> {
    let store = ctx.store();
    let lock = InstanceLock::try_acquire(&store.layout().lock_file())
        .map_err(|e| format!("store error: {e}"))?
        .ok_or_else(|| {
            format!(
                "data root {} is in use by another daybreak process",
                ctx.root.display()
            )
        })?;
    store.load().map_err(|e| format!("store error: {e}"))?;
    Ok((lock, store))
}

pub fn load_watch_config() -> Result<WatchConfig, String> {
    WatchConfig::load_default().map_err(|e| e.to_string())
}

pub fn open_daemon(ctx: &Context) -> Result<Daemon, String> {
    let config = load_watch_config()?;
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(config.fetch_timeout()));
    Daemon::with_store(ctx.store(), config, fetcher).map_err(|e| e.to_string())
}

/// Fetch `url` once, with a spinner on interactive output.
pub fn fetch_once(ctx: &Context, url: &str) -> Result<Vec<u8>, String> {
    let config = load_watch_config()?;
    let fetcher = HttpFetcher::new(config.fetch_timeout());

    if ctx.json {
        return fetcher
            .fetch(url)
            .map_err(|e| format!("failed to fetch {url}: {e}"));
    }

    let pb = spinner(&format!("fetching {url}…"));
    let bytes = fetcher.fetch(url).map_err(|e| {
        spin_fail(&pb, "fetch failed");
        format!("failed to fetch {url}: {e}")
    })?;
    spin_ok(&pb, &format!("fetched {} bytes", bytes.len()));
    Ok(bytes)
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner())
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(style("{spinner:.cyan} {msg}").tick_strings(&[
        "⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏",
    ]));
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(style("{msg}"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(style("{msg}"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_kind(kind: &str) -> String {
    use console::Style;
    match kind {
        "client" => Style::new().green().apply_to(kind).to_string(),
        "mod" => Style::new().cyan().apply_to(kind).to_string(),
        "runtime" => Style::new().yellow().apply_to(kind).to_string(),
        other => other.to_owned(),
    }
}
