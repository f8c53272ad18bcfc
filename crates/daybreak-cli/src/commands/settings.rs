use super::{json_pretty, locked_store, open_store, Context, EXIT_SUCCESS};
use daybreak_store::{Settings, StoreError};

/// Requested settings changes; all `None` means show only.
pub struct Changes {
    pub auto_patch: Option<bool>,
    pub hide_server: Option<String>,
    pub unhide_server: Option<String>,
}

impl Changes {
    fn is_empty(&self) -> bool {
        self.auto_patch.is_none() && self.hide_server.is_none() && self.unhide_server.is_none()
    }
}

fn apply(store: &daybreak_store::Store, changes: &Changes) -> Result<(), StoreError> {
    if let Some(enabled) = changes.auto_patch {
        store.set_auto_patch(enabled)?;
    }
    if let Some(ref id) = changes.hide_server {
        store.hide_server(id)?;
    }
    if let Some(ref id) = changes.unhide_server {
        store.unhide_server(id)?;
    }
    Ok(())
}

pub fn run(ctx: &Context, changes: &Changes) -> Result<u8, String> {
    let settings = if changes.is_empty() {
        open_store(ctx)?.settings()
    } else {
        let (_lock, store) = locked_store(ctx)?;
        apply(&store, changes).map_err(|e| format!("store error: {e}"))?;
        store.settings()
    };

    if ctx.json {
        println!("{}", json_pretty(&settings)?);
    } else {
        print_human(&settings);
    }
    Ok(EXIT_SUCCESS)
}

fn print_human(s: &Settings) {
    println!("theme:           {}", s.theme);
    println!("auto patch:      {}", if s.auto_patch { "on" } else { "off" });
    println!("bin path:        {}", s.paths.bin.display());
    println!("run path:        {}", s.paths.run.display());
    println!("sources:         {}", s.manifest_list.len());
    println!("containers:      {}", s.container_settings.len());
    if !s.recent_servers.is_empty() {
        println!("recent servers:  {}", s.recent_servers.ids().join(", "));
    }
    if !s.hidden_servers.is_empty() {
        let hidden: Vec<&str> = s.hidden_servers.iter().map(String::as_str).collect();
        println!("hidden servers:  {}", hidden.join(", "));
    }
}
