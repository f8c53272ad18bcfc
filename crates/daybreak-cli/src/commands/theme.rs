use super::{json_pretty, locked_store, open_store, Context, EXIT_SUCCESS};
use std::path::Path;

pub fn list(ctx: &Context) -> Result<u8, String> {
    let store = open_store(ctx)?;
    let current = store.settings().theme;
    let themes = store.themes();

    if ctx.json {
        let payload = serde_json::json!({ "current": current, "themes": themes });
        println!("{}", json_pretty(&payload)?);
    } else if themes.is_empty() {
        println!("no themes installed (using '{current}')");
    } else {
        for name in &themes {
            let marker = if *name == current { "*" } else { " " };
            println!("{marker} {name}");
        }
    }
    Ok(EXIT_SUCCESS)
}

pub fn install(ctx: &Context, path: &Path) -> Result<u8, String> {
    let (_lock, store) = locked_store(ctx)?;
    let name = store
        .install_theme(path)
        .map_err(|e| format!("store error: {e}"))?;

    if ctx.json {
        println!("{}", json_pretty(&serde_json::json!({ "installed": name }))?);
    } else {
        println!("installed and selected theme '{name}'");
    }
    Ok(EXIT_SUCCESS)
}

pub fn select(ctx: &Context, name: &str) -> Result<u8, String> {
    let (_lock, store) = locked_store(ctx)?;
    store
        .select_theme(name)
        .map_err(|e| format!("store error: {e}"))?;
    if !ctx.json {
        println!("selected theme '{name}'");
    }
    Ok(EXIT_SUCCESS)
}
