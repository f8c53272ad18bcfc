use super::{json_pretty, locked_store, open_store, Context, EXIT_FAILURE, EXIT_SUCCESS};
use daybreak_core::is_remote;

pub fn list(ctx: &Context) -> Result<u8, String> {
    let store = open_store(ctx)?;
    let sources: Vec<(String, Option<String>)> = store
        .manifest_list()
        .into_iter()
        .map(|url| {
            let name = store.manifest_name(&url);
            (url, name)
        })
        .collect();

    if ctx.json {
        let rows: Vec<_> = sources
            .iter()
            .map(|(url, name)| serde_json::json!({ "url": url, "name": name }))
            .collect();
        println!("{}", json_pretty(&rows)?);
    } else if sources.is_empty() {
        println!("no manifest sources");
    } else {
        for (url, name) in &sources {
            match name {
                Some(name) => println!("{url}  ({name})"),
                None => println!("{url}"),
            }
        }
    }
    Ok(EXIT_SUCCESS)
}

pub fn add(ctx: &Context, url: &str) -> Result<u8, String> {
    if !is_remote(url) {
        return Err(format!("not an http(s) URL: {url}"));
    }
    super::import::run(ctx, url)
}

pub fn remove(ctx: &Context, url: &str) -> Result<u8, String> {
    let (_lock, store) = locked_store(ctx)?;
    let removed = store
        .remove_source(url)
        .map_err(|e| format!("store error: {e}"))?;

    if ctx.json {
        println!("{}", json_pretty(&serde_json::json!({ "url": url, "removed": removed }))?);
    } else if removed {
        println!("removed {url}");
    } else {
        eprintln!("not a known source: {url}");
    }
    Ok(if removed { EXIT_SUCCESS } else { EXIT_FAILURE })
}
