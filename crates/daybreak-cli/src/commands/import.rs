use super::{fetch_once, json_pretty, open_daemon, Context, EXIT_SUCCESS};
use daybreak_core::is_remote;
use std::path::Path;

/// Read `source` and return it with the URL it should be recorded under.
fn read_source(ctx: &Context, source: &str) -> Result<(String, Vec<u8>), String> {
    if is_remote(source) {
        return Ok((source.to_owned(), fetch_once(ctx, source)?));
    }
    let path = Path::new(source)
        .canonicalize()
        .map_err(|e| format!("failed to read manifest {source}: {e}"))?;
    let bytes =
        std::fs::read(&path).map_err(|e| format!("failed to read manifest {source}: {e}"))?;
    Ok((format!("file://{}", path.display()), bytes))
}

pub fn run(ctx: &Context, source: &str) -> Result<u8, String> {
    let (url, bytes) = read_source(ctx, source)?;

    let mut daemon = open_daemon(ctx)?;
    daemon.import(&url, &bytes).map_err(|e| e.to_string())?;
    let name = daemon.store().manifest_name(&url).unwrap_or_default();
    daemon.shutdown().map_err(|e| e.to_string())?;

    if ctx.json {
        let payload = serde_json::json!({ "source": url, "name": name });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("imported '{name}' from {url}");
    }
    Ok(EXIT_SUCCESS)
}
