use super::{json_pretty, open_daemon, Context, EXIT_SUCCESS};
use daybreak_core::{install_signal_handler, shutdown_requested};
use std::time::{Duration, Instant};

pub fn run(ctx: &Context, seconds: Option<u64>) -> Result<u8, String> {
    let mut daemon = open_daemon(ctx)?;
    install_signal_handler();

    let sources = daemon.start().map_err(|e| e.to_string())?;
    if !ctx.json {
        println!("watching {sources} source(s); press Ctrl-C to stop");
    }

    let deadline = seconds.map(|s| Instant::now() + Duration::from_secs(s));
    daemon
        .run_until(|| shutdown_requested() || deadline.is_some_and(|d| Instant::now() >= d))
        .map_err(|e| e.to_string())?;

    let store = daemon.store();
    let (apps, runtimes, servers) = (
        store.applications().len(),
        store.runtimes().len(),
        store.servers().len(),
    );
    if ctx.json {
        let payload = serde_json::json!({
            "sources": sources,
            "applications": apps,
            "runtimes": runtimes,
            "servers": servers,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("stopped: {apps} application(s), {runtimes} runtime(s), {servers} server(s)");
    }
    Ok(EXIT_SUCCESS)
}
