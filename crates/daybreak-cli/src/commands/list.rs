use super::{colorize_kind, json_pretty, open_store, Context, EXIT_SUCCESS};
use crate::Kind;
use daybreak_schema::{Package, Server};

fn package_json(p: &Package) -> serde_json::Value {
    serde_json::json!({
        "id": p.id,
        "type": p.kind,
        "name": p.name,
        "version": p.version,
        "runtime": p.runtime,
        "url": p.url,
    })
}

fn server_json(s: &Server) -> serde_json::Value {
    serde_json::json!({
        "id": s.id,
        "name": s.name,
        "address": s.address,
        "application": s.application,
    })
}

pub fn run(ctx: &Context, kind: Kind, all: bool) -> Result<u8, String> {
    let store = open_store(ctx)?;

    let packages = match kind {
        Kind::Applications => store.applications(),
        Kind::Runtimes => store.runtimes(),
        Kind::Tools => store.tools(),
        Kind::Clients => store.clients(),
        Kind::Servers => {
            let servers = if all {
                store.servers()
            } else {
                store.visible_servers()
            };
            return print_servers(ctx, &servers);
        }
    };

    if ctx.json {
        let rows: Vec<_> = packages.iter().map(package_json).collect();
        println!("{}", json_pretty(&rows)?);
    } else if packages.is_empty() {
        println!("no entries found");
    } else {
        println!("{:<20} {:<24} {:<10} {:<10} RUNTIME", "ID", "NAME", "TYPE", "VERSION");
        for p in &packages {
            println!(
                "{:<20} {:<24} {:<10} {:<10} {}",
                p.id,
                p.display_name(),
                colorize_kind(&p.kind),
                p.version.as_deref().unwrap_or("-"),
                p.runtime.as_deref().unwrap_or("-"),
            );
        }
    }
    Ok(EXIT_SUCCESS)
}

fn print_servers(ctx: &Context, servers: &[Server]) -> Result<u8, String> {
    if ctx.json {
        let rows: Vec<_> = servers.iter().map(server_json).collect();
        println!("{}", json_pretty(&rows)?);
    } else if servers.is_empty() {
        println!("no servers found");
    } else {
        println!("{:<20} {:<24} ADDRESS", "ID", "NAME");
        for s in servers {
            println!(
                "{:<20} {:<24} {}",
                s.id,
                s.name.as_deref().unwrap_or(&s.id),
                s.address
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
