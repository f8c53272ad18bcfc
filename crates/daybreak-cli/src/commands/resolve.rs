use super::{colorize_kind, json_pretty, open_store, Context, EXIT_SUCCESS};

pub fn run(ctx: &Context, id: &str) -> Result<u8, String> {
    let store = open_store(ctx)?;
    let plan = store.resolve_download(id).map_err(|e| e.to_string())?;
    if plan.is_empty() {
        return Err(format!("no application or runtime named '{id}'"));
    }

    if ctx.json {
        let steps: Vec<_> = plan
            .iter()
            .map(|p| serde_json::json!({ "id": p.id, "type": p.kind, "version": p.version }))
            .collect();
        println!("{}", json_pretty(&steps)?);
    } else {
        for (i, p) in plan.iter().enumerate() {
            println!("{}. {} ({})", i + 1, p.display_name(), colorize_kind(&p.kind));
        }
    }
    Ok(EXIT_SUCCESS)
}
