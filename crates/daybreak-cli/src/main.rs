mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use commands::{EXIT_FAILURE, EXIT_MANIFEST_ERROR, EXIT_STORE_ERROR};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "daybreak",
    version,
    about = "Manifest-driven catalog of applications, runtimes, and servers"
)]
struct Cli {
    /// Path to the Daybreak data directory.
    #[arg(long, default_value = "~/.local/share/daybreak", global = true)]
    root: String,

    /// Directory of themes shipped with the launcher.
    #[arg(long, default_value = "/usr/share/daybreak/themes", global = true)]
    bundled_themes: String,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Kind {
    Applications,
    Runtimes,
    Servers,
    Tools,
    Clients,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Watch every known manifest source and merge updates until Ctrl-C.
    Watch {
        /// Stop after this many seconds instead of waiting for Ctrl-C.
        #[arg(long)]
        seconds: Option<u64>,
    },
    /// List catalog entries.
    List {
        /// Which part of the catalog to show.
        #[arg(long, value_enum, default_value = "applications")]
        kind: Kind,
        /// Include servers the user has hidden.
        #[arg(long, default_value_t = false)]
        all: bool,
    },
    /// Show the install/launch order for an application or runtime.
    Resolve {
        /// Application or runtime id.
        id: String,
    },
    /// Merge a manifest from a local file or an http(s) URL.
    Import {
        /// Path or URL of the manifest.
        source: String,
    },
    /// Manage remote manifest sources.
    Sources {
        #[command(subcommand)]
        action: SourcesAction,
    },
    /// Manage UI themes.
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },
    /// Show settings, optionally changing them first.
    Settings {
        /// Enable or disable automatic patching.
        #[arg(long)]
        auto_patch: Option<bool>,
        /// Hide a server from the server list.
        #[arg(long)]
        hide_server: Option<String>,
        /// Show a previously hidden server again.
        #[arg(long)]
        unhide_server: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum SourcesAction {
    /// List known manifest sources.
    List,
    /// Fetch a manifest URL once and remember it.
    Add { url: String },
    /// Forget a manifest source.
    Remove { url: String },
}

#[derive(Debug, Subcommand)]
enum ThemeAction {
    /// List available themes.
    List,
    /// Install a theme directory (or its theme.toml) and select it.
    Install { path: PathBuf },
    /// Select an installed theme.
    Use { name: String },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("DAYBREAK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let ctx = commands::Context {
        root: expand_tilde(&cli.root),
        bundled_themes: expand_tilde(&cli.bundled_themes),
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Watch { seconds } => commands::watch::run(&ctx, seconds),
        Commands::List { kind, all } => commands::list::run(&ctx, kind, all),
        Commands::Resolve { id } => commands::resolve::run(&ctx, &id),
        Commands::Import { source } => commands::import::run(&ctx, &source),
        Commands::Sources { action } => match action {
            SourcesAction::List => commands::sources::list(&ctx),
            SourcesAction::Add { url } => commands::sources::add(&ctx, &url),
            SourcesAction::Remove { url } => commands::sources::remove(&ctx, &url),
        },
        Commands::Theme { action } => match action {
            ThemeAction::List => commands::theme::list(&ctx),
            ThemeAction::Install { path } => commands::theme::install(&ctx, &path),
            ThemeAction::Use { name } => commands::theme::select(&ctx, &name),
        },
        Commands::Settings {
            auto_patch,
            hide_server,
            unhide_server,
        } => commands::settings::run(
            &ctx,
            &commands::settings::Changes {
                auto_patch,
                hide_server,
                unhide_server,
            },
        ),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("manifest error:")
                || msg.starts_with("failed to parse manifest")
                || msg.starts_with("failed to read manifest")
            {
                EXIT_MANIFEST_ERROR
            } else if msg.starts_with("store error:") || msg.starts_with("data root") {
                EXIT_STORE_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
