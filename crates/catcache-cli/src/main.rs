//! catcache - manage a remote category collection from the terminal.
//!
//! Every command goes through the synchronized cache: mutations are sent to
//! the server and followed by a full refetch before anything is shown.

mod args;
mod render;

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use catcache_core::{CategoryForm, CategoryRemote, CategoryStore, Config, LiveView, MemoryRemote};
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use args::{Cli, Command};

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes buffered log lines when dropped.
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (writer, guard) = tracing_appender::non_blocking(io::stderr());
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    // Parse before logging starts; clap exits on its own for --help and usage errors
    let cli = Cli::parse();

    let _guard = init_tracing();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut saved = Config::load()?;

    if let Command::Config { base_url } = &cli.command {
        saved.base_url = Some(base_url.clone());
        saved.save()?;
        println!("Saved server URL {} to {}", base_url, Config::config_path()?.display());
        return Ok(());
    }

    // Flag and environment values apply to this run only and are never saved
    let config = saved.with_overrides(cli.api_url, cli.api_token);

    let remote: Arc<dyn CategoryRemote> = if cli.memory {
        Arc::new(MemoryRemote::seeded())
    } else {
        Arc::new(config.api_client()?)
    };
    info!(memory = cli.memory, base_url = %config.base_url(), "catcache starting");

    // Each run starts with an empty cache, so reads always go to the server
    let store = CategoryStore::new(remote);
    let mut view = LiveView::new(&store, cli.command.view_filter());

    match cli.command {
        Command::List { .. } => store.load().await?,
        Command::Search { query } => store.search_remote(&query.join(" ")).await?,
        Command::Filter { status } => store.filter_remote(status).await?,
        Command::Add { name, status } => {
            let mut form = CategoryForm::new();
            form.name = name.join(" ");
            form.status = status.unwrap_or_default();
            match form.submit(&store).await? {
                Some(created) => println!("Created category {} ({})", created.id, created.name),
                None => println!("Created category"),
            }
        }
        Command::Edit { id, name, status } => {
            store.load().await?;
            let current = store
                .records()
                .into_iter()
                .find(|c| c.id == id)
                .ok_or_else(|| anyhow!("No category with id {}", id))?;

            let mut form = CategoryForm::new();
            form.begin_edit(&current);
            form.name = name.join(" ");
            if let Some(status) = status {
                form.status = status;
            }
            form.submit(&store).await?;
            println!("Updated category {}", id);
        }
        Command::Remove { id } => {
            store.delete(id).await?;
            println!("Deleted category {}", id);
        }
        Command::Config { .. } => {}
    }

    view.refresh();
    print!("{}", render::render_table(view.rows()));
    println!("{}", render::render_footer(view.rows().len(), &store.snapshot()));
    if let Some(failure) = view.last_error() {
        eprintln!("warning: {}", render::render_failure(failure));
    }
    Ok(())
}
