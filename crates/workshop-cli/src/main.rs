//! Workshop Mirror CLI - drives the mirror engine from the command line.
//!
//! Subscriptions come from a folder tree (one numeric folder per subscribed
//! item), which makes the binary usable without the host application.

mod listeners;
mod watch;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use workshop_core::{DirectoryPlatform, WorkshopMirror};

use listeners::LoggingListener;

#[derive(Parser, Debug)]
#[command(name = "workshop-mirror")]
#[command(about = "Mirror workshop subscriptions into local avatar and mod libraries")]
struct Args {
    /// Data root holding the libraries (defaults to the user data dir)
    #[arg(long)]
    data_root: Option<PathBuf>,

    /// Mod loader cache root (defaults to <data-root>/cache)
    #[arg(long)]
    cache_root: Option<PathBuf>,

    /// Folder with one subfolder per subscribed item (defaults to
    /// <data-root>/subscriptions)
    #[arg(long)]
    subscriptions: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// How long to wait for each item to finish installing
    #[arg(long, default_value = "10000")]
    install_timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one reconciliation pass and print its report
    Sync,
    /// Reconcile whenever the subscriptions folder changes
    Watch,
    /// Print the avatar library and mod mapping
    List,
    /// Drop a subscription and reconcile
    Unsubscribe {
        /// Remote item id
        id: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let data_root = match args.data_root {
        Some(path) => path,
        None => dirs::data_dir()
            .context("No user data directory on this platform, pass --data-root")?
            .join("workshop-mirror"),
    };
    let subscriptions = args
        .subscriptions
        .unwrap_or_else(|| data_root.join("subscriptions"));
    std::fs::create_dir_all(&subscriptions)
        .with_context(|| format!("Failed to create {}", subscriptions.display()))?;

    info!("Data root: {}", data_root.display());
    info!("Subscriptions: {}", subscriptions.display());

    let platform = Arc::new(DirectoryPlatform::new(&subscriptions));
    let listener = Arc::new(LoggingListener::new(&data_root));
    let mut builder = WorkshopMirror::builder(&data_root, platform)
        .install_timeout(Duration::from_millis(args.install_timeout_ms))
        .avatar_library(listener.clone())
        .mod_loader(listener);
    if let Some(cache_root) = args.cache_root {
        builder = builder.cache_root(cache_root);
    }
    let mirror = builder.build().await?;

    match args.command {
        Command::Sync => {
            mirror.refresh();
            mirror.wait_idle().await;
            mirror.wait_notified().await;
            print_report(&mirror)?;
        }
        Command::Watch => watch::run(&mirror, &subscriptions).await?,
        Command::List => {
            let listing = serde_json::json!({
                "avatars": mirror.list_avatars()?,
                "mods": mirror.mod_mappings()?,
            });
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        Command::Unsubscribe { id } => {
            mirror.unsubscribe(id).await?;
            mirror.wait_idle().await;
            mirror.wait_notified().await;
            print_report(&mirror)?;
        }
    }

    Ok(())
}

fn print_report(mirror: &WorkshopMirror) -> Result<()> {
    if let Some(error) = mirror.last_error() {
        bail!("Reconciliation failed: {}", error);
    }
    match mirror.last_report() {
        Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
        None => bail!("No reconciliation pass completed"),
    }
    Ok(())
}
