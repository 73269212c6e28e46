//! Watch mode: reconcile whenever the subscriptions folder changes.

use anyhow::{Context, Result};
use notify::{Event, RecursiveMode, Watcher};
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use workshop_core::{RefreshRequest, WorkshopMirror};

pub async fn run(mirror: &WorkshopMirror, subscriptions: &Path) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<()>();

    let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
        match result {
            Ok(event) if is_relevant(&event) => {
                let _ = event_tx.send(());
            }
            Ok(_) => {}
            Err(e) => warn!("File watcher error: {}", e),
        }
    })
    .context("Failed to create file watcher")?;
    watcher
        .watch(subscriptions, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", subscriptions.display()))?;

    info!("Watching {} (Ctrl-C to stop)", subscriptions.display());
    mirror.refresh();

    loop {
        tokio::select! {
            received = event_rx.recv() => {
                if received.is_none() {
                    warn!("File watcher stopped");
                    break;
                }
                if mirror.refresh() == RefreshRequest::Coalesced {
                    debug!("Change folded into the running pass");
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                info!("Shutdown signal received, finishing current pass");
                break;
            }
        }
    }

    mirror.wait_idle().await;
    mirror.wait_notified().await;
    Ok(())
}

/// Reads never change the subscription set.
fn is_relevant(event: &Event) -> bool {
    !event.kind.is_access() && !event.kind.is_other()
}
