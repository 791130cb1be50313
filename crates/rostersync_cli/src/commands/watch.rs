//! Watch command implementation.

use crate::workspace::Workspace;
use rostersync_engine::BackgroundSync;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

/// Runs background differential sync for `duration`, then saves.
pub async fn run(
    workspace: &Workspace,
    interval: Option<Duration>,
    duration: Duration,
) -> Result<(), Box<dyn Error>> {
    let orchestrator = Arc::new(workspace.orchestrator());
    orchestrator.startup();

    let interval = interval
        .or(orchestrator.config().sync_interval)
        .ok_or("no sync interval given and none configured")?;

    let background = BackgroundSync::start(Arc::clone(&orchestrator), interval);
    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = tokio::signal::ctrl_c() => {}
    }
    let runs = background.stop().await?;

    let stats = orchestrator.stats();
    workspace.save()?;
    println!("✓ Background sync stopped after {runs} runs");
    println!("  Skipped: {}", stats.skipped);
    if let Some(error) = stats.last_error {
        println!("  Last error: {error}");
    }
    Ok(())
}
