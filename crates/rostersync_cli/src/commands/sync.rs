//! Sync command implementations.

use crate::workspace::Workspace;
use rostersync_engine::SyncOutcome;
use rostersync_model::{Page, SyncResult};
use std::error::Error;
use tracing::info;

/// Sync mode selected on the command line.
#[derive(Debug, Clone, Copy)]
pub enum SyncMode {
    /// Download and replace.
    Full,
    /// Upload and replace.
    Backup,
    /// Merge remote changes.
    Differential,
    /// Pick a mode from which side has data.
    Compound,
    /// Download and replace the kinds of two pages.
    Page {
        /// Page navigated from.
        from: Page,
        /// Page navigated to.
        to: Page,
    },
}

/// Runs one sync mode and saves the workspace.
pub async fn run(workspace: &Workspace, mode: SyncMode) -> Result<(), Box<dyn Error>> {
    let orchestrator = workspace.orchestrator();
    orchestrator.startup();
    info!(?mode, root = %workspace.root().display(), "running sync");

    match mode {
        SyncMode::Full => print_outcome(&orchestrator.full_sync().await?),
        SyncMode::Backup => print_outcome(&orchestrator.backup().await?),
        SyncMode::Compound => print_outcome(&orchestrator.compound_sync().await?),
        SyncMode::Page { from, to } => print_outcome(&orchestrator.page_sync(from, to).await?),
        SyncMode::Differential => print_result(&orchestrator.differential_sync().await?),
    }

    workspace.save()?;
    Ok(())
}

fn print_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Completed { message, counts } => {
            println!("✓ {message}");
            for (kind, count) in counts {
                println!("  {kind}: {count}");
            }
        }
        SyncOutcome::NoOp(reason) => println!("- Nothing done: {reason}"),
        SyncOutcome::Skipped => println!("- Skipped: another sync is running"),
    }
}

fn print_result(result: &SyncResult) {
    if !result.has_any_changes() {
        println!("✓ Up to date");
    } else {
        println!("✓ Applied {} changes", result.total_changes());
    }
    for summary in result.kind_summaries() {
        println!("  {summary}");
    }
}
