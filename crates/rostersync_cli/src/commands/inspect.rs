//! Inspect command implementation.

use crate::workspace::Workspace;
use rostersync_engine::{choose_strategy, MemoryLocalStore, MemorySheet};
use rostersync_model::{parse_rows, Entity, EntityKind};
use serde::Serialize;
use std::error::Error;

/// Workspace inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Workspace path.
    pub path: String,
    /// Whether a spreadsheet id is configured.
    pub configured: bool,
    /// Per-kind statistics.
    pub kinds: Vec<KindStats>,
    /// Deletion ledger entries.
    pub ledger_entries: usize,
    /// Strategy a compound sync would pick.
    pub strategy: String,
}

/// Statistics for one entity kind.
#[derive(Debug, Serialize)]
pub struct KindStats {
    /// Entity kind.
    pub kind: EntityKind,
    /// Local records.
    pub local: usize,
    /// Local records never uploaded.
    pub pending: usize,
    /// Parsed remote rows.
    pub remote: usize,
    /// Remote rows that fail to parse.
    pub malformed: usize,
}

/// Runs the inspect command.
pub fn run(workspace: &Workspace, format: &str) -> Result<(), Box<dyn Error>> {
    let stores = workspace.stores();
    let kinds = vec![
        kind_stats(&stores.guests, &stores.sheet),
        kind_stats(&stores.volunteers, &stores.sheet),
        kind_stats(&stores.jobs, &stores.sheet),
        kind_stats(&stores.job_types, &stores.sheet),
        kind_stats(&stores.venues, &stores.sheet),
    ];

    let local_rows = kinds.iter().map(|k| k.local).sum();
    let remote_rows = kinds.iter().map(|k| k.remote).sum();
    let result = InspectResult {
        path: workspace.root().display().to_string(),
        configured: workspace.settings().to_config().is_configured(),
        ledger_entries: workspace.ledger().len(),
        strategy: choose_strategy(local_rows, remote_rows).to_string(),
        kinds,
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result),
    }
    Ok(())
}

fn kind_stats<T: Entity>(local: &MemoryLocalStore<T>, sheet: &MemorySheet) -> KindStats {
    let items = local.snapshot();
    let rows = sheet.rows(T::SHEET);
    let parsed = parse_rows::<T>(rows.get(1..).unwrap_or_default());

    KindStats {
        kind: T::KIND,
        local: items.len(),
        pending: items.iter().filter(|i| i.identity().is_pending()).count(),
        remote: parsed.items.len(),
        malformed: parsed.errors.len(),
    }
}

fn print_text_output(result: &InspectResult) {
    println!("Workspace: {}", result.path);
    println!(
        "Spreadsheet: {}",
        if result.configured { "configured" } else { "not configured" }
    );
    println!();
    println!(
        "{:<16} {:>7} {:>8} {:>7} {:>10}",
        "kind", "local", "pending", "remote", "malformed"
    );
    for stats in &result.kinds {
        println!(
            "{:<16} {:>7} {:>8} {:>7} {:>10}",
            stats.kind.as_str(),
            stats.local,
            stats.pending,
            stats.remote,
            stats.malformed
        );
    }
    println!();
    println!("Deletion ledger: {} entries", result.ledger_entries);
    println!("Compound sync would run: {}", result.strategy);
}
