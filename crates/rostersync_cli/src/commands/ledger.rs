//! Ledger command implementation.

use crate::workspace::Workspace;
use std::error::Error;

/// Lists deletion records, optionally pruning expired ones first.
pub fn run(workspace: &Workspace, prune: bool, format: &str) -> Result<(), Box<dyn Error>> {
    let ledger = workspace.ledger();

    if prune {
        let retention = workspace.settings().to_config().ledger_retention;
        let removed = ledger.prune(retention);
        println!("✓ Pruned {removed} expired records");
    }

    let records = ledger.records();
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&records)?),
        _ => {
            println!("Deletion ledger: {} records", records.len());
            for record in &records {
                let remote = record
                    .remote_id
                    .as_ref()
                    .map_or_else(|| "-".to_string(), ToString::to_string);
                println!(
                    "  {:<16} local={:<6} remote={:<6} deleted_at={}",
                    record.entity_kind.as_str(),
                    record.local_id.to_string(),
                    remote,
                    record.deleted_at
                );
            }
        }
    }
    Ok(())
}
