//! Single-record commands: push one record, delete one record.

use crate::workspace::Workspace;
use rostersync_engine::{
    DeleteOutcome, MemoryLocalStore, StoreSet, StoresFor, SyncOrchestrator, UpsertOutcome,
};
use rostersync_model::{Entity, EntityKind, LocalId};
use std::error::Error;

/// Uploads one local record (append or row update).
pub async fn push(
    workspace: &Workspace,
    kind: EntityKind,
    local_id: LocalId,
) -> Result<(), Box<dyn Error>> {
    let orchestrator = workspace.orchestrator();
    let stores = workspace.stores();
    let outcome = match kind {
        EntityKind::Guest => push_one(&orchestrator, &stores.guests, local_id).await?,
        EntityKind::Volunteer => push_one(&orchestrator, &stores.volunteers, local_id).await?,
        EntityKind::Job => push_one(&orchestrator, &stores.jobs, local_id).await?,
        EntityKind::JobTypeConfig => push_one(&orchestrator, &stores.job_types, local_id).await?,
        EntityKind::Venue => push_one(&orchestrator, &stores.venues, local_id).await?,
    };
    workspace.save()?;

    match outcome {
        UpsertOutcome::Appended { remote_id, .. } => {
            println!("✓ Appended {kind} {local_id} as remote row {remote_id}")
        }
        UpsertOutcome::Updated { .. } => println!("✓ Updated remote row of {kind} {local_id}"),
        UpsertOutcome::Recovered { reason, .. } => {
            println!("✓ Row write failed ({reason}); uploaded the whole {kind} sheet instead")
        }
        UpsertOutcome::LocalOnly { .. } => println!("- Saved locally; no spreadsheet configured"),
    }
    Ok(())
}

/// Deletes one local record and its remote row.
pub async fn delete(
    workspace: &Workspace,
    kind: EntityKind,
    local_id: LocalId,
) -> Result<(), Box<dyn Error>> {
    let orchestrator = workspace.orchestrator();
    let stores = workspace.stores();
    let outcome = match kind {
        EntityKind::Guest => delete_one(&orchestrator, &stores.guests, local_id).await,
        EntityKind::Volunteer => delete_one(&orchestrator, &stores.volunteers, local_id).await,
        EntityKind::Job => delete_one(&orchestrator, &stores.jobs, local_id).await,
        EntityKind::JobTypeConfig => delete_one(&orchestrator, &stores.job_types, local_id).await,
        EntityKind::Venue => delete_one(&orchestrator, &stores.venues, local_id).await,
    };
    // The local deletion stands even if the remote part failed.
    workspace.save()?;

    match outcome? {
        DeleteOutcome::Removed => println!("✓ Deleted {kind} {local_id} locally and remotely"),
        DeleteOutcome::Recovered { reason } => {
            println!("✓ Deleted {kind} {local_id}; row delete failed ({reason}), sheet re-uploaded")
        }
        DeleteOutcome::LocalOnly => println!("✓ Deleted {kind} {local_id} locally"),
    }
    Ok(())
}

fn find<T: Entity>(store: &MemoryLocalStore<T>, local_id: LocalId) -> Result<T, Box<dyn Error>> {
    store
        .snapshot()
        .into_iter()
        .find(|item| item.local_id() == Some(local_id))
        .ok_or_else(|| format!("no {} with local id {local_id}", T::KIND).into())
}

async fn push_one<T: Entity>(
    orchestrator: &SyncOrchestrator,
    store: &MemoryLocalStore<T>,
    local_id: LocalId,
) -> Result<UpsertOutcome, Box<dyn Error>>
where
    StoreSet: StoresFor<T>,
{
    let item = find(store, local_id)?;
    Ok(orchestrator.upsert(item).await?)
}

async fn delete_one<T: Entity>(
    orchestrator: &SyncOrchestrator,
    store: &MemoryLocalStore<T>,
    local_id: LocalId,
) -> Result<DeleteOutcome, Box<dyn Error>>
where
    StoreSet: StoresFor<T>,
{
    let item = find(store, local_id)?;
    Ok(orchestrator.delete_item(&item).await?)
}
