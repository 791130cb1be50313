//! Deletion ledger.
//!
//! Remembers records deleted locally so that a merge does not bring them
//! back while the remote sheet still shows them. Entries are written before
//! any remote call for the deletion and expire after a retention window.
//!
//! Persistence is best-effort: a failed write is logged and reported, but
//! the in-memory entry is kept and the local deletion goes ahead.
//!
//! An entry is released early once the remote row is confirmed gone, or
//! when a record with the same identity is saved again. Sheet ids are
//! `max + 1`, so a freed id can come back on an unrelated row.

use crate::error::{EngineResult, SyncError};
use parking_lot::RwLock;
use rostersync_model::{now_millis, Entity, EntityKind, LocalId, RemoteId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const LEDGER_FORMAT_VERSION: u32 = 1;

/// One locally deleted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRecord {
    /// Kind of the deleted record.
    pub entity_kind: EntityKind,
    /// Local id the record had.
    pub local_id: LocalId,
    /// Remote id, if the record had been uploaded.
    pub remote_id: Option<RemoteId>,
    /// Business key, used when a remote row has no matching id.
    #[serde(default)]
    pub business_key: Option<String>,
    /// Unix milliseconds of the deletion.
    pub deleted_at: u64,
}

/// Lookup key for [`DeletionLedger::is_deleted`].
#[derive(Debug, Clone, Copy)]
pub enum LedgerLookup<'a> {
    /// By local id.
    Local(LocalId),
    /// By remote id.
    Remote(&'a RemoteId),
}

#[derive(Serialize, Deserialize)]
struct LedgerFile {
    version: u32,
    records: Vec<DeletionRecord>,
}

/// Durable log of local deletions.
pub struct DeletionLedger {
    path: Option<PathBuf>,
    records: RwLock<Vec<DeletionRecord>>,
}

impl DeletionLedger {
    /// Creates a ledger that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: RwLock::new(Vec::new()),
        }
    }

    /// Opens the ledger stored at `path`.
    ///
    /// A missing file starts an empty ledger. An unreadable or corrupt file
    /// is logged and also starts empty; the next write replaces it.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match Self::load(&path) {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable deletion ledger");
                Vec::new()
            }
        };
        debug!(path = %path.display(), entries = records.len(), "opened deletion ledger");

        Self {
            path: Some(path),
            records: RwLock::new(records),
        }
    }

    fn load(path: &Path) -> EngineResult<Vec<DeletionRecord>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let bytes = fs::read(path).map_err(io_error)?;
        let file: LedgerFile =
            serde_json::from_slice(&bytes).map_err(|e| SyncError::Ledger(e.to_string()))?;
        if file.version != LEDGER_FORMAT_VERSION {
            return Err(SyncError::Ledger(format!(
                "unsupported ledger version {}",
                file.version
            )));
        }
        Ok(file.records)
    }

    /// Returns the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Records a deletion happening now.
    pub fn record(
        &self,
        kind: EntityKind,
        local_id: LocalId,
        remote_id: Option<RemoteId>,
    ) -> EngineResult<()> {
        self.record_at(kind, local_id, remote_id, None, now_millis())
    }

    /// Records the deletion of `item`, including its business key.
    ///
    /// Items that were never stored locally have nothing to guard and are
    /// ignored.
    pub fn record_entity<T: Entity>(&self, item: &T) -> EngineResult<()> {
        let Some(local_id) = item.local_id() else {
            return Ok(());
        };
        self.record_at(
            T::KIND,
            local_id,
            item.remote_id().cloned(),
            Some(item.business_key()),
            now_millis(),
        )
    }

    /// Records a deletion at an explicit time.
    pub fn record_at(
        &self,
        kind: EntityKind,
        local_id: LocalId,
        remote_id: Option<RemoteId>,
        business_key: Option<String>,
        deleted_at: u64,
    ) -> EngineResult<()> {
        self.records.write().push(DeletionRecord {
            entity_kind: kind,
            local_id,
            remote_id,
            business_key,
            deleted_at,
        });
        self.persist()
    }

    /// Returns true if a deletion was recorded for the given id.
    pub fn is_deleted(&self, kind: EntityKind, lookup: LedgerLookup<'_>) -> bool {
        self.records.read().iter().any(|r| {
            r.entity_kind == kind
                && match lookup {
                    LedgerLookup::Local(id) => r.local_id == id,
                    LedgerLookup::Remote(id) => r.remote_id.as_ref() == Some(id),
                }
        })
    }

    /// Returns true if `item` (a remote row) matches a recorded deletion
    /// under the identity rule.
    pub fn suppresses<T: Entity>(&self, item: &T) -> bool {
        let business_key = item.business_key();
        self.records.read().iter().any(|r| {
            r.entity_kind == T::KIND
                && match (item.remote_id(), r.remote_id.as_ref()) {
                    (Some(a), Some(b)) => a == b,
                    _ => r.business_key.as_deref() == Some(business_key.as_str()),
                }
        })
    }

    /// Drops the entries for `remote_id` once its row is confirmed gone.
    /// Returns how many were removed.
    pub fn release_remote(&self, kind: EntityKind, remote_id: &RemoteId) -> EngineResult<usize> {
        self.remove_where(|r| r.entity_kind == kind && r.remote_id.as_ref() == Some(remote_id))
    }

    /// Drops the entries a newly saved `item` supersedes: same remote id, or
    /// same business key for entries that never had a remote id.
    ///
    /// Entries holding a different remote id are kept even when the key
    /// matches, since their row may still be on the sheet.
    pub fn release_matching<T: Entity>(&self, item: &T) -> EngineResult<usize> {
        let business_key = item.business_key();
        self.remove_where(|r| {
            r.entity_kind == T::KIND
                && match (item.remote_id(), r.remote_id.as_ref()) {
                    (Some(a), Some(b)) => a == b,
                    (_, None) => r.business_key.as_deref() == Some(business_key.as_str()),
                    (None, Some(_)) => false,
                }
        })
    }

    fn remove_where(&self, matches: impl Fn(&DeletionRecord) -> bool) -> EngineResult<usize> {
        let removed = {
            let mut records = self.records.write();
            let before = records.len();
            records.retain(|r| !matches(r));
            before - records.len()
        };
        if removed > 0 {
            debug!(removed, "released deletion records");
            self.persist()?;
        }
        Ok(removed)
    }

    /// Removes entries older than `retention`. Returns how many were removed.
    pub fn prune(&self, retention: Duration) -> usize {
        self.prune_at(now_millis(), retention)
    }

    /// Removes entries older than `retention` relative to `now`.
    pub fn prune_at(&self, now: u64, retention: Duration) -> usize {
        let cutoff = now.saturating_sub(retention.as_millis() as u64);
        let removed = {
            let mut records = self.records.write();
            let before = records.len();
            records.retain(|r| r.deleted_at >= cutoff);
            before - records.len()
        };

        if removed > 0 {
            info!(removed, "pruned expired deletion records");
            if let Err(e) = self.persist() {
                warn!(error = %e, "failed to persist pruned deletion ledger");
            }
        }
        removed
    }

    /// Returns a copy of all entries.
    pub fn records(&self) -> Vec<DeletionRecord> {
        self.records.read().clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if the ledger has no entries.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn persist(&self) -> EngineResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let file = LedgerFile {
            version: LEDGER_FORMAT_VERSION,
            records: self.records(),
        };
        let bytes =
            serde_json::to_vec_pretty(&file).map_err(|e| SyncError::Ledger(e.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(io_error)?;
        fs::rename(&tmp, path).map_err(io_error)?;
        Ok(())
    }
}

fn io_error(err: std::io::Error) -> SyncError {
    SyncError::Ledger(err.to_string())
}

impl std::fmt::Debug for DeletionLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeletionLedger")
            .field("path", &self.path)
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rostersync_model::{Guest, Identity};

    const DAY_MS: u64 = 24 * 60 * 60 * 1000;

    fn stored_guest(local: u64, remote: Option<&str>) -> Guest {
        let mut guest = Guest::new("Alice", "Main Hall", 2);
        guest.set_local_id(Some(LocalId(local)));
        if let Some(id) = remote {
            guest.set_identity(Identity::Remote(RemoteId::new(id)));
        }
        guest
    }

    #[test]
    fn lookup_by_local_and_remote_id() {
        let ledger = DeletionLedger::in_memory();
        ledger
            .record(EntityKind::Guest, LocalId(1), Some(RemoteId::from(5)))
            .unwrap();

        assert!(ledger.is_deleted(EntityKind::Guest, LedgerLookup::Local(LocalId(1))));
        assert!(ledger.is_deleted(EntityKind::Guest, LedgerLookup::Remote(&RemoteId::from(5))));
        assert!(!ledger.is_deleted(EntityKind::Venue, LedgerLookup::Local(LocalId(1))));
        assert!(!ledger.is_deleted(EntityKind::Guest, LedgerLookup::Remote(&RemoteId::from(6))));
    }

    #[test]
    fn suppresses_by_remote_id_then_business_key() {
        let ledger = DeletionLedger::in_memory();
        ledger.record_entity(&stored_guest(1, Some("5"))).unwrap();

        // Same remote id, edited remotely: still suppressed.
        let mut edited = stored_guest(0, Some("5"));
        edited.notes = "changed upstream".into();
        assert!(ledger.suppresses(&edited));

        // Same business key but a different remote id is a different record.
        assert!(!ledger.suppresses(&stored_guest(0, Some("8"))));

        // A pending record deleted locally matches remote rows by key.
        let ledger = DeletionLedger::in_memory();
        ledger.record_entity(&stored_guest(2, None)).unwrap();
        assert!(ledger.suppresses(&stored_guest(0, Some("9"))));
    }

    #[test]
    fn never_stored_items_are_not_recorded() {
        let ledger = DeletionLedger::in_memory();
        ledger.record_entity(&Guest::new("Ghost", "Nowhere", 0)).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn release_remote_drops_confirmed_rows_only() {
        let ledger = DeletionLedger::in_memory();
        ledger.record_entity(&stored_guest(1, Some("5"))).unwrap();
        ledger.record_entity(&stored_guest(2, Some("6"))).unwrap();

        assert_eq!(ledger.release_remote(EntityKind::Guest, &RemoteId::from(5)).unwrap(), 1);
        assert_eq!(ledger.release_remote(EntityKind::Venue, &RemoteId::from(6)).unwrap(), 0);
        assert!(!ledger.suppresses(&stored_guest(0, Some("5"))));
        assert!(ledger.suppresses(&stored_guest(0, Some("6"))));
    }

    #[test]
    fn release_matching_follows_identity_rule() {
        let ledger = DeletionLedger::in_memory();
        // Deleted before upload: only the business key is known.
        ledger.record_entity(&stored_guest(1, None)).unwrap();
        // Deleted after upload as row 7.
        ledger.record_entity(&stored_guest(2, Some("7"))).unwrap();

        // Re-creating the same guest clears the key-only entry but not the
        // one whose row may still exist.
        let recreated = Guest::new("Alice", "Main Hall", 2);
        assert_eq!(ledger.release_matching(&recreated).unwrap(), 1);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.suppresses(&stored_guest(0, Some("7"))));

        // A row that got id 7 again supersedes the old entry.
        let mut reused = Guest::new("Barn Dance", "Annex", 1);
        reused.set_identity(Identity::Remote(RemoteId::from(7)));
        assert_eq!(ledger.release_matching(&reused).unwrap(), 1);
        assert!(ledger.is_empty());
    }

    #[test]
    fn prune_removes_expired_entries() {
        let ledger = DeletionLedger::in_memory();
        let now = 100 * DAY_MS;
        ledger
            .record_at(EntityKind::Job, LocalId(1), None, None, now - 31 * DAY_MS)
            .unwrap();
        ledger
            .record_at(EntityKind::Job, LocalId(2), None, None, now - 29 * DAY_MS)
            .unwrap();

        let removed = ledger.prune_at(now, Duration::from_millis(30 * DAY_MS));
        assert_eq!(removed, 1);
        assert!(ledger.is_deleted(EntityKind::Job, LedgerLookup::Local(LocalId(2))));
        assert!(!ledger.is_deleted(EntityKind::Job, LedgerLookup::Local(LocalId(1))));
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("ledger.json");

        let ledger = DeletionLedger::open(&path);
        ledger.record_entity(&stored_guest(3, Some("12"))).unwrap();
        drop(ledger);

        let reopened = DeletionLedger::open(&path);
        assert_eq!(reopened.len(), 1);
        assert!(reopened.suppresses(&stored_guest(0, Some("12"))));
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, b"{ not json").unwrap();

        let ledger = DeletionLedger::open(&path);
        assert!(ledger.is_empty());

        ledger.record(EntityKind::Venue, LocalId(1), None).unwrap();
        assert_eq!(DeletionLedger::open(&path).len(), 1);
    }

    #[test]
    fn failed_write_keeps_in_memory_guard() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"").unwrap();

        let ledger = DeletionLedger::open(blocker.join("ledger.json"));
        let result = ledger.record(EntityKind::Guest, LocalId(4), Some(RemoteId::from(4)));

        assert!(matches!(result, Err(SyncError::Ledger(_))));
        assert!(ledger.is_deleted(EntityKind::Guest, LedgerLookup::Local(LocalId(4))));
    }
}
