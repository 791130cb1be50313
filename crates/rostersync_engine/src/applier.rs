//! Change applicator.
//!
//! Writes a [`ChangeSet`] into the local store. Every item is attempted on
//! its own: a failed write is logged and counted, and the rest of the set
//! is still applied. There is no rollback.

use crate::store::LocalStore;
use rostersync_model::{ChangeSet, Entity};
use tracing::{debug, warn};

/// Counts of local writes performed by [`apply_changes`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Records inserted.
    pub inserted: usize,
    /// Records updated.
    pub updated: usize,
    /// Records deleted.
    pub deleted: usize,
    /// Writes that failed.
    pub failed: usize,
}

impl ApplyReport {
    /// Number of successful writes.
    pub fn applied(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}

/// Inserts added items, updates modified ones (the remote record replaces
/// the local one) and deletes deleted ones.
///
/// Callers should refresh any cached view of the kind afterwards.
pub fn apply_changes<T: Entity>(changes: &ChangeSet<T>, store: &dyn LocalStore<T>) -> ApplyReport {
    let mut report = ApplyReport::default();

    for item in changes.added() {
        match store.insert(item) {
            Ok(_) => report.inserted += 1,
            Err(e) => {
                warn!(kind = %T::KIND, key = %item.match_key(), error = %e, "insert failed");
                report.failed += 1;
            }
        }
    }

    for item in changes.modified() {
        match store.update(item) {
            Ok(()) => report.updated += 1,
            Err(e) => {
                warn!(kind = %T::KIND, key = %item.match_key(), error = %e, "update failed");
                report.failed += 1;
            }
        }
    }

    for item in changes.deleted() {
        match store.delete(item) {
            Ok(()) => report.deleted += 1,
            Err(e) => {
                warn!(kind = %T::KIND, key = %item.match_key(), error = %e, "delete failed");
                report.failed += 1;
            }
        }
    }

    debug!(kind = %T::KIND, ?report, "applied change set");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLocalStore;
    use rostersync_model::{Identity, LocalId, RemoteId, Venue};

    fn venue(id: &str, name: &str, capacity: u32) -> Venue {
        let mut v = Venue::new(name, "1 Road", capacity);
        v.set_identity(Identity::Remote(RemoteId::new(id)));
        v
    }

    #[test]
    fn applies_all_three_lists() {
        let store = MemoryLocalStore::new();
        let kept = store.insert(&venue("1", "Hall", 100)).unwrap();
        let gone = store.insert(&venue("2", "Tent", 20)).unwrap();

        let mut bigger = venue("1", "Hall", 150);
        bigger.set_local_id(Some(kept));
        let mut removed = venue("2", "Tent", 20);
        removed.set_local_id(Some(gone));

        let changes = ChangeSet::new(
            vec![venue("3", "Barn", 60)],
            vec![bigger],
            vec![removed],
            vec![],
        );

        let report = apply_changes(&changes, &store);
        assert_eq!(
            report,
            ApplyReport {
                inserted: 1,
                updated: 1,
                deleted: 1,
                failed: 0
            }
        );

        let mut names: Vec<_> = store
            .get_all()
            .unwrap()
            .into_iter()
            .map(|v| (v.name, v.capacity))
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![(String::from("Barn"), 60), (String::from("Hall"), 150)]
        );
    }

    #[test]
    fn one_failure_does_not_abort_the_rest() {
        let store = MemoryLocalStore::new();
        let existing = store.insert(&venue("1", "Hall", 100)).unwrap();

        // Unknown local id: the update fails, the delete still runs.
        let mut stale = venue("9", "Ghost", 1);
        stale.set_local_id(Some(LocalId(999)));
        let mut removed = venue("1", "Hall", 100);
        removed.set_local_id(Some(existing));

        let changes = ChangeSet::new(
            vec![venue("2", "Tent", 20)],
            vec![stale],
            vec![removed],
            vec![],
        );

        let report = apply_changes(&changes, &store);
        assert_eq!(report.failed, 1);
        assert_eq!(report.applied(), 2);
        assert_eq!(store.get_all().unwrap().len(), 1);
    }
}
