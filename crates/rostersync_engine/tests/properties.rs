//! Property tests for the differential comparator and the row codec.

use proptest::prelude::*;
use rostersync_engine::{apply_changes, compare, MemoryLocalStore};
use rostersync_model::{parse_rows, Guest, Job, Volunteer};
use rostersync_testkit::prelude::*;
use std::collections::HashSet;

proptest! {
    #[test]
    fn compare_partitions_both_snapshots(pair in snapshot_pair_strategy(24)) {
        let changes = compare(pair.remote.clone(), pair.local.clone());

        prop_assert_eq!(changes.added().len(), pair.count(Placement::RemoteOnly));
        prop_assert_eq!(
            changes.modified().len(),
            pair.count(Placement::Modified) + pair.count(Placement::Adopting)
        );
        prop_assert_eq!(
            changes.deleted().len(),
            pair.count(Placement::LocalOnly) + pair.count(Placement::LocalPending)
        );
        prop_assert_eq!(changes.unchanged().len(), pair.count(Placement::Same));

        // Every remote record lands in exactly one of added/modified/unchanged,
        // every local record in exactly one of modified/deleted/unchanged.
        prop_assert_eq!(
            changes.added().len() + changes.modified().len() + changes.unchanged().len(),
            pair.remote.len()
        );
        prop_assert_eq!(
            changes.deleted().len() + changes.modified().len() + changes.unchanged().len(),
            pair.local.len()
        );

        let keys: HashSet<String> = changes
            .added()
            .iter()
            .chain(changes.modified())
            .chain(changes.deleted())
            .chain(changes.unchanged())
            .map(|g| g.name.clone())
            .collect();
        let expected: HashSet<String> = pair
            .remote
            .iter()
            .chain(&pair.local)
            .map(|g| g.name.clone())
            .collect();
        prop_assert_eq!(keys, expected);
    }

    #[test]
    fn applying_changes_is_idempotent(pair in snapshot_pair_strategy(24)) {
        let store = MemoryLocalStore::from_items(pair.local.clone());
        let first = compare(pair.remote.clone(), store.snapshot());
        let report = apply_changes(&first, &store);
        prop_assert_eq!(report.failed, 0);

        let second = compare(pair.remote.clone(), store.snapshot());
        prop_assert!(!second.has_changes());
        prop_assert_eq!(second.unchanged().len(), pair.remote.len());
    }

    #[test]
    fn parsing_arbitrary_rows_never_panics(rows in prop::collection::vec(raw_row_strategy(), 0..16)) {
        let guests = parse_rows::<Guest>(&rows);
        let volunteers = parse_rows::<Volunteer>(&rows);
        let jobs = parse_rows::<Job>(&rows);

        let non_blank = rows
            .iter()
            .filter(|r| r.iter().any(|c| !c.trim().is_empty()))
            .count();
        prop_assert_eq!(guests.items.len() + guests.errors.len(), non_blank);
        prop_assert_eq!(volunteers.items.len() + volunteers.errors.len(), non_blank);
        prop_assert_eq!(jobs.items.len() + jobs.errors.len(), non_blank);
    }
}
