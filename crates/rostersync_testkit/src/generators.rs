//! Property-based test generators using proptest.
//!
//! Provides strategies for generating records and snapshot pairs that keep
//! the invariants real data has: remote ids are unique within a sheet and
//! business keys are unique within a table.

use proptest::prelude::*;
use rostersync_model::{Entity, Guest, Identity, LocalId, RemoteId};

/// Venues guests are assigned to.
pub const VENUES: &[&str] = &["Main Hall", "Annex", "Garden"];

/// Strategy for generating person names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{2,8}").expect("Invalid regex")
}

/// Strategy for generating a pending guest.
pub fn guest_strategy() -> impl Strategy<Value = Guest> {
    (name_strategy(), prop::sample::select(VENUES), 0u32..6)
        .prop_map(|(name, venue, invitations)| Guest::new(name, venue, invitations))
}

/// How one record appears in a generated snapshot pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Only in the remote sheet.
    RemoteOnly,
    /// Only locally, carrying a remote id the sheet no longer has.
    LocalOnly,
    /// Only locally, never uploaded.
    LocalPending,
    /// On both sides with equal tracked fields.
    Same,
    /// On both sides, the remote copy has a different invitation count.
    Modified,
    /// On both sides, the local copy has not learned its remote id yet.
    Adopting,
}

/// Strategy for generating a placement.
pub fn placement_strategy() -> impl Strategy<Value = Placement> {
    prop_oneof![
        Just(Placement::RemoteOnly),
        Just(Placement::LocalOnly),
        Just(Placement::LocalPending),
        Just(Placement::Same),
        Just(Placement::Modified),
        Just(Placement::Adopting),
    ]
}

/// A generated `(remote, local)` snapshot pair plus the placement of
/// every record.
#[derive(Debug, Clone)]
pub struct SnapshotPair {
    /// Remote rows.
    pub remote: Vec<Guest>,
    /// Local rows.
    pub local: Vec<Guest>,
    /// Placement per generated record.
    pub placements: Vec<Placement>,
}

impl SnapshotPair {
    /// Number of records with the given placement.
    pub fn count(&self, placement: Placement) -> usize {
        self.placements.iter().filter(|p| **p == placement).count()
    }
}

/// Strategy for generating guest snapshot pairs of up to `max` records.
pub fn snapshot_pair_strategy(max: usize) -> impl Strategy<Value = SnapshotPair> {
    prop::collection::btree_set(name_strategy(), 0..max)
        .prop_flat_map(|names| {
            let n = names.len();
            (
                Just(names.into_iter().collect::<Vec<_>>()),
                prop::collection::vec(placement_strategy(), n),
                prop::collection::vec((prop::sample::select(VENUES), 0u32..6), n),
            )
        })
        .prop_map(|(names, placements, fields)| build_pair(names, placements, fields))
}

fn build_pair(
    names: Vec<String>,
    placements: Vec<Placement>,
    fields: Vec<(&'static str, u32)>,
) -> SnapshotPair {
    let mut remote = Vec::new();
    let mut local = Vec::new();

    for (idx, ((name, placement), (venue, invitations))) in
        names.into_iter().zip(&placements).zip(fields).enumerate()
    {
        let remote_id = RemoteId::from(idx as u64 + 1);
        let local_id = LocalId(idx as u64 + 1);

        let mut base = Guest::new(name, venue, invitations);
        let mut remote_copy = base.clone();
        remote_copy.set_identity(Identity::Remote(remote_id.clone()));

        base.set_local_id(Some(local_id));
        match placement {
            Placement::RemoteOnly => remote.push(remote_copy),
            Placement::LocalOnly => {
                base.set_identity(Identity::Remote(remote_id));
                local.push(base);
            }
            Placement::LocalPending => local.push(base),
            Placement::Same => {
                base.set_identity(Identity::Remote(remote_id));
                remote.push(remote_copy);
                local.push(base);
            }
            Placement::Modified => {
                base.set_identity(Identity::Remote(remote_id));
                remote_copy.invitations += 10;
                remote.push(remote_copy);
                local.push(base);
            }
            Placement::Adopting => {
                remote.push(remote_copy);
                local.push(base);
            }
        }
    }

    SnapshotPair {
        remote,
        local,
        placements,
    }
}

/// Strategy for generating arbitrary sheet rows, malformed ones included.
pub fn raw_row_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop_oneof![
            Just(String::new()),
            "[0-9]{1,3}",
            "[ a-zA-Z]{0,12}",
            any::<String>(),
        ],
        0..10,
    )
}

/// Returns the remote ids present in `items`.
pub fn remote_ids<T: Entity>(items: &[T]) -> Vec<RemoteId> {
    items.iter().filter_map(|i| i.remote_id().cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;
    use std::collections::HashSet;

    #[test]
    fn generated_pairs_have_unique_remote_ids() {
        let mut runner = TestRunner::default();
        for _ in 0..32 {
            let pair = snapshot_pair_strategy(12)
                .new_tree(&mut runner)
                .unwrap()
                .current();
            let ids = remote_ids(&pair.remote);
            let unique: HashSet<_> = ids.iter().collect();
            assert_eq!(ids.len(), unique.len());
        }
    }
}
