//! Differential comparator.
//!
//! Partitions a remote snapshot and a local snapshot of one entity kind into
//! added / modified / deleted / unchanged using the identity rule: remote ids
//! decide when both sides have one, business keys decide otherwise.

use rostersync_model::{ChangeSet, Entity, RemoteId};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Compares a remote snapshot against a local snapshot.
///
/// - `added`: remote items with no local counterpart.
/// - `modified`: remote items whose tracked fields differ from their local
///   counterpart, or whose remote id the local record has not learned yet.
///   They carry the local record's `local_id`.
/// - `deleted`: local items with no remote counterpart.
/// - `unchanged`: the local copy of items equal on both sides.
///
/// Remote rows repeating an identity already seen are dropped.
pub fn compare<T: Entity>(remote: Vec<T>, local: Vec<T>) -> ChangeSet<T> {
    let mut by_remote_id: HashMap<RemoteId, usize> = HashMap::new();
    let mut by_key: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, item) in local.iter().enumerate() {
        if let Some(id) = item.remote_id() {
            by_remote_id.entry(id.clone()).or_insert(idx);
        }
        by_key.entry(item.business_key()).or_default().push(idx);
    }
    let mut slots: Vec<Option<T>> = local.into_iter().map(Some).collect();

    let mut added = Vec::new();
    let mut modified = Vec::new();
    let mut unchanged = Vec::new();
    let mut seen_ids: HashSet<RemoteId> = HashSet::new();
    let mut seen_pending_keys: HashSet<String> = HashSet::new();

    for item in remote {
        let duplicate = match item.remote_id() {
            Some(id) => !seen_ids.insert(id.clone()),
            None => !seen_pending_keys.insert(item.business_key()),
        };
        if duplicate {
            warn!(kind = %T::KIND, key = %item.match_key(), "dropping duplicate remote row");
            continue;
        }

        let matched = match item.remote_id() {
            Some(id) => by_remote_id
                .get(id)
                .copied()
                .filter(|&idx| slots[idx].is_some())
                .or_else(|| find_by_key(&by_key, &slots, &item.business_key(), true)),
            None => find_by_key(&by_key, &slots, &item.business_key(), false),
        };

        let Some(local_item) = matched.and_then(|idx| slots[idx].take()) else {
            added.push(item);
            continue;
        };

        let learns_remote_id = local_item.identity().is_pending() && item.remote_id().is_some();
        if item.same_tracked_fields(&local_item) && !learns_remote_id {
            unchanged.push(local_item);
        } else {
            let mut incoming = item;
            incoming.set_local_id(local_item.local_id());
            if incoming.identity().is_pending() {
                incoming.set_identity(local_item.identity().clone());
            }
            modified.push(incoming);
        }
    }

    let deleted: Vec<T> = slots.into_iter().flatten().collect();

    let changes = ChangeSet::new(added, modified, deleted, unchanged);
    debug!(kind = %T::KIND, summary = %changes.summary(T::KIND), "compared snapshots");
    changes
}

/// Finds an unmatched local record by business key. With `pending_only`,
/// records that already carry a remote id are skipped, since their id
/// differs from the remote row's.
fn find_by_key<T: Entity>(
    by_key: &HashMap<String, Vec<usize>>,
    slots: &[Option<T>],
    key: &str,
    pending_only: bool,
) -> Option<usize> {
    by_key.get(key)?.iter().copied().find(|&idx| {
        slots[idx]
            .as_ref()
            .is_some_and(|item| !pending_only || item.identity().is_pending())
    })
}
