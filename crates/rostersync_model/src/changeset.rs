//! Change sets produced by differential sync.

use crate::kind::EntityKind;
use crate::records::{Guest, Job, JobTypeConfig, Venue, Volunteer};
use std::fmt;

/// Four-way partition of one entity kind after comparing two snapshots.
///
/// The lists are disjoint. A change set is immutable once built; filtering
/// produces a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet<T> {
    added: Vec<T>,
    modified: Vec<T>,
    deleted: Vec<T>,
    unchanged: Vec<T>,
}

impl<T> ChangeSet<T> {
    /// Creates a change set from its four parts.
    pub fn new(added: Vec<T>, modified: Vec<T>, deleted: Vec<T>, unchanged: Vec<T>) -> Self {
        Self {
            added,
            modified,
            deleted,
            unchanged,
        }
    }

    /// Remote items with no local counterpart.
    pub fn added(&self) -> &[T] {
        &self.added
    }

    /// Remote items whose tracked fields differ from the local counterpart.
    pub fn modified(&self) -> &[T] {
        &self.modified
    }

    /// Local items with no remote counterpart.
    pub fn deleted(&self) -> &[T] {
        &self.deleted
    }

    /// Items identical on both sides.
    pub fn unchanged(&self) -> &[T] {
        &self.unchanged
    }

    /// Number of added, modified and deleted items.
    pub fn total_changes(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }

    /// Returns true if anything needs to be applied.
    pub fn has_changes(&self) -> bool {
        self.total_changes() > 0
    }

    /// Splits the set into `(added, modified, deleted, unchanged)`.
    pub fn into_parts(self) -> (Vec<T>, Vec<T>, Vec<T>, Vec<T>) {
        (self.added, self.modified, self.deleted, self.unchanged)
    }

    /// Returns a new set keeping only the added items accepted by `keep`,
    /// along with the rejected ones.
    pub fn filter_added<F>(self, mut keep: F) -> (Self, Vec<T>)
    where
        F: FnMut(&T) -> bool,
    {
        let (kept, dropped): (Vec<T>, Vec<T>) = self.added.into_iter().partition(|t| keep(t));
        (
            Self {
                added: kept,
                modified: self.modified,
                deleted: self.deleted,
                unchanged: self.unchanged,
            },
            dropped,
        )
    }

    /// Moves the deleted items for which `keep` returns true into
    /// `unchanged`. Returns the new set and how many items were moved.
    pub fn keep_deleted<F>(self, mut keep: F) -> (Self, usize)
    where
        F: FnMut(&T) -> bool,
    {
        let (kept, deleted): (Vec<T>, Vec<T>) = self.deleted.into_iter().partition(|t| keep(t));
        let moved = kept.len();
        let mut unchanged = self.unchanged;
        unchanged.extend(kept);
        (
            Self {
                added: self.added,
                modified: self.modified,
                deleted,
                unchanged,
            },
            moved,
        )
    }

    /// Counts per list.
    pub fn summary(&self, kind: EntityKind) -> KindSummary {
        KindSummary {
            kind,
            added: self.added.len(),
            modified: self.modified.len(),
            deleted: self.deleted.len(),
            unchanged: self.unchanged.len(),
            suppressed: 0,
        }
    }
}

impl<T> Default for ChangeSet<T> {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new(), Vec::new())
    }
}

/// Counts for one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindSummary {
    /// Entity kind.
    pub kind: EntityKind,
    /// Added count.
    pub added: usize,
    /// Modified count.
    pub modified: usize,
    /// Deleted count.
    pub deleted: usize,
    /// Unchanged count.
    pub unchanged: usize,
    /// Remote rows held back because they were deleted locally.
    pub suppressed: usize,
}

impl fmt::Display for KindSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: +{} ~{} -{} ={}",
            self.kind, self.added, self.modified, self.deleted, self.unchanged
        )?;
        if self.suppressed > 0 {
            write!(f, " ({} suppressed)", self.suppressed)?;
        }
        Ok(())
    }
}

/// Outcome of one differential sync: a change set per entity kind.
///
/// Handed to the caller for targeted view updates and then dropped.
#[derive(Debug, Clone, Default)]
pub struct SyncResult {
    /// Guest changes.
    pub guests: ChangeSet<Guest>,
    /// Volunteer changes.
    pub volunteers: ChangeSet<Volunteer>,
    /// Job changes.
    pub jobs: ChangeSet<Job>,
    /// Job type changes.
    pub job_types: ChangeSet<JobTypeConfig>,
    /// Venue changes.
    pub venues: ChangeSet<Venue>,
    /// Ledger-suppressed remote rows per kind, in `EntityKind::ALL` order.
    pub suppressed: [usize; 5],
    /// Unix milliseconds when the sync finished.
    pub sync_time: u64,
}

impl SyncResult {
    /// Returns true if any kind has changes.
    pub fn has_any_changes(&self) -> bool {
        self.total_changes() > 0
    }

    /// Total changes over all kinds.
    pub fn total_changes(&self) -> usize {
        self.kind_summaries().iter().map(|s| s.added + s.modified + s.deleted).sum()
    }

    /// Per-kind counts, in `EntityKind::ALL` order.
    pub fn kind_summaries(&self) -> Vec<KindSummary> {
        let mut summaries = vec![
            self.guests.summary(EntityKind::Guest),
            self.volunteers.summary(EntityKind::Volunteer),
            self.jobs.summary(EntityKind::Job),
            self.job_types.summary(EntityKind::JobTypeConfig),
            self.venues.summary(EntityKind::Venue),
        ];
        for (summary, suppressed) in summaries.iter_mut().zip(self.suppressed) {
            summary.suppressed = suppressed;
        }
        summaries
    }

    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        let lines: Vec<String> = self
            .kind_summaries()
            .iter()
            .filter(|s| s.added + s.modified + s.deleted + s.suppressed > 0)
            .map(ToString::to_string)
            .collect();
        if lines.is_empty() {
            return "no changes".to_string();
        }
        lines.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts() {
        let set = ChangeSet::new(vec![1, 2], vec![3], vec![], vec![4, 5, 6]);
        assert_eq!(set.total_changes(), 3);
        assert!(set.has_changes());
        assert!(!ChangeSet::<i32>::default().has_changes());
    }

    #[test]
    fn filter_added_keeps_other_lists() {
        let set = ChangeSet::new(vec![1, 2, 3], vec![4], vec![5], vec![6]);
        let (kept, dropped) = set.filter_added(|n| n % 2 == 1);

        assert_eq!(kept.added(), &[1, 3]);
        assert_eq!(dropped, vec![2]);
        assert_eq!(kept.modified(), &[4]);
        assert_eq!(kept.deleted(), &[5]);
        assert_eq!(kept.unchanged(), &[6]);
    }

    #[test]
    fn keep_deleted_moves_to_unchanged() {
        let set = ChangeSet::new(vec![1], vec![], vec![2, 3, 4], vec![5]);
        let (set, moved) = set.keep_deleted(|n| n % 2 == 0);

        assert_eq!(moved, 2);
        assert_eq!(set.deleted(), &[3]);
        assert_eq!(set.unchanged(), &[5, 2, 4]);
        assert_eq!(set.total_changes(), 2);
    }

    #[test]
    fn sync_result_summary() {
        let mut result = SyncResult::default();
        assert!(!result.has_any_changes());
        assert_eq!(result.summary(), "no changes");

        result.guests = ChangeSet::new(vec![Guest::new("Alice", "Hall", 1)], vec![], vec![], vec![]);
        result.suppressed[0] = 2;

        assert!(result.has_any_changes());
        assert_eq!(result.total_changes(), 1);
        assert_eq!(result.summary(), "guest: +1 ~0 -0 =0 (2 suppressed)");

        // Suppressed rows alone are reported, though they are not changes.
        let mut guarded = SyncResult::default();
        guarded.suppressed[4] = 1;
        assert!(!guarded.has_any_changes());
        assert_eq!(guarded.summary(), "venue: +0 ~0 -0 =0 (1 suppressed)");
    }
}
