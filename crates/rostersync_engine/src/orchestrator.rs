//! Sync orchestrator.
//!
//! Owns the global remote lock and runs the sync modes over a [`StoreSet`]:
//! full sync, backup, differential sync, page-scoped sync, single-item
//! upsert and delete, and the compound startup sync.

use crate::applier::apply_changes;
use crate::config::{ReplacePolicy, SyncConfig};
use crate::diff::compare;
use crate::error::{EngineResult, SyncError};
use crate::ledger::DeletionLedger;
use crate::retry::RetryPolicy;
use crate::store::{KindStores, StoreSet, StoresFor};
use crate::strategy::{choose_strategy, SyncStrategy};
use parking_lot::RwLock;
use rostersync_model::{
    kinds_for_navigation, now_millis, ChangeSet, Entity, EntityKind, Guest, Identity, Job,
    JobTypeConfig, LocalId, Page, RemoteId, SyncResult, Venue, Volunteer,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Caller-facing outcome of a sync mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The operation ran.
    Completed {
        /// Human-readable summary.
        message: String,
        /// Rows written (or changes applied) per kind.
        counts: BTreeMap<EntityKind, usize>,
    },
    /// Nothing was done, with the reason.
    NoOp(String),
    /// Another sync held the lock.
    Skipped,
}

impl SyncOutcome {
    fn completed(message: impl Into<String>, counts: BTreeMap<EntityKind, usize>) -> Self {
        SyncOutcome::Completed {
            message: message.into(),
            counts,
        }
    }

    /// Returns true if the operation ran.
    pub fn is_completed(&self) -> bool {
        matches!(self, SyncOutcome::Completed { .. })
    }

    /// Human-readable description.
    pub fn message(&self) -> &str {
        match self {
            SyncOutcome::Completed { message, .. } => message,
            SyncOutcome::NoOp(reason) => reason,
            SyncOutcome::Skipped => "skipped: another sync is running",
        }
    }
}

/// Outcome of [`SyncOrchestrator::upsert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new remote row was appended and its id stored locally.
    Appended {
        /// Local id.
        local_id: LocalId,
        /// Assigned remote id.
        remote_id: RemoteId,
    },
    /// The existing remote row was rewritten.
    Updated {
        /// Local id.
        local_id: LocalId,
    },
    /// The single-row write failed and a backup of the kind replaced it.
    Recovered {
        /// Local id.
        local_id: LocalId,
        /// Error of the failed row write.
        reason: String,
    },
    /// Saved locally; no remote target is configured.
    LocalOnly {
        /// Local id.
        local_id: LocalId,
    },
}

impl UpsertOutcome {
    /// Returns the local id of the saved record.
    pub fn local_id(&self) -> LocalId {
        match self {
            UpsertOutcome::Appended { local_id, .. }
            | UpsertOutcome::Updated { local_id }
            | UpsertOutcome::Recovered { local_id, .. }
            | UpsertOutcome::LocalOnly { local_id } => *local_id,
        }
    }
}

/// Outcome of [`SyncOrchestrator::delete_item`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The remote row was deleted.
    Removed,
    /// The row delete failed and a backup of the kind replaced the sheet.
    Recovered {
        /// Error of the failed row delete.
        reason: String,
    },
    /// Deleted locally only (never uploaded, or no remote configured).
    LocalOnly,
}

/// Counters over the orchestrator's lifetime.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Full syncs completed.
    pub full_syncs: u64,
    /// Backups completed.
    pub backups: u64,
    /// Differential syncs completed.
    pub differential_syncs: u64,
    /// Page syncs completed.
    pub page_syncs: u64,
    /// Single-item upserts.
    pub upserts: u64,
    /// Single-item deletes.
    pub deletes: u64,
    /// Row writes that fell back to a backup.
    pub fallbacks: u64,
    /// Timer runs skipped because the lock was held.
    pub skipped: u64,
    /// Unix milliseconds of the last completed sync.
    pub last_sync_time: Option<u64>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Remote rows of the kinds selected for one operation.
#[derive(Debug, Default)]
struct RemoteSnapshot {
    guests: Option<Vec<Guest>>,
    volunteers: Option<Vec<Volunteer>>,
    jobs: Option<Vec<Job>>,
    job_types: Option<Vec<JobTypeConfig>>,
    venues: Option<Vec<Venue>>,
}

impl RemoteSnapshot {
    fn rows(&self) -> usize {
        self.guests.as_ref().map_or(0, Vec::len)
            + self.volunteers.as_ref().map_or(0, Vec::len)
            + self.jobs.as_ref().map_or(0, Vec::len)
            + self.job_types.as_ref().map_or(0, Vec::len)
            + self.venues.as_ref().map_or(0, Vec::len)
    }
}

/// Coordinates every sync mode between the local store and the remote sheet.
///
/// All remote-touching work is serialized by one async lock held for the
/// whole operation, retries included.
pub struct SyncOrchestrator {
    config: SyncConfig,
    stores: StoreSet,
    retry: RetryPolicy,
    ledger: Arc<DeletionLedger>,
    remote_lock: Mutex<()>,
    stats: RwLock<SyncStats>,
}

impl SyncOrchestrator {
    /// Creates an orchestrator. The retry policy comes from `config.retry`.
    pub fn new(config: SyncConfig, stores: StoreSet, ledger: Arc<DeletionLedger>) -> Self {
        let retry = RetryPolicy::new(config.retry.clone());
        Self {
            config,
            stores,
            retry,
            ledger,
            remote_lock: Mutex::new(()),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the deletion ledger.
    pub fn ledger(&self) -> &Arc<DeletionLedger> {
        &self.ledger
    }

    /// Returns the retry policy.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Returns the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Prunes expired deletion records. Returns how many were removed.
    pub fn startup(&self) -> usize {
        let removed = self.ledger.prune(self.config.ledger_retention);
        info!(removed, entries = self.ledger.len(), "orchestrator started");
        removed
    }

    fn ensure_configured(&self) -> EngineResult<()> {
        if self.config.is_configured() {
            Ok(())
        } else {
            Err(SyncError::NotConfigured("spreadsheet id is not set".into()))
        }
    }

    fn kind<T: Entity>(&self) -> &KindStores<T>
    where
        StoreSet: StoresFor<T>,
    {
        StoresFor::<T>::stores(&self.stores)
    }

    fn record<R>(
        &self,
        result: EngineResult<R>,
        update: impl FnOnce(&mut SyncStats),
    ) -> EngineResult<R> {
        let mut stats = self.stats.write();
        match &result {
            Ok(_) => {
                update(&mut *stats);
                stats.last_sync_time = Some(now_millis());
            }
            Err(e) => stats.last_error = Some(e.to_string()),
        }
        result
    }

    // ------------------------------------------------------------------
    // Full sync (download and replace)
    // ------------------------------------------------------------------

    /// Replaces every local table with the remote snapshot.
    ///
    /// If the remote is empty for every kind the local data is left alone
    /// and a no-op outcome is returned.
    pub async fn full_sync(&self) -> EngineResult<SyncOutcome> {
        self.ensure_configured()?;
        let _guard = self.remote_lock.lock().await;
        info!("full sync started");

        let result = self.download_and_replace(&EntityKind::ALL).await;
        self.record(result, |s| s.full_syncs += 1)
    }

    /// Download-and-replace limited to the kinds shown on `from` and `to`.
    pub async fn page_sync(&self, from: Page, to: Page) -> EngineResult<SyncOutcome> {
        self.ensure_configured()?;
        let kinds = kinds_for_navigation(from, to);
        if kinds.is_empty() {
            return Ok(SyncOutcome::NoOp(format!("no data shown on {from} or {to}")));
        }

        let _guard = self.remote_lock.lock().await;
        info!(%from, %to, ?kinds, "page sync started");

        let result = self.download_and_replace(&kinds).await;
        self.record(result, |s| s.page_syncs += 1)
    }

    async fn download_and_replace(&self, kinds: &[EntityKind]) -> EngineResult<SyncOutcome> {
        let snapshot = self.fetch_snapshot(kinds).await?;
        if snapshot.rows() == 0 {
            warn!(?kinds, "remote returned no rows, keeping local data");
            return Ok(SyncOutcome::NoOp(
                "remote sheet is empty, local data was kept".into(),
            ));
        }
        self.replace_from(snapshot)
    }

    async fn fetch_snapshot(&self, kinds: &[EntityKind]) -> EngineResult<RemoteSnapshot> {
        Ok(RemoteSnapshot {
            guests: self.fetch_if_selected::<Guest>(kinds).await?,
            volunteers: self.fetch_if_selected::<Volunteer>(kinds).await?,
            jobs: self.fetch_if_selected::<Job>(kinds).await?,
            job_types: self.fetch_if_selected::<JobTypeConfig>(kinds).await?,
            venues: self.fetch_if_selected::<Venue>(kinds).await?,
        })
    }

    async fn fetch_if_selected<T: Entity>(
        &self,
        kinds: &[EntityKind],
    ) -> EngineResult<Option<Vec<T>>>
    where
        StoreSet: StoresFor<T>,
    {
        if !kinds.contains(&T::KIND) {
            return Ok(None);
        }
        self.fetch_kind::<T>().await.map(Some)
    }

    async fn fetch_kind<T: Entity>(&self) -> EngineResult<Vec<T>>
    where
        StoreSet: StoresFor<T>,
    {
        let remote = &self.kind::<T>().remote;
        self.retry.execute(T::SHEET, || remote.fetch_all()).await
    }

    fn replace_from(&self, snapshot: RemoteSnapshot) -> EngineResult<SyncOutcome> {
        let mut counts = BTreeMap::new();
        if let Some(rows) = snapshot.guests {
            counts.insert(EntityKind::Guest, self.replace_local(rows)?);
        }
        if let Some(rows) = snapshot.volunteers {
            counts.insert(EntityKind::Volunteer, self.replace_local(rows)?);
        }
        if let Some(rows) = snapshot.jobs {
            counts.insert(EntityKind::Job, self.replace_local(rows)?);
        }
        if let Some(rows) = snapshot.job_types {
            counts.insert(EntityKind::JobTypeConfig, self.replace_local(rows)?);
        }
        if let Some(rows) = snapshot.venues {
            counts.insert(EntityKind::Venue, self.replace_local(rows)?);
        }

        let total: usize = counts.values().sum();
        info!(total, "replaced local data from remote");
        Ok(SyncOutcome::completed(
            format!("downloaded {total} records"),
            counts,
        ))
    }

    /// Clears one local table and inserts the remote rows the ledger does
    /// not suppress. Returns the number of rows inserted.
    fn replace_local<T: Entity>(&self, remote: Vec<T>) -> EngineResult<usize>
    where
        StoreSet: StoresFor<T>,
    {
        let local = &self.kind::<T>().local;
        let (rows, suppressed): (Vec<T>, Vec<T>) = remote
            .into_iter()
            .partition(|item| !self.ledger.suppresses(item));
        if !suppressed.is_empty() {
            info!(kind = %T::KIND, suppressed = suppressed.len(), "skipping locally deleted rows");
        }

        let preserved: Vec<T> = match self.config.replace_policy(T::KIND) {
            ReplacePolicy::Replace => Vec::new(),
            ReplacePolicy::PreserveLocalOnly => local
                .get_all()?
                .into_iter()
                .filter(|item| item.identity().is_pending())
                .filter(|item| !rows.iter().any(|r| r.is_same_record(item)))
                .collect(),
        };

        local.clear_all()?;

        let mut inserted = 0;
        for item in rows.iter().chain(preserved.iter()) {
            match local.insert(item) {
                Ok(_) => inserted += 1,
                Err(e) => warn!(kind = %T::KIND, key = %item.match_key(), error = %e, "insert failed"),
            }
        }
        debug!(kind = %T::KIND, inserted, preserved = preserved.len(), "replaced local table");
        Ok(inserted)
    }

    // ------------------------------------------------------------------
    // Backup (upload and replace)
    // ------------------------------------------------------------------

    /// Overwrites every remote sheet with the local tables.
    pub async fn backup(&self) -> EngineResult<SyncOutcome> {
        self.ensure_configured()?;
        let _guard = self.remote_lock.lock().await;
        info!("backup started");

        let result = self.upload_all().await;
        self.record(result, |s| s.backups += 1)
    }

    async fn upload_all(&self) -> EngineResult<SyncOutcome> {
        let mut counts = BTreeMap::new();
        counts.insert(EntityKind::Guest, self.upload_kind::<Guest>().await?);
        counts.insert(EntityKind::Volunteer, self.upload_kind::<Volunteer>().await?);
        counts.insert(EntityKind::Job, self.upload_kind::<Job>().await?);
        counts.insert(EntityKind::JobTypeConfig, self.upload_kind::<JobTypeConfig>().await?);
        counts.insert(EntityKind::Venue, self.upload_kind::<Venue>().await?);

        let total: usize = counts.values().sum();
        info!(total, "uploaded local data");
        Ok(SyncOutcome::completed(format!("uploaded {total} records"), counts))
    }

    /// Uploads one local table over its sheet. Records that were never
    /// uploaded get the next free remote ids first, stored locally.
    async fn upload_kind<T: Entity>(&self) -> EngineResult<usize>
    where
        StoreSet: StoresFor<T>,
    {
        let stores = self.kind::<T>();
        let mut items = stores.local.get_all()?;

        let mut next = items
            .iter()
            .filter_map(|item| item.remote_id().and_then(RemoteId::as_number))
            .max()
            .unwrap_or(0);
        for item in items.iter_mut().filter(|item| item.identity().is_pending()) {
            next += 1;
            item.set_identity(Identity::Remote(RemoteId::from(next)));
            if let Err(e) = stores.local.update(item) {
                warn!(kind = %T::KIND, error = %e, "failed to store assigned remote id");
            }
        }

        let remote = &stores.remote;
        let rows = &items;
        self.retry
            .execute(T::SHEET, || remote.overwrite_all(rows))
            .await?;
        debug!(kind = %T::KIND, rows = items.len(), "uploaded table");
        Ok(items.len())
    }

    // ------------------------------------------------------------------
    // Differential sync
    // ------------------------------------------------------------------

    /// Merges remote changes into the local tables without replacing them.
    pub async fn differential_sync(&self) -> EngineResult<SyncResult> {
        self.ensure_configured()?;
        let _guard = self.remote_lock.lock().await;
        info!("differential sync started");

        let result = self.merge_all().await;
        self.record(result, |s| s.differential_syncs += 1)
    }

    /// Like [`differential_sync`](Self::differential_sync), but returns
    /// [`SyncOutcome::Skipped`] instead of waiting when another sync holds
    /// the lock.
    pub async fn try_differential_sync(&self) -> EngineResult<SyncOutcome> {
        self.ensure_configured()?;
        let Ok(_guard) = self.remote_lock.try_lock() else {
            debug!("sync in progress, skipping differential sync");
            self.stats.write().skipped += 1;
            return Ok(SyncOutcome::Skipped);
        };

        let result = self.merge_all().await.map(|r| merge_outcome(&r));
        self.record(result, |s| s.differential_syncs += 1)
    }

    async fn merge_all(&self) -> EngineResult<SyncResult> {
        let snapshot = self.fetch_snapshot(&EntityKind::ALL).await?;
        self.merge_from(snapshot)
    }

    fn merge_from(&self, snapshot: RemoteSnapshot) -> EngineResult<SyncResult> {
        let mut result = SyncResult::default();
        let (guests, s0) = self.merge_kind(snapshot.guests.unwrap_or_default())?;
        let (volunteers, s1) = self.merge_kind(snapshot.volunteers.unwrap_or_default())?;
        let (jobs, s2) = self.merge_kind(snapshot.jobs.unwrap_or_default())?;
        let (job_types, s3) = self.merge_kind(snapshot.job_types.unwrap_or_default())?;
        let (venues, s4) = self.merge_kind(snapshot.venues.unwrap_or_default())?;

        result.guests = guests;
        result.volunteers = volunteers;
        result.jobs = jobs;
        result.job_types = job_types;
        result.venues = venues;
        result.suppressed = [s0, s1, s2, s3, s4];
        result.sync_time = now_millis();

        info!(summary = %result.summary(), "differential sync finished");
        Ok(result)
    }

    /// Compares, drops ledger-suppressed additions and applies one kind.
    ///
    /// Local records that were never uploaded are kept even though the
    /// remote lacks them; they may be waiting on an upsert.
    fn merge_kind<T: Entity>(&self, remote: Vec<T>) -> EngineResult<(ChangeSet<T>, usize)>
    where
        StoreSet: StoresFor<T>,
    {
        let local = &self.kind::<T>().local;
        let changes = compare(remote, local.get_all()?);
        let (changes, suppressed) = changes.filter_added(|item| !self.ledger.suppresses(item));
        if !suppressed.is_empty() {
            info!(kind = %T::KIND, suppressed = suppressed.len(), "skipping locally deleted rows");
        }
        let (changes, pending) = changes.keep_deleted(|item| item.identity().is_pending());
        if pending > 0 {
            debug!(kind = %T::KIND, pending, "keeping local records not uploaded yet");
        }

        let report = apply_changes(&changes, local.as_ref());
        if report.failed > 0 {
            warn!(kind = %T::KIND, failed = report.failed, "some local writes failed");
        }
        Ok((changes, suppressed.len()))
    }

    // ------------------------------------------------------------------
    // Compound startup sync
    // ------------------------------------------------------------------

    /// Picks backup, full sync or differential sync from which side has
    /// data, then runs it.
    pub async fn compound_sync(&self) -> EngineResult<SyncOutcome> {
        self.ensure_configured()?;
        let _guard = self.remote_lock.lock().await;

        let result = self.compound_locked().await;
        self.record(result, |_| {})
    }

    async fn compound_locked(&self) -> EngineResult<SyncOutcome> {
        let local_rows = self.local_rows()?;
        let snapshot = self.fetch_snapshot(&EntityKind::ALL).await?;
        let remote_rows = snapshot.rows();

        let strategy = choose_strategy(local_rows, remote_rows);
        info!(%strategy, local_rows, remote_rows, "compound sync started");

        match strategy {
            SyncStrategy::Nothing => Ok(SyncOutcome::NoOp(
                "local and remote are both empty".into(),
            )),
            SyncStrategy::LocalWins => {
                let outcome = self.upload_all().await?;
                self.stats.write().backups += 1;
                Ok(outcome)
            }
            SyncStrategy::RemoteWins => {
                let outcome = self.replace_from(snapshot)?;
                self.stats.write().full_syncs += 1;
                Ok(outcome)
            }
            SyncStrategy::Merge => {
                let result = self.merge_from(snapshot)?;
                self.stats.write().differential_syncs += 1;
                Ok(merge_outcome(&result))
            }
        }
    }

    fn local_rows(&self) -> EngineResult<usize> {
        Ok(self.stores.guests.local.get_all()?.len()
            + self.stores.volunteers.local.get_all()?.len()
            + self.stores.jobs.local.get_all()?.len()
            + self.stores.job_types.local.get_all()?.len()
            + self.stores.venues.local.get_all()?.len())
    }

    // ------------------------------------------------------------------
    // Single-item operations
    // ------------------------------------------------------------------

    /// Saves one record locally, then writes it to its remote row.
    ///
    /// The local write happens before the lock is taken, and releases any
    /// ledger entry the record supersedes. A record without a remote id is
    /// appended and learns the assigned id; otherwise its row is rewritten.
    /// If the row write fails the whole kind is backed up instead. If the
    /// assigned id cannot be stored locally the error is returned; the next
    /// merge adopts the appended row by business key.
    pub async fn upsert<T: Entity>(&self, mut item: T) -> EngineResult<UpsertOutcome>
    where
        StoreSet: StoresFor<T>,
    {
        let stores = self.kind::<T>();
        item.touch();
        let local_id = match item.local_id() {
            Some(id) => {
                stores.local.update(&item)?;
                id
            }
            None => {
                let id = stores.local.insert(&item)?;
                item.set_local_id(Some(id));
                id
            }
        };
        self.stats.write().upserts += 1;
        self.release_deletions(&item);

        if !self.config.is_configured() {
            debug!(kind = %T::KIND, %local_id, "no remote configured, saved locally");
            return Ok(UpsertOutcome::LocalOnly { local_id });
        }

        let _guard = self.remote_lock.lock().await;
        let remote = &stores.remote;
        let written = match item.remote_id().cloned() {
            None => self
                .retry
                .execute(T::SHEET, || remote.append_one(&item))
                .await
                .map(Some),
            Some(remote_id) => self
                .retry
                .execute(T::SHEET, || remote.update_one(&item))
                .await
                .map(|()| {
                    debug!(kind = %T::KIND, %remote_id, "updated remote row");
                    None
                }),
        };

        match written {
            Ok(Some(remote_id)) => {
                item.set_identity(Identity::Remote(remote_id.clone()));
                self.release_deletions(&item);
                if let Err(e) = stores.local.update(&item) {
                    warn!(kind = %T::KIND, %remote_id, error = %e, "appended row but failed to store its remote id");
                    return Err(e);
                }
                Ok(UpsertOutcome::Appended {
                    local_id,
                    remote_id,
                })
            }
            Ok(None) => Ok(UpsertOutcome::Updated { local_id }),
            Err(e) => {
                let reason = self.recover_kind::<T>(e).await?;
                Ok(UpsertOutcome::Recovered { local_id, reason })
            }
        }
    }

    /// Deletes one record locally and from the remote sheet.
    ///
    /// The deletion is recorded in the ledger before anything else, so a
    /// later sync does not bring the record back even if the remote delete
    /// fails. Once the row is confirmed gone the entry is released.
    pub async fn delete_item<T: Entity>(&self, item: &T) -> EngineResult<DeleteOutcome>
    where
        StoreSet: StoresFor<T>,
    {
        let stores = self.kind::<T>();
        if item.local_id().is_none() {
            return Err(SyncError::local(format!("{} has no local id", T::KIND)));
        }

        if let Err(e) = self.ledger.record_entity(item) {
            warn!(kind = %T::KIND, error = %e, "failed to persist deletion record");
        }
        stores.local.delete(item)?;
        self.stats.write().deletes += 1;

        let Some(remote_id) = item.remote_id() else {
            return Ok(DeleteOutcome::LocalOnly);
        };
        if !self.config.is_configured() {
            return Ok(DeleteOutcome::LocalOnly);
        }

        let _guard = self.remote_lock.lock().await;
        let remote = &stores.remote;
        match self
            .retry
            .execute(T::SHEET, || remote.delete_one(remote_id))
            .await
        {
            Ok(()) => {
                debug!(kind = %T::KIND, %remote_id, "deleted remote row");
                self.release_confirmed::<T>(remote_id);
                Ok(DeleteOutcome::Removed)
            }
            Err(e) => {
                // The backup rewrites the sheet without the deleted record.
                let reason = self.recover_kind::<T>(e).await?;
                self.release_confirmed::<T>(remote_id);
                Ok(DeleteOutcome::Recovered { reason })
            }
        }
    }

    fn release_deletions<T: Entity>(&self, item: &T) {
        if let Err(e) = self.ledger.release_matching(item) {
            warn!(kind = %T::KIND, error = %e, "failed to persist deletion ledger");
        }
    }

    fn release_confirmed<T: Entity>(&self, remote_id: &RemoteId) {
        if let Err(e) = self.ledger.release_remote(T::KIND, remote_id) {
            warn!(kind = %T::KIND, error = %e, "failed to persist deletion ledger");
        }
    }

    /// Falls back to a backup of one kind after a failed row write.
    /// Must be called with the remote lock held.
    async fn recover_kind<T: Entity>(&self, error: SyncError) -> EngineResult<String>
    where
        StoreSet: StoresFor<T>,
    {
        warn!(kind = %T::KIND, error = %error, "row write failed, backing up the whole sheet");
        self.stats.write().fallbacks += 1;
        match self.upload_kind::<T>().await {
            Ok(_) => Ok(error.to_string()),
            Err(e) => {
                self.stats.write().last_error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

fn merge_outcome(result: &SyncResult) -> SyncOutcome {
    let counts = result
        .kind_summaries()
        .into_iter()
        .map(|s| (s.kind, s.added + s.modified + s.deleted))
        .collect();
    SyncOutcome::completed(result.summary(), counts)
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("config", &self.config)
            .field("ledger", &self.ledger)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::memory::{MemoryStores, SheetFault, SheetOp};
    use crate::store::LocalStore;
    use rostersync_model::SheetRow;
    use std::time::Duration;

    fn orchestrator(stores: &MemoryStores) -> SyncOrchestrator {
        let config = SyncConfig::new("sheet-1")
            .with_retry(RetryConfig::new(3).with_initial_delay(Duration::from_millis(1)));
        SyncOrchestrator::new(config, stores.store_set(), Arc::new(DeletionLedger::in_memory()))
    }

    #[tokio::test]
    async fn not_configured_short_circuits() {
        let stores = MemoryStores::new();
        let sync = SyncOrchestrator::new(
            SyncConfig::default(),
            stores.store_set(),
            Arc::new(DeletionLedger::in_memory()),
        );

        assert!(matches!(sync.full_sync().await, Err(SyncError::NotConfigured(_))));
        assert!(matches!(sync.backup().await, Err(SyncError::NotConfigured(_))));
        assert!(matches!(
            sync.differential_sync().await,
            Err(SyncError::NotConfigured(_))
        ));
        assert!(stores.sheet.calls().is_empty());

        let outcome = sync.upsert(Venue::new("Hall", "", 10)).await.unwrap();
        assert!(matches!(outcome, UpsertOutcome::LocalOnly { .. }));
        assert_eq!(stores.venues.len(), 1);
    }

    #[tokio::test]
    async fn upsert_appends_then_updates() {
        let stores = MemoryStores::new();
        let sync = orchestrator(&stores);

        let outcome = sync.upsert(Venue::new("Hall", "1 Road", 10)).await.unwrap();
        let UpsertOutcome::Appended { local_id, remote_id } = outcome else {
            panic!("expected append, got {outcome:?}");
        };
        assert_eq!(remote_id, RemoteId::from(1));

        let mut hall = stores.venues.snapshot().remove(0);
        assert_eq!(hall.local_id(), Some(local_id));
        assert_eq!(hall.remote_id(), Some(&remote_id));

        hall.capacity = 80;
        let outcome = sync.upsert(hall).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated { local_id });
        assert_eq!(stores.sheet.rows("Venues")[1][3], "80");
    }

    #[tokio::test]
    async fn failed_row_write_falls_back_to_backup() {
        let stores = MemoryStores::new();
        let sync = orchestrator(&stores);
        stores
            .sheet
            .fail_next_on(SheetOp::Append, SheetFault::Remote("internal error".into()));

        let outcome = sync.upsert(Venue::new("Hall", "", 10)).await.unwrap();
        assert!(matches!(outcome, UpsertOutcome::Recovered { .. }));
        assert_eq!(stores.sheet.count(SheetOp::Clear), 1);
        assert_eq!(stores.sheet.rows("Venues").len(), 2);
        // The backup assigned and stored the remote id.
        assert_eq!(
            stores.venues.snapshot()[0].remote_id(),
            Some(&RemoteId::from(1))
        );
        assert_eq!(sync.stats().fallbacks, 1);
    }

    #[tokio::test]
    async fn delete_records_ledger_before_remote_call() {
        let stores = MemoryStores::new();
        let sync = orchestrator(&stores);
        sync.upsert(Venue::new("Hall", "", 10)).await.unwrap();
        let hall = stores.venues.snapshot().remove(0);

        stores.sheet.fail_always(Some(SheetFault::Network));
        let result = sync.delete_item(&hall).await;
        stores.sheet.fail_always(None);

        // Remote delete and fallback both failed, but the ledger and the
        // local deletion stand.
        assert!(matches!(result, Err(SyncError::Network(_))));
        assert!(stores.venues.is_empty());
        assert!(sync.ledger().suppresses(&hall));

        let merged = sync.differential_sync().await.unwrap();
        assert!(merged.venues.added().is_empty());
        assert_eq!(merged.suppressed[4], 1);
        assert!(stores.venues.is_empty());
    }

    #[tokio::test]
    async fn reused_remote_id_is_not_suppressed() {
        let stores = MemoryStores::new();
        let sync = orchestrator(&stores);

        sync.upsert(Venue::new("Hall", "", 10)).await.unwrap();
        let hall = stores.venues.snapshot().remove(0);
        assert_eq!(sync.delete_item(&hall).await.unwrap(), DeleteOutcome::Removed);
        assert!(sync.ledger().is_empty());

        // The freed top id is handed out again.
        let outcome = sync.upsert(Venue::new("Barn", "", 99)).await.unwrap();
        assert!(matches!(
            outcome,
            UpsertOutcome::Appended { ref remote_id, .. } if *remote_id == RemoteId::from(1)
        ));

        sync.full_sync().await.unwrap();
        let names: Vec<_> = stores.venues.snapshot().into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["Barn".to_string()]);
    }

    #[tokio::test]
    async fn appended_id_write_back_failure_is_an_error() {
        let stores = MemoryStores::new();
        let sync = Arc::new(orchestrator(&stores));

        let guard = sync.remote_lock.lock().await;
        let task = tokio::spawn({
            let sync = Arc::clone(&sync);
            async move { sync.upsert(Venue::new("Hall", "", 10)).await }
        });
        while stores.venues.is_empty() {
            tokio::task::yield_now().await;
        }
        stores.venues.set_read_only(true);
        drop(guard);

        let result = task.await.unwrap();
        assert!(matches!(result, Err(SyncError::LocalPersistence(_))));
        stores.venues.set_read_only(false);

        // The row was appended; the next merge adopts its id.
        assert_eq!(stores.sheet.rows("Venues").len(), 2);
        let merged = sync.differential_sync().await.unwrap();
        assert_eq!(merged.venues.modified().len(), 1);
        assert_eq!(
            stores.venues.snapshot()[0].remote_id(),
            Some(&RemoteId::from(1))
        );
    }

    #[tokio::test]
    async fn try_sync_skips_while_locked() {
        let stores = MemoryStores::new();
        let sync = orchestrator(&stores);

        let guard = sync.remote_lock.lock().await;
        assert_eq!(sync.try_differential_sync().await.unwrap(), SyncOutcome::Skipped);
        drop(guard);

        assert!(sync.try_differential_sync().await.unwrap().is_completed());
        assert_eq!(sync.stats().skipped, 1);
    }

    #[tokio::test]
    async fn full_sync_preserves_pending_volunteers() {
        let stores = MemoryStores::new();
        let sync = orchestrator(&stores);

        stores
            .volunteers
            .insert(&Volunteer::new("Local Only", "l@x.org", "1"))
            .unwrap();
        let mut remote = Volunteer::new("Remote", "r@x.org", "2");
        remote.set_identity(Identity::Remote(RemoteId::from(1)));
        stores
            .sheet
            .set_rows("Volunteers", vec![header::<Volunteer>(), remote.to_row()]);

        sync.full_sync().await.unwrap();
        let names: Vec<_> = stores
            .volunteers
            .snapshot()
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, vec!["Remote".to_string(), "Local Only".to_string()]);
    }

    fn header<T: Entity>() -> Vec<String> {
        T::HEADER.iter().map(|h| h.to_string()).collect()
    }

    #[tokio::test]
    async fn startup_prunes_ledger() {
        let stores = MemoryStores::new();
        let sync = orchestrator(&stores);
        sync.ledger()
            .record_at(EntityKind::Job, LocalId(1), None, None, 0)
            .unwrap();
        assert_eq!(sync.startup(), 1);
        assert!(sync.ledger().is_empty());
    }
}
