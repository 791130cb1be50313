//! Store abstractions consumed by the engine.
//!
//! The engine never owns records. It reads snapshots from a [`LocalStore`]
//! and a [`RemoteStore`] per entity kind and writes changes back through
//! them.

use crate::error::EngineResult;
use async_trait::async_trait;
use rostersync_model::{Entity, Guest, Job, JobTypeConfig, LocalId, RemoteId, Venue, Volunteer};
use std::sync::Arc;

/// The on-device store for one entity kind.
///
/// Implementations provide their own concurrency control.
pub trait LocalStore<T: Entity>: Send + Sync {
    /// Returns every record.
    fn get_all(&self) -> EngineResult<Vec<T>>;

    /// Inserts a record and returns its assigned local id.
    fn insert(&self, item: &T) -> EngineResult<LocalId>;

    /// Replaces the record with the same local id.
    fn update(&self, item: &T) -> EngineResult<()>;

    /// Deletes the record with the same local id.
    fn delete(&self, item: &T) -> EngineResult<()>;

    /// Deletes every record.
    fn clear_all(&self) -> EngineResult<()>;
}

/// The remote sheet for one entity kind.
#[async_trait]
pub trait RemoteStore<T: Entity>: Send + Sync {
    /// Reads every row. Malformed rows are skipped by the implementation.
    async fn fetch_all(&self) -> EngineResult<Vec<T>>;

    /// Clears the sheet range, then writes the header and `items`.
    async fn overwrite_all(&self, items: &[T]) -> EngineResult<()>;

    /// Appends one record and returns the remote id it was given.
    async fn append_one(&self, item: &T) -> EngineResult<RemoteId>;

    /// Rewrites the row holding `item`'s remote id.
    async fn update_one(&self, item: &T) -> EngineResult<()>;

    /// Deletes the row holding `remote_id`.
    async fn delete_one(&self, remote_id: &RemoteId) -> EngineResult<()>;
}

/// Local and remote stores of one entity kind.
pub struct KindStores<T: Entity> {
    /// Local store.
    pub local: Arc<dyn LocalStore<T>>,
    /// Remote store.
    pub remote: Arc<dyn RemoteStore<T>>,
}

impl<T: Entity> KindStores<T> {
    /// Pairs a local and a remote store.
    pub fn new(local: Arc<dyn LocalStore<T>>, remote: Arc<dyn RemoteStore<T>>) -> Self {
        Self { local, remote }
    }
}

impl<T: Entity> Clone for KindStores<T> {
    fn clone(&self) -> Self {
        Self {
            local: Arc::clone(&self.local),
            remote: Arc::clone(&self.remote),
        }
    }
}

/// The stores of every entity kind.
#[derive(Clone)]
pub struct StoreSet {
    /// Guest stores.
    pub guests: KindStores<Guest>,
    /// Volunteer stores.
    pub volunteers: KindStores<Volunteer>,
    /// Job stores.
    pub jobs: KindStores<Job>,
    /// Job type stores.
    pub job_types: KindStores<JobTypeConfig>,
    /// Venue stores.
    pub venues: KindStores<Venue>,
}

/// Typed access to the stores of one kind within a [`StoreSet`].
pub trait StoresFor<T: Entity> {
    /// Returns the stores for `T`.
    fn stores(&self) -> &KindStores<T>;
}

impl StoresFor<Guest> for StoreSet {
    fn stores(&self) -> &KindStores<Guest> {
        &self.guests
    }
}

impl StoresFor<Volunteer> for StoreSet {
    fn stores(&self) -> &KindStores<Volunteer> {
        &self.volunteers
    }
}

impl StoresFor<Job> for StoreSet {
    fn stores(&self) -> &KindStores<Job> {
        &self.jobs
    }
}

impl StoresFor<JobTypeConfig> for StoreSet {
    fn stores(&self) -> &KindStores<JobTypeConfig> {
        &self.job_types
    }
}

impl StoresFor<Venue> for StoreSet {
    fn stores(&self) -> &KindStores<Venue> {
        &self.venues
    }
}
