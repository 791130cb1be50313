//! In-memory stores.
//!
//! [`MemoryLocalStore`] and [`MemorySheet`] back the tests and the CLI.
//! `MemorySheet` can inject faults and latency and records every call it
//! receives, so callers can check retry and locking behaviour.

use crate::error::{EngineResult, SyncError};
use crate::sheet::{SheetClient, SheetRemoteStore};
use crate::store::{KindStores, LocalStore, StoreSet};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rostersync_model::{Entity, Guest, Job, JobTypeConfig, LocalId, Venue, Volunteer};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Local store holding records in a map keyed by local id.
#[derive(Debug)]
pub struct MemoryLocalStore<T> {
    items: RwLock<BTreeMap<LocalId, T>>,
    next_id: AtomicU64,
    read_only: AtomicBool,
}

impl<T: Entity> MemoryLocalStore<T> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            read_only: AtomicBool::new(false),
        }
    }

    /// Creates a store from existing records.
    ///
    /// Records keep their local ids; records without one are assigned the
    /// next free id.
    pub fn from_items(items: impl IntoIterator<Item = T>) -> Self {
        let store = Self::new();
        let mut pending = Vec::new();
        {
            let mut map = store.items.write();
            for item in items {
                match item.local_id() {
                    Some(id) => {
                        map.insert(id, item);
                    }
                    None => pending.push(item),
                }
            }
            let next = map.keys().next_back().map_or(1, |id| id.0 + 1);
            store.next_id.store(next, Ordering::SeqCst);
        }
        for item in pending {
            let id = store.allocate();
            let mut item = item;
            item.set_local_id(Some(id));
            store.items.write().insert(id, item);
        }
        store
    }

    /// Returns every record in local id order.
    pub fn snapshot(&self) -> Vec<T> {
        self.items.read().values().cloned().collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Makes every write fail while set.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    fn allocate(&self) -> LocalId {
        LocalId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn check_writable(&self) -> EngineResult<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(SyncError::local(format!("{} table is read-only", T::KIND)));
        }
        Ok(())
    }

    fn require_id(item: &T) -> EngineResult<LocalId> {
        item.local_id()
            .ok_or_else(|| SyncError::local(format!("{} has no local id", T::KIND)))
    }
}

impl<T: Entity> Default for MemoryLocalStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> LocalStore<T> for MemoryLocalStore<T> {
    fn get_all(&self) -> EngineResult<Vec<T>> {
        Ok(self.snapshot())
    }

    fn insert(&self, item: &T) -> EngineResult<LocalId> {
        self.check_writable()?;
        let id = self.allocate();
        let mut stored = item.clone();
        stored.set_local_id(Some(id));
        self.items.write().insert(id, stored);
        Ok(id)
    }

    fn update(&self, item: &T) -> EngineResult<()> {
        self.check_writable()?;
        let id = Self::require_id(item)?;
        let mut items = self.items.write();
        match items.get_mut(&id) {
            Some(slot) => {
                *slot = item.clone();
                Ok(())
            }
            None => Err(SyncError::local(format!("{} {id} does not exist", T::KIND))),
        }
    }

    fn delete(&self, item: &T) -> EngineResult<()> {
        self.check_writable()?;
        let id = Self::require_id(item)?;
        match self.items.write().remove(&id) {
            Some(_) => Ok(()),
            None => Err(SyncError::local(format!("{} {id} does not exist", T::KIND))),
        }
    }

    fn clear_all(&self) -> EngineResult<()> {
        self.check_writable()?;
        self.items.write().clear();
        Ok(())
    }
}

/// Sheet API operations, as recorded by [`MemorySheet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetOp {
    /// `read_range`
    Read,
    /// `clear_range`
    Clear,
    /// `write_range`
    Write,
    /// `append_row`
    Append,
    /// `update_row`
    Update,
    /// `delete_row`
    Delete,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetCall {
    /// Operation.
    pub op: SheetOp,
    /// Target sheet.
    pub sheet: String,
}

/// Failure injected into a [`MemorySheet`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetFault {
    /// Throttling response.
    RateLimited,
    /// Connectivity failure.
    Network,
    /// Any other API error.
    Remote(String),
}

impl SheetFault {
    fn to_error(&self) -> SyncError {
        match self {
            SheetFault::RateLimited => SyncError::RateLimited("429 Too Many Requests".into()),
            SheetFault::Network => SyncError::Network("connection reset by peer".into()),
            SheetFault::Remote(message) => SyncError::remote(message.clone()),
        }
    }
}

/// A whole workbook: sheet name to rows, header first.
pub type Workbook = BTreeMap<String, Vec<Vec<String>>>;

/// In-memory spreadsheet implementing [`SheetClient`].
#[derive(Debug, Default)]
pub struct MemorySheet {
    sheets: Mutex<Workbook>,
    queued_faults: Mutex<VecDeque<(Option<SheetOp>, SheetFault)>>,
    permanent_fault: Mutex<Option<SheetFault>>,
    latency: Mutex<Duration>,
    calls: Mutex<Vec<SheetCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemorySheet {
    /// Creates an empty workbook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sheet client over existing contents.
    pub fn from_workbook(workbook: Workbook) -> Self {
        let sheet = Self::new();
        *sheet.sheets.lock() = workbook;
        sheet
    }

    /// Returns a copy of every sheet.
    pub fn workbook(&self) -> Workbook {
        self.sheets.lock().clone()
    }

    /// Returns the rows of one sheet, header included.
    pub fn rows(&self, sheet: &str) -> Vec<Vec<String>> {
        self.sheets.lock().get(sheet).cloned().unwrap_or_default()
    }

    /// Replaces the rows of one sheet.
    pub fn set_rows(&self, sheet: &str, rows: Vec<Vec<String>>) {
        self.sheets.lock().insert(sheet.to_string(), rows);
    }

    /// Fails the next call of any kind.
    pub fn fail_next(&self, fault: SheetFault) {
        self.queued_faults.lock().push_back((None, fault));
    }

    /// Fails the next call of `op`.
    pub fn fail_next_on(&self, op: SheetOp, fault: SheetFault) {
        self.queued_faults.lock().push_back((Some(op), fault));
    }

    /// Fails every call until cleared with `None`.
    pub fn fail_always(&self, fault: Option<SheetFault>) {
        *self.permanent_fault.lock() = fault;
    }

    /// Delays every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Returns the calls received so far.
    pub fn calls(&self) -> Vec<SheetCall> {
        self.calls.lock().clone()
    }

    /// Number of calls of `op` received so far.
    pub fn count(&self, op: SheetOp) -> usize {
        self.calls.lock().iter().filter(|c| c.op == op).count()
    }

    /// Forgets recorded calls.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Highest number of calls that were in progress at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, op: SheetOp, sheet: &str) -> EngineResult<InFlight<'_>> {
        self.calls.lock().push(SheetCall {
            op,
            sheet: sheet.to_string(),
        });
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);

        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if let Some(fault) = self.take_fault(op) {
            return Err(fault.to_error());
        }
        Ok(guard)
    }

    fn take_fault(&self, op: SheetOp) -> Option<SheetFault> {
        if let Some(fault) = self.permanent_fault.lock().clone() {
            return Some(fault);
        }
        let mut queue = self.queued_faults.lock();
        let pos = queue
            .iter()
            .position(|(target, _)| target.map_or(true, |t| t == op))?;
        queue.remove(pos).map(|(_, fault)| fault)
    }

    fn out_of_range(sheet: &str, index: usize) -> SyncError {
        SyncError::Remote(format!("{sheet}: row index {index} is out of range"))
    }
}

#[async_trait]
impl SheetClient for MemorySheet {
    async fn read_range(&self, sheet: &str) -> EngineResult<Vec<Vec<String>>> {
        let _call = self.enter(SheetOp::Read, sheet).await?;
        Ok(self.rows(sheet))
    }

    async fn clear_range(&self, sheet: &str) -> EngineResult<()> {
        let _call = self.enter(SheetOp::Clear, sheet).await?;
        self.sheets.lock().insert(sheet.to_string(), Vec::new());
        Ok(())
    }

    async fn write_range(&self, sheet: &str, rows: Vec<Vec<String>>) -> EngineResult<()> {
        let _call = self.enter(SheetOp::Write, sheet).await?;
        let mut sheets = self.sheets.lock();
        let target = sheets.entry(sheet.to_string()).or_default();
        for (idx, row) in rows.into_iter().enumerate() {
            match target.get_mut(idx) {
                Some(slot) => *slot = row,
                None => target.push(row),
            }
        }
        Ok(())
    }

    async fn append_row(&self, sheet: &str, row: Vec<String>) -> EngineResult<()> {
        let _call = self.enter(SheetOp::Append, sheet).await?;
        self.sheets
            .lock()
            .entry(sheet.to_string())
            .or_default()
            .push(row);
        Ok(())
    }

    async fn update_row(&self, sheet: &str, index: usize, row: Vec<String>) -> EngineResult<()> {
        let _call = self.enter(SheetOp::Update, sheet).await?;
        let mut sheets = self.sheets.lock();
        match sheets.get_mut(sheet).and_then(|rows| rows.get_mut(index)) {
            Some(slot) => {
                *slot = row;
                Ok(())
            }
            None => Err(Self::out_of_range(sheet, index)),
        }
    }

    async fn delete_row(&self, sheet: &str, index: usize) -> EngineResult<()> {
        let _call = self.enter(SheetOp::Delete, sheet).await?;
        let mut sheets = self.sheets.lock();
        match sheets.get_mut(sheet) {
            Some(rows) if index < rows.len() => {
                rows.remove(index);
                Ok(())
            }
            _ => Err(Self::out_of_range(sheet, index)),
        }
    }
}

/// Local tables and a shared [`MemorySheet`] for every kind.
#[derive(Debug, Clone)]
pub struct MemoryStores {
    /// Remote workbook.
    pub sheet: Arc<MemorySheet>,
    /// Guest table.
    pub guests: Arc<MemoryLocalStore<Guest>>,
    /// Volunteer table.
    pub volunteers: Arc<MemoryLocalStore<Volunteer>>,
    /// Job table.
    pub jobs: Arc<MemoryLocalStore<Job>>,
    /// Job type table.
    pub job_types: Arc<MemoryLocalStore<JobTypeConfig>>,
    /// Venue table.
    pub venues: Arc<MemoryLocalStore<Venue>>,
}

impl MemoryStores {
    /// Empty local tables and an empty workbook.
    pub fn new() -> Self {
        Self::with_sheet(Arc::new(MemorySheet::new()))
    }

    /// Empty local tables over an existing workbook.
    pub fn with_sheet(sheet: Arc<MemorySheet>) -> Self {
        Self {
            sheet,
            guests: Arc::new(MemoryLocalStore::new()),
            volunteers: Arc::new(MemoryLocalStore::new()),
            jobs: Arc::new(MemoryLocalStore::new()),
            job_types: Arc::new(MemoryLocalStore::new()),
            venues: Arc::new(MemoryLocalStore::new()),
        }
    }

    /// Builds the engine's [`StoreSet`] over these tables.
    pub fn store_set(&self) -> StoreSet {
        let client: Arc<dyn SheetClient> = self.sheet.clone();
        StoreSet {
            guests: kind_stores(self.guests.clone(), &client),
            volunteers: kind_stores(self.volunteers.clone(), &client),
            jobs: kind_stores(self.jobs.clone(), &client),
            job_types: kind_stores(self.job_types.clone(), &client),
            venues: kind_stores(self.venues.clone(), &client),
        }
    }
}

impl Default for MemoryStores {
    fn default() -> Self {
        Self::new()
    }
}

fn kind_stores<T: Entity>(
    local: Arc<MemoryLocalStore<T>>,
    client: &Arc<dyn SheetClient>,
) -> KindStores<T> {
    KindStores::new(local, Arc::new(SheetRemoteStore::<T>::new(Arc::clone(client))))
}
