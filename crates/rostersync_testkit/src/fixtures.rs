//! Test fixtures and store helpers.
//!
//! Provides sample records and a harness that wires in-memory stores, a
//! deletion ledger and an orchestrator together.

use rostersync_engine::{
    DeletionLedger, MemoryStores, RetryConfig, SheetClient, SyncConfig, SyncOrchestrator,
};
use rostersync_model::{
    parse_rows, Entity, Guest, Identity, LocalId, RemoteId, Volunteer,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Spreadsheet id used by test configurations.
pub const TEST_SPREADSHEET_ID: &str = "test-spreadsheet";

/// Retry configuration with millisecond delays.
pub fn fast_retry() -> RetryConfig {
    RetryConfig::new(3)
        .with_initial_delay(Duration::from_millis(2))
        .with_max_delay(Duration::from_millis(10))
}

/// A configured sync config using [`fast_retry`].
pub fn test_config() -> SyncConfig {
    SyncConfig::new(TEST_SPREADSHEET_ID).with_retry(fast_retry())
}

/// A guest as read from the remote sheet.
pub fn remote_guest(id: u64, name: &str, invitations: u32) -> Guest {
    let mut guest = Guest::new(name, "Main Hall", invitations);
    guest.set_identity(Identity::Remote(RemoteId::from(id)));
    guest
}

/// A guest as stored locally.
pub fn local_guest(local_id: u64, remote_id: Option<u64>, name: &str, invitations: u32) -> Guest {
    let mut guest = Guest::new(name, "Main Hall", invitations);
    guest.set_local_id(Some(LocalId(local_id)));
    if let Some(id) = remote_id {
        guest.set_identity(Identity::Remote(RemoteId::from(id)));
    }
    guest
}

/// Alice, a new remote guest with remote id 5.
pub fn alice() -> Guest {
    remote_guest(5, "Alice", 1)
}

/// Bob, remote id 3, with the given invitation count.
pub fn bob(invitations: u32) -> Guest {
    remote_guest(3, "Bob", invitations)
}

/// A volunteer as read from the remote sheet.
pub fn remote_volunteer(id: u64, name: &str) -> Volunteer {
    let email = format!("{}@example.org", name.to_lowercase());
    let mut volunteer = Volunteer::new(name, email, "555-0100");
    volunteer.set_identity(Identity::Remote(RemoteId::from(id)));
    volunteer
}

/// In-memory stores, a deletion ledger and an orchestrator.
pub struct TestHarness {
    /// Local tables and the remote workbook.
    pub stores: MemoryStores,
    /// The orchestrator under test.
    pub orchestrator: Arc<SyncOrchestrator>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestHarness {
    /// Harness with an in-memory ledger and [`test_config`].
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Harness with an in-memory ledger and the given config.
    pub fn with_config(config: SyncConfig) -> Self {
        let stores = MemoryStores::new();
        let orchestrator = SyncOrchestrator::new(
            config,
            stores.store_set(),
            Arc::new(DeletionLedger::in_memory()),
        );
        Self {
            stores,
            orchestrator: Arc::new(orchestrator),
            _temp_dir: None,
        }
    }

    /// Harness whose ledger is a file in a temporary directory.
    pub fn with_ledger_file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let ledger = DeletionLedger::open(temp_dir.path().join("deletions.json"));
        let stores = MemoryStores::new();
        let orchestrator =
            SyncOrchestrator::new(test_config(), stores.store_set(), Arc::new(ledger));
        Self {
            stores,
            orchestrator: Arc::new(orchestrator),
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the ledger file path if file-based.
    pub fn ledger_path(&self) -> Option<PathBuf> {
        self.orchestrator.ledger().path().map(PathBuf::from)
    }

    /// Builds a second orchestrator over the same stores and ledger file,
    /// as after an application restart.
    pub fn restart(&self) -> SyncOrchestrator {
        let ledger = match self.ledger_path() {
            Some(path) => DeletionLedger::open(path),
            None => DeletionLedger::in_memory(),
        };
        SyncOrchestrator::new(
            self.orchestrator.config().clone(),
            self.stores.store_set(),
            Arc::new(ledger),
        )
    }

    /// Replaces `T`'s sheet with a header and `items`.
    pub fn seed_remote<T: Entity>(&self, items: &[T]) {
        let mut rows = vec![header::<T>()];
        rows.extend(items.iter().map(|item| item.to_row()));
        self.stores.sheet.set_rows(T::SHEET, rows);
    }

    /// Parses `T`'s sheet.
    pub fn remote_rows<T: Entity>(&self) -> Vec<T> {
        let rows = self.stores.sheet.rows(T::SHEET);
        let data = rows.get(1..).unwrap_or_default();
        parse_rows::<T>(data).items
    }

    /// The workbook as a sheet client.
    pub fn client(&self) -> Arc<dyn SheetClient> {
        self.stores.sheet.clone()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Header row of `T`'s sheet.
pub fn header<T: Entity>() -> Vec<String> {
    T::HEADER.iter().map(|h| h.to_string()).collect()
}
