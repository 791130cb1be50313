//! Sheet-backed remote store.
//!
//! The raw spreadsheet API is abstracted by [`SheetClient`] so that the
//! engine does not depend on a particular HTTP stack or credentials flow.
//! [`SheetRemoteStore`] turns that tabular surface into a typed
//! [`RemoteStore`] using the row codec from the model crate.

use crate::error::{EngineResult, SyncError};
use crate::store::RemoteStore;
use async_trait::async_trait;
use rostersync_model::{parse_rows, Entity, Identity, RemoteId, SheetRow};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

/// Spreadsheet API abstraction.
///
/// Ranges cover a whole sheet. Row indexes are 0-based within the range,
/// so index 0 is the header row.
#[async_trait]
pub trait SheetClient: Send + Sync {
    /// Reads every row of the sheet, header included.
    async fn read_range(&self, sheet: &str) -> EngineResult<Vec<Vec<String>>>;

    /// Clears every cell of the sheet.
    async fn clear_range(&self, sheet: &str) -> EngineResult<()>;

    /// Writes rows starting at the top of the sheet.
    async fn write_range(&self, sheet: &str, rows: Vec<Vec<String>>) -> EngineResult<()>;

    /// Appends one row after the last non-empty row.
    async fn append_row(&self, sheet: &str, row: Vec<String>) -> EngineResult<()>;

    /// Overwrites the row at `index`.
    async fn update_row(&self, sheet: &str, index: usize, row: Vec<String>) -> EngineResult<()>;

    /// Deletes the row at `index`, shifting later rows up.
    async fn delete_row(&self, sheet: &str, index: usize) -> EngineResult<()>;
}

/// Typed remote store over one sheet.
///
/// Remote ids live in the `ID` column. New rows get `max(numeric id) + 1`;
/// rows are located by scanning the ID column, never by cached position,
/// because structural deletes shift every later row.
pub struct SheetRemoteStore<T> {
    client: Arc<dyn SheetClient>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> SheetRemoteStore<T> {
    /// Creates a remote store for `T`'s sheet.
    pub fn new(client: Arc<dyn SheetClient>) -> Self {
        Self {
            client,
            _marker: PhantomData,
        }
    }

    async fn data_rows(&self) -> EngineResult<Vec<Vec<String>>> {
        let mut rows = self.client.read_range(T::SHEET).await?;
        if rows.is_empty() {
            return Ok(rows);
        }
        if !is_header(&rows[0], T::HEADER) {
            return Err(SyncError::Protocol(format!(
                "{} sheet header does not match the expected layout",
                T::SHEET
            )));
        }
        rows.remove(0);
        Ok(rows)
    }

    /// Returns the range index (header = 0) of the row holding `id`.
    async fn locate(&self, id: &RemoteId) -> EngineResult<Option<usize>> {
        let rows = self.data_rows().await?;
        Ok(rows
            .iter()
            .position(|row| row.first().is_some_and(|cell| cell.trim() == id.as_str()))
            .map(|pos| pos + 1))
    }
}

fn is_header(row: &[String], header: &[&str]) -> bool {
    row.first().map(|c| c.trim()) == header.first().copied()
}

fn header_row(header: &[&str]) -> Vec<String> {
    header.iter().map(|h| h.to_string()).collect()
}

/// Next free id: one past the largest numeric ID cell.
fn next_remote_id(rows: &[Vec<String>]) -> RemoteId {
    let max = rows
        .iter()
        .filter_map(|row| row.first())
        .filter_map(|cell| cell.trim().parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    RemoteId::from(max + 1)
}

#[async_trait]
impl<T: Entity> RemoteStore<T> for SheetRemoteStore<T> {
    async fn fetch_all(&self) -> EngineResult<Vec<T>> {
        let rows = self.data_rows().await?;
        let parsed = parse_rows::<T>(&rows);

        for err in &parsed.errors {
            warn!(kind = %T::KIND, error = %err, "skipping malformed row");
        }
        debug!(
            kind = %T::KIND,
            rows = parsed.items.len(),
            skipped = parsed.errors.len(),
            "fetched sheet"
        );
        Ok(parsed.items)
    }

    async fn overwrite_all(&self, items: &[T]) -> EngineResult<()> {
        let mut rows = Vec::with_capacity(items.len() + 1);
        rows.push(header_row(T::HEADER));
        rows.extend(items.iter().map(SheetRow::to_row));

        // Clear first so no stale trailing rows survive a shrinking table.
        self.client.clear_range(T::SHEET).await?;
        self.client.write_range(T::SHEET, rows).await?;
        debug!(kind = %T::KIND, rows = items.len(), "overwrote sheet");
        Ok(())
    }

    async fn append_one(&self, item: &T) -> EngineResult<RemoteId> {
        let raw = self.client.read_range(T::SHEET).await?;
        if raw.is_empty() {
            self.client
                .write_range(T::SHEET, vec![header_row(T::HEADER)])
                .await?;
        }

        let id = next_remote_id(&raw);
        let mut row_item = item.clone();
        row_item.set_identity(Identity::Remote(id.clone()));
        self.client.append_row(T::SHEET, row_item.to_row()).await?;

        debug!(kind = %T::KIND, remote_id = %id, "appended row");
        Ok(id)
    }

    async fn update_one(&self, item: &T) -> EngineResult<()> {
        let id = item
            .remote_id()
            .ok_or_else(|| SyncError::Protocol(format!("{} has no remote id", T::KIND)))?;

        let index = self
            .locate(id)
            .await?
            .ok_or_else(|| SyncError::RowNotFound {
                kind: T::KIND,
                remote_id: id.to_string(),
            })?;

        self.client.update_row(T::SHEET, index, item.to_row()).await
    }

    async fn delete_one(&self, remote_id: &RemoteId) -> EngineResult<()> {
        match self.locate(remote_id).await? {
            Some(index) => self.client.delete_row(T::SHEET, index).await,
            None => {
                debug!(kind = %T::KIND, %remote_id, "row already gone");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemorySheet, SheetFault};
    use rostersync_model::{Guest, Volunteer};

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn guest_store() -> (Arc<MemorySheet>, SheetRemoteStore<Guest>) {
        let sheet = Arc::new(MemorySheet::new());
        let store = SheetRemoteStore::new(sheet.clone() as Arc<dyn SheetClient>);
        (sheet, store)
    }

    #[tokio::test]
    async fn fetch_skips_malformed_rows() {
        let (sheet, store) = guest_store();
        sheet.set_rows(
            "Guests",
            vec![
                header_row(Guest::HEADER),
                cells(&["1", "Alice", "", "", "Main Hall", "2"]),
                cells(&["2", "Bob"]),
                cells(&["3", "Cara", "", "", "Annex", "many"]),
                cells(&["4", "Dan", "d@x.org", "", "Annex", "1", "", "17"]),
            ],
        );

        let guests = store.fetch_all().await.unwrap();
        let names: Vec<_> = guests.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Dan"]);
        assert_eq!(guests[1].last_modified(), 17);
    }

    #[tokio::test]
    async fn fetch_empty_sheet() {
        let (_sheet, store) = guest_store();
        assert!(store.fetch_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_rejects_foreign_header() {
        let (sheet, store) = guest_store();
        sheet.set_rows("Guests", vec![cells(&["Name", "Venue"])]);
        assert!(matches!(store.fetch_all().await, Err(SyncError::Protocol(_))));
    }

    #[tokio::test]
    async fn overwrite_replaces_longer_sheet() {
        let (sheet, store) = guest_store();
        let mut a = Guest::new("A", "Hall", 1);
        a.set_identity(Identity::Remote(RemoteId::from(1)));
        let mut b = Guest::new("B", "Hall", 1);
        b.set_identity(Identity::Remote(RemoteId::from(2)));

        store.overwrite_all(&[a.clone(), b]).await.unwrap();
        store.overwrite_all(&[a]).await.unwrap();

        let rows = sheet.rows("Guests");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], header_row(Guest::HEADER));
        assert_eq!(rows[1][1], "A");
    }

    #[tokio::test]
    async fn append_assigns_next_numeric_id() {
        let sheet = Arc::new(MemorySheet::new());
        let store: SheetRemoteStore<Volunteer> = SheetRemoteStore::new(sheet.clone());

        let first = store
            .append_one(&Volunteer::new("Ann", "a@x.org", "1"))
            .await
            .unwrap();
        let second = store
            .append_one(&Volunteer::new("Ben", "b@x.org", "2"))
            .await
            .unwrap();

        assert_eq!(first, RemoteId::from(1));
        assert_eq!(second, RemoteId::from(2));

        let fetched = store.fetch_all().await.unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[1].remote_id(), Some(&RemoteId::from(2)));
    }

    #[tokio::test]
    async fn update_and_delete_locate_rows_by_id() {
        let sheet = Arc::new(MemorySheet::new());
        let store: SheetRemoteStore<Volunteer> = SheetRemoteStore::new(sheet.clone());
        for name in ["Ann", "Ben", "Cat"] {
            store
                .append_one(&Volunteer::new(name, "", ""))
                .await
                .unwrap();
        }

        store.delete_one(&RemoteId::from(1)).await.unwrap();

        // Row 3 moved up after the delete; it is still found by id.
        let mut cat = Volunteer::new("Cat", "", "");
        cat.set_identity(Identity::Remote(RemoteId::from(3)));
        cat.rank = "Gold".into();
        store.update_one(&cat).await.unwrap();

        let fetched = store.fetch_all().await.unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[1].rank, "Gold");

        // Deleting a missing row is a no-op.
        store.delete_one(&RemoteId::from(1)).await.unwrap();

        let mut ghost = Volunteer::new("Ghost", "", "");
        ghost.set_identity(Identity::Remote(RemoteId::from(99)));
        assert!(matches!(
            store.update_one(&ghost).await,
            Err(SyncError::RowNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn client_faults_surface_as_errors() {
        let (sheet, store) = guest_store();
        sheet.fail_next(SheetFault::RateLimited);
        assert!(matches!(store.fetch_all().await, Err(SyncError::RateLimited(_))));
        assert!(store.fetch_all().await.is_ok());
    }
}
