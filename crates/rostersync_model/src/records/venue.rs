//! Venue records.

use crate::entity::Entity;
use crate::identity::{normalize_key, RecordMeta};
use crate::kind::EntityKind;
use crate::row::{id_cell, RowError, RowReader, SheetRow};
use serde::{Deserialize, Serialize};

// ID and Name; trailing blank cells may be omitted by the sheet.
const REQUIRED_COLUMNS: usize = 2;

/// A venue where jobs take place and guests are invited.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Venue {
    /// Identity and modification time.
    pub meta: RecordMeta,
    /// Venue name (unique).
    pub name: String,
    /// Street address.
    pub address: String,
    /// Guest capacity.
    pub capacity: u32,
}

impl Venue {
    /// Creates a pending venue.
    pub fn new(name: impl Into<String>, address: impl Into<String>, capacity: u32) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            capacity,
            ..Self::default()
        }
    }
}

impl SheetRow for Venue {
    const SHEET: &'static str = "Venues";
    const HEADER: &'static [&'static str] = &["ID", "Name", "Address", "Capacity", "Last Modified"];

    fn to_row(&self) -> Vec<String> {
        vec![
            id_cell(&self.meta.identity),
            self.name.clone(),
            self.address.clone(),
            self.capacity.to_string(),
            self.meta.last_modified.to_string(),
        ]
    }

    fn from_row(row: usize, cells: &[String]) -> Result<Self, RowError> {
        let r = RowReader::new(Self::SHEET, row, cells, REQUIRED_COLUMNS)?;
        Ok(Self {
            meta: RecordMeta::remote(r.identity()?, r.last_modified(4)?),
            name: r.text(1),
            address: r.text(2),
            capacity: r.number(3, "Capacity")?,
        })
    }
}

impl Entity for Venue {
    const KIND: EntityKind = EntityKind::Venue;

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn business_key(&self) -> String {
        normalize_key(&[&self.name])
    }

    fn same_tracked_fields(&self, other: &Self) -> bool {
        self.name == other.name && self.address == other.address && self.capacity == other.capacity
    }
}
