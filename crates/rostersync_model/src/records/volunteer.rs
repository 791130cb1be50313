//! Volunteer records.

use crate::entity::Entity;
use crate::identity::{normalize_key, RecordMeta};
use crate::kind::EntityKind;
use crate::row::{id_cell, RowError, RowReader, SheetRow};
use serde::{Deserialize, Serialize};

// ID through Phone; trailing blank cells may be omitted by the sheet.
const REQUIRED_COLUMNS: usize = 4;

/// A volunteer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Volunteer {
    /// Identity and modification time.
    pub meta: RecordMeta,
    /// Full name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Contact phone.
    pub phone: String,
    /// Current rank, as computed by the business layer.
    pub rank: String,
    /// Free-form notes.
    pub notes: String,
}

impl Volunteer {
    /// Creates a pending volunteer.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            ..Self::default()
        }
    }
}

impl SheetRow for Volunteer {
    const SHEET: &'static str = "Volunteers";
    const HEADER: &'static [&'static str] =
        &["ID", "Name", "Email", "Phone", "Rank", "Notes", "Last Modified"];

    fn to_row(&self) -> Vec<String> {
        vec![
            id_cell(&self.meta.identity),
            self.name.clone(),
            self.email.clone(),
            self.phone.clone(),
            self.rank.clone(),
            self.notes.clone(),
            self.meta.last_modified.to_string(),
        ]
    }

    fn from_row(row: usize, cells: &[String]) -> Result<Self, RowError> {
        let r = RowReader::new(Self::SHEET, row, cells, REQUIRED_COLUMNS)?;
        Ok(Self {
            meta: RecordMeta::remote(r.identity()?, r.last_modified(6)?),
            name: r.text(1),
            email: r.text(2),
            phone: r.text(3),
            rank: r.text(4),
            notes: r.text(5),
        })
    }
}

impl Entity for Volunteer {
    const KIND: EntityKind = EntityKind::Volunteer;

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn business_key(&self) -> String {
        normalize_key(&[&self.name, &self.email, &self.phone])
    }

    fn same_tracked_fields(&self, other: &Self) -> bool {
        self.name == other.name
            && self.email == other.email
            && self.phone == other.phone
            && self.rank == other.rank
            && self.notes == other.notes
    }
}
