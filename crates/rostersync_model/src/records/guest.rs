//! Guest records.

use crate::entity::Entity;
use crate::identity::{normalize_key, RecordMeta};
use crate::kind::EntityKind;
use crate::row::{id_cell, RowError, RowReader, SheetRow};
use serde::{Deserialize, Serialize};

// ID through Invitations; trailing blank cells may be omitted by the sheet.
const REQUIRED_COLUMNS: usize = 6;

/// An invited guest.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Guest {
    /// Identity and modification time.
    pub meta: RecordMeta,
    /// Full name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Contact phone.
    pub phone: String,
    /// Venue the guest is invited to.
    pub venue: String,
    /// Number of invitations issued to this guest.
    pub invitations: u32,
    /// Free-form notes.
    pub notes: String,
}

impl Guest {
    /// Creates a pending guest.
    pub fn new(name: impl Into<String>, venue: impl Into<String>, invitations: u32) -> Self {
        Self {
            name: name.into(),
            venue: venue.into(),
            invitations,
            ..Self::default()
        }
    }
}

impl SheetRow for Guest {
    const SHEET: &'static str = "Guests";
    const HEADER: &'static [&'static str] = &[
        "ID",
        "Name",
        "Email",
        "Phone",
        "Venue",
        "Invitations",
        "Notes",
        "Last Modified",
    ];

    fn to_row(&self) -> Vec<String> {
        vec![
            id_cell(&self.meta.identity),
            self.name.clone(),
            self.email.clone(),
            self.phone.clone(),
            self.venue.clone(),
            self.invitations.to_string(),
            self.notes.clone(),
            self.meta.last_modified.to_string(),
        ]
    }

    fn from_row(row: usize, cells: &[String]) -> Result<Self, RowError> {
        let r = RowReader::new(Self::SHEET, row, cells, REQUIRED_COLUMNS)?;
        Ok(Self {
            meta: RecordMeta::remote(r.identity()?, r.last_modified(7)?),
            name: r.text(1),
            email: r.text(2),
            phone: r.text(3),
            venue: r.text(4),
            invitations: r.number(5, "Invitations")?,
            notes: r.text(6),
        })
    }
}

impl Entity for Guest {
    const KIND: EntityKind = EntityKind::Guest;

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn business_key(&self) -> String {
        normalize_key(&[&self.name, &self.venue, &self.invitations.to_string()])
    }

    fn same_tracked_fields(&self, other: &Self) -> bool {
        self.name == other.name
            && self.email == other.email
            && self.phone == other.phone
            && self.venue == other.venue
            && self.invitations == other.invitations
            && self.notes == other.notes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_layout_matches_header() {
        let mut guest = Guest::new("Bob", "Main Hall", 2);
        guest.email = "bob@example.org".into();
        let row = guest.to_row();
        assert_eq!(row.len(), Guest::HEADER.len());
        assert_eq!(row[0], "");
        assert_eq!(row[5], "2");
    }

    #[test]
    fn business_key_includes_invitation_count() {
        let a = Guest::new("Bob", "Main Hall", 2);
        let b = Guest::new("bob", " main hall", 3);
        assert_ne!(a.business_key(), b.business_key());
        assert_eq!(a.business_key(), Guest::new("BOB", "Main Hall", 2).business_key());
    }

    #[test]
    fn tracked_fields_ignore_metadata() {
        let a = Guest::new("Bob", "Main Hall", 2);
        let mut b = a.clone();
        b.meta.last_modified = 99;
        assert!(a.same_tracked_fields(&b));
        b.notes = "vip".into();
        assert!(!a.same_tracked_fields(&b));
    }
}
