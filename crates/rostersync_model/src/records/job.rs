//! Job (shift) records.

use crate::entity::Entity;
use crate::identity::{normalize_key, RecordMeta};
use crate::kind::EntityKind;
use crate::row::{id_cell, RowError, RowReader, SheetRow};
use serde::{Deserialize, Serialize};

// ID through Start; trailing blank cells may be omitted by the sheet.
const REQUIRED_COLUMNS: usize = 6;

/// A shift worked by a volunteer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Job {
    /// Identity and modification time.
    pub meta: RecordMeta,
    /// Job type name.
    pub job_type: String,
    /// Volunteer name.
    pub volunteer: String,
    /// Venue name.
    pub venue: String,
    /// Shift date (`YYYY-MM-DD`).
    pub date: String,
    /// Shift start (`HH:MM`).
    pub start_time: String,
    /// Shift end (`HH:MM`).
    pub end_time: String,
    /// Free-form notes.
    pub notes: String,
}

impl Job {
    /// Creates a pending job.
    pub fn new(
        job_type: impl Into<String>,
        volunteer: impl Into<String>,
        venue: impl Into<String>,
        date: impl Into<String>,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
    ) -> Self {
        Self {
            job_type: job_type.into(),
            volunteer: volunteer.into(),
            venue: venue.into(),
            date: date.into(),
            start_time: start_time.into(),
            end_time: end_time.into(),
            ..Self::default()
        }
    }
}

impl SheetRow for Job {
    const SHEET: &'static str = "Jobs";
    const HEADER: &'static [&'static str] = &[
        "ID",
        "Job Type",
        "Volunteer",
        "Venue",
        "Date",
        "Start",
        "End",
        "Notes",
        "Last Modified",
    ];

    fn to_row(&self) -> Vec<String> {
        vec![
            id_cell(&self.meta.identity),
            self.job_type.clone(),
            self.volunteer.clone(),
            self.venue.clone(),
            self.date.clone(),
            self.start_time.clone(),
            self.end_time.clone(),
            self.notes.clone(),
            self.meta.last_modified.to_string(),
        ]
    }

    fn from_row(row: usize, cells: &[String]) -> Result<Self, RowError> {
        let r = RowReader::new(Self::SHEET, row, cells, REQUIRED_COLUMNS)?;
        Ok(Self {
            meta: RecordMeta::remote(r.identity()?, r.last_modified(8)?),
            job_type: r.text(1),
            volunteer: r.text(2),
            venue: r.text(3),
            date: r.text(4),
            start_time: r.text(5),
            end_time: r.text(6),
            notes: r.text(7),
        })
    }
}

impl Entity for Job {
    const KIND: EntityKind = EntityKind::Job;

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn business_key(&self) -> String {
        normalize_key(&[
            &self.job_type,
            &self.volunteer,
            &self.venue,
            &self.date,
            &self.start_time,
        ])
    }

    fn same_tracked_fields(&self, other: &Self) -> bool {
        self.job_type == other.job_type
            && self.volunteer == other.volunteer
            && self.venue == other.venue
            && self.date == other.date
            && self.start_time == other.start_time
            && self.end_time == other.end_time
            && self.notes == other.notes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_time_is_tracked_but_not_keyed() {
        let a = Job::new("Bar", "Ann", "Main Hall", "2024-06-01", "18:00", "22:00");
        let mut b = a.clone();
        b.end_time = "23:00".into();

        assert_eq!(a.business_key(), b.business_key());
        assert!(!a.same_tracked_fields(&b));
    }
}
