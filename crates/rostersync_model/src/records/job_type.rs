//! Job type configuration records.

use crate::entity::Entity;
use crate::identity::{normalize_key, RecordMeta};
use crate::kind::EntityKind;
use crate::row::{id_cell, RowError, RowReader, SheetRow};
use serde::{Deserialize, Serialize};

// ID and Name; trailing blank cells may be omitted by the sheet.
const REQUIRED_COLUMNS: usize = 2;

/// Configuration for one kind of job.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobTypeConfig {
    /// Identity and modification time.
    pub meta: RecordMeta,
    /// Job type name (unique).
    pub name: String,
    /// Description shown to schedulers.
    pub description: String,
    /// Default shift length in minutes.
    pub default_minutes: u32,
    /// Whether new jobs of this type can be scheduled.
    pub active: bool,
}

impl JobTypeConfig {
    /// Creates a pending, active job type.
    pub fn new(name: impl Into<String>, default_minutes: u32) -> Self {
        Self {
            name: name.into(),
            default_minutes,
            active: true,
            ..Self::default()
        }
    }
}

impl SheetRow for JobTypeConfig {
    const SHEET: &'static str = "JobTypes";
    const HEADER: &'static [&'static str] = &[
        "ID",
        "Name",
        "Description",
        "Default Minutes",
        "Active",
        "Last Modified",
    ];

    fn to_row(&self) -> Vec<String> {
        vec![
            id_cell(&self.meta.identity),
            self.name.clone(),
            self.description.clone(),
            self.default_minutes.to_string(),
            if self.active { "TRUE" } else { "FALSE" }.to_string(),
            self.meta.last_modified.to_string(),
        ]
    }

    fn from_row(row: usize, cells: &[String]) -> Result<Self, RowError> {
        let r = RowReader::new(Self::SHEET, row, cells, REQUIRED_COLUMNS)?;
        Ok(Self {
            meta: RecordMeta::remote(r.identity()?, r.last_modified(5)?),
            name: r.text(1),
            description: r.text(2),
            default_minutes: r.number(3, "Default Minutes")?,
            active: r.flag(4, "Active")?,
        })
    }
}

impl Entity for JobTypeConfig {
    const KIND: EntityKind = EntityKind::JobTypeConfig;

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
        self.name == other.name
            && self.description == other.description
            && self.default_minutes == other.default_minutes
            && self.active == other.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_flag_roundtrip() {
        let mut jt = JobTypeConfig::new("Bar", 240);
        jt.meta.identity = crate::identity::Identity::Remote("2".into());
        jt.active = false;

        let row = jt.to_row();
        assert_eq!(row[4], "FALSE");
        assert!(!JobTypeConfig::from_row(2, &row).unwrap().active);
    }

    #[test]
    fn rejects_garbage_flag() {
        let cells: Vec<String> = ["1", "Bar", "", "240", "sometimes"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(matches!(
            JobTypeConfig::from_row(2, &cells),
            Err(RowError::InvalidValue { column: "Active", .. })
        ));
    }
}
