//! Sheet row codec.
//!
//! Every kind lives on its own sheet with a fixed header. Column 0 is the
//! remote id and the last column is the last-modified timestamp. Rows are
//! parsed one at a time into `Result<T, RowError>`; a malformed row never
//! aborts the rest of the sheet.

use crate::identity::{Identity, RemoteId};
use std::str::FromStr;
use thiserror::Error;

/// A single malformed row in a remote sheet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    /// The row has fewer cells than the layout requires.
    #[error("{sheet} row {row}: expected at least {expected} columns, found {found}")]
    TooFewColumns {
        /// Sheet name.
        sheet: &'static str,
        /// 1-based sheet row number.
        row: usize,
        /// Required column count.
        expected: usize,
        /// Actual column count.
        found: usize,
    },

    /// The ID cell is empty.
    #[error("{sheet} row {row}: missing ID")]
    MissingId {
        /// Sheet name.
        sheet: &'static str,
        /// 1-based sheet row number.
        row: usize,
    },

    /// A cell could not be parsed.
    #[error("{sheet} row {row}: invalid {column} value {value:?}")]
    InvalidValue {
        /// Sheet name.
        sheet: &'static str,
        /// 1-based sheet row number.
        row: usize,
        /// Column header.
        column: &'static str,
        /// Raw cell value.
        value: String,
    },
}

impl RowError {
    /// Returns the 1-based sheet row number of the offending row.
    pub fn row(&self) -> usize {
        match self {
            RowError::TooFewColumns { row, .. }
            | RowError::MissingId { row, .. }
            | RowError::InvalidValue { row, .. } => *row,
        }
    }
}

/// A record kind with a fixed sheet layout.
pub trait SheetRow: Sized {
    /// Sheet (tab) name.
    const SHEET: &'static str;

    /// Header row, ID first and `Last Modified` last.
    const HEADER: &'static [&'static str];

    /// Encodes the record as one row of cells in header order.
    ///
    /// Pending records encode an empty ID cell.
    fn to_row(&self) -> Vec<String>;

    /// Decodes one data row. `row` is the 1-based sheet row number.
    fn from_row(row: usize, cells: &[String]) -> Result<Self, RowError>;
}

/// Cursor over the cells of one row with typed accessors.
pub struct RowReader<'a> {
    sheet: &'static str,
    row: usize,
    cells: &'a [String],
}

impl<'a> RowReader<'a> {
    /// Creates a reader, checking that at least `required` cells exist.
    pub fn new(
        sheet: &'static str,
        row: usize,
        cells: &'a [String],
        required: usize,
    ) -> Result<Self, RowError> {
        if cells.len() < required {
            return Err(RowError::TooFewColumns {
                sheet,
                row,
                expected: required,
                found: cells.len(),
            });
        }
        Ok(Self { sheet, row, cells })
    }

    /// Reads the ID cell (column 0).
    pub fn identity(&self) -> Result<RemoteId, RowError> {
        let raw = self.text(0);
        if raw.is_empty() {
            return Err(RowError::MissingId {
                sheet: self.sheet,
                row: self.row,
            });
        }
        Ok(RemoteId::new(raw))
    }

    /// Reads a trimmed text cell; missing cells read as empty.
    pub fn text(&self, idx: usize) -> String {
        self.cells
            .get(idx)
            .map(|c| c.trim().to_string())
            .unwrap_or_default()
    }

    /// Reads a numeric cell; a blank cell reads as zero.
    pub fn number<N>(&self, idx: usize, column: &'static str) -> Result<N, RowError>
    where
        N: FromStr + Default,
    {
        let raw = self.text(idx);
        if raw.is_empty() {
            return Ok(N::default());
        }
        raw.parse().map_err(|_| self.invalid(column, raw))
    }

    /// Reads a boolean cell (`TRUE`/`FALSE`, `yes`/`no`, `1`/`0`).
    pub fn flag(&self, idx: usize, column: &'static str) -> Result<bool, RowError> {
        let raw = self.text(idx);
        match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Ok(true),
            "false" | "no" | "n" | "0" | "" => Ok(false),
            _ => Err(self.invalid(column, raw)),
        }
    }

    /// Reads the trailing `Last Modified` cell; a missing cell reads as zero.
    pub fn last_modified(&self, idx: usize) -> Result<u64, RowError> {
        self.number(idx, "Last Modified")
    }

    fn invalid(&self, column: &'static str, value: String) -> RowError {
        RowError::InvalidValue {
            sheet: self.sheet,
            row: self.row,
            column,
            value,
        }
    }
}

/// Encodes an identity as the ID cell.
pub(crate) fn id_cell(identity: &Identity) -> String {
    identity
        .remote_id()
        .map(|id| id.as_str().to_string())
        .unwrap_or_default()
}

/// Parsed rows of one sheet, with malformed rows kept apart.
#[derive(Debug, Clone)]
pub struct ParsedRows<T> {
    /// Successfully decoded records.
    pub items: Vec<T>,
    /// Rows that failed to decode.
    pub errors: Vec<RowError>,
}

/// Decodes data rows (header excluded). Blank rows are skipped silently.
pub fn parse_rows<T: SheetRow>(rows: &[Vec<String>]) -> ParsedRows<T> {
    let mut items = Vec::with_capacity(rows.len());
    let mut errors = Vec::new();

    for (idx, cells) in rows.iter().enumerate() {
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        // Data starts on sheet row 2, below the header.
        match T::from_row(idx + 2, cells) {
            Ok(item) => items.push(item),
            Err(e) => errors.push(e),
        }
    }

    ParsedRows { items, errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Venue;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reader_rejects_short_rows() {
        let row = cells(&["1", "Hall"]);
        let err = RowReader::new("Venues", 2, &row, 4).err().unwrap();
        assert_eq!(
            err,
            RowError::TooFewColumns {
                sheet: "Venues",
                row: 2,
                expected: 4,
                found: 2
            }
        );
        assert_eq!(err.row(), 2);
    }

    #[test]
    fn reader_typed_cells() {
        let row = cells(&[" 7 ", "x", "", "12", "maybe", "yes"]);
        let reader = RowReader::new("Test", 3, &row, 2).unwrap();

        assert_eq!(reader.identity().unwrap(), RemoteId::from(7));
        assert_eq!(reader.number::<u32>(2, "Blank").unwrap(), 0);
        assert_eq!(reader.number::<u32>(3, "Count").unwrap(), 12);
        assert!(reader.number::<u32>(1, "Count").is_err());
        assert!(reader.flag(4, "Active").is_err());
        assert!(reader.flag(5, "Active").unwrap());
        assert_eq!(reader.text(99), "");
    }

    #[test]
    fn parse_rows_collects_errors_and_skips_blanks() {
        let rows = vec![
            cells(&["1", "Main Hall", "1 High St", "200", "10"]),
            cells(&["", "", "", "", ""]),
            cells(&["", "No Id", "Somewhere", "5", "0"]),
            cells(&["3", "Annex", "2 Low St", "lots", "0"]),
            cells(&["4"]),
            cells(&["5", "Barn", "Farm Rd", "80"]),
        ];

        let parsed = parse_rows::<Venue>(&rows);
        let names: Vec<_> = parsed.items.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Main Hall", "Barn"]);

        let error_rows: Vec<_> = parsed.errors.iter().map(RowError::row).collect();
        assert_eq!(error_rows, vec![4, 5, 6]);
    }
}
