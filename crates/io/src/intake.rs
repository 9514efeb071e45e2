//! Form responses as a CSV file, with approval status columns.

use std::path::Path;

use chrono::{Local, NaiveDateTime};
use fairways_recon::approval::{
    StatusUpdate, APPROVAL_TIMESTAMP_COLUMN, APPROVED_BY_COLUMN, STATUS_COLUMN,
};
use fairways_recon::fields;
use fairways_recon::model::TIMESTAMP_FORMAT;
use fairways_recon::{IntakeRecord, IntakeStore, StoreError};

use crate::csv::Table;

#[derive(Debug)]
pub struct CsvIntake {
    table: Table,
}

impl CsvIntake {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self { table: Table::load(path)? })
    }

    pub fn headers(&self) -> &[String] {
        self.table.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Last submission row, if any.
    pub fn last_row(&self) -> Option<usize> {
        (self.table.rows.len() > 1).then_some(self.table.rows.len())
    }

    /// Current text of a status column for `row`.
    pub fn status_of(&self, row: usize) -> Option<&str> {
        let col = self.column(STATUS_COLUMN)?;
        self.table.row(row)?.get(col).map(String::as_str).filter(|s| !s.is_empty())
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.headers().iter().position(|h| h == name)
    }

    /// Position of `name`, appending it to the header row when missing.
    fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(col) = self.column(name) {
            return col;
        }
        if self.table.rows.is_empty() {
            self.table.rows.push(Vec::new());
        }
        let headers = &mut self.table.rows[0];
        while headers.last().is_some_and(|h| h.is_empty()) {
            headers.pop();
        }
        headers.push(name.to_string());
        log::info!("added intake column '{name}'");
        headers.len() - 1
    }
}

impl IntakeStore for CsvIntake {
    fn read_record(&self, row: usize) -> Result<IntakeRecord, StoreError> {
        if row < 2 {
            return Err(StoreError::new("read_record", format!("row {row} is not a submission row")));
        }
        let values = self
            .table
            .row(row)
            .ok_or_else(|| StoreError::new("read_record", format!("intake row {row} does not exist")))?;

        let submitted_at = self
            .column(fields::TIMESTAMP)
            .and_then(|col| values.get(col))
            .and_then(|v| NaiveDateTime::parse_from_str(v.trim(), TIMESTAMP_FORMAT).ok())
            .unwrap_or_else(|| Local::now().naive_local());

        Ok(IntakeRecord::from_row(submitted_at, self.headers(), values))
    }

    fn set_status(&mut self, row: usize, update: &StatusUpdate) -> Result<(), StoreError> {
        if self.table.row(row).is_none() || row < 2 {
            return Err(StoreError::new("set_status", format!("intake row {row} does not exist")));
        }
        let status_col = self.ensure_column(STATUS_COLUMN);
        let by_col = self.ensure_column(APPROVED_BY_COLUMN);
        let at_col = self.ensure_column(APPROVAL_TIMESTAMP_COLUMN);

        self.table.set(row, status_col, update.status.as_str())?;
        if let Some(by) = &update.approved_by {
            self.table.set(row, by_col, by)?;
        }
        if let Some(at) = update.at {
            self.table.set(row, at_col, &at.format(TIMESTAMP_FORMAT).to_string())?;
        }
        self.table.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fairways_recon::approval::ApprovalStatus;
    use tempfile::tempdir;

    const RESPONSES: &str = "\
Timestamp,First Name,Last Name,Occupant Email Address
11/08/2025 06:15:00,Ann,One,ann@x.com
,Bob,Two,bob@x.com
";

    fn intake() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("responses.csv");
        std::fs::write(&path, RESPONSES).unwrap();
        (dir, path)
    }

    #[test]
    fn reads_submission() {
        let (_dir, path) = intake();
        let store = CsvIntake::open(&path).unwrap();
        let rec = store.read_record(2).unwrap();
        assert_eq!(rec.get("First Name").map(|v| v.to_string()).as_deref(), Some("Ann"));
        assert_eq!(
            rec.submitted_at,
            NaiveDate::from_ymd_opt(2025, 11, 8).unwrap().and_hms_opt(6, 15, 0).unwrap()
        );
        assert_eq!(store.last_row(), Some(3));
        assert!(store.read_record(1).is_err());
        assert!(store.read_record(4).is_err());
    }

    #[test]
    fn status_columns_created_on_demand() {
        let (_dir, path) = intake();
        let mut store = CsvIntake::open(&path).unwrap();
        store.set_status(3, &StatusUpdate::pending()).unwrap();

        let at = NaiveDate::from_ymd_opt(2025, 11, 9).unwrap().and_hms_opt(8, 0, 0).unwrap();
        store
            .set_status(3, &StatusUpdate::decided(ApprovalStatus::Approved, "board@x.com", at))
            .unwrap();

        let reopened = CsvIntake::open(&path).unwrap();
        assert_eq!(
            &reopened.headers()[4..],
            &["Approval Status", "Approved By", "Approval Timestamp"]
        );
        assert_eq!(reopened.status_of(3), Some("Approved"));
        assert_eq!(reopened.status_of(2), None);
        let row = reopened.table.row(3).unwrap();
        assert_eq!(row[5], "board@x.com");
        assert_eq!(row[6], "11/09/2025 08:00:00");
    }
}
