//! Collaborator seams: the directory dataset, the intake store and the
//! notification transport, plus in-memory implementations.
//!
//! Rows are 1-based sheet row numbers (row 1 holds the headers); columns are
//! 0-based header positions.

use crate::approval::StatusUpdate;
use crate::error::StoreError;
use crate::model::{IntakeRecord, Record};
use crate::notify::Notification;

/// The canonical directory dataset.
pub trait DirectoryStore {
    fn read_header_row(&self) -> Result<Vec<String>, StoreError>;
    /// Every row including the header row at index 0.
    fn read_all_rows(&self) -> Result<Vec<Vec<String>>, StoreError>;
    fn read_row(&self, row: usize) -> Result<Vec<String>, StoreError>;
    fn write_header_row(&mut self, headers: &[String]) -> Result<(), StoreError>;
    fn write_cell(&mut self, row: usize, col: usize, value: &str) -> Result<(), StoreError>;
    fn write_formula(&mut self, row: usize, col: usize, formula: &str) -> Result<(), StoreError>;
    /// Append after the last row and return the new row's number.
    fn append_row(&mut self, values: &[String]) -> Result<usize, StoreError>;
}

/// Where form submissions and their approval status live.
pub trait IntakeStore {
    fn read_record(&self, row: usize) -> Result<IntakeRecord, StoreError>;
    /// Status columns are created on demand.
    fn set_status(&mut self, row: usize, update: &StatusUpdate) -> Result<(), StoreError>;
}

/// Delivers human-readable messages to administrators.
pub trait Notifier {
    fn send(&mut self, message: &Notification) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Position of the first header named `name`.
pub fn column_index(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

/// A full read of the directory taken at the start of a run.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub headers: Vec<String>,
    /// Data rows only; `rows[i]` is sheet row `i + 2`.
    pub rows: Vec<Vec<String>>,
}

impl Snapshot {
    pub fn from_rows(mut all: Vec<Vec<String>>) -> Self {
        if all.is_empty() {
            return Self::default();
        }
        let headers = all.remove(0);
        Self { headers, rows: all }
    }

    pub fn read<S: DirectoryStore + ?Sized>(store: &S) -> Result<Self, StoreError> {
        Ok(Self::from_rows(store.read_all_rows()?))
    }

    /// No usable header row (absent or all blank).
    pub fn has_no_headers(&self) -> bool {
        self.headers.iter().all(|h| h.trim().is_empty())
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        column_index(&self.headers, name)
    }

    /// Cell text, or `""` when the column is absent or the row is short.
    pub fn cell(&self, index: usize, col: Option<usize>) -> &str {
        col.and_then(|c| self.rows.get(index).and_then(|r| r.get(c)))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn record(&self, index: usize) -> Record {
        let row = self.rows.get(index).map(Vec::as_slice).unwrap_or(&[]);
        Record::from_row(&self.headers, row)
    }

    pub fn sheet_row(index: usize) -> usize {
        index + 2
    }
}

// ---------------------------------------------------------------------------
// In-memory directory
// ---------------------------------------------------------------------------

/// A write performed against a [`MemoryDirectory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Header(Vec<String>),
    Cell { row: usize, col: usize, value: String },
    Formula { row: usize, col: usize, formula: String },
    Append { row: usize, values: Vec<String> },
}

/// Directory held in memory. Formulas are stored as cell text.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    rows: Vec<Vec<String>>,
    /// Every write in order.
    pub writes: Vec<Write>,
    fail_op: Option<String>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        Self { rows, ..Self::default() }
    }

    /// Make the named operation fail from now on.
    pub fn fail_on(mut self, op: &str) -> Self {
        self.fail_op = Some(op.to_string());
        self
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    fn check(&self, op: &str) -> Result<(), StoreError> {
        match &self.fail_op {
            Some(f) if f == op => Err(StoreError::new(op, "injected failure")),
            _ => Ok(()),
        }
    }

    fn set(&mut self, row: usize, col: usize, value: &str) -> Result<(), StoreError> {
        if row == 0 {
            return Err(StoreError::new("write_cell", "row numbers start at 1"));
        }
        if self.rows.len() < row {
            self.rows.resize(row, Vec::new());
        }
        let cells = &mut self.rows[row - 1];
        if cells.len() <= col {
            cells.resize(col + 1, String::new());
        }
        cells[col] = value.to_string();
        Ok(())
    }
}

impl DirectoryStore for MemoryDirectory {
    fn read_header_row(&self) -> Result<Vec<String>, StoreError> {
        self.check("read_header_row")?;
        Ok(self.rows.first().cloned().unwrap_or_default())
    }

    fn read_all_rows(&self) -> Result<Vec<Vec<String>>, StoreError> {
        self.check("read_all_rows")?;
        Ok(self.rows.clone())
    }

    fn read_row(&self, row: usize) -> Result<Vec<String>, StoreError> {
        self.check("read_row")?;
        row.checked_sub(1)
            .and_then(|i| self.rows.get(i))
            .cloned()
            .ok_or_else(|| StoreError::new("read_row", format!("row {row} does not exist")))
    }

    fn write_header_row(&mut self, headers: &[String]) -> Result<(), StoreError> {
        self.check("write_header_row")?;
        match self.rows.first_mut() {
            Some(first) => *first = headers.to_vec(),
            None => self.rows.push(headers.to_vec()),
        }
        self.writes.push(Write::Header(headers.to_vec()));
        Ok(())
    }

    fn write_cell(&mut self, row: usize, col: usize, value: &str) -> Result<(), StoreError> {
        self.check("write_cell")?;
        self.set(row, col, value)?;
        self.writes.push(Write::Cell { row, col, value: value.to_string() });
        Ok(())
    }

    fn write_formula(&mut self, row: usize, col: usize, formula: &str) -> Result<(), StoreError> {
        self.check("write_formula")?;
        self.set(row, col, formula)?;
        self.writes.push(Write::Formula { row, col, formula: formula.to_string() });
        Ok(())
    }

    fn append_row(&mut self, values: &[String]) -> Result<usize, StoreError> {
        self.check("append_row")?;
        self.rows.push(values.to_vec());
        let row = self.rows.len();
        self.writes.push(Write::Append { row, values: values.to_vec() });
        Ok(row)
    }
}

// ---------------------------------------------------------------------------
// In-memory intake + notifier
// ---------------------------------------------------------------------------

/// Intake rows keyed by sheet row, with the last status update per row.
#[derive(Debug, Clone, Default)]
pub struct MemoryIntake {
    pub records: Vec<(usize, IntakeRecord)>,
    pub statuses: Vec<(usize, StatusUpdate)>,
}

impl MemoryIntake {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, row: usize, record: IntakeRecord) -> Self {
        self.records.push((row, record));
        self
    }

    pub fn status(&self, row: usize) -> Option<&StatusUpdate> {
        self.statuses.iter().rev().find(|(r, _)| *r == row).map(|(_, s)| s)
    }
}

impl IntakeStore for MemoryIntake {
    fn read_record(&self, row: usize) -> Result<IntakeRecord, StoreError> {
        self.records
            .iter()
            .find(|(r, _)| *r == row)
            .map(|(_, rec)| rec.clone())
            .ok_or_else(|| StoreError::new("read_record", format!("intake row {row} does not exist")))
    }

    fn set_status(&mut self, row: usize, update: &StatusUpdate) -> Result<(), StoreError> {
        self.statuses.push((row, update.clone()));
        Ok(())
    }
}

/// Keeps every message it is asked to send.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    pub sent: Vec<Notification>,
    pub fail: bool,
}

impl Notifier for MemoryNotifier {
    fn send(&mut self, message: &Notification) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::new("send", "notifier unavailable"));
        }
        self.sent.push(message.clone());
        Ok(())
    }
}
