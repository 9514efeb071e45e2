//! The canonical directory as a CSV file.

use std::path::Path;

use fairways_recon::{DirectoryStore, StoreError};

use crate::csv::Table;

/// Directory backed by one CSV file. Every write is saved immediately.
/// Formulas are stored as their cell text.
#[derive(Debug)]
pub struct CsvDirectory {
    table: Table,
}

impl CsvDirectory {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let table = Table::load(path)?;
        log::debug!("opened directory {} ({} rows)", path.display(), table.rows.len());
        Ok(Self { table })
    }

    pub fn path(&self) -> &Path {
        self.table.path()
    }
}

impl DirectoryStore for CsvDirectory {
    fn read_header_row(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.table.rows.first().cloned().unwrap_or_default())
    }

    fn read_all_rows(&self) -> Result<Vec<Vec<String>>, StoreError> {
        Ok(self.table.rows.clone())
    }

    fn read_row(&self, row: usize) -> Result<Vec<String>, StoreError> {
        self.table
            .row(row)
            .cloned()
            .ok_or_else(|| StoreError::new("read_row", format!("row {row} does not exist")))
    }

    fn write_header_row(&mut self, headers: &[String]) -> Result<(), StoreError> {
        match self.table.rows.first_mut() {
            Some(first) => *first = headers.to_vec(),
            None => self.table.rows.push(headers.to_vec()),
        }
        self.table.save()
    }

    fn write_cell(&mut self, row: usize, col: usize, value: &str) -> Result<(), StoreError> {
        self.table.set(row, col, value)?;
        self.table.save()
    }

    fn write_formula(&mut self, row: usize, col: usize, formula: &str) -> Result<(), StoreError> {
        self.table.set(row, col, formula)?;
        self.table.save()
    }

    fn append_row(&mut self, values: &[String]) -> Result<usize, StoreError> {
        if self.table.rows.is_empty() {
            return Err(StoreError::new("append_row", "directory has no header row"));
        }
        self.table.rows.push(values.to_vec());
        self.table.save()?;
        Ok(self.table.rows.len())
    }
}
