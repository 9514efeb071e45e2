// CSV table load/save shared by the file-backed stores

use std::path::{Path, PathBuf};

use fairways_recon::StoreError;

/// A whole CSV file held in memory. Row 0 is the header row.
#[derive(Debug, Clone)]
pub struct Table {
    path: PathBuf,
    delimiter: u8,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Load `path`. A missing file is an empty table that will be created on
    /// first save.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            log::debug!("{} does not exist yet, starting empty", path.display());
            return Ok(Self { path: path.to_path_buf(), delimiter: b',', rows: Vec::new() });
        }
        let content = read_export(path).map_err(|e| StoreError::new("load", e))?;
        let delimiter = sniff_delimiter(&content);
        let rows = parse(&content, delimiter).map_err(|e| StoreError::new("load", e))?;
        Ok(Self { path: path.to_path_buf(), delimiter, rows })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cell at 1-based `row`, 0-based `col`, growing the table as needed.
    pub fn set(&mut self, row: usize, col: usize, value: &str) -> Result<(), StoreError> {
        let index = row
            .checked_sub(1)
            .ok_or_else(|| StoreError::new("write_cell", "row numbers start at 1"))?;
        if self.rows.len() <= index {
            self.rows.resize(index + 1, Vec::new());
        }
        let cells = &mut self.rows[index];
        if cells.len() <= col {
            cells.resize(col + 1, String::new());
        }
        cells[col] = value.to_string();
        Ok(())
    }

    pub fn row(&self, row: usize) -> Option<&Vec<String>> {
        row.checked_sub(1).and_then(|i| self.rows.get(i))
    }

    /// Write the table back, replacing the file only once the new content is
    /// fully on disk.
    pub fn save(&self) -> Result<(), StoreError> {
        let err = |e: String| StoreError::new("save", format!("{}: {e}", self.path.display()));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| err(e.to_string()))?;
        }
        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::WriterBuilder::new()
                .delimiter(self.delimiter)
                .flexible(true)
                .from_path(&tmp)
                .map_err(|e| err(e.to_string()))?;
            for row in &self.rows {
                // An empty record would be written as a bare newline and vanish on reload
                if row.is_empty() {
                    writer.write_record([""]).map_err(|e| err(e.to_string()))?;
                } else {
                    writer.write_record(row).map_err(|e| err(e.to_string()))?;
                }
            }
            writer.flush().map_err(|e| err(e.to_string()))?;
        }
        std::fs::rename(&tmp, &self.path).map_err(|e| err(e.to_string()))?;
        Ok(())
    }
}

fn parse(content: &str, delimiter: u8) -> Result<Vec<Vec<String>>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        if row.len() == 1 && row[0].is_empty() {
            row.clear();
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Delimiter of a directory or intake export, read off its header row.
/// Commas win ties.
fn sniff_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or("");
    let width = |delimiter: u8| {
        csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .from_reader(header.as_bytes())
            .records()
            .next()
            .and_then(Result::ok)
            .map_or(0, |r| r.len())
    };

    let mut best = (b',', width(b','));
    for delimiter in [b'\t', b';'] {
        let w = width(delimiter);
        if w > best.1 {
            best = (delimiter, w);
        }
    }
    best.0
}

/// File contents as UTF-8 without a BOM. Excel writes CSV as Windows-1252
/// unless told otherwise.
fn read_export(path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    let (text, _, malformed) = encoding_rs::UTF_8.decode(&bytes);
    if !malformed {
        return Ok(text.into_owned());
    }
    log::debug!("{} is not UTF-8, reading as Windows-1252", path.display());
    let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(&bytes);
    Ok(text.into_owned())
}
