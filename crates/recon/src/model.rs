use std::fmt;

use chrono::NaiveDateTime;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Rendering used whenever a timestamp becomes a directory cell.
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// Prefix marking metadata keys that never take part in diffs or output tables.
pub const METADATA_PREFIX: char = '_';

// ---------------------------------------------------------------------------
// Intake
// ---------------------------------------------------------------------------

/// A raw form value: free text or a submission timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Text(String),
    Timestamp(NaiveDateTime),
}

impl RawValue {
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::Timestamp(_) => false,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// One form submission, exactly as the intake form produced it.
///
/// Keys are whatever the form defined; order follows the form's columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeRecord {
    pub submitted_at: NaiveDateTime,
    fields: Vec<(String, RawValue)>,
}

impl IntakeRecord {
    pub fn new(submitted_at: NaiveDateTime) -> Self {
        Self { submitted_at, fields: Vec::new() }
    }

    /// Build from an intake header row and the matching value row.
    /// Missing trailing values become empty text.
    pub fn from_row(submitted_at: NaiveDateTime, headers: &[String], values: &[String]) -> Self {
        let mut record = Self::new(submitted_at);
        for (i, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let value = values.get(i).cloned().unwrap_or_default();
            record.insert(header.clone(), RawValue::Text(value));
        }
        record
    }

    pub fn with(mut self, field: &str, value: impl Into<RawValue>) -> Self {
        self.insert(field.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, field: String, value: RawValue) {
        match self.fields.iter_mut().find(|(k, _)| *k == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&RawValue> {
        self.fields.iter().find(|(k, _)| k == field).map(|(_, v)| v)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Canonical / directory records
// ---------------------------------------------------------------------------

/// Ordered field-name → value mapping.
///
/// Used both for canonical records built from an intake and for directory
/// rows read back under the dynamic header row. Lookups on absent fields
/// yield the empty string, never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zip a directory header row with one data row. A duplicated header
    /// keeps its first column, the same one `column_index` resolves to.
    pub fn from_row(headers: &[String], row: &[String]) -> Self {
        let mut record = Self::new();
        for (i, header) in headers.iter().enumerate() {
            if record.contains(header) {
                continue;
            }
            record.set(header, row.get(i).map(String::as_str).unwrap_or(""));
        }
        record
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.iter().find(|(k, _)| k == field).map(|(_, v)| v.as_str())
    }

    /// Value of `field`, or `""` when absent.
    pub fn value(&self, field: &str) -> &str {
        self.get(field).unwrap_or("")
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == field)
    }

    /// Replace in place (keeping position) or append.
    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| k == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field.to_string(), value)),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|(k, _)| k.clone()).collect()
    }

    /// Values laid out under `headers`; columns the record lacks are empty.
    pub fn project(&self, headers: &[String]) -> Vec<String> {
        headers.iter().map(|h| self.value(h).to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (k, v) in iter {
            let k: String = k.into();
            record.set(&k, v);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddressComponents {
    pub street_number: String,
    pub street_name: String,
    pub street_type: String,
}

impl AddressComponents {
    /// All three parts present.
    pub fn is_complete(&self) -> bool {
        !self.street_number.is_empty() && !self.street_name.is_empty() && !self.street_type.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.street_number.is_empty() && self.street_name.is_empty() && self.street_type.is_empty()
    }

    pub fn to_uppercase(&self) -> Self {
        Self {
            street_number: self.street_number.to_uppercase(),
            street_name: self.street_name.to_uppercase(),
            street_type: self.street_type.to_uppercase(),
        }
    }

    /// `"number name type"`.
    pub fn recompose(&self) -> String {
        format!("{} {} {}", self.street_number, self.street_name, self.street_type)
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedBy {
    Email,
    Name,
    None,
}

impl fmt::Display for MatchedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email => write!(f, "Email-1"),
            Self::Name => write!(f, "First Name + Last Name"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Outcome of locating an intake record in the directory. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub found: bool,
    /// 1-based sheet row of the matched record.
    pub row: Option<usize>,
    pub matched_by: MatchedBy,
    /// Matched row's parcel, or the address-narrowed parcel when unmatched.
    pub parcel: Option<String>,
    pub address: Option<String>,
    pub existing: Option<Record>,
    /// Other rows that satisfied the winning tier, in dataset order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ambiguous_rows: Vec<usize>,
}

impl MatchResult {
    pub fn not_found(parcel: Option<String>, address: Option<String>) -> Self {
        Self {
            found: false,
            row: None,
            matched_by: MatchedBy::None,
            parcel,
            address,
            existing: None,
            ambiguous_rows: Vec::new(),
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        !self.ambiguous_rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Changes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Add,
    Update,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "ADD"),
            Self::Update => write!(f, "UPDATE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub field: String,
    pub old_value: String,
    pub new_value: String,
    pub change_type: ChangeType,
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconAction {
    Inserted,
    Updated,
}

impl fmt::Display for ReconAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inserted => write!(f, "INSERTED"),
            Self::Updated => write!(f, "UPDATED"),
        }
    }
}

/// Orchestrator lifecycle. `Failed` is reachable from every state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconState {
    Received,
    Mapped,
    Matched,
    Unmatched,
    Updated,
    Inserted,
    Done,
    Failed,
}

impl fmt::Display for ReconState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Received => "received",
            Self::Mapped => "mapped",
            Self::Matched => "matched",
            Self::Unmatched => "unmatched",
            Self::Updated => "updated",
            Self::Inserted => "inserted",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Result of an applied reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct ReconOutcome {
    pub action: ReconAction,
    /// Sheet row that was written.
    pub row: usize,
    pub changes: Vec<ChangeRecord>,
    pub match_info: MatchResult,
}

/// What an approval would do, computed without touching the directory.
#[derive(Debug, Clone, Serialize)]
pub struct ReconPlan {
    pub action: ReconAction,
    /// Canonical record after formatting (and insert defaults when inserting).
    pub record: Record,
    pub changes: Vec<ChangeRecord>,
    pub match_info: MatchResult,
}

impl ReconPlan {
    pub fn is_new_entry(&self) -> bool {
        self.action == ReconAction::Inserted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn set_keeps_field_position() {
        let mut r: Record = [("A", "1"), ("B", "2")].into_iter().collect();
        r.set("A", "9");
        r.set("C", "3");
        assert_eq!(r.field_names(), headers(&["A", "B", "C"]));
        assert_eq!(r.value("A"), "9");
        assert_eq!(r.value("missing"), "");
        assert_eq!(r.project(&headers(&["C", "X", "A"])), headers(&["3", "", "9"]));
    }

    #[test]
    fn short_rows_read_as_empty() {
        let r = Record::from_row(&headers(&["A", "B"]), &headers(&["1"]));
        assert_eq!(r.value("B"), "");
        assert!(r.contains("B"));
    }

    #[test]
    fn duplicate_header_reads_first_column() {
        let r = Record::from_row(&headers(&["Email-1", "Email-1"]), &headers(&["a@x.com", "b@x.com"]));
        assert_eq!(r.value("Email-1"), "a@x.com");
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn json_shape() {
        let r: Record = [("Zeta", "1"), ("Alpha", "2")].into_iter().collect();
        assert_eq!(serde_json::to_string(&r).unwrap(), r#"{"Zeta":"1","Alpha":"2"}"#);

        let change = ChangeRecord {
            field: "Home Phone".into(),
            old_value: "1".into(),
            new_value: "2".into(),
            change_type: ChangeType::Update,
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["change_type"], "UPDATE");
        assert_eq!(serde_json::to_value(MatchedBy::Email).unwrap(), "email");
    }

    #[test]
    fn raw_timestamp_renders_in_directory_format() {
        let ts = chrono::NaiveDate::from_ymd_opt(2025, 3, 4)
            .unwrap()
            .and_hms_opt(5, 6, 7)
            .unwrap();
        assert_eq!(RawValue::Timestamp(ts).to_string(), "03/04/2025 05:06:07");
        assert!(RawValue::from("  ").is_blank());
    }
}
