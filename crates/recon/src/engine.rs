use crate::config::ReconOptions;
use crate::diff::diff;
use crate::error::ReconError;
use crate::fields;
use crate::formatting::{apply_formatting, apply_insert_defaults};
use crate::links::link_formulas;
use crate::mapping::map_to_canonical;
use crate::matcher::locate;
use crate::model::{
    ChangeRecord, IntakeRecord, MatchResult, ReconAction, ReconOutcome, ReconPlan, ReconState, Record,
};
use crate::store::{column_index, DirectoryStore, Snapshot};

/// Map → match → diff/format → update-or-insert → derived link columns.
///
/// Every run reads a fresh snapshot and writes back synchronously; nothing is
/// cached between runs. Two runs against the same directory are not isolated
/// from each other (read-then-write race), and a store failure midway can
/// leave a partially written row: the store offers no transactions.
pub struct Reconciler {
    options: ReconOptions,
}

/// A plan plus the exact writes needed to carry it out.
struct Prepared {
    plan: ReconPlan,
    headers: Vec<String>,
    create_headers: bool,
    /// `(column, value)` for the update path.
    cell_writes: Vec<(usize, String)>,
}

impl Reconciler {
    pub fn new(options: ReconOptions) -> Self {
        Self { options }
    }

    /// Reconcile one intake record into the directory.
    pub fn reconcile_and_apply<S: DirectoryStore + ?Sized>(
        &self,
        store: &mut S,
        intake: &IntakeRecord,
    ) -> Result<ReconOutcome, ReconError> {
        let mut state = ReconState::Received;
        match self.apply(store, intake, &mut state) {
            Ok(outcome) => {
                advance(&mut state, ReconState::Done);
                Ok(outcome)
            }
            Err(e) => {
                log::error!("reconciliation failed while {state}: {e}");
                advance(&mut state, ReconState::Failed);
                Err(e)
            }
        }
    }

    /// Compute what an approval would do, without writing.
    pub fn preview<S: DirectoryStore + ?Sized>(
        &self,
        store: &S,
        intake: &IntakeRecord,
    ) -> Result<ReconPlan, ReconError> {
        let mut state = ReconState::Received;
        let snapshot = Snapshot::read(store)?;
        let prepared = self.prepare(&snapshot, intake, &mut state)?;
        Ok(prepared.plan)
    }

    /// Like [`preview`](Self::preview), but also fails wherever
    /// `reconcile_and_apply` would refuse before its first write.
    pub fn check<S: DirectoryStore + ?Sized>(
        &self,
        store: &S,
        intake: &IntakeRecord,
    ) -> Result<ReconPlan, ReconError> {
        let plan = self.preview(store, intake)?;
        self.check_ambiguity(&plan.match_info)?;
        Ok(plan)
    }

    fn apply<S: DirectoryStore + ?Sized>(
        &self,
        store: &mut S,
        intake: &IntakeRecord,
        state: &mut ReconState,
    ) -> Result<ReconOutcome, ReconError> {
        let snapshot = Snapshot::read(store)?;
        let prepared = self.prepare(&snapshot, intake, state)?;
        self.check_ambiguity(&prepared.plan.match_info)?;

        let Prepared { plan, headers, create_headers, cell_writes } = prepared;
        let row = match plan.action {
            ReconAction::Updated => {
                let row = plan.match_info.row.ok_or_else(|| {
                    ReconError::Schema("matched record has no row number".into())
                })?;
                for (col, value) in &cell_writes {
                    store.write_cell(row, *col, value)?;
                }
                log::info!("updated {} field(s) in row {row}", cell_writes.len());
                advance(state, ReconState::Updated);
                row
            }
            ReconAction::Inserted => {
                if create_headers {
                    store.write_header_row(&headers)?;
                    log::info!("created header row with {} column(s)", headers.len());
                }
                let row = store.append_row(&plan.record.project(&headers))?;
                for link in link_formulas(&headers, row, &self.options.links) {
                    store.write_formula(row, link.column, &link.formula)?;
                }
                log::info!("inserted new record at row {row}");
                advance(state, ReconState::Inserted);
                row
            }
        };

        Ok(ReconOutcome {
            action: plan.action,
            row,
            changes: plan.changes,
            match_info: plan.match_info,
        })
    }

    fn prepare(
        &self,
        snapshot: &Snapshot,
        intake: &IntakeRecord,
        state: &mut ReconState,
    ) -> Result<Prepared, ReconError> {
        let mut record = map_to_canonical(intake);
        advance(state, ReconState::Mapped);

        let match_info = locate(snapshot, &record);
        if match_info.found {
            advance(state, ReconState::Matched);
            apply_formatting(&mut record);
            Ok(prepare_update(snapshot, record, match_info))
        } else {
            advance(state, ReconState::Unmatched);
            self.prepare_insert(snapshot, record, match_info)
        }
    }

    fn prepare_insert(
        &self,
        snapshot: &Snapshot,
        mut record: Record,
        match_info: MatchResult,
    ) -> Result<Prepared, ReconError> {
        apply_formatting(&mut record);
        apply_insert_defaults(&mut record, &self.options.defaults);

        let parcel = parcel_for_address(snapshot, record.value(fields::ADDRESS))
            .or_else(|| match_info.parcel.clone())
            .unwrap_or_default();
        if !parcel.is_empty() {
            log::info!("new record inherits parcel {parcel}");
        }
        record.set(fields::PARCEL, parcel);

        let create_headers = snapshot.has_no_headers();
        let headers = if create_headers {
            if record.is_empty() {
                return Err(ReconError::Schema(
                    "directory has no header row and the record has no fields".into(),
                ));
            }
            record.field_names()
        } else {
            snapshot.headers.clone()
        };

        let changes: Vec<ChangeRecord> = diff(&record, None)
            .into_iter()
            .filter(|c| column_index(&headers, &c.field).is_some())
            .collect();

        Ok(Prepared {
            plan: ReconPlan { action: ReconAction::Inserted, record, changes, match_info },
            headers,
            create_headers,
            cell_writes: Vec::new(),
        })
    }

    fn check_ambiguity(&self, match_info: &MatchResult) -> Result<(), ReconError> {
        if !self.options.fail_on_ambiguous || !match_info.is_ambiguous() {
            return Ok(());
        }
        let mut rows: Vec<usize> = match_info.row.into_iter().collect();
        rows.extend(&match_info.ambiguous_rows);
        Err(ReconError::AmbiguousMatch { field: match_info.matched_by.to_string(), rows })
    }
}

/// Changes and cell writes for a matched row, in header order. Only columns
/// the directory has are touched; blank incoming values never are.
fn prepare_update(snapshot: &Snapshot, record: Record, match_info: MatchResult) -> Prepared {
    let candidates = diff(&record, match_info.existing.as_ref());

    let mut changes: Vec<ChangeRecord> = Vec::new();
    let mut cell_writes = Vec::new();
    for (col, header) in snapshot.headers.iter().enumerate() {
        let Some(change) = candidates.iter().find(|c| &c.field == header) else {
            continue;
        };
        log::debug!("{header}: \"{}\" -> \"{}\"", change.old_value, change.new_value);
        cell_writes.push((col, change.new_value.clone()));
        if !changes.iter().any(|c| &c.field == header) {
            changes.push(change.clone());
        }
    }
    if changes.is_empty() {
        log::info!("no changes detected, all fields match existing data");
    }

    Prepared {
        plan: ReconPlan { action: ReconAction::Updated, record, changes, match_info },
        headers: snapshot.headers.clone(),
        create_headers: false,
        cell_writes,
    }
}

/// Parcel of the first row whose `Address` equals `address`
/// (case-insensitive, trimmed) and whose parcel is non-empty.
fn parcel_for_address(snapshot: &Snapshot, address: &str) -> Option<String> {
    let want = address.trim().to_uppercase();
    if want.is_empty() {
        return None;
    }
    let addr_col = snapshot.column(fields::ADDRESS)?;
    let parcel_col = snapshot.column(fields::PARCEL)?;

    (0..snapshot.rows.len()).find_map(|i| {
        let parcel = snapshot.cell(i, Some(parcel_col)).trim();
        let same = snapshot.cell(i, Some(addr_col)).trim().to_uppercase() == want;
        (same && !parcel.is_empty()).then(|| parcel.to_string())
    })
}

fn advance(state: &mut ReconState, next: ReconState) {
    log::debug!("reconcile: {state} -> {next}");
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChangeType, MatchedBy};
    use crate::store::{MemoryDirectory, Write};
    use chrono::NaiveDate;

    fn intake(pairs: &[(&str, &str)]) -> IntakeRecord {
        let at = NaiveDate::from_ymd_opt(2025, 11, 8).unwrap().and_hms_opt(9, 0, 0).unwrap();
        pairs.iter().fold(IntakeRecord::new(at), |r, (k, v)| r.with(k, *v))
    }

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter().map(|r| r.iter().map(|s| s.to_string()).collect()).collect()
    }

    #[test]
    fn insert_into_empty_directory() {
        let mut dir = MemoryDirectory::new();
        let rec = intake(&[
            ("First Name", "A"),
            ("Last Name", "B"),
            ("Unit Address", "5 Elm St"),
            ("Occupant Email Address", "a@x.com"),
        ]);
        let out = Reconciler::new(ReconOptions::default()).reconcile_and_apply(&mut dir, &rec).unwrap();

        assert_eq!(out.action, ReconAction::Inserted);
        assert_eq!(out.row, 2);
        assert!(!out.match_info.found);
        assert!(matches!(dir.writes[0], Write::Header(_)));

        let snap = Snapshot::from_rows(dir.rows().to_vec());
        let row = snap.record(0);
        assert_eq!(row.value("Address"), "5 ELM ST");
        assert_eq!(row.value("ST #"), "5");
        assert_eq!(row.value("Email Type-1"), "Home");
        assert_eq!(row.value("Status"), "Sold");
        assert_eq!(row.value("Newsletter"), "Email");
        assert_eq!(row.value("Entry Type"), "Occupant");
        assert_eq!(row.value("Parcel"), "");
        assert!(snap.column("Parcel").is_some());
        assert!(out.changes.iter().all(|c| c.change_type == ChangeType::Add));
    }

    #[test]
    fn update_touches_only_changed_column() {
        let mut dir = MemoryDirectory::from_rows(rows(&[
            &["Parcel", "Address", "First Name", "Last Name", "Email-1", "Home Phone", "Status"],
            &["P1", "5 ELM ST", "A", "B", "a@x.com", "555-1111", "Sold"],
        ]));
        let rec = intake(&[
            ("First Name", "A"),
            ("Last Name", "B"),
            ("Occupant Email Address", "a@x.com"),
            ("Phone number", "555-2222"),
        ]);
        let out = Reconciler::new(ReconOptions::default()).reconcile_and_apply(&mut dir, &rec).unwrap();

        assert_eq!(out.action, ReconAction::Updated);
        assert_eq!(out.match_info.matched_by, MatchedBy::Email);
        assert_eq!(out.changes.len(), 1);
        assert_eq!(out.changes[0].field, "Home Phone");
        assert_eq!(out.changes[0].change_type, ChangeType::Update);
        assert_eq!(dir.writes, vec![Write::Cell { row: 2, col: 5, value: "555-2222".into() }]);
        assert_eq!(dir.rows()[1][6], "Sold");
    }

    #[test]
    fn update_leaves_blank_default_columns_alone() {
        let mut dir = MemoryDirectory::from_rows(rows(&[
            &["Email-1", "Home Phone", "Email Type-1", "Newsletter", "Status", "Entry Type"],
            &["a@x.com", "555-1111", "", "", "", ""],
        ]));
        let rec = intake(&[("Occupant Email Address", "a@x.com"), ("Phone number", "555-2222")]);
        let out = Reconciler::new(ReconOptions::default()).reconcile_and_apply(&mut dir, &rec).unwrap();

        assert_eq!(out.action, ReconAction::Updated);
        assert_eq!(out.changes.len(), 1);
        assert_eq!(dir.writes, vec![Write::Cell { row: 2, col: 1, value: "555-2222".into() }]);
        assert_eq!(dir.rows()[1][2..], ["", "", "", ""]);
    }

    #[test]
    fn check_refuses_what_apply_would() {
        let dir = MemoryDirectory::from_rows(rows(&[&["Email-1"], &["dup@x.com"], &["dup@x.com"]]));
        let rec = intake(&[("Occupant Email Address", "dup@x.com")]);
        let strict = Reconciler::new(ReconOptions { fail_on_ambiguous: true, ..ReconOptions::default() });
        assert!(strict.preview(&dir, &rec).unwrap().match_info.is_ambiguous());
        assert!(matches!(strict.check(&dir, &rec), Err(ReconError::AmbiguousMatch { .. })));
        assert!(Reconciler::new(ReconOptions::default()).check(&dir, &rec).is_ok());
    }

    #[test]
    fn insert_inherits_parcel_from_address() {
        let mut dir = MemoryDirectory::from_rows(rows(&[
            &["Parcel", "Address", "ST #", "ST Name", "ST Type", "First Name", "Last Name", "Email-1", "Map"],
            &["P7", "5 ELM ST", "5", "ELM", "ST", "Ann", "One", "ann@x.com", ""],
        ]));
        let rec = intake(&[("Unit Address", "5 elm st"), ("Occupant Email Address", "new@x.com")]);
        let out = Reconciler::new(ReconOptions::default()).reconcile_and_apply(&mut dir, &rec).unwrap();

        assert_eq!(out.action, ReconAction::Inserted);
        assert_eq!(out.row, 3);
        assert_eq!(dir.rows()[2][0], "P7");
        assert_eq!(
            dir.rows()[2][8],
            "=HYPERLINK(CONCATENATE(\"https://www.google.com/maps/place/\",B3,\", Mount Vernon, OH 43050\"),\"Map\")"
        );
    }

    #[test]
    fn preview_does_not_write() {
        let dir = MemoryDirectory::new();
        let plan = Reconciler::new(ReconOptions::default())
            .preview(&dir, &intake(&[("First Name", "A")]))
            .unwrap();
        assert!(plan.is_new_entry());
        assert!(dir.writes.is_empty());
        assert_eq!(plan.record.value("Status"), "Sold");
    }

    #[test]
    fn ambiguity_policy() {
        let data = rows(&[
            &["Email-1", "Home Phone"],
            &["dup@x.com", "1"],
            &["dup@x.com", "2"],
        ]);
        let rec = intake(&[("Occupant Email Address", "dup@x.com"), ("Phone number", "3")]);

        let mut lenient = MemoryDirectory::from_rows(data.clone());
        let out = Reconciler::new(ReconOptions::default()).reconcile_and_apply(&mut lenient, &rec).unwrap();
        assert_eq!(out.row, 2);

        let strict = ReconOptions { fail_on_ambiguous: true, ..ReconOptions::default() };
        let mut dir = MemoryDirectory::from_rows(data);
        let err = Reconciler::new(strict).reconcile_and_apply(&mut dir, &rec).unwrap_err();
        match err {
            ReconError::AmbiguousMatch { rows, .. } => assert_eq!(rows, vec![2, 3]),
            other => panic!("expected ambiguity, got {other}"),
        }
        assert!(dir.writes.is_empty());
    }

    #[test]
    fn store_failure_propagates() {
        let mut dir = MemoryDirectory::new().fail_on("append_row");
        let err = Reconciler::new(ReconOptions::default())
            .reconcile_and_apply(&mut dir, &intake(&[("First Name", "A")]))
            .unwrap_err();
        match err {
            ReconError::Store(e) => assert_eq!(e.op, "append_row"),
            other => panic!("expected store error, got {other}"),
        }
    }

    #[test]
    fn parcel_lookup_ignores_rows_without_parcel() {
        let snap = Snapshot::from_rows(rows(&[
            &["Parcel", "Address"],
            &["", "5 ELM ST"],
            &["P2", " 5 elm st "],
        ]));
        assert_eq!(parcel_for_address(&snap, "5 ELM ST").as_deref(), Some("P2"));
        assert_eq!(parcel_for_address(&snap, ""), None);
    }
}
