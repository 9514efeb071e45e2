//! Tiered lookup of an incoming record in the directory.
//!
//! 1. Address narrowing: rows whose `ST #`/`ST Name`/`ST Type` equal the
//!    parsed query address give a parcel; every row on that parcel becomes a
//!    candidate (multi-unit buildings share one parcel).
//! 2. No address hit: every data row is a candidate.
//! 3. `Email-1` match within the candidates.
//! 4. `First Name` + `Last Name` match within the candidates.
//!
//! The earliest row in dataset order wins every tier. A missing column or an
//! empty query key skips its tier; nothing here fails.

use crate::address;
use crate::fields;
use crate::model::{MatchResult, MatchedBy, Record};
use crate::store::Snapshot;

pub fn locate(snapshot: &Snapshot, query: &Record) -> MatchResult {
    let parcel_col = snapshot.column(fields::PARCEL);
    let query_address = query.value(fields::ADDRESS).trim();

    let (candidates, narrowed_parcel) = narrow_by_address(snapshot, query_address);
    let candidates = if candidates.is_empty() {
        log::debug!("no address match, searching all {} rows", snapshot.rows.len());
        (0..snapshot.rows.len()).collect()
    } else {
        candidates
    };

    // Email tier
    let email = query.value(fields::EMAIL).trim().to_lowercase();
    match snapshot.column(fields::EMAIL) {
        Some(col) if !email.is_empty() => {
            let hits: Vec<usize> = candidates
                .iter()
                .copied()
                .filter(|&i| {
                    let v = snapshot.cell(i, Some(col)).trim();
                    !v.is_empty() && v.to_lowercase() == email
                })
                .collect();
            if let Some((&first, rest)) = hits.split_first() {
                return found(snapshot, first, rest, MatchedBy::Email, parcel_col);
            }
        }
        None => log::warn!("directory has no '{}' column, skipping email match", fields::EMAIL),
        _ => {}
    }

    // Name tier
    let first_name = query.value(fields::FIRST_NAME).trim().to_lowercase();
    let last_name = query.value(fields::LAST_NAME).trim().to_lowercase();
    match (snapshot.column(fields::FIRST_NAME), snapshot.column(fields::LAST_NAME)) {
        (Some(fc), Some(lc)) if !first_name.is_empty() && !last_name.is_empty() => {
            let hits: Vec<usize> = candidates
                .iter()
                .copied()
                .filter(|&i| {
                    let f = snapshot.cell(i, Some(fc)).trim();
                    let l = snapshot.cell(i, Some(lc)).trim();
                    !f.is_empty()
                        && !l.is_empty()
                        && f.to_lowercase() == first_name
                        && l.to_lowercase() == last_name
                })
                .collect();
            if let Some((&first, rest)) = hits.split_first() {
                return found(snapshot, first, rest, MatchedBy::Name, parcel_col);
            }
        }
        (None, _) | (_, None) => {
            log::warn!("directory lacks name columns, skipping name match");
        }
        _ => {}
    }

    match &narrowed_parcel {
        Some(p) => log::info!("no person match; address belongs to parcel {p}"),
        None => log::info!("no person match and address not found in directory"),
    }
    let address = (!query_address.is_empty()).then(|| query_address.to_string());
    MatchResult::not_found(narrowed_parcel, address)
}

/// Candidate rows from the address tier, plus the parcel they share.
///
/// Returns no candidates when the address is incomplete, the `ST` columns
/// are missing, or no row matches.
fn narrow_by_address(snapshot: &Snapshot, query_address: &str) -> (Vec<usize>, Option<String>) {
    let parts = address::parse(query_address).to_uppercase();
    if !parts.is_complete() {
        return (Vec::new(), None);
    }

    let cols = (
        snapshot.column(fields::ST_NUMBER),
        snapshot.column(fields::ST_NAME),
        snapshot.column(fields::ST_TYPE),
    );
    let (Some(no), Some(name), Some(kind)) = cols else {
        log::warn!("directory lacks ST #/ST Name/ST Type columns, skipping address narrowing");
        return (Vec::new(), None);
    };

    let same = |i: usize, col: usize, want: &str| {
        let v = snapshot.cell(i, Some(col)).trim();
        !v.is_empty() && v.to_uppercase() == want
    };
    let address_rows: Vec<usize> = (0..snapshot.rows.len())
        .filter(|&i| {
            same(i, no, &parts.street_number)
                && same(i, name, &parts.street_name)
                && same(i, kind, &parts.street_type)
        })
        .collect();

    let Some(&first) = address_rows.first() else {
        log::debug!("no row at {}", parts.recompose());
        return (Vec::new(), None);
    };

    let parcel_col = snapshot.column(fields::PARCEL);
    let parcel = snapshot.cell(first, parcel_col).trim();
    if parcel.is_empty() {
        log::debug!("address matched {} row(s) without a parcel", address_rows.len());
        return (address_rows, None);
    }

    let on_parcel: Vec<usize> = (0..snapshot.rows.len())
        .filter(|&i| snapshot.cell(i, parcel_col).trim() == parcel)
        .collect();
    log::debug!("parcel {parcel} covers {} row(s)", on_parcel.len());
    (on_parcel, Some(parcel.to_string()))
}

fn found(
    snapshot: &Snapshot,
    index: usize,
    others: &[usize],
    matched_by: MatchedBy,
    parcel_col: Option<usize>,
) -> MatchResult {
    let row = Snapshot::sheet_row(index);
    log::info!("record found by {matched_by} at row {row}");
    if !others.is_empty() {
        log::warn!("{} other row(s) also match by {matched_by}; using row {row}", others.len());
    }

    let non_empty = |s: &str| (!s.trim().is_empty()).then(|| s.trim().to_string());
    MatchResult {
        found: true,
        row: Some(row),
        matched_by,
        parcel: non_empty(snapshot.cell(index, parcel_col)),
        address: non_empty(snapshot.cell(index, snapshot.column(fields::ADDRESS))),
        existing: Some(snapshot.record(index)),
        ambiguous_rows: others.iter().map(|&i| Snapshot::sheet_row(i)).collect(),
    }
}
