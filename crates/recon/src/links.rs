//! Computed hyperlink columns written after an insert.
//!
//! Each formula references the new row's own cells by column letter and row
//! number, so the hosting sheet keeps recalculating them when the referenced
//! cells change. No literal record data is ever spliced in.

use crate::config::LinkConfig;
use crate::fields;
use crate::store::column_index;

/// Spreadsheet column letter for a 0-based column index (`0 → A`, `26 → AA`).
pub fn column_letter(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// One formula to write at `(row, column)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFormula {
    pub column: usize,
    pub formula: String,
}

/// Build the map, registry and address-search formulas for sheet row `row`.
///
/// A link whose target or source columns are missing from `headers` is
/// skipped.
pub fn link_formulas(headers: &[String], row: usize, links: &LinkConfig) -> Vec<LinkFormula> {
    if !links.enabled {
        return Vec::new();
    }

    let cell = |col: usize| format!("{}{row}", column_letter(col));
    let address = column_index(headers, fields::ADDRESS);
    let parcel = column_index(headers, fields::PARCEL);
    let mut out = Vec::new();

    if let (Some(target), Some(addr)) = (column_index(headers, &links.map_column), address) {
        out.push(LinkFormula {
            column: target,
            formula: format!(
                "=HYPERLINK(CONCATENATE(\"{}\",{},\"{}\"),\"Map\")",
                links.map_base,
                cell(addr),
                links.locality
            ),
        });
    }

    if let (Some(target), Some(parcel)) = (column_index(headers, &links.registry_column), parcel) {
        out.push(LinkFormula {
            column: target,
            formula: format!(
                "=HYPERLINK(CONCATENATE(\"{}\",{}),\"{}\")",
                links.registry_base,
                cell(parcel),
                links.registry_label
            ),
        });
    }

    let street = (
        column_index(headers, fields::ST_NUMBER),
        column_index(headers, fields::ST_NAME),
        column_index(headers, fields::ST_TYPE),
    );
    if let (Some(target), (Some(no), Some(name), Some(kind))) =
        (column_index(headers, &links.search_column), street)
    {
        let label = match (&links.reference_range, parcel, address) {
            (Some(range), Some(parcel), _) => format!("VLOOKUP({},{range},2,FALSE)", cell(parcel)),
            (_, _, Some(addr)) => cell(addr),
            _ => "\"Search\"".to_string(),
        };
        out.push(LinkFormula {
            column: target,
            formula: format!(
                "=HYPERLINK(CONCATENATE(\"{}\",{},\"+\",{},\"+\",{},\"{}\"),{label})",
                links.search_base,
                cell(no),
                cell(name),
                cell(kind),
                links.search_suffix
            ),
        });
    }

    out
}
