//! Canonicalization applied to a record before it reaches the directory.

use std::collections::BTreeMap;

use crate::address;
use crate::fields;
use crate::model::Record;

/// Split `Address` into the `ST` columns and rewrite it in canonical form.
///
/// `Address` becomes the uppercased `"NUMBER NAME TYPE"` when all three parts
/// parse, otherwise the uppercased raw text. `Unit Manager` is uppercased.
/// A record without an address keeps whatever `ST` values it has.
pub fn apply_formatting(record: &mut Record) {
    let raw = record.value(fields::ADDRESS).to_string();
    if !raw.is_empty() {
        let parts = address::parse(&raw).to_uppercase();
        record.set(fields::ST_NUMBER, parts.street_number.clone());
        record.set(fields::ST_NAME, parts.street_name.clone());
        record.set(fields::ST_TYPE, parts.street_type.clone());

        if parts.is_complete() {
            record.set(fields::ADDRESS, parts.recompose());
        } else {
            record.set(fields::ADDRESS, raw.to_uppercase());
        }
    }

    let manager = record.value(fields::UNIT_MANAGER);
    if !manager.is_empty() {
        let upper = manager.to_uppercase();
        record.set(fields::UNIT_MANAGER, upper);
    }
}

/// Fill insert-only defaults into fields that are absent or whitespace.
/// Never used on the update path.
pub fn apply_insert_defaults(record: &mut Record, defaults: &BTreeMap<String, String>) {
    for (field, value) in defaults {
        if record.value(field).trim().is_empty() {
            record.set(field, value.clone());
        }
    }
}

/// Built-in insert defaults.
pub fn builtin_defaults() -> BTreeMap<String, String> {
    BTreeMap::from([
        (fields::EMAIL_TYPE.to_string(), "Home".to_string()),
        (fields::NEWSLETTER.to_string(), "Email".to_string()),
        (fields::STATUS.to_string(), "Sold".to_string()),
        (fields::ENTRY_TYPE.to_string(), "Occupant".to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recomposes_address() {
        let mut r: Record = [("Address", "12 oak st")].into_iter().collect();
        apply_formatting(&mut r);
        assert_eq!(r.value("Address"), "12 OAK ST");
        assert_eq!(r.value("ST #"), "12");
        assert_eq!(r.value("ST Name"), "OAK");
        assert_eq!(r.value("ST Type"), "ST");
    }

    #[test]
    fn drops_locality_on_recompose() {
        let mut r: Record = [("Address", "7 north fairway dr, Mount Vernon OH")].into_iter().collect();
        apply_formatting(&mut r);
        assert_eq!(r.value("Address"), "7 NORTH FAIRWAY DR");
        assert_eq!(r.value("ST Name"), "NORTH FAIRWAY");
    }

    #[test]
    fn incomplete_address_kept_raw_uppercased() {
        let mut r: Record = [("Address", "55 elm, mount vernon")].into_iter().collect();
        apply_formatting(&mut r);
        assert_eq!(r.value("Address"), "55 ELM, MOUNT VERNON");
        assert_eq!(r.value("ST #"), "55");
        assert_eq!(r.value("ST Name"), "ELM");
        assert_eq!(r.value("ST Type"), "");
    }

    #[test]
    fn empty_address_leaves_components_alone() {
        let mut r: Record = [("Address", ""), ("ST #", "9")].into_iter().collect();
        apply_formatting(&mut r);
        assert_eq!(r.value("ST #"), "9");
        assert!(!r.contains("ST Name"));
    }

    #[test]
    fn uppercases_unit_manager() {
        let mut r: Record = [("Unit Manager", "jane doe")].into_iter().collect();
        apply_formatting(&mut r);
        assert_eq!(r.value("Unit Manager"), "JANE DOE");
    }

    #[test]
    fn defaults_fill_only_blank() {
        let mut r: Record = [("Status", "Rented"), ("Newsletter", " ")].into_iter().collect();
        apply_insert_defaults(&mut r, &builtin_defaults());
        assert_eq!(r.value("Status"), "Rented");
        assert_eq!(r.value("Newsletter"), "Email");
        assert_eq!(r.value("Email Type-1"), "Home");
        assert_eq!(r.value("Entry Type"), "Occupant");
    }
}
