//! Intake form field names → canonical directory column names.

use crate::fields;
use crate::model::{IntakeRecord, RawValue, Record};

/// `(intake field, canonical field)`, in canonical output order.
pub const FIELD_MAPPING: &[(&str, &str)] = &[
    ("Timestamp", fields::TIMESTAMP),
    ("Unit Address", fields::ADDRESS),
    ("Phone number", "Home Phone"),
    ("First Name", fields::FIRST_NAME),
    ("Last Name", fields::LAST_NAME),
    ("Business Phone", "Business Phone"),
    ("Business Addresses", "Business Addresses"),
    ("Manager", fields::UNIT_MANAGER),
    ("Occupant Email Address", fields::EMAIL),
    ("Occupancy First Date", "Date Moved In"),
    ("Mailing Address", "Mailing Address"),
    ("Other Phone Number", "Cell Phone"),
    ("Emergency Contact Name", "Emergency Contact Name"),
    ("Emergency Contact Phone", "Emergency Contact Phone"),
    ("Emergency Contact Email", "Emergency Contact Email"),
    ("Emergency Contact Relationship", "Emergency Contact Relationship"),
    ("Emergency Contact Address", "Emergency Contact ST Address"),
    ("Alternate Home Address", "Alternate Home Address"),
    ("Alternate Home Phone", "Alternate Home Phone"),
    ("Are you Working", "Working?"),
    ("Do you have a Alternate Home", "Alternate Home?"),
    ("Any other Contact Information", "Other Contact Information"),
];

/// Translate an intake record into canonical fields.
///
/// Every table entry is present in the output (empty when the intake lacks
/// it); intake fields outside the table are dropped. `Timestamp` falls back
/// to the submission time.
pub fn map_to_canonical(intake: &IntakeRecord) -> Record {
    let mut record = Record::new();
    for (from, to) in FIELD_MAPPING {
        let value = intake.get(from).map(|v| v.to_string()).unwrap_or_default();
        record.set(to, value);
    }

    if intake.get("Timestamp").map_or(true, RawValue::is_blank) {
        let ts = intake.submitted_at.format(crate::model::TIMESTAMP_FORMAT).to_string();
        record.set(fields::TIMESTAMP, ts);
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn submitted() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 8).unwrap().and_hms_opt(6, 15, 0).unwrap()
    }

    #[test]
    fn renames_known_fields() {
        let intake = IntakeRecord::new(submitted())
            .with("Unit Address", "5 Elm St")
            .with("Occupant Email Address", "a@x.com")
            .with("Manager", "jane doe");
        let record = map_to_canonical(&intake);
        assert_eq!(record.value("Address"), "5 Elm St");
        assert_eq!(record.value("Email-1"), "a@x.com");
        assert_eq!(record.value("Unit Manager"), "jane doe");
    }

    #[test]
    fn every_table_field_present_in_order() {
        let record = map_to_canonical(&IntakeRecord::new(submitted()));
        let names = record.field_names();
        let expected: Vec<&str> = FIELD_MAPPING.iter().map(|(_, to)| *to).collect();
        assert_eq!(names, expected);
        assert_eq!(record.value("Home Phone"), "");
    }

    #[test]
    fn drops_unknown_fields() {
        let intake = IntakeRecord::new(submitted()).with("Favourite Colour", "green");
        let record = map_to_canonical(&intake);
        assert!(!record.contains("Favourite Colour"));
    }

    #[test]
    fn timestamp_defaults_to_submission() {
        let record = map_to_canonical(&IntakeRecord::new(submitted()));
        assert_eq!(record.value("Timestamp"), "11/08/2025 06:15:00");

        let blank = IntakeRecord::new(submitted()).with("Timestamp", "  ");
        assert_eq!(map_to_canonical(&blank).value("Timestamp"), "11/08/2025 06:15:00");
    }

    #[test]
    fn timestamp_value_is_rendered() {
        let ts = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap().and_hms_opt(3, 4, 5).unwrap();
        let intake = IntakeRecord::new(submitted()).with("Timestamp", RawValue::Timestamp(ts));
        assert_eq!(map_to_canonical(&intake).value("Timestamp"), "01/02/2025 03:04:05");
    }
}
