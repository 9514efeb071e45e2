//! Field-level change sets between an incoming record and a directory row.

use crate::model::{ChangeRecord, ChangeType, Record, METADATA_PREFIX};

/// Compute the changes `incoming` would make to `existing`.
///
/// Without an existing row every non-blank field is an `ADD`. Against an
/// existing row a field is an `UPDATE` when its trimmed value differs and the
/// incoming value is non-blank: a blank incoming value never clears a cell.
/// Metadata keys (leading `_`) are ignored.
pub fn diff(incoming: &Record, existing: Option<&Record>) -> Vec<ChangeRecord> {
    let mut changes = Vec::new();

    for (field, new_value) in incoming.fields() {
        if field.starts_with(METADATA_PREFIX) {
            continue;
        }
        let new_trim = new_value.trim();
        if new_trim.is_empty() {
            continue;
        }

        match existing {
            None => changes.push(ChangeRecord {
                field: field.to_string(),
                old_value: String::new(),
                new_value: new_value.to_string(),
                change_type: ChangeType::Add,
            }),
            Some(existing) => {
                let old_value = existing.value(field);
                if old_value.trim() != new_trim {
                    changes.push(ChangeRecord {
                        field: field.to_string(),
                        old_value: old_value.to_string(),
                        new_value: new_value.to_string(),
                        change_type: ChangeType::Update,
                    });
                }
            }
        }
    }

    changes
}
