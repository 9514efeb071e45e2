//! Administrator notifications: the approval request rendered from a
//! [`ReconPlan`], and the error report sent when a submission cannot be
//! processed.

use std::fmt::Write as _;

use serde::Serialize;

use crate::approval::{ApprovalAction, ApprovalRequest};
use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::model::{ReconPlan, METADATA_PREFIX};

/// A rendered message. Transport is the [`Notifier`](crate::store::Notifier)'s concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub to: Vec<String>,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Approve and reject links for one intake row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionLinks {
    pub approve: String,
    pub reject: String,
}

impl ActionLinks {
    pub fn for_row(config: &ReconConfig, row: usize) -> Result<Self, ReconError> {
        let link = |action| {
            ApprovalRequest {
                action,
                row,
                sheet_id: config.intake.sheet_id.clone(),
                test: config.target.is_test(),
            }
            .to_url(&config.notify.action_url)
        };
        Ok(Self {
            approve: link(ApprovalAction::Approve)?,
            reject: link(ApprovalAction::Reject)?,
        })
    }
}

const BUTTON: &str = "color: white; padding: 10px 20px; text-decoration: none; \
                      border-radius: 5px; display: inline-block; margin-right: 10px;";

/// Render the approval request for intake row `intake_row`.
pub fn render_request(
    config: &ReconConfig,
    plan: &ReconPlan,
    intake_row: usize,
) -> Result<Notification, ReconError> {
    let links = ActionLinks::for_row(config, intake_row)?;
    let test = config.target.is_test();

    Ok(Notification {
        to: config.admin_emails.clone(),
        subject: config.subject().to_string(),
        text_body: request_text(plan, intake_row, &links, test),
        html_body: request_html(plan, intake_row, &links, test),
    })
}

fn request_text(plan: &ReconPlan, intake_row: usize, links: &ActionLinks, test: bool) -> String {
    let mut out = String::new();
    if test {
        out.push_str("=== TEST MODE - UPDATES WILL BE MADE TO THE TEST DIRECTORY ===\n\n");
    }
    let _ = writeln!(out, "Form Response Row: {intake_row}\n");

    let m = &plan.match_info;
    if plan.is_new_entry() {
        out.push_str("*** NEW ENTRY ***\n");
        out.push_str("*** Record not found in the directory ***\n");
        out.push_str("*** This will ADD a new contact ***\n\n");
    } else {
        out.push_str("*** EXISTING ENTRY ***\n");
        if let Some(row) = m.row {
            let _ = writeln!(out, "*** Record found at row {row} ***");
        }
        let _ = writeln!(out, "*** Matched by: {} ***", m.matched_by);
        if let Some(parcel) = m.parcel.as_deref().filter(|p| !p.is_empty()) {
            let _ = writeln!(out, "*** Existing Parcel: {parcel} ***");
        }
        if let Some(address) = m.address.as_deref().filter(|a| !a.is_empty()) {
            let _ = writeln!(out, "*** Existing Address: {address} ***");
        }
        out.push_str("*** This will UPDATE the existing contact ***\n\n");
    }
    if m.is_ambiguous() {
        let rows: Vec<String> = m.ambiguous_rows.iter().map(ToString::to_string).collect();
        let _ = writeln!(out, "WARNING: also matches row(s) {}\n", rows.join(", "));
    }

    if !plan.changes.is_empty() {
        let _ = writeln!(out, "=== CHANGES TO BE MADE ({} fields) ===\n", plan.changes.len());
        for change in &plan.changes {
            let _ = writeln!(out, "{}:", change.field);
            let _ = writeln!(out, "  OLD: {}", or_empty(&change.old_value));
            let _ = writeln!(out, "  NEW: {}\n", change.new_value);
        }
    } else if !plan.is_new_entry() {
        out.push_str("=== NO CHANGES DETECTED ===\n\n");
        out.push_str("All form values match existing directory data.\n\n");
    }

    out.push_str("=== ALL FORM DATA ===\n\n");
    for (field, value) in submitted_fields(plan) {
        let _ = writeln!(out, "{field}: {value}");
    }

    out.push_str("\n\n=== ACTIONS ===\n\n");
    let _ = write!(out, "APPROVE: {}\n\nREJECT: {}\n\n", links.approve, links.reject);
    out.push_str("---\n");
    out.push_str("Click the appropriate link above to approve or reject this request.\n");
    if test {
        out.push_str("NOTE: In TEST MODE, approval will update the TEST directory.");
    } else {
        out.push_str("The directory will be updated automatically upon approval.");
    }
    out
}

fn request_html(plan: &ReconPlan, intake_row: usize, links: &ActionLinks, test: bool) -> String {
    let mut out = String::new();
    if test {
        out.push_str(
            "<div style=\"background-color: #fff3cd; border: 2px solid #856404; padding: 15px; margin-bottom: 20px;\">\
             <h2 style=\"color: #856404; margin-top: 0;\">TEST MODE</h2>\
             <p style=\"margin: 0;\">Updates will go to the <strong>TEST</strong> directory</p></div>",
        );
    }
    let _ = write!(out, "<p>Form Response Row: <strong>{intake_row}</strong></p>");

    let m = &plan.match_info;
    if plan.is_new_entry() {
        out.push_str(
            "<div style=\"background-color: #d4edda; border: 2px solid #155724; padding: 15px; margin-bottom: 20px;\">\
             <h3 style=\"color: #155724; margin-top: 0;\">NEW ENTRY</h3>\
             <p>Record not found in the directory. This will <strong>ADD</strong> a new contact.</p></div>",
        );
    } else {
        out.push_str(
            "<div style=\"background-color: #d1ecf1; border: 2px solid #0c5460; padding: 15px; margin-bottom: 20px;\">\
             <h3 style=\"color: #0c5460; margin-top: 0;\">EXISTING ENTRY</h3>",
        );
        if let Some(row) = m.row {
            let _ = write!(out, "<p>Record found at row <strong>{row}</strong></p>");
        }
        let _ = write!(out, "<p>Matched by: <strong>{}</strong></p>", escape_html(&m.matched_by.to_string()));
        if let Some(parcel) = m.parcel.as_deref().filter(|p| !p.is_empty()) {
            let _ = write!(out, "<p>Existing Parcel: <strong>{}</strong></p>", escape_html(parcel));
        }
        if let Some(address) = m.address.as_deref().filter(|a| !a.is_empty()) {
            let _ = write!(out, "<p>Existing Address: <strong>{}</strong></p>", escape_html(address));
        }
        out.push_str("<p>This will <strong>UPDATE</strong> the existing contact.</p></div>");
    }

    if !plan.changes.is_empty() {
        let _ = write!(out, "<h3>Changes To Be Made ({} fields)</h3>", plan.changes.len());
        out.push_str(
            "<table border=\"1\" cellpadding=\"8\" cellspacing=\"0\" style=\"border-collapse: collapse;\">\
             <tr><th>Field</th><th>OLD</th><th>NEW</th></tr>",
        );
        for change in &plan.changes {
            let old = if change.old_value.is_empty() {
                "<em>(empty)</em>".to_string()
            } else {
                escape_html(&change.old_value)
            };
            let _ = write!(
                out,
                "<tr><td><strong>{}</strong></td><td style=\"background-color: #ffe6e6;\">{old}</td>\
                 <td style=\"background-color: #e6ffe6;\">{}</td></tr>",
                escape_html(&change.field),
                escape_html(&change.new_value),
            );
        }
        out.push_str("</table>");
    } else if !plan.is_new_entry() {
        out.push_str(
            "<div style=\"background-color: #e7f3ff; border: 2px solid #0066cc; padding: 15px; margin-bottom: 20px;\">\
             <h3 style=\"color: #0066cc; margin-top: 0;\">NO CHANGES DETECTED</h3>\
             <p>All form values match existing directory data.</p></div>",
        );
    }

    out.push_str(
        "<h3>All Form Data</h3>\
         <table border=\"1\" cellpadding=\"8\" cellspacing=\"0\" style=\"border-collapse: collapse;\">",
    );
    for (field, value) in submitted_fields(plan) {
        let _ = write!(
            out,
            "<tr><td><strong>{}</strong></td><td>{}</td></tr>",
            escape_html(field),
            escape_html(value)
        );
    }
    out.push_str("</table><br><br><h3>Actions Required</h3>");

    let suffix = if test { " (TEST)" } else { "" };
    let _ = write!(
        out,
        "<p><a href=\"{}\" style=\"background-color: #4CAF50; {BUTTON}\">APPROVE{suffix}</a>\
         <a href=\"{}\" style=\"background-color: #f44336; {BUTTON}\">REJECT{suffix}</a></p>",
        escape_html(&links.approve),
        escape_html(&links.reject),
    );
    out.push_str("<p><em>Click the appropriate button above to approve or reject this request.</em></p>");
    out
}

/// Render the report sent when `operation` failed with `error`.
pub fn render_error(config: &ReconConfig, operation: &str, error: &ReconError) -> Notification {
    let text_body = format!(
        "An error occurred while processing a form submission.\n\n\
         Operation: {operation}\nError: {error}\n\n\
         Check the intake sheet and the directory, then resubmit or process manually."
    );
    let html_body = format!(
        "<h2>Form Submission Processing Failed</h2>\
         <p><strong>Operation:</strong> {}</p><p><strong>Error:</strong> {}</p>\
         <p>Check the intake sheet and the directory, then resubmit or process manually.</p>",
        escape_html(operation),
        escape_html(&error.to_string()),
    );
    Notification {
        to: config.admin_emails.clone(),
        subject: config.notify.error_subject.clone(),
        text_body,
        html_body,
    }
}

fn submitted_fields(plan: &ReconPlan) -> impl Iterator<Item = (&str, &str)> {
    plan.record.fields().filter(|(k, _)| !k.starts_with(METADATA_PREFIX))
}

fn or_empty(value: &str) -> &str {
    if value.is_empty() {
        "(empty)"
    } else {
        value
    }
}

/// Escape text for HTML element content and double-quoted attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChangeRecord, ChangeType, MatchResult, MatchedBy, ReconAction, Record};

    const CONFIG: &str = r#"
name = "Fairways"
admin_emails = ["admin@example.com"]

[directory]
production = "directory.csv"
test = "directory-test.csv"

[intake]
file = "responses.csv"
sheet_id = "42"

[notify]
action_url = "https://example.com/approve"
"#;

    fn config() -> ReconConfig {
        ReconConfig::from_toml(CONFIG).unwrap()
    }

    fn existing_plan(changes: Vec<ChangeRecord>) -> ReconPlan {
        let record: Record = [("Email-1", "a@x.com"), ("Home Phone", "555")].into_iter().collect();
        ReconPlan {
            action: ReconAction::Updated,
            record: record.clone(),
            changes,
            match_info: MatchResult {
                found: true,
                row: Some(7),
                matched_by: MatchedBy::Email,
                parcel: Some("P1".into()),
                address: Some("5 ELM ST".into()),
                existing: Some(record),
                ambiguous_rows: Vec::new(),
            },
        }
    }

    #[test]
    fn existing_entry_with_changes() {
        let plan = existing_plan(vec![ChangeRecord {
            field: "Home Phone".into(),
            old_value: String::new(),
            new_value: "555".into(),
            change_type: ChangeType::Add,
        }]);
        let n = render_request(&config(), &plan, 12).unwrap();

        assert_eq!(n.to, vec!["admin@example.com".to_string()]);
        assert_eq!(n.subject, "[TEST CONTACT UPDATE] New Request - Action Required");
        assert!(n.text_body.starts_with("=== TEST MODE"));
        assert!(n.text_body.contains("*** EXISTING ENTRY ***"));
        assert!(n.text_body.contains("Record found at row 7"));
        assert!(n.text_body.contains("Matched by: Email-1"));
        assert!(n.text_body.contains("Existing Parcel: P1"));
        assert!(n.text_body.contains("CHANGES TO BE MADE (1 fields)"));
        assert!(n.text_body.contains("  OLD: (empty)\n  NEW: 555"));
        assert!(n.text_body
            .contains("APPROVE: https://example.com/approve?action=approve&row=12&sheetId=42&test=true"));
        assert!(n.html_body.contains("<em>(empty)</em>"));
        assert!(n.html_body.contains("APPROVE (TEST)"));
    }

    #[test]
    fn existing_entry_without_changes() {
        let n = render_request(&config(), &existing_plan(Vec::new()), 3).unwrap();
        assert!(n.text_body.contains("=== NO CHANGES DETECTED ==="));
        assert!(n.html_body.contains("NO CHANGES DETECTED"));
    }

    #[test]
    fn new_entry_in_production() {
        let mut cfg = config();
        cfg.target = crate::config::Target::Production;
        let record: Record = [("First Name", "<b>Ann</b>"), ("_note", "hidden")].into_iter().collect();
        let plan = ReconPlan {
            action: ReconAction::Inserted,
            record,
            changes: Vec::new(),
            match_info: MatchResult::not_found(None, None),
        };
        let n = render_request(&cfg, &plan, 4).unwrap();

        assert_eq!(n.subject, "[CONTACT UPDATE] New Request - Action Required");
        assert!(!n.text_body.contains("TEST MODE"));
        assert!(!n.text_body.contains("test=true"));
        assert!(n.text_body.contains("*** NEW ENTRY ***"));
        assert!(!n.text_body.contains("NO CHANGES DETECTED"));
        assert!(!n.text_body.contains("_note"));
        assert!(n.html_body.contains("&lt;b&gt;Ann&lt;/b&gt;"));
        assert!(!n.html_body.contains("<b>Ann</b>"));
    }

    #[test]
    fn error_report() {
        let err = ReconError::Schema("no header row".into());
        let n = render_error(&config(), "submit row 9", &err);
        assert_eq!(n.subject, "Error: Form Submission Processing Failed");
        assert!(n.text_body.contains("Operation: submit row 9"));
        assert!(n.text_body.contains("no header row"));
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html(r#"a<b>&"c'"#), "a&lt;b&gt;&amp;&quot;c&#39;");
    }
}
