//! `fairways submit|preview|apply|approve|reject|link`: the approval
//! workflow over the CSV stores.

use chrono::Local;
use fairways_io::{CsvDirectory, CsvIntake, OutboxNotifier};
use fairways_recon::approval::{ApprovalAction, ApprovalRequest, ApprovalStatus, Decision, Workflow};
use fairways_recon::model::{ChangeRecord, ReconOutcome, ReconPlan};
use fairways_recon::{IntakeStore, ReconError};

use crate::exit_codes::{recon_exit_code, EXIT_ERROR, EXIT_USAGE};
use crate::settings::Settings;
use crate::CliError;

fn recon_err(err: ReconError) -> CliError {
    let hint = match &err {
        ReconError::AmbiguousMatch { .. } => {
            Some("resolve the duplicate rows in the directory, or set matching.fail_on_ambiguous = false".to_string())
        }
        ReconError::InvalidRequest(_) => Some("approval links look like <action_url>?action=approve&row=N&sheetId=S".to_string()),
        _ => None,
    };
    CliError { code: recon_exit_code(&err), message: err.to_string(), hint }
}

fn open_intake(settings: &Settings) -> Result<CsvIntake, CliError> {
    CsvIntake::open(&settings.intake_path()).map_err(|e| recon_err(e.into()))
}

fn open_directory(settings: &Settings) -> Result<CsvDirectory, CliError> {
    let path = settings.directory_path();
    log::info!("directory: {} ({})", path.display(), settings.config.target);
    CsvDirectory::open(&path).map_err(|e| recon_err(e.into()))
}

/// Explicit row, or the newest submission.
fn pick_row(intake: &CsvIntake, row: Option<usize>) -> Result<usize, CliError> {
    match row {
        Some(r) => Ok(r),
        None => intake.last_row().ok_or_else(|| {
            CliError::args("intake has no submissions").with_hint("pass --row once the form has responses")
        }),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| CliError { code: EXIT_ERROR, message: format!("JSON serialization error: {e}"), hint: None })?;
    println!("{out}");
    Ok(())
}

// ============================================================================
// submit / preview / apply
// ============================================================================

pub fn cmd_submit(settings: &Settings, row: Option<usize>, json: bool) -> Result<(), CliError> {
    let mut intake = open_intake(settings)?;
    let row = pick_row(&intake, row)?;
    let directory = open_directory(settings)?;
    let mut outbox = OutboxNotifier::new(&settings.outbox_path());

    let plan = Workflow::new(&settings.config)
        .submit(row, &mut intake, &directory, &mut outbox)
        .map_err(recon_err)?;

    if json {
        return print_json(&plan);
    }
    eprintln!("row {row}: approval request queued in {}", outbox.dir().display());
    print_plan(&plan);
    Ok(())
}

pub fn cmd_preview(settings: &Settings, row: Option<usize>, json: bool) -> Result<(), CliError> {
    let intake = open_intake(settings)?;
    let row = pick_row(&intake, row)?;
    let record = intake.read_record(row).map_err(|e| recon_err(e.into()))?;
    let directory = open_directory(settings)?;

    let workflow = Workflow::new(&settings.config);
    let plan = workflow.reconciler().preview(&directory, &record).map_err(recon_err)?;

    if json {
        return print_json(&plan);
    }
    print_plan(&plan);
    Ok(())
}

/// Reconcile without the approval step.
pub fn cmd_apply(settings: &Settings, row: Option<usize>, json: bool) -> Result<(), CliError> {
    let intake = open_intake(settings)?;
    let row = pick_row(&intake, row)?;
    let record = intake.read_record(row).map_err(|e| recon_err(e.into()))?;
    let mut directory = open_directory(settings)?;

    let workflow = Workflow::new(&settings.config);
    let outcome = workflow
        .reconciler()
        .reconcile_and_apply(&mut directory, &record)
        .map_err(recon_err)?;

    if json {
        return print_json(&outcome);
    }
    print_outcome(&outcome);
    Ok(())
}

// ============================================================================
// approve / reject / link
// ============================================================================

pub fn cmd_decide(
    settings: &Settings,
    action: ApprovalAction,
    row: usize,
    sheet: Option<String>,
    approver: &str,
    json: bool,
) -> Result<(), CliError> {
    let request = ApprovalRequest {
        action,
        row,
        sheet_id: sheet.unwrap_or_else(|| settings.config.intake.sheet_id.clone()),
        test: settings.config.target.is_test(),
    };
    decide(settings, &request, approver, json)
}

pub fn cmd_link(settings: &Settings, url: &str, approver: &str, json: bool) -> Result<(), CliError> {
    let request = ApprovalRequest::from_url(url).map_err(recon_err)?;
    let issued_for = request.target();
    if issued_for != settings.config.target {
        return Err(CliError {
            code: EXIT_USAGE,
            message: format!(
                "link was issued for the {issued_for} directory, target is {}",
                settings.config.target
            ),
            hint: Some(format!("re-run with --target {issued_for}")),
        });
    }
    decide(settings, &request, approver, json)
}

fn decide(settings: &Settings, request: &ApprovalRequest, approver: &str, json: bool) -> Result<(), CliError> {
    let mut intake = open_intake(settings)?;
    if let Some(status) = intake.status_of(request.row) {
        if status != ApprovalStatus::Pending.as_str() {
            log::warn!("intake row {} is already {status}", request.row);
        }
    }
    let mut directory = open_directory(settings)?;

    let decision = Workflow::new(&settings.config)
        .decide(request, approver, Local::now().naive_local(), &mut intake, &mut directory)
        .map_err(recon_err)?;

    if json {
        return print_json(&decision);
    }
    match &decision {
        Decision::Approved(outcome) => {
            println!("Request approved (intake row {}).", request.row);
            print_outcome(outcome);
        }
        Decision::Rejected => println!("Request rejected (intake row {}).", request.row),
    }
    Ok(())
}

// ============================================================================
// Human output
// ============================================================================

fn print_plan(plan: &ReconPlan) {
    let m = &plan.match_info;
    if plan.is_new_entry() {
        println!("NEW ENTRY: will add a contact");
        if let Some(parcel) = m.parcel.as_deref().filter(|p| !p.is_empty()) {
            println!("  address belongs to parcel {parcel}");
        }
    } else {
        println!(
            "EXISTING ENTRY: row {} (matched by {})",
            m.row.map(|r| r.to_string()).unwrap_or_default(),
            m.matched_by
        );
    }
    if m.is_ambiguous() {
        let rows: Vec<String> = m.ambiguous_rows.iter().map(|r| r.to_string()).collect();
        println!("  also matches row(s) {}", rows.join(", "));
    }
    print_changes(&plan.changes, !plan.is_new_entry());
}

fn print_outcome(outcome: &ReconOutcome) {
    println!("{} row {}", outcome.action, outcome.row);
    print_changes(&outcome.changes, true);
}

fn print_changes(changes: &[ChangeRecord], report_none: bool) {
    if changes.is_empty() {
        if report_none {
            println!("  no changes detected");
        }
        return;
    }
    let width = changes.iter().map(|c| c.field.len()).max().unwrap_or(0);
    for c in changes {
        let old = if c.old_value.is_empty() { "(empty)" } else { &c.old_value };
        println!("  {:<6} {:<width$}  {old} -> {}", c.change_type.to_string(), c.field, c.new_value);
    }
}
