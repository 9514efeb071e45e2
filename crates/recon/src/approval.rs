//! Human approval gate in front of the directory.
//!
//! A submission is previewed and sent to the administrators with approve and
//! reject links; clicking one comes back here as an [`ApprovalRequest`].

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::config::{ReconConfig, Target};
use crate::engine::Reconciler;
use crate::error::ReconError;
use crate::model::{ReconOutcome, ReconPlan};
use crate::notify::{render_error, render_request};
use crate::store::{DirectoryStore, IntakeStore, Notifier};

pub const STATUS_COLUMN: &str = "Approval Status";
pub const APPROVED_BY_COLUMN: &str = "Approved By";
pub const APPROVAL_TIMESTAMP_COLUMN: &str = "Approval Timestamp";

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ApprovalStatus {
    #[serde(rename = "Pending Approval")]
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending Approval",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to write into an intake row's status columns. `approved_by` and `at`
/// are left untouched when `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: ApprovalStatus,
    pub approved_by: Option<String>,
    pub at: Option<NaiveDateTime>,
}

impl StatusUpdate {
    pub fn pending() -> Self {
        Self { status: ApprovalStatus::Pending, approved_by: None, at: None }
    }

    pub fn decided(status: ApprovalStatus, by: &str, at: NaiveDateTime) -> Self {
        Self { status, approved_by: Some(by.to_string()), at: Some(at) }
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalAction {
    Approve,
    Reject,
}

impl ApprovalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

impl FromStr for ApprovalAction {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            other => Err(ReconError::InvalidRequest(format!("unknown action \"{other}\""))),
        }
    }
}

/// `{action, row, sheetId}` as carried by an approval link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalRequest {
    pub action: ApprovalAction,
    /// Intake sheet row.
    pub row: usize,
    pub sheet_id: String,
    /// Link was issued while targeting the test directory.
    pub test: bool,
}

impl ApprovalRequest {
    /// Parse a full approval link.
    pub fn from_url(link: &str) -> Result<Self, ReconError> {
        let url = url::Url::parse(link)
            .map_err(|e| ReconError::InvalidRequest(format!("not a URL: {e}")))?;
        Self::from_params(url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())))
    }

    /// Build a request from query parameters. Unknown keys are ignored.
    pub fn from_params<I>(params: I) -> Result<Self, ReconError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let (mut action, mut row, mut sheet_id, mut test) = (None, None, None, false);
        for (key, value) in params {
            match key.as_str() {
                "action" => action = Some(value),
                "row" => row = Some(value),
                "sheetId" => sheet_id = Some(value),
                "test" => test = value == "true",
                _ => {}
            }
        }

        let missing = |name: &str| ReconError::InvalidRequest(format!("missing parameter \"{name}\""));
        let action: ApprovalAction = action.ok_or_else(|| missing("action"))?.parse()?;
        let row = row.ok_or_else(|| missing("row"))?;
        let row: usize = row
            .trim()
            .parse()
            .map_err(|_| ReconError::InvalidRequest(format!("row \"{row}\" is not a number")))?;
        let sheet_id = sheet_id.filter(|s| !s.is_empty()).ok_or_else(|| missing("sheetId"))?;

        Ok(Self { action, row, sheet_id, test })
    }

    /// Directory the link was issued against.
    pub fn target(&self) -> Target {
        if self.test {
            Target::Test
        } else {
            Target::Production
        }
    }

    /// Render as a link under `base`.
    pub fn to_url(&self, base: &str) -> Result<String, ReconError> {
        let mut url = url::Url::parse(base)
            .map_err(|e| ReconError::ConfigValidation(format!("action URL \"{base}\": {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("action", self.action.as_str())
                .append_pair("row", &self.row.to_string())
                .append_pair("sheetId", &self.sheet_id);
            if self.test {
                query.append_pair("test", "true");
            }
        }
        Ok(url.into())
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// Result of an administrator's decision.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Approved(ReconOutcome),
    Rejected,
}

pub struct Workflow<'a> {
    config: &'a ReconConfig,
    reconciler: Reconciler,
}

impl<'a> Workflow<'a> {
    pub fn new(config: &'a ReconConfig) -> Self {
        Self { config, reconciler: Reconciler::new(config.recon_options()) }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Handle a new submission at intake row `row`.
    ///
    /// On failure the administrators get an error notification and the
    /// submission error is returned.
    pub fn submit(
        &self,
        row: usize,
        intake: &mut dyn IntakeStore,
        directory: &dyn DirectoryStore,
        notifier: &mut dyn Notifier,
    ) -> Result<ReconPlan, ReconError> {
        match self.try_submit(row, intake, directory, notifier) {
            Ok(plan) => Ok(plan),
            Err(err) => {
                log::error!("submission at intake row {row} failed: {err}");
                let report = render_error(self.config, &format!("submit intake row {row}"), &err);
                if let Err(send_err) = notifier.send(&report) {
                    log::error!("could not send error notification: {send_err}");
                }
                Err(err)
            }
        }
    }

    fn try_submit(
        &self,
        row: usize,
        intake: &mut dyn IntakeStore,
        directory: &dyn DirectoryStore,
        notifier: &mut dyn Notifier,
    ) -> Result<ReconPlan, ReconError> {
        let record = intake.read_record(row)?;
        let plan = self.reconciler.preview(directory, &record)?;
        let message = render_request(self.config, &plan, row)?;
        notifier.send(&message)?;
        intake.set_status(row, &StatusUpdate::pending())?;
        log::info!(
            "intake row {row} pending approval ({} change(s), {})",
            plan.changes.len(),
            if plan.is_new_entry() { "new entry" } else { "existing entry" }
        );
        Ok(plan)
    }

    /// Apply an administrator's decision made as `identity` at `now`.
    pub fn decide(
        &self,
        request: &ApprovalRequest,
        identity: &str,
        now: NaiveDateTime,
        intake: &mut dyn IntakeStore,
        directory: &mut dyn DirectoryStore,
    ) -> Result<Decision, ReconError> {
        self.check(request, identity)?;
        let row = request.row;

        match request.action {
            ApprovalAction::Approve => {
                let record = intake.read_record(row)?;
                // A refused approval leaves the row pending.
                self.reconciler.check(&*directory, &record)?;
                intake.set_status(row, &StatusUpdate::decided(ApprovalStatus::Approved, identity, now))?;
                log::info!("intake row {row} approved by {identity}");
                let outcome = self.reconciler.reconcile_and_apply(directory, &record)?;
                Ok(Decision::Approved(outcome))
            }
            ApprovalAction::Reject => {
                intake.set_status(row, &StatusUpdate::decided(ApprovalStatus::Rejected, identity, now))?;
                log::info!("intake row {row} rejected by {identity}");
                Ok(Decision::Rejected)
            }
        }
    }

    fn check(&self, request: &ApprovalRequest, identity: &str) -> Result<(), ReconError> {
        if request.sheet_id != self.config.intake.sheet_id {
            return Err(ReconError::InvalidRequest(format!(
                "sheet \"{}\" not found",
                request.sheet_id
            )));
        }
        if request.row < 2 {
            return Err(ReconError::InvalidRequest(format!(
                "row {} is not a submission row",
                request.row
            )));
        }
        if identity.trim().is_empty() {
            return Err(ReconError::InvalidRequest("approver identity is required".into()));
        }
        if request.target() != self.config.target {
            return Err(ReconError::InvalidRequest(format!(
                "link was issued for the {} directory, configured target is {}",
                request.target(),
                self.config.target
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn parses_link() {
        let req = ApprovalRequest::from_url(
            "https://example.com/exec?action=reject&row=14&sheetId=99&test=true",
        )
        .unwrap();
        assert_eq!(req.action, ApprovalAction::Reject);
        assert_eq!(req.row, 14);
        assert_eq!(req.sheet_id, "99");
        assert!(req.test);
    }

    #[test]
    fn rejects_bad_params() {
        for params in [
            pairs(&[("row", "3"), ("sheetId", "1")]),
            pairs(&[("action", "delete"), ("row", "3"), ("sheetId", "1")]),
            pairs(&[("action", "approve"), ("row", "three"), ("sheetId", "1")]),
            pairs(&[("action", "approve"), ("row", "3"), ("sheetId", "")]),
        ] {
            let err = ApprovalRequest::from_params(params).unwrap_err();
            assert!(matches!(err, ReconError::InvalidRequest(_)), "{err}");
        }
        assert!(ApprovalRequest::from_url("not a link").is_err());
    }

    #[test]
    fn link_round_trip() {
        let req = ApprovalRequest {
            action: ApprovalAction::Approve,
            row: 5,
            sheet_id: "7".into(),
            test: false,
        };
        let link = req.to_url("https://example.com/exec").unwrap();
        assert_eq!(link, "https://example.com/exec?action=approve&row=5&sheetId=7");
        assert_eq!(ApprovalRequest::from_url(&link).unwrap(), req);
    }

    #[test]
    fn status_strings() {
        assert_eq!(ApprovalStatus::Pending.to_string(), "Pending Approval");
        assert_eq!(ApprovalStatus::Approved.as_str(), "Approved");
        assert_eq!(ApprovalStatus::Rejected.as_str(), "Rejected");
    }
}
