use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    /// Which directory approvals write to.
    #[serde(default)]
    pub target: Target,
    pub admin_emails: Vec<String>,
    pub directory: DirectoryConfig,
    pub intake: IntakeConfig,
    pub notify: NotifyConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    /// Insert-only defaults (field → value). Replaces the built-in set when given.
    #[serde(default = "crate::formatting::builtin_defaults")]
    pub defaults: BTreeMap<String, String>,
    #[serde(default)]
    pub links: LinkConfig,
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// Test vs production directory selection.
///
/// Defaults to `test` so a fresh config never writes the live directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    #[default]
    Test,
    Production,
}

impl Target {
    pub fn is_test(&self) -> bool {
        matches!(self, Self::Test)
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Test => write!(f, "test"),
            Self::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for Target {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "test" => Ok(Self::Test),
            "production" => Ok(Self::Production),
            other => Err(ReconError::ConfigValidation(format!(
                "unknown target \"{other}\" (expected \"test\" or \"production\")"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    pub production: String,
    pub test: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntakeConfig {
    pub file: String,
    /// Identifier carried in approval links; requests naming another sheet are refused.
    pub sheet_id: String,
}

// ---------------------------------------------------------------------------
// Notify
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    /// Base URL of the approval endpoint.
    pub action_url: String,
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default = "default_test_subject")]
    pub test_subject: String,
    #[serde(default = "default_error_subject")]
    pub error_subject: String,
    /// Directory the file notifier drops messages into.
    #[serde(default = "default_outbox")]
    pub outbox: String,
}

fn default_subject() -> String {
    "[CONTACT UPDATE] New Request - Action Required".into()
}

fn default_test_subject() -> String {
    "[TEST CONTACT UPDATE] New Request - Action Required".into()
}

fn default_error_subject() -> String {
    "Error: Form Submission Processing Failed".into()
}

fn default_outbox() -> String {
    "outbox".into()
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchingConfig {
    /// Refuse to write when two rows satisfy the winning match tier.
    /// Off by default: the earliest row wins.
    #[serde(default)]
    pub fail_on_ambiguous: bool,
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// Column names and URL fragments for the three computed link columns.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LinkConfig {
    pub enabled: bool,
    pub map_column: String,
    pub map_base: String,
    /// Appended after the address in map links.
    pub locality: String,
    pub registry_column: String,
    pub registry_base: String,
    pub registry_label: String,
    pub search_column: String,
    pub search_base: String,
    pub search_suffix: String,
    /// Range whose second column holds a display label keyed by parcel,
    /// e.g. `Reference!$Q$2:$AD`.
    pub reference_range: Option<String>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            map_column: "Map".into(),
            map_base: "https://www.google.com/maps/place/".into(),
            locality: ", Mount Vernon, OH 43050".into(),
            registry_column: "Knox County Link".into(),
            registry_base: "https://beacon.schneidercorp.com/Application.aspx?AppID=1124&LayerID=28285&PageTypeID=4&PageID=11642&KeyValue=".into(),
            registry_label: "Knox County Auditor".into(),
            search_column: "Address Search".into(),
            search_base: "https://www.google.com/search?q=".into(),
            search_suffix: "+OH+43050".into(),
            reference_range: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine options
// ---------------------------------------------------------------------------

/// The slice of configuration the reconciliation engine needs.
#[derive(Debug, Clone)]
pub struct ReconOptions {
    pub fail_on_ambiguous: bool,
    pub defaults: BTreeMap<String, String>,
    pub links: LinkConfig,
}

impl Default for ReconOptions {
    fn default() -> Self {
        Self {
            fail_on_ambiguous: false,
            defaults: crate::formatting::builtin_defaults(),
            links: LinkConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ReconError> {
        let input = std::fs::read_to_string(path)
            .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&input)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.admin_emails.iter().all(|e| e.trim().is_empty()) {
            return Err(ReconError::ConfigValidation(
                "at least one admin email is required".into(),
            ));
        }
        if let Some(bad) = self.admin_emails.iter().find(|e| !e.contains('@')) {
            return Err(ReconError::ConfigValidation(format!(
                "admin email \"{bad}\" is not an address"
            )));
        }

        if self.directory.production.trim().is_empty() || self.directory.test.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "directory.production and directory.test must both be set".into(),
            ));
        }
        if self.intake.file.trim().is_empty() {
            return Err(ReconError::ConfigValidation("intake.file must be set".into()));
        }
        if self.intake.sheet_id.trim().is_empty() {
            return Err(ReconError::ConfigValidation("intake.sheet_id must be set".into()));
        }

        url::Url::parse(&self.notify.action_url).map_err(|e| {
            ReconError::ConfigValidation(format!(
                "notify.action_url \"{}\" is not a valid URL: {e}",
                self.notify.action_url
            ))
        })?;

        // Fragments are spliced into formula string literals
        let links = &self.links;
        for (key, value) in [
            ("map_base", &links.map_base),
            ("locality", &links.locality),
            ("registry_base", &links.registry_base),
            ("registry_label", &links.registry_label),
            ("search_base", &links.search_base),
            ("search_suffix", &links.search_suffix),
        ] {
            if value.contains('"') {
                return Err(ReconError::ConfigValidation(format!(
                    "links.{key} must not contain a double quote"
                )));
            }
        }

        Ok(())
    }

    /// Directory path for the configured target.
    pub fn directory_path(&self) -> &str {
        match self.target {
            Target::Test => &self.directory.test,
            Target::Production => &self.directory.production,
        }
    }

    pub fn recon_options(&self) -> ReconOptions {
        ReconOptions {
            fail_on_ambiguous: self.matching.fail_on_ambiguous,
            defaults: self.defaults.clone(),
            links: self.links.clone(),
        }
    }

    pub fn subject(&self) -> &str {
        if self.target.is_test() {
            &self.notify.test_subject
        } else {
            &self.notify.subject
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name = "Fairways Directory"
admin_emails = ["admin@example.org"]

[directory]
production = "directory.csv"
test = "directory-test.csv"

[intake]
file = "responses.csv"
sheet_id = "873697025"

[notify]
action_url = "https://example.org/approve"
"#;

    #[test]
    fn parse_minimal() {
        let config = ReconConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.name, "Fairways Directory");
        assert_eq!(config.target, Target::Test);
        assert_eq!(config.directory_path(), "directory-test.csv");
        assert!(!config.matching.fail_on_ambiguous);
        assert_eq!(config.defaults["Status"], "Sold");
        assert_eq!(config.links, LinkConfig::default());
        assert_eq!(config.notify.outbox, "outbox");
        assert!(config.subject().starts_with("[TEST"));
    }

    #[test]
    fn production_target_selects_live_directory() {
        let input = MINIMAL.replace("admin_emails", "target = \"production\"\nadmin_emails");
        let config = ReconConfig::from_toml(&input).unwrap();
        assert_eq!(config.target, Target::Production);
        assert_eq!(config.directory_path(), "directory.csv");
        assert_eq!(config.subject(), "[CONTACT UPDATE] New Request - Action Required");
    }

    #[test]
    fn parse_overrides() {
        let input = format!(
            r#"{MINIMAL}
[matching]
fail_on_ambiguous = true

[defaults]
"Status" = "Rented"

[links]
map_column = "Location"
reference_range = "Reference!$Q$2:$AD"
"#
        );
        let config = ReconConfig::from_toml(&input).unwrap();
        assert!(config.recon_options().fail_on_ambiguous);
        assert_eq!(config.defaults.len(), 1);
        assert_eq!(config.defaults["Status"], "Rented");
        assert_eq!(config.links.map_column, "Location");
        assert_eq!(config.links.registry_column, "Knox County Link");
        assert_eq!(config.links.reference_range.as_deref(), Some("Reference!$Q$2:$AD"));
    }

    #[test]
    fn reject_invalid_target() {
        let input = MINIMAL.replace("admin_emails", "target = \"prod\"\nadmin_emails");
        assert!(ReconConfig::from_toml(&input).is_err());
    }

    #[test]
    fn reject_empty_admins() {
        let input = MINIMAL.replace(r#"["admin@example.org"]"#, "[]");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("admin email"));
    }

    #[test]
    fn reject_bad_action_url() {
        let input = MINIMAL.replace("https://example.org/approve", "not a url");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("notify.action_url"));
    }

    #[test]
    fn reject_quote_in_link_fragment() {
        let input = format!("{MINIMAL}\n[links]\nlocality = \"\\\", OH\"\n");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("links.locality"));
    }

    #[test]
    fn reject_missing_sheet_id() {
        let input = MINIMAL.replace("873697025", " ");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("sheet_id"));
    }

    #[test]
    fn target_from_str() {
        assert_eq!("production".parse::<Target>().unwrap(), Target::Production);
        assert!("live".parse::<Target>().is_err());
    }
}
