//! Locating and loading `fairways.toml`.

use std::path::{Path, PathBuf};

use fairways_recon::{ReconConfig, Target};

use crate::exit_codes::{EXIT_CONFIG_INVALID, EXIT_CONFIG_MISSING};
use crate::CliError;

pub const CONFIG_FILE: &str = "fairways.toml";

/// Default config path (~/.config/fairways/fairways.toml)
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fairways")
        .join(CONFIG_FILE)
}

/// A loaded config plus the directory its relative paths resolve against.
pub struct Settings {
    pub path: PathBuf,
    pub config: ReconConfig,
    base_dir: PathBuf,
}

impl Settings {
    pub fn load(path: Option<&Path>, target: Option<Target>) -> Result<Self, CliError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        if !path.exists() {
            return Err(CliError {
                code: EXIT_CONFIG_MISSING,
                message: format!("config not found: {}", path.display()),
                hint: Some("create one with `fairways config init`".into()),
            });
        }

        let mut config = ReconConfig::load(&path).map_err(|e| CliError {
            code: EXIT_CONFIG_INVALID,
            message: format!("{}: {e}", path.display()),
            hint: None,
        })?;
        if let Some(target) = target {
            config.target = target;
        }
        log::debug!("loaded {} (target: {})", path.display(), config.target);

        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self { path, config, base_dir })
    }

    pub fn resolve(&self, file: &str) -> PathBuf {
        let p = Path::new(file);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }

    pub fn directory_path(&self) -> PathBuf {
        self.resolve(self.config.directory_path())
    }

    pub fn intake_path(&self) -> PathBuf {
        self.resolve(&self.config.intake.file)
    }

    pub fn outbox_path(&self) -> PathBuf {
        self.resolve(&self.config.notify.outbox)
    }
}

/// Starter config written by `fairways config init`.
pub const TEMPLATE: &str = r#"name = "Fairways Directory"

# "test" writes to directory.test, "production" to directory.production
target = "test"
admin_emails = ["board@example.com"]

[directory]
production = "directory.csv"
test = "directory-test.csv"

[intake]
file = "responses.csv"
sheet_id = "1"

[notify]
action_url = "https://example.com/approval"
outbox = "outbox"

[matching]
fail_on_ambiguous = false

# Insert-only defaults; replaces the built-in set when present
[defaults]
"Email Type-1" = "Home"
"Newsletter" = "Email"
"Status" = "Sold"
"Entry Type" = "Occupant"

[links]
enabled = true
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn template_is_valid() {
        let config = ReconConfig::from_toml(TEMPLATE).unwrap();
        assert_eq!(config.target, Target::Test);
        assert_eq!(config.defaults.len(), 4);
    }

    #[test]
    fn relative_paths_follow_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, TEMPLATE).unwrap();

        let settings = Settings::load(Some(&path), Some(Target::Production)).unwrap();
        assert_eq!(settings.config.target, Target::Production);
        assert_eq!(settings.directory_path(), dir.path().join("directory.csv"));
        assert_eq!(settings.intake_path(), dir.path().join("responses.csv"));
        assert_eq!(settings.resolve("/abs/x.csv"), PathBuf::from("/abs/x.csv"));
    }

    #[test]
    fn missing_config_has_hint() {
        let dir = tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("none.toml")), None).err().unwrap();
        assert_eq!(err.code, EXIT_CONFIG_MISSING);
        assert!(err.hint.is_some());
    }
}
