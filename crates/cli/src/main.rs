// Fairways CLI - contact directory intake, approval and reconciliation
// Exit codes: see exit_codes.rs

mod exit_codes;
mod logging;
mod settings;
mod workflow;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use fairways_recon::approval::ApprovalAction;
use fairways_recon::{ReconConfig, Target};

use exit_codes::{EXIT_CONFIG_INVALID, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use settings::{default_config_path, Settings, TEMPLATE};

#[derive(Parser)]
#[command(name = "fairways")]
#[command(about = "Reconcile contact-update form submissions into the community directory")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/fairways/fairways.toml)
    #[arg(long, global = true, env = "FAIRWAYS_CONFIG")]
    config: Option<PathBuf>,

    /// Override the directory target from the config
    #[arg(long, global = true, value_enum)]
    target: Option<TargetArg>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum TargetArg {
    Test,
    Production,
}

impl From<TargetArg> for Target {
    fn from(t: TargetArg) -> Self {
        match t {
            TargetArg::Test => Target::Test,
            TargetArg::Production => Target::Production,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Send the approval request for a new submission and mark it pending
    #[command(after_help = "\
Examples:
  fairways submit
  fairways submit --row 14
  fairways submit --row 14 --json")]
    Submit {
        /// Intake row (default: newest submission)
        #[arg(long)]
        row: Option<usize>,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show what approving a submission would change, without writing
    #[command(after_help = "\
Examples:
  fairways preview --row 14
  fairways preview --json")]
    Preview {
        /// Intake row (default: newest submission)
        #[arg(long)]
        row: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Reconcile a submission into the directory without the approval step
    #[command(after_help = "\
Examples:
  fairways apply --row 14 --target test")]
    Apply {
        /// Intake row (default: newest submission)
        #[arg(long)]
        row: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Approve a submission and write it to the directory
    #[command(after_help = "\
Examples:
  fairways approve --row 14 --as board@example.com")]
    Approve(DecisionArgs),

    /// Reject a submission
    #[command(after_help = "\
Examples:
  fairways reject --row 14 --as board@example.com")]
    Reject(DecisionArgs),

    /// Act on an approval link from a notification
    #[command(after_help = "\
Examples:
  fairways link 'https://example.com/approval?action=approve&row=14&sheetId=1' --as board@example.com")]
    Link {
        /// The full approve or reject URL
        url: String,

        /// Approver identity recorded in the intake sheet
        #[arg(long = "as", env = "FAIRWAYS_APPROVER")]
        approver: String,

        #[arg(long)]
        json: bool,
    },

    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Args)]
struct DecisionArgs {
    /// Intake row
    #[arg(long)]
    row: usize,

    /// Intake sheet id (default: intake.sheet_id from the config)
    #[arg(long)]
    sheet: Option<String>,

    /// Approver identity recorded in the intake sheet
    #[arg(long = "as", env = "FAIRWAYS_APPROVER")]
    approver: String,

    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the config path in use
    Path,

    /// Parse and validate the config
    #[command(after_help = "\
Examples:
  fairways config validate
  fairways --config ./fairways.toml config validate")]
    Validate,

    /// Write a starter config
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let target = cli.target.map(Target::from);
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Config { command } => cmd_config(command, cli.config.clone()),
        Commands::Submit { row, json } => {
            workflow::cmd_submit(&Settings::load(config, target)?, row, json)
        }
        Commands::Preview { row, json } => {
            workflow::cmd_preview(&Settings::load(config, target)?, row, json)
        }
        Commands::Apply { row, json } => {
            workflow::cmd_apply(&Settings::load(config, target)?, row, json)
        }
        Commands::Approve(args) => decide(ApprovalAction::Approve, args, config, target),
        Commands::Reject(args) => decide(ApprovalAction::Reject, args, config, target),
        Commands::Link { url, approver, json } => {
            workflow::cmd_link(&Settings::load(config, target)?, &url, &approver, json)
        }
    }
}

fn decide(
    action: ApprovalAction,
    args: DecisionArgs,
    config: Option<&std::path::Path>,
    target: Option<Target>,
) -> Result<(), CliError> {
    let settings = Settings::load(config, target)?;
    workflow::cmd_decide(&settings, action, args.row, args.sheet, &args.approver, args.json)
}

// ============================================================================
// config
// ============================================================================

fn cmd_config(cmd: ConfigCommands, path: Option<PathBuf>) -> Result<(), CliError> {
    let path = path.unwrap_or_else(default_config_path);
    match cmd {
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Validate => {
            let settings = Settings::load(Some(&path), None)?;
            let c = &settings.config;
            println!("{}: ok", path.display());
            println!("  name:      {}", c.name);
            println!("  target:    {} ({})", c.target, settings.directory_path().display());
            println!("  intake:    {}", settings.intake_path().display());
            println!("  admins:    {}", c.admin_emails.join(", "));
            println!("  ambiguous: {}", if c.matching.fail_on_ambiguous { "fail" } else { "first match" });
            Ok(())
        }
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::args(format!("{} already exists", path.display()))
                    .with_hint("pass --force to overwrite"));
            }
            // Never write a template that would not load
            ReconConfig::from_toml(TEMPLATE).map_err(|e| CliError {
                code: EXIT_CONFIG_INVALID,
                message: e.to_string(),
                hint: None,
            })?;
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|e| CliError::io(format!("cannot create {}: {e}", parent.display())))?;
            }
            std::fs::write(&path, TEMPLATE)
                .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
            eprintln!("wrote {}", path.display());
            Ok(())
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_decision_flags() {
        let cli = Cli::try_parse_from([
            "fairways", "approve", "--row", "14", "--as", "board@x.com", "--target", "production",
        ])
        .unwrap();
        assert!(matches!(cli.target, Some(TargetArg::Production)));
        match cli.command {
            Commands::Approve(args) => {
                assert_eq!(args.row, 14);
                assert_eq!(args.approver, "board@x.com");
                assert!(args.sheet.is_none());
            }
            _ => panic!("expected approve"),
        }
    }
}
