use std::path::PathBuf;

use clap::{Parser, Subcommand};

const HELP_EPILOG: &str = r#"Config resolution order:
  1) --config/-c PATH
  2) $APPROVAL_NOTIFY_CONFIG
  3) platform default: ~/.config/approval-notify/client.yaml

Settings file: --settings PATH, else `settings_path` from the config,
else approval-notify-setting.json next to client.yaml.

While the agent runs, type `help` on stdin for the control commands.
"#;

#[derive(Debug, Parser)]
#[command(
    name = "approval-notify",
    version,
    about = "Desktop indicator for pending approval requests",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Path to the JSON settings file
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,
    /// Use fixture counts and the short debug interval instead of the server
    #[arg(long, global = true)]
    pub debug: bool,
    /// Optional subcommand. Without one, runs the agent.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the resident indicator (default)
    Run,
    /// Fetch the counts once and print them
    Check,
    /// Open the approval page for the configured user
    Open,
    /// Print the settings file path and the effective settings
    Settings,
    /// Prompt for an admin secret and print its SHA-256 digest for the config
    HashSecret,
}
