//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vaultsync")]
#[command(author, version, about = "Sync a Markdown vault into a Notion database", long_about = None)]
pub struct Cli {
    /// Configuration file (default: <config dir>/vaultsync/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the vault (overrides config and OBSIDIAN_VAULT_PATH)
    #[arg(long, global = true)]
    pub vault: Option<PathBuf>,

    /// Sync state file (overrides config)
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    /// Output as JSON (default)
    #[arg(long, global = true, conflicts_with_all = ["yaml", "toml"])]
    pub json: bool,

    /// Output as YAML
    #[arg(long, global = true, conflicts_with_all = ["json", "toml"])]
    pub yaml: bool,

    /// Output as TOML
    #[arg(long, global = true, conflicts_with_all = ["json", "yaml"])]
    pub toml: bool,

    /// Only log errors and suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (can be repeated)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_format(&self) -> OutputFormat {
        if self.yaml {
            OutputFormat::Yaml
        } else if self.toml {
            OutputFormat::Toml
        } else {
            OutputFormat::Json
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Toml,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single sync pass
    Sync(SyncArgs),

    /// Sync now, then again every interval until interrupted
    Watch(WatchArgs),

    /// Show the page a note would become, without syncing
    Preview(PreviewArgs),

    /// Show or clear the sync state
    State(StateArgs),
}

#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Report what would be synced without calling the remote or saving state
    #[arg(long)]
    pub dry_run: bool,

    /// Always create new pages instead of reusing pages with the same title
    #[arg(long)]
    pub no_adopt: bool,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Minutes between passes (overrides config and SYNC_INTERVAL_MINUTES)
    #[arg(long)]
    pub interval: Option<u64>,

    /// Always create new pages instead of reusing pages with the same title
    #[arg(long)]
    pub no_adopt: bool,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Note path relative to the vault (.md optional)
    pub note: String,
}

#[derive(Args, Debug)]
pub struct StateArgs {
    /// Delete the state file so every note is synced again
    #[arg(long)]
    pub clear: bool,
}
