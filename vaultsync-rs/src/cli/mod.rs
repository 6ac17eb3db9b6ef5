//! CLI command implementations.

pub mod args;
pub mod output;
pub mod signal;

pub mod preview;
pub mod state;
pub mod sync;
pub mod watch;

pub use args::{Cli, Commands};
pub use output::Output;

use crate::config::Config;
use crate::error::Result;
use crate::vault::Vault;
use std::path::PathBuf;

/// Resolved configuration shared by all commands.
#[derive(Debug)]
pub struct Context {
    pub config: Config,
    pub vault: Vault,
    pub state_path: PathBuf,
}

impl Context {
    /// Apply command line overrides to `config` and open the vault.
    pub fn new(cli: &Cli, mut config: Config) -> Result<Self> {
        if let Some(vault) = &cli.vault {
            config.vault_path = Some(vault.clone());
        }
        if let Some(state) = &cli.state {
            config.state_path = Some(state.clone());
        }

        let vault_root = config.vault_root()?.to_path_buf();
        let vault = Vault::new(&vault_root)?.with_exclude(&config.exclude)?;
        let state_path = config.state_path_for(&vault_root);

        Ok(Self {
            config,
            vault,
            state_path,
        })
    }
}
