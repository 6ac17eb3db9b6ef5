//! Vaultsync - incremental sync of an Obsidian-style Markdown vault into Notion.
//!
//! # Overview
//!
//! Each pass walks the vault, fingerprints every note and skips the ones
//! whose content is unchanged since the last successful sync. Changed notes
//! are converted into Notion blocks:
//! - YAML frontmatter becomes page properties (title, tags, date)
//! - `[[wikilinks]]` become plain text
//! - headings, lists, todos, quotes, code fences and remote images become
//!   the matching Notion blocks, nested lists included
//!
//! # Example
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//! use vaultsync::remote::MemoryClient;
//! use vaultsync::state::JsonFileStore;
//! use vaultsync::{Syncer, Vault};
//!
//! let vault = Vault::new("/path/to/vault").unwrap();
//! let store = JsonFileStore::new("/tmp/vaultsync-state.json");
//! let mut syncer = Syncer::new(vault, store, MemoryClient::new());
//!
//! let summary = syncer.run_pass(&AtomicBool::new(false)).unwrap();
//! println!("{} created, {} skipped", summary.created, summary.skipped);
//! ```

pub mod cli;
pub mod config;
pub mod convert;
pub mod detect;
pub mod error;
pub mod logging;
pub mod parser;
pub mod remote;
pub mod state;
pub mod sync;
pub mod types;
pub mod vault;

// Re-export main types at crate root
pub use config::Config;
pub use error::{RemoteError, Result, SyncError};
pub use sync::{FileOutcome, PassSummary, SyncOptions, Syncer};
pub use types::*;
pub use vault::Vault;
