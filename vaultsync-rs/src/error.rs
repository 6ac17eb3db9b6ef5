//! Error types and exit codes for vaultsync.

use std::path::PathBuf;
use thiserror::Error;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const VAULT_NOT_FOUND: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const STATE_ERROR: i32 = 4;
    pub const STATE_LOCKED: i32 = 5;
    pub const FILES_FAILED: i32 = 10;
}

/// Main error type for vaultsync operations.
///
/// Everything here is fatal for a pass. Per-file problems are reported
/// through [`crate::sync::FileOutcome::Failed`] instead.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Vault not found at: {0}")]
    VaultNotFound(PathBuf),

    #[error("Note not found: {0}")]
    NoteNotFound(PathBuf),

    #[error("Note is not valid UTF-8: {0}")]
    InvalidUtf8(PathBuf),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Sync state error: {0}")]
    StateError(String),

    #[error("Sync state is locked by another process (pid {pid}): {path}")]
    StateLocked { path: PathBuf, pid: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),
}

impl SyncError {
    /// Returns the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncError::VaultNotFound(_) => exit_code::VAULT_NOT_FOUND,
            SyncError::ConfigError(_) | SyncError::TomlParse(_) => exit_code::CONFIG_ERROR,
            SyncError::StateError(_) => exit_code::STATE_ERROR,
            SyncError::StateLocked { .. } => exit_code::STATE_LOCKED,
            _ => exit_code::GENERAL_ERROR,
        }
    }
}

/// Errors reported by a [`crate::remote::RemoteClient`].
///
/// Any of these means the remote state is unknown for that note.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    #[error("page not found: {0}")]
    PageNotFound(String),
}

/// Result type alias for vaultsync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    FilesFailed,
}

impl ExitCode {
    /// Convert to exit code integer.
    pub fn code(self) -> i32 {
        match self {
            ExitCode::Success => exit_code::SUCCESS,
            ExitCode::FilesFailed => exit_code::FILES_FAILED,
        }
    }
}
