//! State command implementation.

use crate::cli::args::StateArgs;
use crate::cli::output::Output;
use crate::cli::Context;
use crate::error::Result;
use crate::state::{JsonFileStore, SyncState};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub path: String,
    pub records: usize,
    #[serde(skip_serializing_if = "SyncState::is_empty")]
    pub notes: SyncState,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub path: String,
    pub cleared: bool,
}

pub fn run(ctx: &Context, args: &StateArgs, output: &Output) -> Result<()> {
    let path = ctx.state_path.display().to_string();

    if args.clear {
        let existed = ctx.state_path.exists();
        JsonFileStore::clear(&ctx.state_path)?;
        output.info(&format!("Cleared sync state at {}", path));
        return output.print(&ClearResponse {
            path,
            cleared: existed,
        });
    }

    let notes = JsonFileStore::read(&ctx.state_path)?;
    output.print(&StateResponse {
        path,
        records: notes.len(),
        notes,
    })
}
