//! Sync command implementation.

use crate::cli::args::SyncArgs;
use crate::cli::output::Output;
use crate::cli::{signal, Context};
use crate::error::{ExitCode, Result};
use crate::remote::{MemoryClient, NotionClient, RemoteClient};
use crate::state::JsonFileStore;
use crate::sync::{PassSummary, SyncOptions, Syncer};

pub fn run(ctx: &Context, args: &SyncArgs, output: &Output) -> Result<ExitCode> {
    let options = SyncOptions {
        dry_run: args.dry_run,
        adopt_existing_pages: ctx.config.adopt_existing_pages && !args.no_adopt,
    };

    // A dry run never reaches the remote, so it works without credentials.
    let summary = if args.dry_run {
        run_pass(ctx, MemoryClient::new(), options)?
    } else {
        run_pass(ctx, NotionClient::new(&ctx.config.notion)?, options)?
    };

    output.print(&summary)?;
    Ok(exit_code_for(&summary))
}

fn run_pass<C: RemoteClient>(
    ctx: &Context,
    client: C,
    options: SyncOptions,
) -> Result<PassSummary> {
    let store = JsonFileStore::new(&ctx.state_path);
    let mut syncer = Syncer::new(ctx.vault.clone(), store, client).with_options(options);
    syncer.run_pass(&signal::SHUTDOWN)
}

/// Exit code for a finished pass.
pub fn exit_code_for(summary: &PassSummary) -> ExitCode {
    if summary.failed > 0 {
        ExitCode::FilesFailed
    } else {
        ExitCode::Success
    }
}
