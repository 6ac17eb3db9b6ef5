//! Watch command implementation.

use crate::cli::args::WatchArgs;
use crate::cli::output::Output;
use crate::cli::{signal, Context};
use crate::error::{ExitCode, Result};
use crate::remote::NotionClient;
use crate::state::JsonFileStore;
use crate::sync::{SyncOptions, Syncer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(250);

pub fn run(ctx: &Context, args: &WatchArgs, output: &Output) -> Result<ExitCode> {
    let mut config = ctx.config.clone();
    if let Some(minutes) = args.interval {
        config.interval_minutes = minutes;
    }
    let interval = config.interval()?;

    let client = NotionClient::new(&config.notion)?;
    let options = SyncOptions {
        dry_run: false,
        adopt_existing_pages: config.adopt_existing_pages && !args.no_adopt,
    };
    let store = JsonFileStore::new(&ctx.state_path);
    let mut syncer = Syncer::new(ctx.vault.clone(), store, client).with_options(options);

    tracing::info!(
        "watching {} every {} minute(s)",
        ctx.vault.root.display(),
        config.interval_minutes
    );

    loop {
        match syncer.run_pass(&signal::SHUTDOWN) {
            Ok(summary) => output.print(&summary)?,
            Err(e) => tracing::error!("pass failed: {}", e),
        }

        if !wait(interval, &signal::SHUTDOWN) {
            break;
        }
    }

    tracing::info!("shutdown requested, stopping");
    Ok(ExitCode::Success)
}

/// Sleep for `interval`, waking early when `stop` is set.
///
/// Returns `false` if stopped.
pub fn wait(interval: Duration, stop: &AtomicBool) -> bool {
    let start = Instant::now();
    while !stop.load(Ordering::SeqCst) {
        let elapsed = start.elapsed();
        if elapsed >= interval {
            return true;
        }
        std::thread::sleep(TICK.min(interval - elapsed));
    }
    false
}
