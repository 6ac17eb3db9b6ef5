//! Log subscriber setup for the binary.

use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Install the stderr subscriber.
///
/// `-q` and `-v` flags win over everything. Otherwise `RUST_LOG` directives
/// apply on top of `configured_level`.
pub fn init(configured_level: &str, verbose: u8, quiet: bool) {
    let filter = match flag_level(verbose, quiet) {
        Some(level) => EnvFilter::new(level.to_string()),
        None => {
            let level = parse_level(configured_level).unwrap_or(LevelFilter::INFO);
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy()
        }
    };

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry().with(layer).try_init();
}

fn flag_level(verbose: u8, quiet: bool) -> Option<LevelFilter> {
    if quiet {
        return Some(LevelFilter::ERROR);
    }
    match verbose {
        0 => None,
        1 => Some(LevelFilter::DEBUG),
        _ => Some(LevelFilter::TRACE),
    }
}

/// Parse a level name such as `info` or `WARN`.
pub fn parse_level(s: &str) -> Option<LevelFilter> {
    match s.trim().to_lowercase().as_str() {
        "off" => Some(LevelFilter::OFF),
        "error" => Some(LevelFilter::ERROR),
        "warn" | "warning" => Some(LevelFilter::WARN),
        "info" => Some(LevelFilter::INFO),
        "debug" => Some(LevelFilter::DEBUG),
        "trace" => Some(LevelFilter::TRACE),
        _ => None,
    }
}
