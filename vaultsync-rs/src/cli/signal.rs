//! Shutdown requests from SIGINT and SIGTERM.

use std::sync::atomic::{AtomicBool, Ordering};

/// Set once a shutdown signal arrived.
pub static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Route SIGINT and SIGTERM to [`SHUTDOWN`].
///
/// A pass in progress finishes the note it is on and stops.
#[cfg(unix)]
pub fn install() {
    extern "C" fn on_signal(_signal: libc::c_int) {
        SHUTDOWN.store(true, Ordering::SeqCst);
    }

    let handler = on_signal as extern "C" fn(libc::c_int);
    unsafe {
        libc::signal(libc::SIGINT, handler as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handler as libc::sighandler_t);
    }
}

#[cfg(not(unix))]
pub fn install() {}
