//! Teardown of spawned engines when the host program exits.
//!
//! There is no "last client gone" shutdown. Every spawned engine is recorded
//! here and killed, with its socket file removed, from one of two paths:
//!
//! - a libc `atexit` hook (normal return from `main` or `std::process::exit`)
//! - an optional `ctrlc` handler for SIGINT/SIGTERM, which exits with status
//!   [`EngineConfig::SIGNAL_EXIT_CODE`] afterwards
//!
//! The signal handler can be turned off per supervisor because a host application may
//! already own those signals; a conflict is logged, not raised.

use super::endpoint::Endpoint;
use crate::config::EngineConfig;
use crate::platform;
use std::sync::{Mutex, Once};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
struct CleanupEntry {
    pid: u32,
    endpoint: Endpoint,
}

static REGISTRY: Mutex<Vec<CleanupEntry>> = Mutex::new(Vec::new());
static EXIT_HOOK: Once = Once::new();
static SIGNAL_HOOK: Once = Once::new();

/// Record an engine for teardown at exit.
pub fn register(pid: u32, endpoint: &Endpoint) {
    install_exit_hook();
    let mut entries = REGISTRY.lock().unwrap_or_else(|e| e.into_inner());
    entries.push(CleanupEntry {
        pid,
        endpoint: endpoint.clone(),
    });
    debug!("Registered engine PID {} ({}) for exit cleanup", pid, endpoint);
}

/// Forget an engine that was already stopped.
pub fn unregister(pid: u32) {
    let mut entries = REGISTRY.lock().unwrap_or_else(|e| e.into_inner());
    entries.retain(|entry| entry.pid != pid);
}

/// PIDs currently awaiting cleanup.
pub fn registered_pids() -> Vec<u32> {
    REGISTRY
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .iter()
        .map(|entry| entry.pid)
        .collect()
}

/// Kill every registered engine and remove its socket file now.
///
/// Returns the number of engines handled.
pub fn run_cleanup() -> usize {
    let entries = std::mem::take(&mut *REGISTRY.lock().unwrap_or_else(|e| e.into_inner()));
    for entry in &entries {
        let killed = platform::kill_process(entry.pid);
        let removed = entry.endpoint.remove_socket_file();
        info!(
            "Stopped engine PID {} (killed: {}, socket removed: {})",
            entry.pid, killed, removed
        );
    }
    entries.len()
}

/// Install the SIGINT/SIGTERM handler once per process.
pub fn install_signal_handler() {
    SIGNAL_HOOK.call_once(|| {
        let result = ctrlc::set_handler(|| {
            let count = run_cleanup();
            debug!("Signal cleanup stopped {} engine(s)", count);
            std::process::exit(EngineConfig::SIGNAL_EXIT_CODE);
        });
        match result {
            Ok(()) => debug!("Installed engine cleanup signal handler"),
            Err(ctrlc::Error::MultipleHandlers) => {
                debug!("Signal handler already owned by host; relying on exit hook")
            }
            Err(e) => warn!("Failed to install engine cleanup signal handler: {}", e),
        }
    });
}

fn install_exit_hook() {
    EXIT_HOOK.call_once(|| {
        #[cfg(unix)]
        register_atexit();
    });
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn register_atexit() {
    // SAFETY: `exit_hook` is a plain `extern "C" fn()` with no captured
    // state; registering it has no preconditions.
    let rc = unsafe { libc::atexit(exit_hook) };
    if rc != 0 {
        warn!("Failed to register engine exit hook (rc {})", rc);
    }
}

/// Runs during libc exit; must not block on a lock or log.
#[cfg(unix)]
extern "C" fn exit_hook() {
    use std::sync::TryLockError;

    let entries = match REGISTRY.try_lock() {
        Ok(mut guard) => std::mem::take(&mut *guard),
        Err(TryLockError::Poisoned(e)) => std::mem::take(&mut *e.into_inner()),
        Err(TryLockError::WouldBlock) => return,
    };
    for entry in &entries {
        platform::kill_process(entry.pid);
        entry.endpoint.remove_socket_file();
    }
}
