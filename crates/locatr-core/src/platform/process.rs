//! Platform-specific process checks and termination for the engine.

#[cfg(not(any(unix, windows)))]
use tracing::warn;

/// Check if a process with the given PID is alive.
///
/// # Platform Behavior
/// - **Linux/macOS**: Uses `kill(pid, 0)` signal check
/// - **Windows**: Uses `OpenProcess` with `PROCESS_QUERY_LIMITED_INFORMATION`
#[allow(unsafe_code)]
pub fn is_process_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        if pid == 0 || pid > i32::MAX as u32 {
            return false;
        }
        // SAFETY: signal 0 performs permission and existence checks only; no
        // signal is delivered and no memory is touched.
        unsafe { libc::kill(pid as i32, 0) == 0 }
    }

    #[cfg(windows)]
    {
        use windows_sys::Win32::Foundation::CloseHandle;
        use windows_sys::Win32::System::Threading::{
            OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION,
        };

        // SAFETY: the handle is checked for null and closed exactly once.
        unsafe {
            let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
            if !handle.is_null() {
                CloseHandle(handle);
                true
            } else {
                false
            }
        }
    }

    #[cfg(not(any(unix, windows)))]
    {
        warn!("Process alive check not implemented for this platform");
        true
    }
}

/// Force-kill a process without waiting for a graceful shutdown.
///
/// The engine holds no state worth flushing, so there is no SIGTERM grace
/// period. Returns `true` if the process is gone afterwards (or was never
/// running).
///
/// # Platform Behavior
/// - **Linux/macOS**: Sends SIGKILL and reaps the zombie if it is our child
/// - **Windows**: Uses `TerminateProcess`
pub fn kill_process(pid: u32) -> bool {
    #[cfg(unix)]
    {
        // 0 and negative values address process groups, never a single engine.
        if pid == 0 || pid > i32::MAX as u32 {
            return false;
        }

        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::sys::wait::{waitpid, WaitPidFlag};
        use nix::unistd::Pid;

        let nix_pid = Pid::from_raw(pid as i32);
        match kill(nix_pid, Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(_) => return false,
        }

        // Reap if it was spawned by us; the kill is asynchronous so poll briefly.
        for _ in 0..20 {
            match waitpid(nix_pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(nix::sys::wait::WaitStatus::StillAlive) => {
                    std::thread::sleep(std::time::Duration::from_millis(5));
                }
                _ => break,
            }
        }
        true
    }

    #[cfg(windows)]
    {
        kill_process_windows(pid)
    }

    #[cfg(not(any(unix, windows)))]
    {
        warn!("Process termination not implemented for this platform");
        false
    }
}

#[cfg(windows)]
#[allow(unsafe_code)]
fn kill_process_windows(pid: u32) -> bool {
    use windows_sys::Win32::Foundation::CloseHandle;
    use windows_sys::Win32::System::Threading::{OpenProcess, TerminateProcess, PROCESS_TERMINATE};

    // SAFETY: the handle is checked for null before use and closed exactly once.
    unsafe {
        let handle = OpenProcess(PROCESS_TERMINATE, 0, pid);
        if handle.is_null() {
            return !is_process_alive(pid);
        }
        let ok = TerminateProcess(handle, 1) != 0;
        CloseHandle(handle);
        ok
    }
}
