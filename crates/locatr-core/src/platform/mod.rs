//! Platform abstraction layer.
//!
//! All `#[cfg]` blocks for OS-specific process handling live here rather than
//! in the supervisor.
//!
//! # Supported Platforms
//!
//! - **Linux** / **macOS**: Unix domain sockets, signals via `nix`
//! - **Windows**: loopback TCP, termination via `windows-sys`

pub mod process;

pub use process::{is_process_alive, kill_process};
