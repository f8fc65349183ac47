//! Engine process lifecycle.
//!
//! # Responsibilities
//!
//! - **endpoint**: pick a socket address nobody else is using
//! - **supervisor**: spawn the engine once and share it across clients
//! - **output**: forward engine stdout/stderr to a [`LogSink`]
//! - **cleanup**: kill engines and remove sockets when the program exits
//!
//! # Example
//!
//! ```rust,no_run
//! use locatr_client::process::{EngineOptions, EngineSupervisor};
//!
//! fn main() -> locatr_client::Result<()> {
//!     let supervisor = EngineSupervisor::shared_with(
//!         EngineOptions::default().with_binary_path("/opt/locatr/locatr.bin"),
//!     );
//!     let engine = supervisor.ensure_running()?;
//!     println!("engine PID {} listening on {}", engine.pid(), engine.endpoint());
//!     Ok(())
//! }
//! ```

pub mod cleanup;
mod endpoint;
mod output;
mod supervisor;

pub use endpoint::{loopback, select_endpoint, Endpoint};
pub use output::{drain_lines, spawn_drain, LogSink, OutputStream, TracingSink};
pub use supervisor::{EngineOptions, EngineProcess, EngineSupervisor};
