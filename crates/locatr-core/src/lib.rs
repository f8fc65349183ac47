//! Locatr Client - supervisor and framed IPC client for the locatr engine.
//!
//! The locatr engine turns a natural-language description of a page element
//! ("search bar", "login button") into CSS or XPath selectors. This crate does
//! not resolve selectors itself. It starts the engine binary once per program,
//! connects to it over a local socket, performs the session handshake and
//! carries request/response frames.
//!
//! # Example
//!
//! ```rust,no_run
//! use locatr_client::{BackendSettings, LlmProvider, LlmSettings, Locatr, LocatrSettings};
//!
//! #[tokio::main]
//! async fn main() -> locatr_client::Result<()> {
//!     let settings = LocatrSettings::new(
//!         BackendSettings::cdp("http://localhost:9222")?,
//!         LlmSettings::new(LlmProvider::Anthropic, "sk-ant-...", "claude-3-5-sonnet-latest"),
//!     );
//!     let locatr = Locatr::new(settings);
//!
//!     // Blocking call
//!     let output = locatr.get("search bar", None)?;
//!     println!("{}: {:?}", output.selector_type, output.selectors);
//!
//!     // Same contract, run on a blocking worker
//!     let output = locatr.get_async("login button", None).await?;
//!     println!("{:?}", output.first());
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod ipc;
pub mod platform;
pub mod process;
pub mod settings;

mod client;

// Re-export commonly used types
pub use client::{ClientState, Locatr, LocatrBuilder};
pub use config::{ClientOptions, EngineConfig, LogLevel, TracingConfig, TransportConfig};
pub use error::{LocatrError, ProtocolError, Result, SetupError, TransportError};
pub use ipc::messages::{LocatrOutput, SelectorType};
pub use ipc::protocol::PROTOCOL_VERSION;
pub use process::{
    EngineOptions, EngineProcess, EngineSupervisor, Endpoint, LogSink, OutputStream, TracingSink,
};
pub use settings::{BackendSettings, LlmProvider, LlmSettings, LocatrSettings};
