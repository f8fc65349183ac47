//! Framed local IPC with the locatr engine.
//!
//! # Architecture
//!
//! - **Protocol**: version-stamped, length-prefixed framing (no I/O)
//! - **Messages**: JSON shapes for handshake and query traffic
//! - **Transport**: one blocking socket with bounded connect retries
//! - **Handshake** / **Request**: the two exchanges a connection performs
//!
//! Frames on a connection are strictly request then reply; there is no
//! pipelining.

pub mod handshake;
pub mod messages;
pub mod protocol;
pub mod request;
pub mod transport;

pub use messages::{LocatrOutput, SelectorType};
pub use protocol::PROTOCOL_VERSION;
pub use transport::TransportChannel;
