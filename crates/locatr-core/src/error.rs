//! Error types for the locatr client.
//!
//! Errors are grouped by the boundary that raises them so callers can match on
//! the kind instead of inspecting messages:
//!
//! - [`SetupError`] - the engine binary could not be found or started
//! - [`TransportError`] - the local byte stream failed
//! - [`ProtocolError`] - the peer speaks a different wire version
//! - [`LocatrError::Handshake`] / [`LocatrError::Query`] - the engine rejected a
//!   message or replied with something that does not validate

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures while locating or launching the engine process.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Locatr binary not found at path: {}", .0.display())]
    BinaryNotFound(PathBuf),

    #[error("Failed to spawn locatr engine {}: {message}", .binary.display())]
    SpawnFailed {
        binary: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("No free endpoint found after {attempts} candidates")]
    EndpointExhausted { attempts: u32 },
}

/// Failures of the byte stream between client and engine.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Locatr socket not available at {endpoint} after {attempts} attempts")]
    Unavailable { endpoint: String, attempts: u32 },

    #[error("Socket timed out after {0:?} while reading")]
    Timeout(Duration),

    #[error("Broken pipe: engine is gone")]
    BrokenPipe,

    #[error("Connection was closed unexpectedly")]
    ConnectionReset,

    #[error("Failed to send data: {message}")]
    SendFailed { message: String },

    #[error("Failed to receive data: {message}")]
    ReceiveFailed { message: String },

    #[error("Connection is closed")]
    Closed,
}

impl TransportError {
    /// Whether a fresh call on a new instance may succeed.
    ///
    /// The channel itself is closed by then; only connect attempts are
    /// retried inside it.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Unavailable { .. } | TransportError::Timeout(_))
    }
}

/// Wire-level disagreements with the engine.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Client and server version mismatch: client version {expected}, server version {actual}")]
    VersionMismatch { expected: String, actual: String },
}

/// Main error type for the locatr client.
#[derive(Debug, Error)]
pub enum LocatrError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Locatr initial handshake failed: {message}")]
    Handshake { message: String },

    #[error("Failed to retrieve locatr: {message}")]
    Query { message: String },

    #[error("Invalid settings for {field}: {message}")]
    Settings { field: String, message: String },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Client instance failed earlier and cannot be reused")]
    InstanceFailed,

    #[error("Worker task failed: {message}")]
    Worker { message: String },
}

/// Result type alias for locatr client operations.
pub type Result<T> = std::result::Result<T, LocatrError>;

impl From<serde_json::Error> for LocatrError {
    fn from(err: serde_json::Error) -> Self {
        LocatrError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl LocatrError {
    /// Check if issuing a fresh call (on a new instance) may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            LocatrError::Transport(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// True when the engine was built for another protocol version.
    pub fn is_version_mismatch(&self) -> bool {
        matches!(
            self,
            LocatrError::Protocol(ProtocolError::VersionMismatch { .. })
        )
    }

    /// True for faults of the underlying connection.
    pub fn is_transport(&self) -> bool {
        matches!(self, LocatrError::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LocatrError::Handshake {
            message: "bad api key".into(),
        };
        assert_eq!(err.to_string(), "Locatr initial handshake failed: bad api key");

        let err: LocatrError = SetupError::BinaryNotFound(PathBuf::from("/opt/locatr.bin")).into();
        assert_eq!(
            err.to_string(),
            "Locatr binary not found at path: /opt/locatr.bin"
        );
    }

    #[test]
    fn test_version_mismatch_is_distinct_from_transport() {
        let err: LocatrError = ProtocolError::VersionMismatch {
            expected: "0.0.1".into(),
            actual: "0.0.2".into(),
        }
        .into();

        assert!(err.is_version_mismatch());
        assert!(!err.is_transport());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable_errors() {
        let timeout: LocatrError = TransportError::Timeout(Duration::from_secs(5)).into();
        assert!(timeout.is_retryable());

        let broken: LocatrError = TransportError::BrokenPipe.into();
        assert!(!broken.is_retryable());
        assert!(broken.is_transport());

        assert!(!LocatrError::Query {
            message: "no element".into()
        }
        .is_retryable());
    }
}
