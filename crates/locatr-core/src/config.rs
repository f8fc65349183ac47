//! Centralized configuration for the locatr client.
//!
//! Compile-time constants live on unit structs (`TransportConfig`,
//! `EngineConfig`); per-instance knobs are set through [`ClientOptions`] and
//! [`crate::EngineOptions`].

use std::time::Duration;

/// Socket and retry parameters for the engine connection.
pub struct TransportConfig;

impl TransportConfig {
    /// Read timeout applied to every socket.
    pub const SOCKET_TIMEOUT: Duration = Duration::from_secs(30);
    /// Connect attempts made while the engine finishes starting.
    pub const CONNECT_MAX_RETRIES: u32 = 5;
    pub const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(1);
    /// Budget for transient write faults.
    pub const SEND_MAX_RETRIES: u32 = 3;
    pub const SEND_RETRY_DELAY: Duration = Duration::from_millis(500);
}

/// Engine process parameters.
pub struct EngineConfig;

impl EngineConfig {
    pub const DEFAULT_SOCKET_PATH: &'static str = "/tmp/locatr.sock";
    /// Used where Unix domain sockets are unavailable.
    pub const DEFAULT_TCP_PORT: u16 = 8192;
    /// Random candidates are `/tmp/locatr{N}.sock` with `N <= RANDOM_SUFFIX_MAX`.
    pub const RANDOM_SUFFIX_MAX: u32 = 100_000;
    /// Candidates probed before endpoint selection gives up.
    pub const MAX_ENDPOINT_CANDIDATES: u32 = 1_000;
    /// Environment variable that overrides the engine binary location.
    pub const BINARY_PATH_ENV: &'static str = "LOCATR_BINARY_PATH";
    pub const DEFAULT_BINARY_NAME: &'static str = "locatr.bin";
    /// Exit status used after signal-driven cleanup.
    pub const SIGNAL_EXIT_CODE: i32 = 130;
}

/// Log verbosity forwarded to the engine as `-logLevel`.
///
/// Values follow the engine's slog levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_engine_value(&self) -> i32 {
        match self {
            LogLevel::Debug => -4,
            LogLevel::Info => 0,
            LogLevel::Warn => 4,
            LogLevel::Error => 8,
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Error
    }
}

/// OpenTelemetry exporter settings passed through to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    pub endpoint: String,
    pub service_name: String,
    pub insecure: bool,
}

impl TracingConfig {
    pub fn new(endpoint: impl Into<String>, service_name: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            service_name: service_name.into(),
            insecure: false,
        }
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// Engine command-line arguments for this config.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            format!("-tracing.endpoint={}", self.endpoint),
            format!("-tracing.svcName={}", self.service_name),
            format!("-tracing.insecure={}", self.insecure),
        ]
    }
}

/// Per-instance connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub socket_timeout: Duration,
    pub connect_retries: u32,
    pub connect_retry_delay: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            socket_timeout: TransportConfig::SOCKET_TIMEOUT,
            connect_retries: TransportConfig::CONNECT_MAX_RETRIES,
            connect_retry_delay: TransportConfig::CONNECT_RETRY_DELAY,
        }
    }
}

impl ClientOptions {
    pub fn with_socket_timeout(mut self, timeout: Duration) -> Self {
        self.socket_timeout = timeout;
        self
    }

    pub fn with_connect_retries(mut self, retries: u32) -> Self {
        self.connect_retries = retries;
        self
    }

    pub fn with_connect_retry_delay(mut self, delay: Duration) -> Self {
        self.connect_retry_delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_engine_values() {
        assert_eq!(LogLevel::Debug.as_engine_value(), -4);
        assert_eq!(LogLevel::Info.as_engine_value(), 0);
        assert_eq!(LogLevel::Warn.as_engine_value(), 4);
        assert_eq!(LogLevel::Error.as_engine_value(), 8);
        assert_eq!(LogLevel::default(), LogLevel::Error);
    }

    #[test]
    fn test_tracing_args() {
        let args = TracingConfig::new("localhost:4317", "locatr")
            .with_insecure(true)
            .to_args();
        assert_eq!(
            args,
            vec![
                "-tracing.endpoint=localhost:4317".to_string(),
                "-tracing.svcName=locatr".to_string(),
                "-tracing.insecure=true".to_string(),
            ]
        );
    }

    #[test]
    fn test_timeouts_are_reasonable() {
        assert!(TransportConfig::SOCKET_TIMEOUT > Duration::ZERO);
        assert!(TransportConfig::CONNECT_MAX_RETRIES > 0);
        assert_eq!(ClientOptions::default().socket_timeout, TransportConfig::SOCKET_TIMEOUT);
    }
}
