//! Local endpoint addresses for the engine and collision-free selection.

use crate::config::EngineConfig;
use crate::error::{Result, SetupError};
use rand::Rng;
use std::net::{Ipv4Addr, SocketAddr, TcpListener};
#[cfg(unix)]
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Address the engine listens on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Filesystem path of a Unix domain socket.
    #[cfg(unix)]
    Unix(PathBuf),
    /// Loopback `host:port`.
    Tcp(SocketAddr),
}

impl Default for Endpoint {
    #[cfg(unix)]
    fn default() -> Self {
        Endpoint::Unix(PathBuf::from(EngineConfig::DEFAULT_SOCKET_PATH))
    }

    #[cfg(not(unix))]
    fn default() -> Self {
        loopback(EngineConfig::DEFAULT_TCP_PORT)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(unix)]
            Endpoint::Unix(path) => write!(f, "{}", path.display()),
            Endpoint::Tcp(addr) => write!(f, "{}", addr),
        }
    }
}

impl Endpoint {
    #[cfg(unix)]
    pub fn unix(path: impl AsRef<Path>) -> Self {
        Endpoint::Unix(path.as_ref().to_path_buf())
    }

    pub fn tcp(addr: SocketAddr) -> Self {
        Endpoint::Tcp(addr)
    }

    /// Whether something already owns this address.
    ///
    /// A socket path counts as taken as soon as the file exists, live listener
    /// or not. A TCP address is taken when a probe bind fails.
    pub fn is_in_use(&self) -> bool {
        match self {
            #[cfg(unix)]
            Endpoint::Unix(path) => path.symlink_metadata().is_ok(),
            Endpoint::Tcp(addr) => TcpListener::bind(addr).is_err(),
        }
    }

    /// Engine command-line arguments that select this endpoint.
    pub fn engine_args(&self) -> Vec<String> {
        match self {
            #[cfg(unix)]
            Endpoint::Unix(path) => vec![format!("-socketFilePath={}", path.display())],
            Endpoint::Tcp(addr) => vec![format!("-listenAddr={}", addr)],
        }
    }

    /// Delete the socket file if present. Returns true when a file was removed.
    pub fn remove_socket_file(&self) -> bool {
        match self {
            #[cfg(unix)]
            Endpoint::Unix(path) => std::fs::remove_file(path).is_ok(),
            Endpoint::Tcp(_) => false,
        }
    }

    /// A fresh address of the same kind next to this one.
    ///
    /// `/tmp/locatr.sock` yields `/tmp/locatr{N}.sock`; TCP endpoints get an
    /// OS-assigned loopback port.
    fn random_candidate(&self) -> Endpoint {
        match self {
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                let n = rand::rng().random_range(0..=EngineConfig::RANDOM_SUFFIX_MAX);
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "locatr".to_string());
                let file_name = match path.extension() {
                    Some(ext) => format!("{}{}.{}", stem, n, ext.to_string_lossy()),
                    None => format!("{}{}", stem, n),
                };
                Endpoint::Unix(path.with_file_name(file_name))
            }
            Endpoint::Tcp(addr) => {
                let port = TcpListener::bind((addr.ip(), 0))
                    .and_then(|l| l.local_addr())
                    .map(|a| a.port())
                    .unwrap_or_else(|_| rand::rng().random_range(1024..=u16::MAX));
                Endpoint::Tcp(SocketAddr::new(addr.ip(), port))
            }
        }
    }
}

/// Choose `preferred` if free, otherwise probe random candidates until one is.
pub fn select_endpoint(preferred: &Endpoint) -> Result<Endpoint> {
    if !preferred.is_in_use() {
        debug!("Using default engine endpoint {}", preferred);
        return Ok(preferred.clone());
    }

    for _ in 0..EngineConfig::MAX_ENDPOINT_CANDIDATES {
        let candidate = preferred.random_candidate();
        if !candidate.is_in_use() {
            info!(
                "Engine endpoint {} is in use, switching to {}",
                preferred, candidate
            );
            return Ok(candidate);
        }
    }

    Err(SetupError::EndpointExhausted {
        attempts: EngineConfig::MAX_ENDPOINT_CANDIDATES,
    }
    .into())
}

/// Loopback TCP endpoint on the given port.
pub fn loopback(port: u16) -> Endpoint {
    Endpoint::Tcp(SocketAddr::from((Ipv4Addr::LOCALHOST, port)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    #[test]
    fn test_free_socket_path_is_kept() {
        let temp_dir = TempDir::new().unwrap();
        let preferred = Endpoint::unix(temp_dir.path().join("locatr.sock"));

        assert!(!preferred.is_in_use());
        assert_eq!(select_endpoint(&preferred).unwrap(), preferred);
    }

    #[cfg(unix)]
    #[test]
    fn test_occupied_socket_path_is_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let default_path = temp_dir.path().join("locatr.sock");
        std::fs::write(&default_path, b"").unwrap();
        let preferred = Endpoint::unix(&default_path);

        let chosen = select_endpoint(&preferred).unwrap();
        assert_ne!(chosen, preferred);
        assert!(!chosen.is_in_use());

        match chosen {
            Endpoint::Unix(path) => {
                assert_eq!(path.parent(), Some(temp_dir.path()));
                let name = path.file_name().unwrap().to_string_lossy().into_owned();
                assert!(name.starts_with("locatr"));
                assert!(name.ends_with(".sock"));
            }
            other => panic!("Expected Unix endpoint, got: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_engine_args_and_removal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("engine.sock");
        let endpoint = Endpoint::unix(&path);

        assert_eq!(
            endpoint.engine_args(),
            vec![format!("-socketFilePath={}", path.display())]
        );

        assert!(!endpoint.remove_socket_file());
        std::fs::write(&path, b"").unwrap();
        assert!(endpoint.remove_socket_file());
        assert!(!path.exists());
    }

    #[test]
    fn test_occupied_tcp_port_is_replaced() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let taken = Endpoint::tcp(listener.local_addr().unwrap());
        assert!(taken.is_in_use());

        let chosen = select_endpoint(&taken).unwrap();
        assert_ne!(chosen, taken);
        assert!(chosen.engine_args()[0].starts_with("-listenAddr=127.0.0.1:"));
    }
}
