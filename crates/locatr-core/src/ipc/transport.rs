//! Blocking byte-stream connection to the engine.
//!
//! A [`TransportChannel`] owns exactly one socket. Connecting is retried a
//! bounded number of times because the engine may still be starting. Sends
//! retry transient faults; receives never retry. Any send or receive failure
//! closes the socket, so a failed channel fails fast on later use instead of
//! resuming mid-frame.

use super::protocol::{self, HEADER_LEN};
use crate::config::{ClientOptions, TransportConfig};
use crate::error::{LocatrError, Result, TransportError};
use crate::process::Endpoint;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::time::Duration;
use tracing::{debug, warn};

/// Socket kinds the engine can listen on.
#[derive(Debug)]
pub(crate) enum Stream {
    #[cfg(unix)]
    Unix(UnixStream),
    Tcp(TcpStream),
}

impl Stream {
    fn connect(endpoint: &Endpoint) -> io::Result<Self> {
        match endpoint {
            #[cfg(unix)]
            Endpoint::Unix(path) => UnixStream::connect(path).map(Stream::Unix),
            Endpoint::Tcp(addr) => TcpStream::connect(addr).map(Stream::Tcp),
        }
    }

    fn set_timeout(&self, timeout: Duration) -> io::Result<()> {
        // A zero duration is rejected by the OS; treat it as "no timeout".
        let timeout = Some(timeout).filter(|t| !t.is_zero());
        match self {
            #[cfg(unix)]
            Stream::Unix(s) => {
                s.set_read_timeout(timeout)?;
                s.set_write_timeout(timeout)
            }
            Stream::Tcp(s) => {
                s.set_read_timeout(timeout)?;
                s.set_write_timeout(timeout)
            }
        }
    }

    fn shutdown(&self) {
        let _ = match self {
            #[cfg(unix)]
            Stream::Unix(s) => s.shutdown(Shutdown::Both),
            Stream::Tcp(s) => s.shutdown(Shutdown::Both),
        };
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            #[cfg(unix)]
            Stream::Unix(s) => s.read(buf),
            Stream::Tcp(s) => s.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            #[cfg(unix)]
            Stream::Unix(s) => s.write(buf),
            Stream::Tcp(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            #[cfg(unix)]
            Stream::Unix(s) => s.flush(),
            Stream::Tcp(s) => s.flush(),
        }
    }
}

/// One exclusive connection to the engine.
#[derive(Debug)]
pub struct TransportChannel {
    stream: Option<Stream>,
    endpoint: Endpoint,
    timeout: Duration,
}

impl TransportChannel {
    /// Connect to `endpoint`, retrying while nothing is listening yet.
    ///
    /// Makes `options.connect_retries + 1` attempts with a fixed delay between
    /// them and fails with [`TransportError::Unavailable`] once they are spent.
    pub fn connect(endpoint: &Endpoint, options: &ClientOptions) -> Result<Self> {
        let attempts = options.connect_retries.saturating_add(1);

        for attempt in 1..=attempts {
            match Stream::connect(endpoint) {
                Ok(stream) => {
                    stream
                        .set_timeout(options.socket_timeout)
                        .map_err(timeout_setup_error)?;
                    debug!("Connected to locatr engine at {} (attempt {})", endpoint, attempt);
                    return Ok(Self {
                        stream: Some(stream),
                        endpoint: endpoint.clone(),
                        timeout: options.socket_timeout,
                    });
                }
                Err(e) => {
                    debug!(
                        "Connect to {} failed (attempt {}/{}): {}",
                        endpoint, attempt, attempts, e
                    );
                    if attempt < attempts {
                        std::thread::sleep(options.connect_retry_delay);
                    }
                }
            }
        }

        warn!("Locatr engine at {} never became reachable", endpoint);
        Err(TransportError::Unavailable {
            endpoint: endpoint.to_string(),
            attempts,
        }
        .into())
    }

    /// Wrap an already-connected Unix stream.
    #[cfg(all(test, unix))]
    pub(crate) fn from_unix_stream(stream: UnixStream, timeout: Duration) -> Self {
        let stream = Stream::Unix(stream);
        stream
            .set_timeout(timeout)
            .expect("failed to set test stream timeout");
        Self {
            stream: Some(stream),
            endpoint: Endpoint::unix("<socketpair>"),
            timeout,
        }
    }

    /// Write a complete frame.
    ///
    /// Broken pipe and connection reset are raised at once. Interrupted,
    /// would-block and timed-out writes are retried up to
    /// [`TransportConfig::SEND_MAX_RETRIES`] times before surfacing as
    /// [`TransportError::SendFailed`]. Other faults fail with `SendFailed`
    /// immediately.
    pub fn send(&mut self, frame: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        let result = write_frame(stream, frame);
        if let Err(e) = result {
            warn!("Send to locatr engine failed: {}", e);
            self.close();
            return Err(e.into());
        }
        debug!("Sent {} byte frame", frame.len());
        Ok(())
    }

    /// Read one frame and return its payload bytes.
    pub fn receive(&mut self) -> Result<Vec<u8>> {
        let timeout = self.timeout;
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        let result = read_frame(stream, timeout);
        match result {
            Ok(payload) => {
                debug!("Received {} byte payload", payload.len());
                Ok(payload)
            }
            Err(e) => {
                warn!("Receive from locatr engine failed: {}", e);
                self.close();
                Err(e)
            }
        }
    }

    /// Frame `payload`, send it and wait for exactly one reply.
    pub fn round_trip(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        self.send(&protocol::encode(payload)?)?;
        self.receive()
    }

    /// Shut the socket down. Later calls fail with [`TransportError::Closed`].
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.shutdown();
            debug!("Closed connection to {}", self.endpoint);
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

impl Drop for TransportChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// The socket was never used, so this is reported against the first send.
fn timeout_setup_error(e: io::Error) -> TransportError {
    TransportError::SendFailed {
        message: format!("failed to set socket timeout: {}", e),
    }
}

fn write_frame(stream: &mut Stream, frame: &[u8]) -> std::result::Result<(), TransportError> {
    let mut offset = 0;
    let mut transient_failures = 0;

    while offset < frame.len() {
        match stream.write(&frame[offset..]) {
            Ok(0) => return Err(TransportError::ConnectionReset),
            Ok(n) => offset += n,
            Err(e) => match e.kind() {
                io::ErrorKind::BrokenPipe => return Err(TransportError::BrokenPipe),
                io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
                    return Err(TransportError::ConnectionReset)
                }
                io::ErrorKind::Interrupted
                | io::ErrorKind::WouldBlock
                | io::ErrorKind::TimedOut => {
                    transient_failures += 1;
                    if transient_failures > TransportConfig::SEND_MAX_RETRIES {
                        return Err(TransportError::SendFailed {
                            message: format!(
                                "gave up after {} retries: {}",
                                TransportConfig::SEND_MAX_RETRIES,
                                e
                            ),
                        });
                    }
                    debug!(
                        "Transient send fault ({}), retry {}/{}",
                        e,
                        transient_failures,
                        TransportConfig::SEND_MAX_RETRIES
                    );
                    std::thread::sleep(TransportConfig::SEND_RETRY_DELAY);
                }
                _ => {
                    return Err(TransportError::SendFailed {
                        message: e.to_string(),
                    })
                }
            },
        }
    }

    stream.flush().map_err(|e| TransportError::SendFailed {
        message: e.to_string(),
    })
}

fn read_frame(stream: &mut Stream, timeout: Duration) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_LEN];
    read_exact(stream, &mut header[..protocol::VERSION_LEN], timeout, "version")?;
    protocol::check_version(&header[..protocol::VERSION_LEN])?;
    read_exact(stream, &mut header[protocol::VERSION_LEN..], timeout, "length")?;

    let (_, len) = protocol::decode_header(&header)?;
    let mut payload = vec![0u8; len];
    read_exact(stream, &mut payload, timeout, "payload")?;
    Ok(payload)
}

fn read_exact(
    stream: &mut Stream,
    buf: &mut [u8],
    timeout: Duration,
    part: &str,
) -> Result<()> {
    stream.read_exact(buf).map_err(|e| -> LocatrError {
        match e.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                TransportError::Timeout(timeout).into()
            }
            io::ErrorKind::UnexpectedEof => TransportError::ReceiveFailed {
                message: format!(
                    "connection closed while reading {} ({} bytes expected)",
                    part,
                    buf.len()
                ),
            }
            .into(),
            _ => TransportError::ReceiveFailed {
                message: format!("error reading {}: {}", part, e),
            }
            .into(),
        }
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::ProtocolError;
    use std::os::unix::net::UnixListener;
    use std::thread;
    use tempfile::TempDir;

    fn fast_options() -> ClientOptions {
        ClientOptions::default()
            .with_socket_timeout(Duration::from_secs(5))
            .with_connect_retries(2)
            .with_connect_retry_delay(Duration::from_millis(20))
    }

    #[test]
    fn test_connect_unavailable_after_retries() {
        let temp_dir = TempDir::new().unwrap();
        let endpoint = Endpoint::unix(temp_dir.path().join("missing.sock"));

        match TransportChannel::connect(&endpoint, &fast_options()).unwrap_err() {
            LocatrError::Transport(TransportError::Unavailable { attempts, .. }) => {
                assert_eq!(attempts, 3);
            }
            other => panic!("Expected Unavailable, got: {:?}", other),
        }
    }

    #[test]
    fn test_connect_waits_for_late_listener() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("late.sock");
        let endpoint = Endpoint::unix(&path);

        let server = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            let listener = UnixListener::bind(&path).unwrap();
            let _ = listener.accept().unwrap();
        });

        let options = fast_options()
            .with_connect_retries(50)
            .with_connect_retry_delay(Duration::from_millis(20));
        let channel = TransportChannel::connect(&endpoint, &options).unwrap();
        assert!(channel.is_open());
        assert_eq!(channel.endpoint(), &endpoint);

        server.join().unwrap();
    }

    #[test]
    fn test_round_trip_over_socket_pair() {
        let (client, mut peer) = UnixStream::pair().unwrap();
        let mut channel = TransportChannel::from_unix_stream(client, Duration::from_secs(5));

        let server = thread::spawn(move || {
            let mut header = [0u8; HEADER_LEN];
            peer.read_exact(&mut header).unwrap();
            let (_, len) = protocol::decode_header(&header).unwrap();
            let mut payload = vec![0u8; len];
            peer.read_exact(&mut payload).unwrap();
            assert_eq!(payload, b"ping");
            peer.write_all(&protocol::encode(b"pong").unwrap()).unwrap();
        });

        assert_eq!(channel.round_trip(b"ping").unwrap(), b"pong");
        assert!(channel.is_open());
        server.join().unwrap();
    }

    #[test]
    fn test_receive_timeout_closes_channel() {
        let (client, _peer) = UnixStream::pair().unwrap();
        let mut channel = TransportChannel::from_unix_stream(client, Duration::from_millis(100));

        match channel.receive().unwrap_err() {
            LocatrError::Transport(TransportError::Timeout(d)) => {
                assert_eq!(d, Duration::from_millis(100));
            }
            other => panic!("Expected Timeout, got: {:?}", other),
        }
        assert!(!channel.is_open());

        match channel.send(b"late").unwrap_err() {
            LocatrError::Transport(TransportError::Closed) => {}
            other => panic!("Expected Closed, got: {:?}", other),
        }
    }

    #[test]
    fn test_truncated_payload_is_receive_failure() {
        let (client, mut peer) = UnixStream::pair().unwrap();
        let mut channel = TransportChannel::from_unix_stream(client, Duration::from_secs(5));

        let mut partial = Vec::new();
        partial.extend_from_slice(&protocol::PROTOCOL_VERSION);
        partial.extend_from_slice(&100u32.to_be_bytes());
        partial.extend_from_slice(&[b'x'; 40]);
        peer.write_all(&partial).unwrap();
        drop(peer);

        match channel.receive().unwrap_err() {
            LocatrError::Transport(TransportError::ReceiveFailed { message }) => {
                assert!(message.contains("payload"));
            }
            other => panic!("Expected ReceiveFailed, got: {:?}", other),
        }
        assert!(!channel.is_open());
    }

    #[test]
    fn test_version_mismatch_on_receive() {
        let (client, mut peer) = UnixStream::pair().unwrap();
        let mut channel = TransportChannel::from_unix_stream(client, Duration::from_secs(5));

        let mut frame = protocol::encode(b"{}").unwrap();
        frame[..3].copy_from_slice(&[0, 0, 2]);
        peer.write_all(&frame).unwrap();

        match channel.receive().unwrap_err() {
            LocatrError::Protocol(ProtocolError::VersionMismatch { actual, .. }) => {
                assert_eq!(actual, "0.0.2");
            }
            other => panic!("Expected VersionMismatch, got: {:?}", other),
        }
        assert!(!channel.is_open());
    }

    #[test]
    fn test_send_to_closed_peer_is_broken_pipe() {
        let (client, peer) = UnixStream::pair().unwrap();
        let mut channel = TransportChannel::from_unix_stream(client, Duration::from_secs(5));
        drop(peer);

        match channel.send(&protocol::encode(b"hello").unwrap()).unwrap_err() {
            LocatrError::Transport(TransportError::BrokenPipe)
            | LocatrError::Transport(TransportError::ConnectionReset) => {}
            other => panic!("Expected BrokenPipe, got: {:?}", other),
        }
        assert!(!channel.is_open());
    }

    #[test]
    fn test_send_gives_up_when_peer_stops_reading() {
        let (client, _peer) = UnixStream::pair().unwrap();
        let mut channel = TransportChannel::from_unix_stream(client, Duration::from_millis(50));

        // Larger than any socket buffer, so writes block until they time out.
        let frame = protocol::encode(&vec![b'x'; 8 * 1024 * 1024]).unwrap();
        match channel.send(&frame).unwrap_err() {
            LocatrError::Transport(TransportError::SendFailed { message }) => {
                assert!(message.contains("gave up after"));
            }
            other => panic!("Expected SendFailed, got: {:?}", other),
        }
        assert!(!channel.is_open());
    }

    #[test]
    fn test_timeout_setup_failure_is_send_failure() {
        let err = timeout_setup_error(io::Error::from(io::ErrorKind::InvalidInput));
        match err {
            TransportError::SendFailed { message } => {
                assert!(message.contains("socket timeout"));
            }
            other => panic!("Expected SendFailed, got: {:?}", other),
        }
    }
}
