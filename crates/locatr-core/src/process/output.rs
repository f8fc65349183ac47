//! Forwarding of engine stdout/stderr into the host's logs.
//!
//! Each stream is drained line by line on its own named thread for as long as
//! the engine keeps it open. Draining never blocks the request path and its
//! own faults are logged, never raised.

use std::io::{BufRead, BufReader, Read};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Which engine stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        }
    }
}

/// Destination for engine log lines.
pub trait LogSink: Send + Sync {
    fn log_line(&self, stream: OutputStream, line: &str);
}

/// Default sink: emits lines through `tracing` under target `locatr::engine`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log_line(&self, stream: OutputStream, line: &str) {
        match stream {
            OutputStream::Stdout => info!(target: "locatr::engine", "{}", line),
            OutputStream::Stderr => warn!(target: "locatr::engine", "{}", line),
        }
    }
}

/// Read `reader` to EOF, handing each line (without its terminator) to `sink`.
///
/// Invalid UTF-8 is replaced. Returns the number of lines forwarded.
pub fn drain_lines<R: Read>(reader: R, stream: OutputStream, sink: &dyn LogSink) -> usize {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut count = 0;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']);
                sink.log_line(stream, line);
                count += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("Stopped reading engine {}: {}", stream.as_str(), e);
                break;
            }
        }
    }

    debug!("Engine {} closed after {} lines", stream.as_str(), count);
    count
}

/// Drain `reader` on a detached background thread.
pub fn spawn_drain<R>(
    reader: R,
    stream: OutputStream,
    sink: std::sync::Arc<dyn LogSink>,
) -> Option<JoinHandle<usize>>
where
    R: Read + Send + 'static,
{
    let name = format!("locatr-engine-{}", stream.as_str());
    match thread::Builder::new()
        .name(name)
        .spawn(move || drain_lines(reader, stream, sink.as_ref()))
    {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Failed to start engine {} drain: {}", stream.as_str(), e);
            None
        }
    }
}
