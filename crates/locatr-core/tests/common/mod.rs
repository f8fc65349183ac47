//! Shared fixtures: a fake engine binary and an in-process mock engine.
//!
//! The fake engine is a shell script that records its arguments, prints one
//! log line and sleeps. It never listens; tests bind the chosen socket path
//! themselves with [`serve`] and answer frames from a thread.

#![allow(dead_code)]

use locatr_client::ipc::protocol::{self, HEADER_LEN};
use locatr_client::{
    BackendSettings, ClientOptions, EngineOptions, EngineProcess, EngineSupervisor, Endpoint,
    LlmProvider, LlmSettings, LocatrSettings, LogSink, OutputStream,
};
use std::io::{Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use uuid::Uuid;

const FAKE_ENGINE: &str = r#"#!/bin/sh
sock=""
for arg in "$@"; do
    case "$arg" in
        -socketFilePath=*) sock="${arg#-socketFilePath=}" ;;
    esac
done
if [ -n "$sock" ]; then
    echo "$@" >> "$(dirname "$sock")/engine-args.txt"
fi
echo "fake engine listening on $sock"
exec sleep 30
"#;

static FAKE_ENGINE_DIR: OnceLock<TempDir> = OnceLock::new();

/// Path of the fake engine script, written once per test binary.
///
/// Every spawn goes through this single file so no test writes an executable
/// while another thread is forking.
pub fn fake_engine() -> PathBuf {
    let dir = FAKE_ENGINE_DIR.get_or_init(|| {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("locatr.bin");
        std::fs::write(&path, FAKE_ENGINE).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        dir
    });
    dir.path().join("locatr.bin")
}

/// Collects forwarded engine log lines.
#[derive(Default)]
pub struct CollectingSink {
    pub lines: Mutex<Vec<(OutputStream, String)>>,
}

impl LogSink for CollectingSink {
    fn log_line(&self, stream: OutputStream, line: &str) {
        self.lines.lock().unwrap().push((stream, line.to_string()));
    }
}

impl CollectingSink {
    /// Wait until a line containing `needle` arrives.
    pub fn wait_for(&self, needle: &str, timeout: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if self.lines.lock().unwrap().iter().any(|(_, l)| l.contains(needle)) {
                return true;
            }
            thread::sleep(Duration::from_millis(20));
        }
        false
    }
}

/// A supervisor running the fake engine inside its own temp directory.
pub struct TestEngine {
    pub dir: TempDir,
    pub supervisor: Arc<EngineSupervisor>,
    pub sink: Arc<CollectingSink>,
}

impl TestEngine {
    pub fn new() -> Self {
        Self::with_options(|options| options)
    }

    pub fn with_options(customize: impl FnOnce(EngineOptions) -> EngineOptions) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let sink = Arc::new(CollectingSink::default());
        let options = EngineOptions::default()
            .with_binary_path(fake_engine())
            .with_endpoint(Endpoint::unix(dir.path().join("locatr.sock")))
            .with_log_sink(sink.clone())
            .with_signal_cleanup(false);
        let supervisor = Arc::new(EngineSupervisor::new(customize(options)));
        Self {
            dir,
            supervisor,
            sink,
        }
    }

    pub fn default_socket(&self) -> PathBuf {
        self.dir.path().join("locatr.sock")
    }

    /// Arguments the fake engine was started with, one line per spawn.
    pub fn recorded_args(&self) -> Vec<String> {
        let path = self.dir.path().join("engine-args.txt");
        let start = Instant::now();
        while start.elapsed() < Duration::from_secs(5) {
            if let Ok(text) = std::fs::read_to_string(&path) {
                if !text.is_empty() {
                    return text.lines().map(str::to_string).collect();
                }
            }
            thread::sleep(Duration::from_millis(20));
        }
        Vec::new()
    }

    /// Start the engine and return it with its socket path.
    pub fn start(&self) -> (Arc<EngineProcess>, PathBuf) {
        let engine = self.supervisor.ensure_running().unwrap();
        let path = match engine.endpoint() {
            Endpoint::Unix(path) => path.clone(),
            other => panic!("Expected Unix endpoint, got: {:?}", other),
        };
        (engine, path)
    }
}

pub fn settings() -> LocatrSettings {
    LocatrSettings::new(
        BackendSettings::cdp("http://localhost:9222").unwrap(),
        LlmSettings::new(LlmProvider::OpenAi, "sk-test", "gpt-4o"),
    )
}

pub fn fast_client_options() -> ClientOptions {
    ClientOptions::default()
        .with_socket_timeout(Duration::from_secs(5))
        .with_connect_retries(20)
        .with_connect_retry_delay(Duration::from_millis(50))
}

/// What the mock engine does after reading one request.
pub enum Reply {
    /// Send a well-formed frame with this JSON.
    Json(String),
    /// Write these bytes verbatim, then hang up.
    Raw(Vec<u8>),
    /// Send nothing, hold the connection open, then hang up.
    Stall(Duration),
}

pub fn handshake_ok(id: Uuid) -> Reply {
    Reply::Json(format!(
        r#"{{"id":"{}","type":"initial_handshake","status":"ok","error":""}}"#,
        id
    ))
}

pub fn handshake_error(id: Uuid, error: &str) -> Reply {
    Reply::Json(format!(
        r#"{{"id":"{}","type":"initial_handshake","status":"error","error":"{}"}}"#,
        id, error
    ))
}

pub fn query_ok(id: Uuid, selectors: &[&str], selector_type: &str) -> Reply {
    Reply::Json(
        serde_json::json!({
            "id": id,
            "type": "locatr_request",
            "status": "ok",
            "error": "",
            "selectors": selectors,
            "selector_type": selector_type,
        })
        .to_string(),
    )
}

pub fn query_error(id: Uuid, error: &str) -> Reply {
    Reply::Json(
        serde_json::json!({
            "id": id,
            "type": "locatr_request",
            "status": "error",
            "error": error,
            "selectors": [],
            "selector_type": "",
        })
        .to_string(),
    )
}

/// Bind `path` and answer one connection with `replies`, in order.
///
/// The handle yields every request JSON the mock received.
pub fn serve(path: &Path, replies: Vec<Reply>) -> JoinHandle<Vec<serde_json::Value>> {
    let listener = UnixListener::bind(path).unwrap();

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut requests = Vec::new();

        for reply in replies {
            let mut header = [0u8; HEADER_LEN];
            if stream.read_exact(&mut header).is_err() {
                break;
            }
            let (_, len) = protocol::decode_header(&header).unwrap();
            let mut payload = vec![0u8; len];
            stream.read_exact(&mut payload).unwrap();
            requests.push(serde_json::from_slice(&payload).unwrap());

            match reply {
                Reply::Json(json) => {
                    let frame = protocol::encode(json.as_bytes()).unwrap();
                    stream.write_all(&frame).unwrap();
                }
                Reply::Raw(bytes) => {
                    let _ = stream.write_all(&bytes);
                    break;
                }
                Reply::Stall(duration) => {
                    thread::sleep(duration);
                    break;
                }
            }
        }
        requests
    })
}
