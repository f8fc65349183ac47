//! Spawning and sharing of the engine process.
//!
//! One [`EngineSupervisor`] owns at most one live engine. The process-wide
//! instance returned by [`EngineSupervisor::shared`] is what every
//! [`crate::Locatr`] uses unless another supervisor is injected, so the engine
//! is started once and reused by all clients in the program.
//!
//! `ensure_running` holds the supervisor lock across the whole
//! check-then-spawn sequence; concurrent first use from many clients results
//! in exactly one spawn.

use super::cleanup;
use super::endpoint::{select_endpoint, Endpoint};
use super::output::{spawn_drain, LogSink, OutputStream, TracingSink};
use crate::config::{EngineConfig, LogLevel, TracingConfig};
use crate::error::{Result, SetupError};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, error, info, warn};

static SHARED: OnceLock<Arc<EngineSupervisor>> = OnceLock::new();

/// How the engine binary is found and launched.
#[derive(Clone)]
pub struct EngineOptions {
    /// Explicit binary; otherwise `LOCATR_BINARY_PATH`, then next to the
    /// running executable.
    pub binary_path: Option<PathBuf>,
    /// Preferred endpoint. Replaced by a random sibling if occupied.
    pub endpoint: Endpoint,
    /// `None` starts a quiet engine and skips output draining.
    pub log_level: Option<LogLevel>,
    pub tracing: Option<TracingConfig>,
    /// Appended after the generated arguments.
    pub extra_args: Vec<String>,
    pub log_sink: Arc<dyn LogSink>,
    /// Install the SIGINT/SIGTERM cleanup handler on first spawn.
    pub install_signal_cleanup: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            binary_path: None,
            endpoint: Endpoint::default(),
            log_level: Some(LogLevel::default()),
            tracing: None,
            extra_args: Vec::new(),
            log_sink: Arc::new(TracingSink),
            install_signal_cleanup: true,
        }
    }
}

impl std::fmt::Debug for EngineOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineOptions")
            .field("binary_path", &self.binary_path)
            .field("endpoint", &self.endpoint)
            .field("log_level", &self.log_level)
            .field("tracing", &self.tracing)
            .field("extra_args", &self.extra_args)
            .field("install_signal_cleanup", &self.install_signal_cleanup)
            .finish_non_exhaustive()
    }
}

impl EngineOptions {
    pub fn with_binary_path(mut self, path: impl AsRef<Path>) -> Self {
        self.binary_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_log_level(mut self, level: Option<LogLevel>) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_tracing(mut self, tracing: TracingConfig) -> Self {
        self.tracing = Some(tracing);
        self
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = sink;
        self
    }

    pub fn with_signal_cleanup(mut self, install: bool) -> Self {
        self.install_signal_cleanup = install;
        self
    }

    /// Locate the engine executable.
    pub fn resolve_binary(&self) -> Result<PathBuf> {
        if let Some(path) = &self.binary_path {
            return existing_file(path);
        }

        if let Some(path) = std::env::var_os(EngineConfig::BINARY_PATH_ENV) {
            return existing_file(Path::new(&path));
        }

        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        let candidates = [
            exe_dir.join(EngineConfig::DEFAULT_BINARY_NAME),
            exe_dir.join("bin").join(EngineConfig::DEFAULT_BINARY_NAME),
        ];
        for candidate in &candidates {
            if candidate.is_file() {
                return Ok(candidate.clone());
            }
        }

        Err(SetupError::BinaryNotFound(candidates[0].clone()).into())
    }

    /// Command line for an engine listening on `endpoint`.
    pub fn engine_args(&self, endpoint: &Endpoint) -> Vec<String> {
        let mut args = endpoint.engine_args();
        if let Some(tracing) = &self.tracing {
            args.extend(tracing.to_args());
        }
        if let Some(level) = self.log_level {
            args.push(format!("-logLevel={}", level.as_engine_value()));
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

fn existing_file(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(SetupError::BinaryNotFound(path.to_path_buf()).into())
    }
}

/// A spawned engine.
#[derive(Debug)]
pub struct EngineProcess {
    child: Mutex<Child>,
    pid: u32,
    endpoint: Endpoint,
    binary: PathBuf,
}

impl EngineProcess {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Whether the process has not exited yet. Reaps it if it has.
    pub fn is_alive(&self) -> bool {
        let mut child = self.child.lock().unwrap_or_else(|e| e.into_inner());
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                debug!("Engine PID {} exited with {}", self.pid, status);
                false
            }
            Err(e) => {
                warn!("Failed to query engine PID {}: {}", self.pid, e);
                false
            }
        }
    }
}

/// Create-once owner of the engine process.
#[derive(Debug)]
pub struct EngineSupervisor {
    options: EngineOptions,
    engine: Mutex<Option<Arc<EngineProcess>>>,
    spawn_count: AtomicUsize,
}

impl EngineSupervisor {
    /// A standalone supervisor. Most callers want [`EngineSupervisor::shared`].
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            engine: Mutex::new(None),
            spawn_count: AtomicUsize::new(0),
        }
    }

    /// The process-wide supervisor with default options.
    pub fn shared() -> Arc<Self> {
        SHARED
            .get_or_init(|| Arc::new(Self::new(EngineOptions::default())))
            .clone()
    }

    /// The process-wide supervisor, created with `options` if it does not
    /// exist yet. Options are ignored once it does.
    pub fn shared_with(options: EngineOptions) -> Arc<Self> {
        let mut created = false;
        let supervisor = SHARED
            .get_or_init(|| {
                created = true;
                Arc::new(Self::new(options))
            })
            .clone();
        if !created {
            debug!("Shared engine supervisor already exists; new options ignored");
        }
        supervisor
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Return the live engine, spawning one if none exists or the last one
    /// has exited.
    pub fn ensure_running(&self) -> Result<Arc<EngineProcess>> {
        let mut guard = self.engine.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(engine) = guard.as_ref() {
            if engine.is_alive() {
                return Ok(Arc::clone(engine));
            }
            warn!(
                "Locatr engine PID {} is no longer running; starting a new one",
                engine.pid
            );
            cleanup::unregister(engine.pid);
            engine.endpoint.remove_socket_file();
            *guard = None;
        }

        let engine = Arc::new(self.spawn()?);
        *guard = Some(Arc::clone(&engine));
        Ok(engine)
    }

    /// The engine from the last successful spawn, alive or not.
    pub fn current(&self) -> Option<Arc<EngineProcess>> {
        self.engine
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of engines this supervisor has started.
    pub fn spawn_count(&self) -> usize {
        self.spawn_count.load(Ordering::SeqCst)
    }

    fn spawn(&self) -> Result<EngineProcess> {
        let binary = self.options.resolve_binary()?;
        let endpoint = select_endpoint(&self.options.endpoint)?;
        let args = self.options.engine_args(&endpoint);
        let drain_output = self.options.log_level.is_some();

        let mut cmd = Command::new(&binary);
        cmd.args(&args).stdin(Stdio::null());
        if drain_output {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        info!("Launching locatr engine {} on {}", binary.display(), endpoint);
        debug!("Engine arguments: {:?}", args);

        let mut child = cmd.spawn().map_err(|e| {
            error!("Failed to spawn locatr engine: {}", e);
            SetupError::SpawnFailed {
                binary: binary.clone(),
                message: e.to_string(),
                source: Some(e),
            }
        })?;
        let pid = child.id();

        cleanup::register(pid, &endpoint);
        if self.options.install_signal_cleanup {
            cleanup::install_signal_handler();
        }

        if drain_output {
            if let Some(stdout) = child.stdout.take() {
                spawn_drain(stdout, OutputStream::Stdout, Arc::clone(&self.options.log_sink));
            }
            if let Some(stderr) = child.stderr.take() {
                spawn_drain(stderr, OutputStream::Stderr, Arc::clone(&self.options.log_sink));
            }
        }

        self.spawn_count.fetch_add(1, Ordering::SeqCst);
        info!("Locatr engine started with PID {}", pid);

        Ok(EngineProcess {
            child: Mutex::new(child),
            pid,
            endpoint,
            binary,
        })
    }
}
