//! Public facade: lazy engine setup plus one request per call.
//!
//! A [`Locatr`] owns one connection and one session id. The engine process
//! behind it is shared through an [`EngineSupervisor`].
//!
//! # State machine
//!
//! ```text
//! Uninitialized -> ProcessReady -> Connected -> Handshaken -> Ready <-> Active
//!                                                       any ----> Failed
//! ```
//!
//! Setup errors (binary missing, spawn failed) leave the state unchanged so a
//! later call can try again. Transport, protocol and handshake errors move the
//! instance to `Failed` and close its connection; every later call returns
//! [`LocatrError::InstanceFailed`]. Engine-reported query errors return the
//! instance to `Ready`.

mod builder;

pub use builder::LocatrBuilder;

use crate::config::ClientOptions;
use crate::error::{LocatrError, Result, TransportError};
use crate::ipc::{handshake, request, LocatrOutput, TransportChannel};
use crate::process::EngineSupervisor;
use crate::settings::LocatrSettings;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

/// Lifecycle of one [`Locatr`] instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientState {
    Uninitialized,
    ProcessReady,
    Connected,
    Handshaken,
    Ready,
    /// A request is in flight.
    Active,
    /// Terminal; construct a new instance.
    Failed,
}

impl ClientState {
    pub fn is_failed(&self) -> bool {
        matches!(self, ClientState::Failed)
    }
}

/// Client for the locatr engine.
///
/// # Example
///
/// ```rust,no_run
/// use locatr_client::{BackendSettings, LlmProvider, LlmSettings, Locatr, LocatrSettings};
///
/// fn main() -> locatr_client::Result<()> {
///     let settings = LocatrSettings::new(
///         BackendSettings::cdp("http://localhost:9222")?,
///         LlmSettings::new(LlmProvider::OpenAi, "sk-...", "gpt-4o"),
///     );
///     let locatr = Locatr::new(settings);
///
///     let output = locatr.get("search bar", None)?;
///     println!("{:?} {:?}", output.selector_type, output.selectors);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Locatr {
    session: Arc<Mutex<Session>>,
    state: Arc<Mutex<ClientState>>,
    session_id: Uuid,
}

impl Locatr {
    /// A client backed by the process-wide engine supervisor.
    pub fn new(settings: LocatrSettings) -> Self {
        Self::builder(settings).build()
    }

    pub fn builder(settings: LocatrSettings) -> LocatrBuilder {
        LocatrBuilder::new(settings)
    }

    pub(crate) fn from_parts(
        settings: LocatrSettings,
        supervisor: Arc<EngineSupervisor>,
        options: ClientOptions,
        session_id: Uuid,
    ) -> Self {
        let state = Arc::new(Mutex::new(ClientState::Uninitialized));
        let session = Session {
            settings,
            supervisor,
            options,
            session_id,
            channel: None,
            state: Arc::clone(&state),
        };
        Self {
            session: Arc::new(Mutex::new(session)),
            state,
            session_id,
        }
    }

    /// Resolve `query` to selectors, starting and connecting to the engine on
    /// first use.
    ///
    /// Blocks for up to the configured socket timeout. Calls on one instance
    /// are serialized.
    pub fn get(&self, query: &str, trace_id: Option<&str>) -> Result<LocatrOutput> {
        let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        session.get(query, trace_id)
    }

    /// [`Locatr::get`] on a blocking worker thread.
    ///
    /// Dropping the returned future does not cancel the request; it runs to
    /// completion and its result is discarded.
    pub async fn get_async(
        &self,
        query: impl Into<String>,
        trace_id: Option<String>,
    ) -> Result<LocatrOutput> {
        let session = Arc::clone(&self.session);
        let query = query.into();

        tokio::task::spawn_blocking(move || {
            let mut session = session.lock().unwrap_or_else(|e| e.into_inner());
            session.get(&query, trace_id.as_deref())
        })
        .await
        .map_err(|e| LocatrError::Worker {
            message: e.to_string(),
        })?
    }

    pub fn state(&self) -> ClientState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }
}

/// Everything behind the instance lock.
#[derive(Debug)]
struct Session {
    settings: LocatrSettings,
    supervisor: Arc<EngineSupervisor>,
    options: ClientOptions,
    session_id: Uuid,
    channel: Option<TransportChannel>,
    state: Arc<Mutex<ClientState>>,
}

impl Session {
    fn state(&self) -> ClientState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: ClientState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state != next {
            debug!("Session {}: {:?} -> {:?}", self.session_id, *state, next);
            *state = next;
        }
    }

    fn fail(&mut self, err: LocatrError) -> LocatrError {
        warn!("Session {} failed: {}", self.session_id, err);
        self.channel = None;
        self.set_state(ClientState::Failed);
        err
    }

    /// Bring the instance to `Ready`, doing only the steps not yet done.
    fn prepare(&mut self) -> Result<()> {
        if self.channel.is_some() {
            return Ok(());
        }

        let engine = self.supervisor.ensure_running()?;
        self.set_state(ClientState::ProcessReady);

        let mut channel = match TransportChannel::connect(engine.endpoint(), &self.options) {
            Ok(channel) => channel,
            Err(e) => return Err(self.fail(e)),
        };
        self.set_state(ClientState::Connected);

        if let Err(e) = handshake::perform(&mut channel, self.session_id, &self.settings) {
            return Err(self.fail(e));
        }
        self.set_state(ClientState::Handshaken);

        self.channel = Some(channel);
        self.set_state(ClientState::Ready);
        Ok(())
    }

    fn get(&mut self, query: &str, trace_id: Option<&str>) -> Result<LocatrOutput> {
        if self.state().is_failed() {
            return Err(LocatrError::InstanceFailed);
        }
        self.prepare()?;

        self.set_state(ClientState::Active);
        let result = match self.channel.as_mut() {
            Some(channel) => request::call(channel, self.session_id, query, trace_id),
            None => Err(TransportError::Closed.into()),
        };

        match result {
            Ok(output) => {
                self.set_state(ClientState::Ready);
                Ok(output)
            }
            Err(e @ LocatrError::Query { .. }) => {
                self.set_state(ClientState::Ready);
                Err(e)
            }
            Err(e) => Err(self.fail(e)),
        }
    }
}
