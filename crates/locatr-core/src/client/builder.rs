//! Builder for configuring a [`Locatr`] instance.

use super::Locatr;
use crate::config::ClientOptions;
use crate::process::{EngineOptions, EngineSupervisor};
use crate::settings::LocatrSettings;
use std::sync::Arc;
use uuid::Uuid;

/// Builder for [`Locatr`].
///
/// # Example
///
/// ```rust,ignore
/// use locatr_client::{EngineOptions, Locatr, LogLevel};
///
/// let locatr = Locatr::builder(settings)
///     .with_engine_options(EngineOptions::default().with_log_level(Some(LogLevel::Info)))
///     .build();
/// ```
pub struct LocatrBuilder {
    settings: LocatrSettings,
    supervisor: Option<Arc<EngineSupervisor>>,
    engine_options: Option<EngineOptions>,
    client_options: ClientOptions,
    session_id: Option<Uuid>,
}

impl LocatrBuilder {
    pub fn new(settings: LocatrSettings) -> Self {
        Self {
            settings,
            supervisor: None,
            engine_options: None,
            client_options: ClientOptions::default(),
            session_id: None,
        }
    }

    /// Use a specific supervisor instead of the process-wide one.
    pub fn with_supervisor(mut self, supervisor: Arc<EngineSupervisor>) -> Self {
        self.supervisor = Some(supervisor);
        self
    }

    /// Options for the process-wide supervisor.
    ///
    /// Only the first client to create the shared supervisor decides its
    /// options. Ignored when [`LocatrBuilder::with_supervisor`] is used.
    pub fn with_engine_options(mut self, options: EngineOptions) -> Self {
        self.engine_options = Some(options);
        self
    }

    pub fn with_client_options(mut self, options: ClientOptions) -> Self {
        self.client_options = options;
        self
    }

    /// Fix the session id instead of generating a random one.
    pub fn with_session_id(mut self, id: Uuid) -> Self {
        self.session_id = Some(id);
        self
    }

    /// Build the client. Nothing is started until the first request.
    pub fn build(self) -> Locatr {
        let supervisor = match (self.supervisor, self.engine_options) {
            (Some(supervisor), _) => supervisor,
            (None, Some(options)) => EngineSupervisor::shared_with(options),
            (None, None) => EngineSupervisor::shared(),
        };
        let session_id = self.session_id.unwrap_or_else(Uuid::new_v4);

        Locatr::from_parts(self.settings, supervisor, self.client_options, session_id)
    }
}
