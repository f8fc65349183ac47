//! Backend and LLM settings carried by the initial handshake.
//!
//! The client never interprets these values beyond URL syntax; they are
//! forwarded to the engine as-is and live only in memory.

use crate::error::{LocatrError, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// LLM vendors the engine knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    OpenRouter,
    Groq,
}

/// LLM credentials and model choice.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_provider: Option<LlmProvider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reranker_api_key: Option<String>,
}

impl LlmSettings {
    pub fn new(
        provider: LlmProvider,
        api_key: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            llm_provider: Some(provider),
            llm_api_key: Some(api_key.into()),
            model_name: Some(model_name.into()),
            reranker_api_key: None,
        }
    }

    pub fn with_reranker_api_key(mut self, key: impl Into<String>) -> Self {
        self.reranker_api_key = Some(key.into());
        self
    }
}

// Keys stay out of logs.
impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("LlmSettings")
            .field("llm_provider", &self.llm_provider)
            .field("llm_api_key", &redact(&self.llm_api_key))
            .field("model_name", &self.model_name)
            .field("reranker_api_key", &redact(&self.reranker_api_key))
            .finish()
    }
}

/// Which automation backend the engine should attach to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "plugin_type", rename_all = "lowercase")]
pub enum BackendSettings {
    Cdp {
        cdp_url: Url,
    },
    Selenium {
        selenium_url: Url,
        selenium_session_id: String,
    },
    Appium {
        appium_url: Url,
        appium_session_id: String,
    },
}

impl BackendSettings {
    /// Chrome DevTools Protocol endpoint, e.g. `http://localhost:9222`.
    pub fn cdp(url: &str) -> Result<Self> {
        Ok(BackendSettings::Cdp {
            cdp_url: parse_url("cdp_url", url)?,
        })
    }

    pub fn selenium(url: &str, session_id: impl Into<String>) -> Result<Self> {
        Ok(BackendSettings::Selenium {
            selenium_url: parse_url("selenium_url", url)?,
            selenium_session_id: non_empty("selenium_session_id", session_id.into())?,
        })
    }

    pub fn appium(url: &str, session_id: impl Into<String>) -> Result<Self> {
        Ok(BackendSettings::Appium {
            appium_url: parse_url("appium_url", url)?,
            appium_session_id: non_empty("appium_session_id", session_id.into())?,
        })
    }

    pub fn plugin_type(&self) -> &'static str {
        match self {
            BackendSettings::Cdp { .. } => "cdp",
            BackendSettings::Selenium { .. } => "selenium",
            BackendSettings::Appium { .. } => "appium",
        }
    }
}

fn parse_url(field: &str, raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| LocatrError::Settings {
        field: field.to_string(),
        message: format!("{raw:?} is not a valid URL: {e}"),
    })
}

fn non_empty(field: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        return Err(LocatrError::Settings {
            field: field.to_string(),
            message: "must not be empty".to_string(),
        });
    }
    Ok(value)
}

/// Everything the engine needs to create a locator for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatrSettings {
    #[serde(flatten)]
    pub backend: BackendSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<String>,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
    pub llm_settings: LlmSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_file_path: Option<String>,
}

fn default_use_cache() -> bool {
    true
}

impl LocatrSettings {
    pub fn new(backend: BackendSettings, llm_settings: LlmSettings) -> Self {
        Self {
            backend,
            cache_path: None,
            use_cache: true,
            llm_settings,
            results_file_path: None,
        }
    }

    pub fn with_cache_path(mut self, path: impl Into<String>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    pub fn with_use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn with_results_file_path(mut self, path: impl Into<String>) -> Self {
        self.results_file_path = Some(path.into());
        self
    }
}
