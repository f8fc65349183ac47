//! JSON message shapes exchanged with the engine.
//!
//! Protocol version `0.0.1` uses the `LocatrOutput` family of replies: every
//! reply carries `id`, `type`, `status` and `error`; query replies add
//! `selectors` and `selector_type`.

use crate::settings::LocatrSettings;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Discriminates requests on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    InitialHandshake,
    LocatrRequest,
    /// Used by the engine when it cannot tell which request failed.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// How returned selectors should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectorType {
    #[serde(rename = "xpath")]
    XPath,
    #[serde(rename = "css selector")]
    Css,
    #[serde(rename = "")]
    None,
}

impl SelectorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectorType::XPath => "xpath",
            SelectorType::Css => "css selector",
            SelectorType::None => "",
        }
    }
}

impl std::fmt::Display for SelectorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HandshakeRequest<'a> {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub locatr_settings: &'a LocatrSettings,
}

impl<'a> HandshakeRequest<'a> {
    pub fn new(id: Uuid, settings: &'a LocatrSettings) -> Self {
        Self {
            id,
            kind: MessageType::InitialHandshake,
            locatr_settings: settings,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeResponse {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub status: Status,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest<'a> {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub user_request: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otel_parent_trace_id: Option<&'a str>,
}

impl<'a> QueryRequest<'a> {
    pub fn new(id: Uuid, user_request: &'a str, trace_id: Option<&'a str>) -> Self {
        Self {
            id,
            kind: MessageType::LocatrRequest,
            user_request,
            otel_parent_trace_id: trace_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub status: Status,
    pub error: String,
    /// Error replies may carry `null` here.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub selectors: Vec<String>,
    pub selector_type: SelectorType,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Selectors resolved by the engine for one query.
///
/// An empty `selectors` list is a valid answer meaning nothing matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatrOutput {
    pub selectors: Vec<String>,
    pub selector_type: SelectorType,
}

impl LocatrOutput {
    /// Highest-ranked selector, if any.
    pub fn first(&self) -> Option<&str> {
        self.selectors.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }
}

impl From<QueryResponse> for LocatrOutput {
    fn from(resp: QueryResponse) -> Self {
        Self {
            selectors: resp.selectors,
            selector_type: resp.selector_type,
        }
    }
}
