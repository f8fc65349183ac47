//! One query and its reply.

use super::messages::{LocatrOutput, QueryRequest, QueryResponse, Status};
use super::protocol;
use super::transport::TransportChannel;
use crate::error::{LocatrError, Result};
use tracing::debug;
use uuid::Uuid;

/// Send `query` on an already-handshaken channel and decode the selectors.
///
/// An engine `status: "error"` and a reply that fails to validate both map to
/// [`LocatrError::Query`]. An empty selector list is returned as success.
pub fn call(
    channel: &mut TransportChannel,
    session_id: Uuid,
    query: &str,
    trace_id: Option<&str>,
) -> Result<LocatrOutput> {
    let request = QueryRequest::new(session_id, query, trace_id);
    let payload = serde_json::to_vec(&request)?;

    debug!("Sending query for session {}: {:?}", session_id, query);
    let reply = channel.round_trip(&payload)?;
    let text = protocol::decode_payload(&reply);

    let response: QueryResponse = serde_json::from_str(&text).map_err(|e| LocatrError::Query {
        message: format!("invalid query response: {}", e),
    })?;

    if response.status == Status::Error {
        return Err(LocatrError::Query {
            message: response.error,
        });
    }

    debug!(
        "Query returned {} {} selector(s)",
        response.selectors.len(),
        response.selector_type
    );
    Ok(response.into())
}
