//! Initial handshake that authorizes a connection for queries.

use super::messages::{HandshakeRequest, HandshakeResponse, Status};
use super::protocol;
use super::transport::TransportChannel;
use crate::error::{LocatrError, Result};
use crate::settings::LocatrSettings;
use tracing::{debug, info};
use uuid::Uuid;

/// Send the session's settings and require an `ok` reply.
///
/// A reply that does not parse as a handshake response, or one with
/// `status: "error"`, fails with [`LocatrError::Handshake`].
pub fn perform(
    channel: &mut TransportChannel,
    session_id: Uuid,
    settings: &LocatrSettings,
) -> Result<()> {
    let request = HandshakeRequest::new(session_id, settings);
    let payload = serde_json::to_vec(&request)?;

    debug!(
        "Sending handshake for session {} ({} backend)",
        session_id,
        settings.backend.plugin_type()
    );
    let reply = channel.round_trip(&payload)?;
    let text = protocol::decode_payload(&reply);

    let response: HandshakeResponse =
        serde_json::from_str(&text).map_err(|e| LocatrError::Handshake {
            message: format!("invalid handshake response: {}", e),
        })?;

    if response.status == Status::Error {
        return Err(LocatrError::Handshake {
            message: response.error,
        });
    }

    info!("Handshake complete for session {}", session_id);
    Ok(())
}
