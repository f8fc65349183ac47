//! Wire framing shared by every message to and from the engine.
//!
//! Each frame carries the 3-byte protocol version, a 4-byte big-endian length
//! and a UTF-8 JSON payload:
//!
//! ```text
//! [u8; 3: version][u32 BE: len][UTF-8 JSON bytes of len]
//! ```
//!
//! The version must match [`PROTOCOL_VERSION`] byte for byte. There is no
//! negotiation; a mismatch means client and engine were built from different
//! releases.

use crate::error::{ProtocolError, Result, TransportError};

/// Version compiled into this client. Selects the `LocatrOutput` message schema.
pub const PROTOCOL_VERSION: [u8; 3] = [0, 0, 1];

pub const VERSION_LEN: usize = 3;
pub const LENGTH_LEN: usize = 4;
pub const HEADER_LEN: usize = VERSION_LEN + LENGTH_LEN;

/// Render a version triple as `major.minor.patch`.
pub fn version_string(version: &[u8]) -> String {
    version
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Reject any version prefix that is not exactly ours.
pub fn check_version(version: &[u8]) -> Result<()> {
    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::VersionMismatch {
            expected: version_string(&PROTOCOL_VERSION),
            actual: version_string(version),
        }
        .into());
    }
    Ok(())
}

/// Prefix a payload with the version and its length.
///
/// No size limit is enforced beyond what the u32 length field can express;
/// the engine is a trusted local peer.
pub fn encode(payload: &[u8]) -> Result<Vec<u8>> {
    let len = frame_length(payload.len())?;
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&PROTOCOL_VERSION);
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

fn frame_length(len: usize) -> std::result::Result<u32, TransportError> {
    u32::try_from(len).map_err(|_| TransportError::SendFailed {
        message: format!("payload of {} bytes exceeds the frame length limit", len),
    })
}

/// Parse the 7-byte header into `(version, payload length)`.
pub fn decode_header(header: &[u8; HEADER_LEN]) -> Result<([u8; VERSION_LEN], usize)> {
    let mut version = [0u8; VERSION_LEN];
    version.copy_from_slice(&header[..VERSION_LEN]);
    check_version(&version)?;

    let mut len_buf = [0u8; LENGTH_LEN];
    len_buf.copy_from_slice(&header[VERSION_LEN..]);
    Ok((version, u32::from_be_bytes(len_buf) as usize))
}

/// Turn payload bytes into text.
///
/// Invalid UTF-8 is replaced rather than rejected so that a garbled payload
/// surfaces as a message validation failure, not a framing error.
pub fn decode_payload(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload).into_owned()
}

/// Split a complete frame back into its payload.
pub fn decode(frame: &[u8]) -> Result<Vec<u8>> {
    let header: [u8; HEADER_LEN] = frame
        .get(..HEADER_LEN)
        .and_then(|h| h.try_into().ok())
        .ok_or_else(|| TransportError::ReceiveFailed {
            message: format!("frame shorter than {} byte header", HEADER_LEN),
        })?;
    let (_, len) = decode_header(&header)?;

    let body = &frame[HEADER_LEN..];
    if body.len() != len {
        return Err(TransportError::ReceiveFailed {
            message: format!("declared payload length {} but got {} bytes", len, body.len()),
        }
        .into());
    }
    Ok(body.to_vec())
}
