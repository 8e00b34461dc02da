//! Transport armor and framing header.
//!
//! A transmitted message is `base64(payload)` followed by a single `'.'`.
//! Inside the armor every payload starts with a u16 protocol version (must
//! be 4) and a u8 message type.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::ProtoError;
use crate::wire::Decoder;

/// Protocol version carried by every framed payload.
pub const PROTOCOL_VERSION: u16 = 4;

/// Armor a payload for transmission.
pub fn encode_message(payload: &[u8]) -> String {
    let mut out = STANDARD.encode(payload);
    out.push('.');
    out
}

/// Strip the trailing dot and decode the base64 body.
pub fn decode_message(message: &str) -> Result<Vec<u8>, ProtoError> {
    let body = message
        .strip_suffix('.')
        .ok_or(ProtoError::MalformedInput("missing terminating dot"))?;
    STANDARD
        .decode(body)
        .map_err(|_| ProtoError::MalformedInput("invalid base64"))
}

/// Read and check the framing header; returns the message type.
pub fn parse_header(decoder: &mut Decoder<'_>) -> Result<u8, ProtoError> {
    let version = decoder.read_u16()?;
    if version != PROTOCOL_VERSION {
        return Err(ProtoError::UnsupportedVersion(version));
    }
    decoder.read_u8()
}
