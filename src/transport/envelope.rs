use serde::{Deserialize, Serialize};

use crate::error::PayloadError;

/// Wire envelope of a probe. Only the correlation id is interpreted; any other
/// field a server adds to a broadcast is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeEnvelope {
    #[serde(rename = "cid", default)]
    pub correlation_id: String,
}

/// Encodes a probe carrying `correlation_id`.
///
/// # Errors
///
/// Returns an error if the envelope cannot be serialized.
pub fn encode_probe(correlation_id: &str) -> Result<Vec<u8>, PayloadError> {
    let envelope = ProbeEnvelope {
        correlation_id: correlation_id.to_owned(),
    };
    serde_json::to_vec(&envelope).map_err(|err| PayloadError::Encode { source: err })
}

/// Extracts the correlation id from a received frame.
///
/// Returns `Ok(None)` for envelopes without a correlation id, which are
/// regular server traffic rather than probe broadcasts.
///
/// # Errors
///
/// Returns an error when the frame is not a JSON object.
pub fn decode_correlation_id(frame: &[u8]) -> Result<Option<String>, PayloadError> {
    let envelope: ProbeEnvelope =
        serde_json::from_slice(frame).map_err(|err| PayloadError::Malformed { source: err })?;
    if envelope.correlation_id.is_empty() {
        return Ok(None);
    }
    Ok(Some(envelope.correlation_id))
}
