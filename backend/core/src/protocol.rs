//! Wire protocol of the assistant socket.
//!
//! Inbound frames are UTF-8 JSON text:
//! `{"metadata": {"status": "AWAITING_DATA|IN_PROGRESS|COMPLETE|ERROR"}, "response": "..."}`.
//! Outbound frames carry the raw user text with no envelope.

use serde::Deserialize;

use crate::error::ProtocolError;

pub const STATUS_AWAITING_DATA: &str = "AWAITING_DATA";
pub const STATUS_IN_PROGRESS: &str = "IN_PROGRESS";
pub const STATUS_COMPLETE: &str = "COMPLETE";
pub const STATUS_ERROR: &str = "ERROR";

/// Backend progress reported by one envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStatus {
    AwaitingData,
    InProgress,
    Complete,
    Error,
}

impl EnvelopeStatus {
    /// Case-sensitive match against the fixed status vocabulary.
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw {
            STATUS_AWAITING_DATA => Some(EnvelopeStatus::AwaitingData),
            STATUS_IN_PROGRESS => Some(EnvelopeStatus::InProgress),
            STATUS_COMPLETE => Some(EnvelopeStatus::Complete),
            STATUS_ERROR => Some(EnvelopeStatus::Error),
            _ => None,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            EnvelopeStatus::AwaitingData => STATUS_AWAITING_DATA,
            EnvelopeStatus::InProgress => STATUS_IN_PROGRESS,
            EnvelopeStatus::Complete => STATUS_COMPLETE,
            EnvelopeStatus::Error => STATUS_ERROR,
        }
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub status: EnvelopeStatus,
    pub payload: String,
}

#[derive(Deserialize)]
struct WireFrame {
    metadata: WireMetadata,
    #[serde(default)]
    response: Option<String>,
}

#[derive(Deserialize)]
struct WireMetadata {
    status: String,
}

/// Parse and classify one inbound text frame.
pub fn decode_frame(text: &str) -> Result<Envelope, ProtocolError> {
    let frame: WireFrame =
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

    let status = EnvelopeStatus::from_wire(&frame.metadata.status)
        .ok_or(ProtocolError::UnknownStatus(frame.metadata.status))?;

    Ok(Envelope {
        status,
        payload: frame.response.unwrap_or_default(),
    })
}

/// Build the body of an outbound frame.
pub fn encode_outbound(text: &str) -> String {
    text.to_string()
}
