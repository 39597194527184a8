//! Session Trace
//!
//! Structured lifecycle and frame events for one site's chat session, routed
//! through `tracing` under the `assistant_events` target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Activated { epoch: u64 },
    Deactivated { epoch: u64 },
    Reset { epoch: u64 },
    CredentialFailed { error: String },
    FrameReceived { status: String, bytes: usize },
    FrameSent { bytes: usize },
    Resent { bytes: usize },
    FrameDropped { reason: String },
    NavigationBlocked { destination: String },
}

#[derive(Debug, Serialize)]
pub struct SessionTraceEntry {
    pub site_id: u64,
    pub timestamp: DateTime<Utc>,
    pub event: SessionEvent,
}

pub struct SessionTrace;

impl SessionTrace {
    /// Log a session event. Free-form strings are redacted first.
    pub fn log(site_id: u64, mut event: SessionEvent) {
        match &mut event {
            SessionEvent::CredentialFailed { error } => {
                *error = redact_sensitive_data(error);
            }
            SessionEvent::FrameDropped { reason } => {
                *reason = redact_sensitive_data(reason);
            }
            _ => {}
        }

        let entry = SessionTraceEntry {
            site_id,
            timestamp: Utc::now(),
            event,
        };

        info!(target: "assistant_events", event = ?entry, "Session trace event");
    }
}
