//! Read-only view of a session, published to subscribers after every event.

use serde::Serialize;
use solarops_core::{ConnectionReadiness, Lifecycle, Message, ProcessingStatus, SiteId};

use crate::confirmation::ConfirmationView;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub site_id: SiteId,
    pub lifecycle: Lifecycle,
    /// The chat panel is open.
    pub expanded: bool,
    pub readiness: ConnectionReadiness,
    pub status: ProcessingStatus,
    pub progress: Option<String>,
    pub messages: Vec<Message>,
    pub confirmation: Option<ConfirmationView>,
    /// Overlay that replaces the chat until it is closed and reopened.
    pub blocking_error: Option<String>,
    pub draft: String,
    pub can_submit: bool,
    pub session_id: Option<String>,
}

impl SessionSnapshot {
    /// Snapshot of a session that was never opened.
    pub fn idle(site_id: SiteId) -> Self {
        Self {
            site_id,
            lifecycle: Lifecycle::Inactive,
            expanded: false,
            readiness: ConnectionReadiness::Uninstantiated,
            status: ProcessingStatus::Initial,
            progress: None,
            messages: Vec::new(),
            confirmation: None,
            blocking_error: None,
            draft: String::new(),
            can_submit: false,
            session_id: None,
        }
    }
}
