use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a solar site. Fixed for the lifetime of a chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(pub u64);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of the chat feature as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Inactive,
    Active,
    /// A close or navigation confirmation is pending.
    Closing,
}

impl Lifecycle {
    /// A session exists (credential requested, transport possibly up).
    pub fn is_live(self) -> bool {
        matches!(self, Lifecycle::Active | Lifecycle::Closing)
    }
}

/// Low-level state of the transport connection. Written by the transport
/// only; the session machine observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionReadiness {
    #[default]
    Uninstantiated,
    Connecting,
    Open,
    Closing,
    Closed,
}

impl fmt::Display for ConnectionReadiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionReadiness::Uninstantiated => "uninstantiated",
            ConnectionReadiness::Connecting => "connecting",
            ConnectionReadiness::Open => "open",
            ConnectionReadiness::Closing => "closing",
            ConnectionReadiness::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Local interpretation of backend progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessingStatus {
    #[default]
    Initial,
    Awaiting,
    InProgress,
    Error,
    Complete,
}

impl ProcessingStatus {
    /// Statuses in which the backend accepts a new question.
    pub fn accepts_input(self) -> bool {
        matches!(
            self,
            ProcessingStatus::Awaiting | ProcessingStatus::Error | ProcessingStatus::Complete
        )
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessingStatus::Initial => "initial",
            ProcessingStatus::Awaiting => "awaiting",
            ProcessingStatus::InProgress => "in-progress",
            ProcessingStatus::Error => "error",
            ProcessingStatus::Complete => "complete",
        };
        f.write_str(s)
    }
}

/// Access credential issued for one site session.
///
/// `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub token_type: String,
    pub session_id: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"***")
            .field("token_type", &self.token_type)
            .field("session_id", &self.session_id)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtteranceKind {
    Basic,
    Error,
}

/// One assistant utterance inside a response block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub kind: UtteranceKind,
}

/// An entry in the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Text the user submitted.
    Input {
        text: String,
        timestamp: DateTime<Utc>,
    },
    /// Everything the assistant said while answering one input.
    Response {
        messages: Vec<Utterance>,
        timestamp: DateTime<Utc>,
    },
}

impl Message {
    pub fn input(text: impl Into<String>) -> Self {
        Message::Input {
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn empty_response() -> Self {
        Message::Response {
            messages: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(self, Message::Input { .. })
    }

    /// A response block with no utterances yet.
    pub fn is_pending_response(&self) -> bool {
        matches!(self, Message::Response { messages, .. } if messages.is_empty())
    }
}
