use thiserror::Error;

/// Failure to obtain a session credential for a site.
///
/// Fatal for the activation attempt that raised it; the user has to close and
/// reopen the chat to try again.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("credential request failed: {0}")]
    Request(String),

    #[error("malformed credential response: {0}")]
    Decode(String),
}

/// Transport-level failure. Never surfaced to the user: the transport
/// reconnects on its own while the session is active.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid transport url: {0}")]
    InvalidUrl(String),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("socket error: {0}")]
    Socket(String),
}

/// An inbound frame that could not be interpreted. Dropped after logging.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("frame is not a valid envelope: {0}")]
    Malformed(String),

    #[error("unknown envelope status {0:?}")]
    UnknownStatus(String),
}

/// Inline error reported by the assistant backend (envelope status `ERROR`).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("assistant backend error: {0}")]
pub struct BackendError(pub String);

/// Top-level error type for the site assistant.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("assistant controller stopped")]
    ControllerStopped,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
