//! Core types for the SolarOps site assistant: data model, wire protocol,
//! conversation log and error taxonomy.

pub mod conversation;
pub mod error;
pub mod protocol;
pub mod traits;
pub mod types;

pub use conversation::ConversationLog;
pub use error::{AssistantError, BackendError, CredentialError, ProtocolError, TransportError};
pub use protocol::{decode_frame, encode_outbound, Envelope, EnvelopeStatus};
pub use traits::CredentialProvider;
pub use types::{
    ConnectionReadiness, Credential, Lifecycle, Message, ProcessingStatus, SiteId, Utterance,
    UtteranceKind,
};
