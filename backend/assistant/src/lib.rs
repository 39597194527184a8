//! `solarops-assistant`: the site assistant session engine.
//!
//! [`SessionMachine`] holds every rule about the chat lifecycle and the
//! conversation log. [`AssistantController`] drives it: it issues
//! credentials, runs the socket transport, fires the response block timer and
//! publishes [`SessionSnapshot`]s for the UI.

pub mod backoff;
pub mod confirmation;
pub mod controller;
pub mod credential;
pub mod navigation;
pub mod session;
pub mod snapshot;
pub mod transport;

pub use backoff::ReconnectBackoff;
pub use confirmation::{ConfirmationKind, ConfirmationRequest, ConfirmationView, PendingAction};
pub use controller::{AssistantController, AssistantHandle, ControllerSettings, UiCommand};
pub use credential::HttpCredentialProvider;
pub use navigation::{is_within_scope, site_scope, NavigationDecision};
pub use session::{Effect, Event, SessionMachine, DEFAULT_PROGRESS_MESSAGE};
pub use snapshot::SessionSnapshot;
pub use transport::{transport_url, Connector, TransportHandle, TransportSink, WsConnector};
