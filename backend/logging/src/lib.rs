//! Telemetry and structured logging for the site assistant.
//!
//! Handles token redaction, console + rolling NDJSON output, and structured
//! session trace events.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{SessionEvent, SessionTrace, SessionTraceEntry};
pub use logger::init_logger;
pub use redact::{redact_sensitive_data, redact_url_token};
