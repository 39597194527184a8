//! Session state machine.
//!
//! Owns the chat lifecycle, the conversation log and the processing status
//! for one site. Every change goes through [`SessionMachine::dispatch`], which
//! returns the side effects the caller must perform. The machine itself never
//! does I/O and never sleeps, so every rule here is testable synchronously.
//!
//! Each activation, reset and deactivation advances `epoch`. Credentials,
//! transport events and timers are tagged with the epoch that requested them
//! and are ignored once the epoch has moved on.

use solarops_core::{
    decode_frame, BackendError, ConnectionReadiness, ConversationLog, Credential, Envelope,
    EnvelopeStatus, Lifecycle, ProcessingStatus, SiteId, UtteranceKind,
};
use solarops_logging::{SessionEvent, SessionTrace};
use tracing::{debug, info, warn};

use crate::confirmation::{ConfirmationRequest, PendingAction};
use crate::navigation::{self, NavigationDecision};
use crate::snapshot::SessionSnapshot;

/// Progress text shown while an unanswered question is replayed.
pub const DEFAULT_PROGRESS_MESSAGE: &str = "Working on your question...";

/// Everything that can happen to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    OpenChat,
    CollapseChat,
    RequestReset,
    RequestClose,
    SetDraft(String),
    Submit(String),
    Navigate { from: String, to: String },
    Confirm,
    Cancel,
    CredentialIssued { epoch: u64, credential: Credential },
    CredentialFailed { epoch: u64, error: String },
    /// The transport for `epoch` could not even be started.
    ConnectFailed { epoch: u64, error: String },
    Readiness { epoch: u64, readiness: ConnectionReadiness },
    Frame { epoch: u64, text: String },
    ResponseBlockDue { epoch: u64 },
}

/// Work the owner of the machine must carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    IssueCredential { epoch: u64, site_id: SiteId },
    OpenTransport { epoch: u64, access_token: String },
    Send(String),
    CloseTransport,
    /// Deliver [`Event::ResponseBlockDue`] after the configured delay.
    ScheduleResponseBlock { epoch: u64 },
    /// Hand the path to the router.
    Navigate(String),
}

#[derive(Debug)]
pub struct SessionMachine {
    site_id: SiteId,
    lifecycle: Lifecycle,
    epoch: u64,
    expanded: bool,
    credential: Option<Credential>,
    blocking_error: Option<String>,
    readiness: ConnectionReadiness,
    status: ProcessingStatus,
    progress: Option<String>,
    log: ConversationLog,
    draft: String,
    confirmation: Option<ConfirmationRequest>,
    block_scheduled: bool,
}

impl SessionMachine {
    pub fn new(site_id: SiteId) -> Self {
        Self {
            site_id,
            lifecycle: Lifecycle::Inactive,
            epoch: 0,
            expanded: false,
            credential: None,
            blocking_error: None,
            readiness: ConnectionReadiness::Uninstantiated,
            status: ProcessingStatus::Initial,
            progress: None,
            log: ConversationLog::new(),
            draft: String::new(),
            confirmation: None,
            block_scheduled: false,
        }
    }

    pub fn site_id(&self) -> SiteId {
        self.site_id
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn status(&self) -> ProcessingStatus {
        self.status
    }

    pub fn readiness(&self) -> ConnectionReadiness {
        self.readiness
    }

    pub fn progress(&self) -> Option<&str> {
        self.progress.as_deref()
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn confirmation(&self) -> Option<&ConfirmationRequest> {
        self.confirmation.as_ref()
    }

    /// The UI may offer the input box.
    pub fn can_submit(&self) -> bool {
        self.lifecycle == Lifecycle::Active
            && self.blocking_error.is_none()
            && self.readiness == ConnectionReadiness::Open
            && self.status.accepts_input()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            site_id: self.site_id,
            lifecycle: self.lifecycle,
            expanded: self.expanded,
            readiness: self.readiness,
            status: self.status,
            progress: self.progress.clone(),
            messages: self.log.entries().to_vec(),
            confirmation: self.confirmation.as_ref().map(ConfirmationRequest::view),
            blocking_error: self.blocking_error.clone(),
            draft: self.draft.clone(),
            can_submit: self.can_submit(),
            session_id: self.credential.as_ref().map(|c| c.session_id.clone()),
        }
    }

    /// Apply one event and return the effects it requires, in order.
    pub fn dispatch(&mut self, event: Event) -> Vec<Effect> {
        let mut effects = Vec::new();
        match event {
            Event::OpenChat => {
                self.expanded = true;
                self.activate(&mut effects);
            }
            Event::CollapseChat => self.expanded = false,
            Event::RequestReset => self.request_reset(&mut effects),
            Event::RequestClose => self.request_close(&mut effects),
            Event::SetDraft(text) => self.draft = text,
            Event::Submit(text) => self.submit(text, &mut effects),
            Event::Navigate { from, to } => self.navigate(&from, to, &mut effects),
            Event::Confirm => self.confirm(&mut effects),
            Event::Cancel => self.cancel(),
            Event::CredentialIssued { epoch, credential } => {
                if self.is_current(epoch) {
                    info!(site_id = %self.site_id, session_id = %credential.session_id, "Assistant session issued");
                    effects.push(Effect::OpenTransport {
                        epoch,
                        access_token: credential.access_token.clone(),
                    });
                    self.credential = Some(credential);
                }
            }
            Event::CredentialFailed { epoch, error } => {
                if self.is_current(epoch) {
                    SessionTrace::log(
                        self.site_id.0,
                        SessionEvent::CredentialFailed { error: error.clone() },
                    );
                    self.blocking_error = Some(error);
                }
            }
            Event::ConnectFailed { epoch, error } => {
                if self.is_current(epoch) {
                    warn!(site_id = %self.site_id, %error, "Assistant transport could not start");
                    self.blocking_error = Some(error);
                }
            }
            Event::Readiness { epoch, readiness } => {
                if self.is_current(epoch) {
                    self.on_readiness(readiness, &mut effects);
                }
            }
            Event::Frame { epoch, text } => {
                if self.is_current(epoch) {
                    self.on_frame(&text, &mut effects);
                }
            }
            Event::ResponseBlockDue { epoch } => {
                if self.is_current(epoch) {
                    self.block_scheduled = false;
                    if self.log.open_response_block() {
                        debug!(site_id = %self.site_id, "Opened pending response block");
                    }
                }
            }
        }
        effects
    }

    /// Deferred work from a previous activation must not touch this one.
    fn is_current(&self, epoch: u64) -> bool {
        if epoch != self.epoch || !self.lifecycle.is_live() {
            debug!(site_id = %self.site_id, epoch, current = self.epoch, "Ignoring stale session event");
            return false;
        }
        true
    }

    fn activate(&mut self, effects: &mut Vec<Effect>) {
        if self.lifecycle != Lifecycle::Inactive {
            return;
        }
        self.lifecycle = Lifecycle::Active;
        self.epoch += 1;
        self.blocking_error = None;
        SessionTrace::log(self.site_id.0, SessionEvent::Activated { epoch: self.epoch });
        effects.push(Effect::IssueCredential {
            epoch: self.epoch,
            site_id: self.site_id,
        });
    }

    /// Clear derived conversation state. The epoch bump cancels anything in flight.
    fn clear_conversation(&mut self) {
        self.epoch += 1;
        self.log.clear();
        self.status = ProcessingStatus::Initial;
        self.progress = None;
        self.credential = None;
        self.confirmation = None;
        self.block_scheduled = false;
        // The mirrored transport is gone; a new one reports its own state.
        self.readiness = ConnectionReadiness::Uninstantiated;
    }

    fn reset(&mut self, effects: &mut Vec<Effect>) {
        self.clear_conversation();
        SessionTrace::log(self.site_id.0, SessionEvent::Reset { epoch: self.epoch });
        effects.push(Effect::CloseTransport);
        if self.lifecycle.is_live() {
            self.lifecycle = Lifecycle::Active;
            self.blocking_error = None;
            effects.push(Effect::IssueCredential {
                epoch: self.epoch,
                site_id: self.site_id,
            });
        }
    }

    fn deactivate(&mut self, effects: &mut Vec<Effect>) {
        self.clear_conversation();
        self.lifecycle = Lifecycle::Inactive;
        self.expanded = false;
        self.blocking_error = None;
        self.draft.clear();
        SessionTrace::log(self.site_id.0, SessionEvent::Deactivated { epoch: self.epoch });
        effects.push(Effect::CloseTransport);
    }

    fn request_reset(&mut self, effects: &mut Vec<Effect>) {
        if self.lifecycle != Lifecycle::Active || self.confirmation.is_some() {
            return;
        }
        if self.log.is_empty() {
            self.reset(effects);
        } else {
            self.raise_confirmation(ConfirmationRequest::reset_chat());
        }
    }

    fn request_close(&mut self, effects: &mut Vec<Effect>) {
        match self.lifecycle {
            Lifecycle::Inactive => self.expanded = false,
            Lifecycle::Closing => {}
            Lifecycle::Active if self.confirmation.is_some() => {}
            Lifecycle::Active if self.log.is_empty() => self.deactivate(effects),
            Lifecycle::Active => {
                self.raise_confirmation(ConfirmationRequest::close_chat());
            }
        }
    }

    fn navigate(&mut self, from: &str, to: String, effects: &mut Vec<Effect>) {
        if self.confirmation.is_some() {
            debug!(site_id = %self.site_id, destination = %to, "Navigation ignored while a confirmation is open");
            return;
        }
        match navigation::check(self.lifecycle, from, &to) {
            NavigationDecision::Proceed => effects.push(Effect::Navigate(to)),
            NavigationDecision::RequireConfirmation => {
                SessionTrace::log(
                    self.site_id.0,
                    SessionEvent::NavigationBlocked { destination: to.clone() },
                );
                self.raise_confirmation(ConfirmationRequest::navigation_blocked(to));
            }
        }
    }

    fn confirm(&mut self, effects: &mut Vec<Effect>) {
        let Some(request) = self.confirmation.take() else {
            return;
        };
        match request.on_confirm {
            PendingAction::Reset => self.reset(effects),
            PendingAction::Deactivate => self.deactivate(effects),
            PendingAction::LeaveTo(destination) => {
                self.deactivate(effects);
                effects.push(Effect::Navigate(destination));
            }
        }
    }

    /// Confirmations that would end the session put it in `Closing` while pending.
    fn raise_confirmation(&mut self, request: ConfirmationRequest) {
        if request.ends_session() {
            self.lifecycle = Lifecycle::Closing;
        }
        self.confirmation = Some(request);
    }

    fn cancel(&mut self) {
        let Some(request) = self.confirmation.take() else {
            return;
        };
        if request.ends_session() && self.lifecycle == Lifecycle::Closing {
            self.lifecycle = Lifecycle::Active;
        }
    }

    fn submit(&mut self, text: String, effects: &mut Vec<Effect>) {
        if text.trim().is_empty() {
            return;
        }
        if self.lifecycle != Lifecycle::Active || self.blocking_error.is_some() {
            warn!(site_id = %self.site_id, lifecycle = ?self.lifecycle, "Submission refused: no usable session");
            return;
        }
        // The backend takes nothing new while it is working on an answer.
        if self.status == ProcessingStatus::InProgress {
            warn!(site_id = %self.site_id, "Submission refused: backend is busy");
            return;
        }

        if self.readiness == ConnectionReadiness::Open {
            SessionTrace::log(self.site_id.0, SessionEvent::FrameSent { bytes: text.len() });
            effects.push(Effect::Send(text.clone()));
        } else {
            // Replayed by resend-on-reconnect once the link is back.
            debug!(site_id = %self.site_id, readiness = %self.readiness, "Queued input until the transport opens");
        }

        self.log.push_input(text);
        self.status = ProcessingStatus::InProgress;
        self.draft.clear();
        self.schedule_response_block(effects);
    }

    fn on_readiness(&mut self, readiness: ConnectionReadiness, effects: &mut Vec<Effect>) {
        debug!(site_id = %self.site_id, from = %self.readiness, to = %readiness, "Transport readiness changed");
        self.readiness = readiness;
        match readiness {
            ConnectionReadiness::Open => {
                self.status = ProcessingStatus::Initial;
                self.progress = None;
                self.resend_unanswered(effects);
            }
            ConnectionReadiness::Closed => {
                self.status = ProcessingStatus::Initial;
                self.progress = None;
            }
            _ => {}
        }
    }

    /// Replay the last input if no answer for it has started to arrive.
    fn resend_unanswered(&mut self, effects: &mut Vec<Effect>) {
        let Some(text) = self.log.unanswered_input() else {
            return;
        };
        info!(site_id = %self.site_id, "Resending unanswered input after reconnect");
        SessionTrace::log(self.site_id.0, SessionEvent::Resent { bytes: text.len() });
        effects.push(Effect::Send(text.to_string()));
        self.status = ProcessingStatus::InProgress;
        self.progress = Some(DEFAULT_PROGRESS_MESSAGE.to_string());
        self.schedule_response_block(effects);
    }

    fn on_frame(&mut self, text: &str, effects: &mut Vec<Effect>) {
        match decode_frame(text) {
            Ok(envelope) => {
                SessionTrace::log(
                    self.site_id.0,
                    SessionEvent::FrameReceived {
                        status: envelope.status.as_wire().to_string(),
                        bytes: text.len(),
                    },
                );
                self.apply_envelope(envelope, effects);
            }
            Err(e) => {
                warn!(site_id = %self.site_id, error = %e, "Dropping inbound frame");
                SessionTrace::log(
                    self.site_id.0,
                    SessionEvent::FrameDropped { reason: e.to_string() },
                );
            }
        }
    }

    fn apply_envelope(&mut self, envelope: Envelope, effects: &mut Vec<Effect>) {
        match envelope.status {
            EnvelopeStatus::AwaitingData => {
                self.status = ProcessingStatus::Awaiting;
                self.progress = None;
            }
            EnvelopeStatus::InProgress => {
                self.status = ProcessingStatus::InProgress;
                self.progress = Some(envelope.payload);
                self.schedule_response_block(effects);
            }
            EnvelopeStatus::Error => {
                let error = BackendError(envelope.payload);
                info!(site_id = %self.site_id, %error, "Backend reported an error");
                self.log.append_utterance(error.0, UtteranceKind::Error);
                self.status = ProcessingStatus::Error;
                self.progress = None;
            }
            EnvelopeStatus::Complete => {
                self.log.append_utterance(envelope.payload, UtteranceKind::Basic);
                self.status = ProcessingStatus::Complete;
                self.progress = None;
            }
        }
    }

    /// While in progress, a trailing input gets an empty response block after
    /// a short delay. At most one timer is outstanding.
    fn schedule_response_block(&mut self, effects: &mut Vec<Effect>) {
        if self.status == ProcessingStatus::InProgress
            && self.log.awaits_response_block()
            && !self.block_scheduled
        {
            self.block_scheduled = true;
            effects.push(Effect::ScheduleResponseBlock { epoch: self.epoch });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solarops_core::{Message, UtteranceKind};

    const SITE: SiteId = SiteId(7);

    fn credential(token: &str) -> Credential {
        Credential {
            access_token: token.into(),
            token_type: "bearer".into(),
            session_id: "sess-1".into(),
        }
    }

    fn frame(status: &str, response: &str) -> String {
        serde_json::json!({"metadata": {"status": status}, "response": response}).to_string()
    }

    /// Machine with an open transport for epoch 1.
    fn connected() -> SessionMachine {
        let mut m = SessionMachine::new(SITE);
        m.dispatch(Event::OpenChat);
        m.dispatch(Event::CredentialIssued { epoch: 1, credential: credential("abc") });
        m.dispatch(Event::Readiness { epoch: 1, readiness: ConnectionReadiness::Connecting });
        m.dispatch(Event::Readiness { epoch: 1, readiness: ConnectionReadiness::Open });
        m
    }

    fn receive(m: &mut SessionMachine, status: &str, response: &str) -> Vec<Effect> {
        let epoch = m.epoch();
        m.dispatch(Event::Frame { epoch, text: frame(status, response) })
    }

    fn sends(effects: &[Effect]) -> Vec<&str> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Send(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn utterances(message: &Message) -> Vec<(&str, UtteranceKind)> {
        match message {
            Message::Response { messages, .. } => {
                messages.iter().map(|u| (u.text.as_str(), u.kind)).collect()
            }
            other => panic!("expected response block, got {other:?}"),
        }
    }

    /// Never two response blocks in a row. Two inputs in a row come only
    /// from grouping: a question sent before the previous one got its
    /// response block shares that block once the timer opens it.
    fn assert_well_formed(log: &ConversationLog) {
        let entries = log.entries();
        for (i, pair) in entries.windows(2).enumerate() {
            if !pair[0].is_input() && !pair[1].is_input() {
                panic!("two response blocks in a row at {i}: {entries:?}");
            }
        }
    }

    #[test]
    fn activation_is_idempotent() {
        let mut m = SessionMachine::new(SITE);
        let first = m.dispatch(Event::OpenChat);
        let second = m.dispatch(Event::OpenChat);

        assert_eq!(first, vec![Effect::IssueCredential { epoch: 1, site_id: SITE }]);
        assert!(second.is_empty());
        assert_eq!(m.lifecycle(), Lifecycle::Active);
    }

    #[test]
    fn credential_opens_transport_once() {
        let mut m = SessionMachine::new(SITE);
        m.dispatch(Event::OpenChat);
        m.dispatch(Event::OpenChat);
        let effects =
            m.dispatch(Event::CredentialIssued { epoch: 1, credential: credential("abc") });
        assert_eq!(
            effects,
            vec![Effect::OpenTransport { epoch: 1, access_token: "abc".into() }]
        );
        assert_eq!(m.snapshot().session_id.as_deref(), Some("sess-1"));
    }

    #[test]
    fn credential_failure_blocks_until_reopened() {
        let mut m = SessionMachine::new(SITE);
        m.dispatch(Event::OpenChat);
        m.dispatch(Event::CredentialFailed { epoch: 1, error: "HTTP 500".into() });

        let snap = m.snapshot();
        assert_eq!(snap.blocking_error.as_deref(), Some("HTTP 500"));
        assert_eq!(snap.status, ProcessingStatus::Initial);
        assert!(!snap.can_submit);
        assert!(m.dispatch(Event::Submit("hi".into())).is_empty());

        // Nothing to lose, so close needs no confirmation; reopening re-issues.
        assert_eq!(m.dispatch(Event::RequestClose), vec![Effect::CloseTransport]);
        assert_eq!(
            m.dispatch(Event::OpenChat),
            vec![Effect::IssueCredential { epoch: 3, site_id: SITE }]
        );
        assert!(m.snapshot().blocking_error.is_none());
    }

    #[test]
    fn uptime_scenario_produces_single_answer() {
        let mut m = connected();
        let effects = m.dispatch(Event::Submit("What is uptime?".into()));
        assert_eq!(sends(&effects), ["What is uptime?"]);
        assert!(effects.contains(&Effect::ScheduleResponseBlock { epoch: 1 }));

        receive(&mut m, "AWAITING_DATA", "");
        receive(&mut m, "IN_PROGRESS", "Processing...");
        assert_eq!(m.progress(), Some("Processing..."));
        receive(&mut m, "COMPLETE", "98%");

        let entries = m.log().entries();
        assert_eq!(entries.len(), 2);
        assert!(matches!(&entries[0], Message::Input { text, .. } if text == "What is uptime?"));
        assert_eq!(utterances(&entries[1]), [("98%", UtteranceKind::Basic)]);
        assert_eq!(m.status(), ProcessingStatus::Complete);
        assert_eq!(m.progress(), None);
        assert!(m.can_submit());
    }

    #[test]
    fn reconnect_mid_answer_resends_once() {
        let mut m = connected();
        m.dispatch(Event::Submit("What is uptime?".into()));
        receive(&mut m, "AWAITING_DATA", "");
        receive(&mut m, "IN_PROGRESS", "Processing...");

        m.dispatch(Event::Readiness { epoch: 1, readiness: ConnectionReadiness::Closed });
        assert_eq!(m.status(), ProcessingStatus::Initial);
        assert_eq!(m.progress(), None);

        let effects =
            m.dispatch(Event::Readiness { epoch: 1, readiness: ConnectionReadiness::Open });
        assert_eq!(sends(&effects), ["What is uptime?"]);
        assert_eq!(m.status(), ProcessingStatus::InProgress);
        assert_eq!(m.progress(), Some(DEFAULT_PROGRESS_MESSAGE));

        receive(&mut m, "COMPLETE", "98%");
        assert_eq!(m.log().len(), 2);
        assert_eq!(utterances(&m.log().entries()[1]), [("98%", UtteranceKind::Basic)]);
    }

    #[test]
    fn resend_when_pending_block_is_empty() {
        let mut m = connected();
        m.dispatch(Event::Submit("X".into()));
        m.dispatch(Event::ResponseBlockDue { epoch: 1 });
        assert!(m.log().last().unwrap().is_pending_response());

        m.dispatch(Event::Readiness { epoch: 1, readiness: ConnectionReadiness::Closed });
        let effects =
            m.dispatch(Event::Readiness { epoch: 1, readiness: ConnectionReadiness::Open });
        assert_eq!(sends(&effects), ["X"]);
        // The block already exists; no second one is scheduled.
        assert!(!effects.iter().any(|e| matches!(e, Effect::ScheduleResponseBlock { .. })));
    }

    #[test]
    fn answered_input_is_not_resent() {
        let mut m = connected();
        m.dispatch(Event::Submit("X".into()));
        receive(&mut m, "COMPLETE", "answer");

        m.dispatch(Event::Readiness { epoch: 1, readiness: ConnectionReadiness::Closed });
        let effects =
            m.dispatch(Event::Readiness { epoch: 1, readiness: ConnectionReadiness::Open });
        assert!(sends(&effects).is_empty());
        assert_eq!(m.status(), ProcessingStatus::Initial);
    }

    #[test]
    fn submit_while_disconnected_is_replayed_on_open() {
        let mut m = connected();
        m.dispatch(Event::Readiness { epoch: 1, readiness: ConnectionReadiness::Closed });

        let effects = m.dispatch(Event::Submit("later".into()));
        assert!(sends(&effects).is_empty());
        assert!(m.log().awaits_response_block());

        let effects =
            m.dispatch(Event::Readiness { epoch: 1, readiness: ConnectionReadiness::Open });
        assert_eq!(sends(&effects), ["later"]);
    }

    #[test]
    fn empty_submission_is_ignored() {
        let mut m = connected();
        assert!(m.dispatch(Event::Submit(String::new())).is_empty());
        assert!(m.dispatch(Event::Submit("   ".into())).is_empty());
        assert!(m.log().is_empty());
    }

    #[test]
    fn submit_is_refused_while_backend_is_busy() {
        let mut m = connected();
        receive(&mut m, "AWAITING_DATA", "");
        m.dispatch(Event::Submit("first".into()));
        assert!(!m.can_submit());
        assert!(m.dispatch(Event::Submit("second".into())).is_empty());
        assert_eq!(m.log().len(), 1);

        receive(&mut m, "COMPLETE", "answer");
        assert_eq!(sends(&m.dispatch(Event::Submit("second".into()))), ["second"]);
        assert_well_formed(m.log());
    }

    #[test]
    fn second_question_before_block_timer_is_sent_and_grouped() {
        let mut m = connected();
        m.dispatch(Event::Submit("first".into()));
        receive(&mut m, "AWAITING_DATA", "");
        assert!(m.can_submit());

        let effects = m.dispatch(Event::Submit("second".into()));
        assert_eq!(sends(&effects), ["second"]);
        // The timer from the first question is still outstanding.
        assert!(!effects.iter().any(|e| matches!(e, Effect::ScheduleResponseBlock { .. })));
        assert_eq!(m.log().len(), 2);
        assert_eq!(m.status(), ProcessingStatus::InProgress);

        m.dispatch(Event::ResponseBlockDue { epoch: 1 });
        assert_eq!(m.log().len(), 3);
        assert!(m.log().last().unwrap().is_pending_response());
        assert_well_formed(m.log());

        receive(&mut m, "COMPLETE", "both answered");
        assert_eq!(utterances(&m.log().entries()[2]), [("both answered", UtteranceKind::Basic)]);
        assert_well_formed(m.log());
    }

    #[test]
    fn open_gate_always_accepts_submission() {
        let mut m = connected();
        let script = [
            ("AWAITING_DATA", ""),
            ("IN_PROGRESS", "working"),
            ("ERROR", "no data"),
            ("COMPLETE", "ok"),
        ];
        for (round, (status, response)) in script.into_iter().enumerate() {
            receive(&mut m, status, response);
            if m.can_submit() {
                let before = m.log().len();
                let effects = m.dispatch(Event::Submit(format!("q{round}")));
                assert_eq!(sends(&effects).len(), 1, "gate open but nothing sent after {status}");
                assert!(m.log().len() > before);
            }
        }
    }

    #[test]
    fn submit_clears_draft() {
        let mut m = connected();
        m.dispatch(Event::SetDraft("What is".into()));
        assert_eq!(m.snapshot().draft, "What is");
        m.dispatch(Event::Submit("What is uptime?".into()));
        assert_eq!(m.snapshot().draft, "");
    }

    #[test]
    fn response_block_opens_after_delay() {
        let mut m = connected();
        m.dispatch(Event::Submit("q".into()));
        assert_eq!(m.log().len(), 1);

        m.dispatch(Event::ResponseBlockDue { epoch: 1 });
        assert_eq!(m.log().len(), 2);
        assert!(m.log().last().unwrap().is_pending_response());

        receive(&mut m, "COMPLETE", "a");
        assert_eq!(m.log().len(), 2);
        assert_eq!(utterances(&m.log().entries()[1]), [("a", UtteranceKind::Basic)]);
    }

    #[test]
    fn late_block_timer_after_fast_answer_is_noop() {
        let mut m = connected();
        m.dispatch(Event::Submit("q".into()));
        receive(&mut m, "COMPLETE", "fast");
        m.dispatch(Event::ResponseBlockDue { epoch: 1 });
        assert_eq!(m.log().len(), 2);
        assert_well_formed(m.log());
    }

    #[test]
    fn error_envelope_is_inline_and_non_fatal() {
        let mut m = connected();
        m.dispatch(Event::Submit("q".into()));
        receive(&mut m, "ERROR", "no telemetry for site");

        assert_eq!(m.status(), ProcessingStatus::Error);
        assert_eq!(
            utterances(&m.log().entries()[1]),
            [("no telemetry for site", UtteranceKind::Error)]
        );
        assert!(m.can_submit());
        assert_eq!(m.lifecycle(), Lifecycle::Active);
    }

    #[test]
    fn malformed_frames_are_dropped() {
        let mut m = connected();
        m.dispatch(Event::Submit("q".into()));
        let before = m.snapshot();

        assert!(m.dispatch(Event::Frame { epoch: 1, text: "not json".into() }).is_empty());
        receive(&mut m, "PAUSED", "??");

        assert_eq!(m.snapshot(), before);
    }

    #[test]
    fn submission_gate_follows_readiness_and_status() {
        let mut m = connected();
        assert!(!m.can_submit(), "initial status waits for the backend");
        receive(&mut m, "AWAITING_DATA", "");
        assert!(m.can_submit());
        m.dispatch(Event::Submit("q".into()));
        assert!(!m.can_submit());
        receive(&mut m, "COMPLETE", "a");
        assert!(m.can_submit());
        m.dispatch(Event::Readiness { epoch: 1, readiness: ConnectionReadiness::Closing });
        assert!(!m.can_submit());
    }

    #[test]
    fn input_while_pending_slots_before_block() {
        let mut m = connected();
        m.dispatch(Event::Submit("first".into()));
        m.dispatch(Event::ResponseBlockDue { epoch: 1 });
        receive(&mut m, "AWAITING_DATA", "");
        m.dispatch(Event::Submit("second".into()));

        let entries = m.log().entries();
        assert_eq!(entries.len(), 3);
        assert!(matches!(&entries[1], Message::Input { text, .. } if text == "second"));
        assert!(entries[2].is_pending_response());
        assert_well_formed(m.log());

        receive(&mut m, "COMPLETE", "both answered");
        assert_eq!(m.log().len(), 3);
        assert_well_formed(m.log());
    }

    #[test]
    fn log_stays_well_formed_over_long_exchange() {
        let mut m = connected();
        receive(&mut m, "AWAITING_DATA", "");
        for round in 0..5 {
            m.dispatch(Event::Submit(format!("question {round}")));
            if round % 2 == 0 {
                m.dispatch(Event::ResponseBlockDue { epoch: 1 });
            }
            receive(&mut m, "IN_PROGRESS", "thinking");
            if round == 3 {
                m.dispatch(Event::Readiness { epoch: 1, readiness: ConnectionReadiness::Closed });
                m.dispatch(Event::Readiness { epoch: 1, readiness: ConnectionReadiness::Open });
            }
            if round % 3 == 1 {
                receive(&mut m, "ERROR", "partial failure");
            }
            receive(&mut m, "COMPLETE", "done");
            m.dispatch(Event::ResponseBlockDue { epoch: 1 });
            receive(&mut m, "AWAITING_DATA", "");
            assert_well_formed(m.log());
        }
        assert_eq!(m.log().len(), 10);
    }

    /// xorshift64, enough to shuffle event orders reproducibly.
    fn next_random(state: &mut u64) -> u64 {
        *state ^= *state << 13;
        *state ^= *state >> 7;
        *state ^= *state << 17;
        *state
    }

    #[test]
    fn log_stays_well_formed_under_random_interleavings() {
        for seed in 1..=200u64 {
            let mut rng = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
            let mut m = connected();
            let mut timer_pending = false;

            for step in 0..60 {
                let gate_open = m.can_submit();
                let effects = match next_random(&mut rng) % 8 {
                    0 | 1 => {
                        let effects = m.dispatch(Event::Submit(format!("q{step}")));
                        if gate_open {
                            assert_eq!(sends(&effects).len(), 1, "seed {seed} step {step}");
                        }
                        effects
                    }
                    2 => receive(&mut m, "AWAITING_DATA", ""),
                    3 => receive(&mut m, "IN_PROGRESS", "working"),
                    4 => receive(&mut m, "COMPLETE", "done"),
                    5 => receive(&mut m, "ERROR", "failed"),
                    6 if timer_pending => {
                        timer_pending = false;
                        m.dispatch(Event::ResponseBlockDue { epoch: 1 })
                    }
                    _ => {
                        let readiness = if m.readiness() == ConnectionReadiness::Open {
                            ConnectionReadiness::Closed
                        } else {
                            ConnectionReadiness::Open
                        };
                        m.dispatch(Event::Readiness { epoch: 1, readiness })
                    }
                };
                if effects.iter().any(|e| matches!(e, Effect::ScheduleResponseBlock { .. })) {
                    assert!(!timer_pending, "second timer scheduled, seed {seed} step {step}");
                    timer_pending = true;
                }
                assert_well_formed(m.log());
            }
        }
    }

    #[test]
    fn reset_needs_confirmation_when_log_has_content() {
        let mut m = connected();
        m.dispatch(Event::Submit("q".into()));

        assert!(m.dispatch(Event::RequestReset).is_empty());
        let request = m.confirmation().unwrap();
        assert_eq!(request.on_confirm, PendingAction::Reset);
        assert_eq!(m.lifecycle(), Lifecycle::Active);

        let effects = m.dispatch(Event::Confirm);
        assert_eq!(
            effects,
            vec![
                Effect::CloseTransport,
                Effect::IssueCredential { epoch: 2, site_id: SITE },
            ]
        );
        assert!(m.log().is_empty());
        assert_eq!(m.lifecycle(), Lifecycle::Active);
        assert_eq!(m.snapshot().session_id, None);
    }

    #[test]
    fn cancelled_reset_keeps_everything() {
        let mut m = connected();
        m.dispatch(Event::Submit("q".into()));
        m.dispatch(Event::RequestReset);
        m.dispatch(Event::Cancel);

        assert!(m.confirmation().is_none());
        assert_eq!(m.log().len(), 1);
        assert_eq!(m.epoch(), 1);
    }

    #[test]
    fn close_with_content_goes_through_closing() {
        let mut m = connected();
        m.dispatch(Event::Submit("q".into()));
        m.dispatch(Event::RequestClose);
        assert_eq!(m.lifecycle(), Lifecycle::Closing);
        assert!(!m.can_submit());

        // Frames keep flowing while the dialog is open.
        receive(&mut m, "COMPLETE", "a");
        assert_eq!(m.log().len(), 2);

        m.dispatch(Event::Cancel);
        assert_eq!(m.lifecycle(), Lifecycle::Active);

        m.dispatch(Event::RequestClose);
        let effects = m.dispatch(Event::Confirm);
        assert_eq!(effects, vec![Effect::CloseTransport]);
        let snap = m.snapshot();
        assert_eq!(snap.lifecycle, Lifecycle::Inactive);
        assert!(!snap.expanded);
        assert!(snap.messages.is_empty());
        assert_eq!(snap.status, ProcessingStatus::Initial);
    }

    #[test]
    fn collapse_keeps_session() {
        let mut m = connected();
        m.dispatch(Event::CollapseChat);
        let snap = m.snapshot();
        assert!(!snap.expanded);
        assert_eq!(snap.lifecycle, Lifecycle::Active);
        assert!(m.dispatch(Event::OpenChat).is_empty());
        assert!(m.snapshot().expanded);
    }

    #[test]
    fn stale_events_after_close_are_ignored() {
        let mut m = SessionMachine::new(SITE);
        m.dispatch(Event::OpenChat);
        m.dispatch(Event::RequestClose);
        assert_eq!(m.lifecycle(), Lifecycle::Inactive);

        let effects =
            m.dispatch(Event::CredentialIssued { epoch: 1, credential: credential("late") });
        assert!(effects.is_empty());
        assert_eq!(m.snapshot().session_id, None);

        m.dispatch(Event::OpenChat);
        let effects = m.dispatch(Event::Readiness { epoch: 1, readiness: ConnectionReadiness::Open });
        assert!(effects.is_empty());
        assert_eq!(m.readiness(), ConnectionReadiness::Uninstantiated);
    }

    #[test]
    fn stale_block_timer_does_not_resurrect_log() {
        let mut m = connected();
        m.dispatch(Event::Submit("q".into()));
        m.dispatch(Event::RequestClose);
        m.dispatch(Event::Confirm);
        m.dispatch(Event::OpenChat);

        m.dispatch(Event::ResponseBlockDue { epoch: 1 });
        m.dispatch(Event::Frame { epoch: 1, text: frame("COMPLETE", "ghost") });
        assert!(m.log().is_empty());
    }

    #[test]
    fn navigation_within_site_proceeds() {
        let mut m = SessionMachine::new(SiteId(42));
        m.dispatch(Event::OpenChat);
        let effects = m.dispatch(Event::Navigate {
            from: "/org/1/sites/42/overview".into(),
            to: "/org/1/sites/42/inverters".into(),
        });
        assert_eq!(effects, vec![Effect::Navigate("/org/1/sites/42/inverters".into())]);
        assert!(m.confirmation().is_none());
    }

    #[test]
    fn navigation_to_other_site_requires_confirmation() {
        let mut m = SessionMachine::new(SiteId(42));
        m.dispatch(Event::OpenChat);
        let effects = m.dispatch(Event::Navigate {
            from: "/org/1/sites/42/overview".into(),
            to: "/org/1/sites/43/overview".into(),
        });
        assert!(effects.is_empty());
        assert_eq!(m.lifecycle(), Lifecycle::Closing);

        let effects = m.dispatch(Event::Confirm);
        assert_eq!(
            effects,
            vec![
                Effect::CloseTransport,
                Effect::Navigate("/org/1/sites/43/overview".into()),
            ]
        );
        assert_eq!(m.lifecycle(), Lifecycle::Inactive);
    }

    #[test]
    fn cancelled_navigation_leaves_session_untouched() {
        let mut m = connected();
        m.dispatch(Event::Submit("q".into()));
        m.dispatch(Event::Navigate { from: "/sites/7".into(), to: "/reports".into() });
        let effects = m.dispatch(Event::Cancel);

        assert!(effects.is_empty());
        assert_eq!(m.lifecycle(), Lifecycle::Active);
        assert_eq!(m.log().len(), 1);
        assert_eq!(m.epoch(), 1);
    }

    #[test]
    fn navigation_without_session_is_free() {
        let mut m = SessionMachine::new(SITE);
        let effects = m.dispatch(Event::Navigate { from: "/sites/7".into(), to: "/reports".into() });
        assert_eq!(effects, vec![Effect::Navigate("/reports".into())]);
    }
}
