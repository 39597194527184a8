//! Pending destructive actions awaiting user confirmation.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfirmationKind {
    ResetChat,
    CloseChat,
    NavigationBlocked,
}

/// What confirming the request does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    Reset,
    Deactivate,
    /// Deactivate, then continue to the given path.
    LeaveTo(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub kind: ConfirmationKind,
    pub title: String,
    pub text: String,
    pub on_confirm: PendingAction,
}

impl ConfirmationRequest {
    pub fn reset_chat() -> Self {
        Self {
            kind: ConfirmationKind::ResetChat,
            title: "Reset conversation?".into(),
            text: "The assistant will forget this conversation and start a new session.".into(),
            on_confirm: PendingAction::Reset,
        }
    }

    pub fn close_chat() -> Self {
        Self {
            kind: ConfirmationKind::CloseChat,
            title: "Close the assistant?".into(),
            text: "Closing ends the session and clears the conversation.".into(),
            on_confirm: PendingAction::Deactivate,
        }
    }

    pub fn navigation_blocked(destination: impl Into<String>) -> Self {
        Self {
            kind: ConfirmationKind::NavigationBlocked,
            title: "Leave this site?".into(),
            text: "Leaving the site ends the assistant session and clears the conversation."
                .into(),
            on_confirm: PendingAction::LeaveTo(destination.into()),
        }
    }

    /// Confirming ends the session.
    pub fn ends_session(&self) -> bool {
        !matches!(self.on_confirm, PendingAction::Reset)
    }

    pub fn view(&self) -> ConfirmationView {
        ConfirmationView {
            kind: self.kind,
            title: self.title.clone(),
            text: self.text.clone(),
        }
    }
}

/// Render-only part of a confirmation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmationView {
    pub kind: ConfirmationKind,
    pub title: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_reset_keeps_session() {
        assert!(!ConfirmationRequest::reset_chat().ends_session());
        assert!(ConfirmationRequest::close_chat().ends_session());
        assert!(ConfirmationRequest::navigation_blocked("/sites/3").ends_session());
    }

    #[test]
    fn navigation_request_carries_destination() {
        let request = ConfirmationRequest::navigation_blocked("/org/1/sites/43");
        assert_eq!(
            request.on_confirm,
            PendingAction::LeaveTo("/org/1/sites/43".into())
        );
        assert_eq!(request.view().kind, ConfirmationKind::NavigationBlocked);
    }
}
