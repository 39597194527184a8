//! Conversation log and its grouping rules.
//!
//! All mutation goes through the functions here so the ordering rules can be
//! tested without transport or timers. Blocks are appended, extended, or an
//! input is slotted in front of a still-empty response block. Nothing is
//! reordered or removed except by [`ConversationLog::clear`].

use chrono::Utc;
use serde::Serialize;

use crate::types::{Message, Utterance, UtteranceKind};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConversationLog {
    entries: Vec<Message>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.entries.last()
    }

    /// The last entry is an input that has no response block yet.
    pub fn awaits_response_block(&self) -> bool {
        self.last().is_some_and(Message::is_input)
    }

    /// Record a user input.
    ///
    /// When the log ends in an empty response block the input goes in front of
    /// it, so that block keeps following the input that triggered it.
    pub fn push_input(&mut self, text: impl Into<String>) {
        let input = Message::input(text);
        match self.entries.last() {
            Some(last) if last.is_pending_response() => {
                let at = self.entries.len() - 1;
                self.entries.insert(at, input);
            }
            _ => self.entries.push(input),
        }
    }

    /// Append an empty response block after a trailing input.
    ///
    /// Returns `false` (and leaves the log alone) when the last entry is not an
    /// input, e.g. the answer already arrived.
    pub fn open_response_block(&mut self) -> bool {
        if !self.awaits_response_block() {
            return false;
        }
        self.entries.push(Message::empty_response());
        true
    }

    /// Add an assistant utterance to the current response block, creating the
    /// block when none follows the last input yet.
    pub fn append_utterance(&mut self, text: impl Into<String>, kind: UtteranceKind) {
        let utterance = Utterance {
            text: text.into(),
            timestamp: Utc::now(),
            kind,
        };
        match self.entries.last_mut() {
            Some(Message::Response { messages, .. }) => messages.push(utterance),
            _ => self.entries.push(Message::Response {
                messages: vec![utterance],
                timestamp: Utc::now(),
            }),
        }
    }

    /// Text to replay after the transport reconnects, if the last question was
    /// never answered: either no response block follows it, or the block that
    /// follows it is still empty.
    pub fn unanswered_input(&self) -> Option<&str> {
        match self.entries.as_slice() {
            [.., Message::Input { text, .. }] => Some(text.as_str()),
            [.., Message::Input { text, .. }, last] if last.is_pending_response() => {
                Some(text.as_str())
            }
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
