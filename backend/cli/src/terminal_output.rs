//! Terminal output: ANSI notes and incremental rendering of session snapshots.

use solarops_assistant::{ConfirmationView, SessionSnapshot};
use solarops_core::{ConnectionReadiness, Lifecycle, Message, UtteranceKind};

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM")
                .map(|t| t != "dumb")
                .unwrap_or(false))
}

/// Print a formatted INFO note to stdout.
pub fn note_info(msg: &str) {
    if supports_color() {
        println!("{CYAN}{BOLD}i{RESET} {msg}");
    } else {
        println!("INFO: {msg}");
    }
}

/// Print a formatted WARNING note.
pub fn note_warn(msg: &str) {
    if supports_color() {
        println!("{YELLOW}{BOLD}!{RESET} {msg}");
    } else {
        println!("WARN: {msg}");
    }
}

/// Print a formatted ERROR note.
pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}x{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

/// Turns a stream of snapshots into the lines that changed since the last one.
#[derive(Debug, Default)]
pub struct SnapshotRenderer {
    color: bool,
    printed_utterances: usize,
    lifecycle: Option<Lifecycle>,
    readiness: Option<ConnectionReadiness>,
    progress: Option<String>,
    confirmation: Option<ConfirmationView>,
    blocking_error: Option<String>,
}

impl SnapshotRenderer {
    pub fn new(color: bool) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    fn paint(&self, style: &str, text: &str) -> String {
        if self.color {
            format!("{style}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    pub fn render(&mut self, snapshot: &SessionSnapshot) -> Vec<String> {
        let mut lines = Vec::new();

        if self.lifecycle != Some(snapshot.lifecycle) {
            if snapshot.lifecycle == Lifecycle::Inactive && self.lifecycle.is_some() {
                lines.push(self.paint(DIM, "[chat closed]"));
            }
            self.lifecycle = Some(snapshot.lifecycle);
        }

        if self.readiness != Some(snapshot.readiness) {
            if snapshot.lifecycle.is_live() {
                lines.push(self.paint(DIM, &format!("[connection {}]", snapshot.readiness)));
            }
            self.readiness = Some(snapshot.readiness);
        }

        if snapshot.blocking_error != self.blocking_error {
            if let Some(error) = &snapshot.blocking_error {
                lines.push(self.paint(RED, &format!("The assistant is unavailable: {error}")));
                lines.push("Close the chat with /close and open it again to retry.".to_string());
            }
            self.blocking_error = snapshot.blocking_error.clone();
        }

        let utterances: Vec<_> = snapshot
            .messages
            .iter()
            .filter_map(|m| match m {
                Message::Response { messages, .. } => Some(messages),
                Message::Input { .. } => None,
            })
            .flatten()
            .collect();
        if utterances.len() < self.printed_utterances {
            // Conversation was cleared.
            self.printed_utterances = 0;
        }
        for utterance in &utterances[self.printed_utterances..] {
            let line = match utterance.kind {
                UtteranceKind::Basic => self.paint(GREEN, &format!("assistant> {}", utterance.text)),
                UtteranceKind::Error => self.paint(RED, &format!("assistant! {}", utterance.text)),
            };
            lines.push(line);
        }
        self.printed_utterances = utterances.len();

        if snapshot.progress != self.progress {
            if let Some(progress) = &snapshot.progress {
                lines.push(self.paint(DIM, &format!("... {progress}")));
            }
            self.progress = snapshot.progress.clone();
        }

        if snapshot.confirmation != self.confirmation {
            if let Some(view) = &snapshot.confirmation {
                lines.push(self.paint(BOLD, &view.title));
                lines.push(format!("{} (/yes or /no)", view.text));
            }
            self.confirmation = snapshot.confirmation.clone();
        }

        lines
    }
}
