//! Incremental line-oriented transcript output.

use chat_types::{Message, Role};
use uuid::Uuid;

/// Turns successive transcript snapshots into append-only terminal text.
///
/// Closed messages are printed once. The open assistant message is printed as
/// it grows, and its line is terminated when it closes. A snapshot whose
/// message at the last printed position has a different id is treated as a new
/// transcript (cleared, possibly refilled) and printed from the start.
#[derive(Debug, Default)]
pub struct TranscriptPrinter {
    started: usize,
    last_started: Option<Uuid>,
    printed_bytes: usize,
    line_open: bool,
}

impl TranscriptPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text to append for `messages`, given everything printed so far.
    pub fn render(&mut self, messages: &[Message]) -> String {
        let mut out = String::new();

        let same_transcript = self.started == 0
            || messages.get(self.started - 1).map(|message| message.id) == self.last_started;
        if !same_transcript {
            if self.line_open {
                out.push('\n');
            }
            *self = Self::default();
        }

        if self.line_open {
            if let Some(message) = self.started.checked_sub(1).and_then(|i| messages.get(i)) {
                if let Some(tail) = message.content.get(self.printed_bytes..) {
                    out.push_str(tail);
                }
                self.printed_bytes = message.content.len();
                if !message.open {
                    out.push('\n');
                    self.line_open = false;
                }
            }
        }

        for message in &messages[self.started..] {
            if self.line_open {
                out.push('\n');
            }
            out.push_str(&prefix(message));
            out.push_str(&message.content);
            self.started += 1;
            self.last_started = Some(message.id);
            self.printed_bytes = message.content.len();
            self.line_open = message.open;
            if !message.open {
                out.push('\n');
            }
        }

        out
    }
}

fn prefix(message: &Message) -> String {
    match message.role {
        Role::User => "you> ".to_string(),
        Role::System => "! ".to_string(),
        Role::Assistant => match &message.agent_id {
            Some(agent) => format!("{agent}> "),
            None => "assistant> ".to_string(),
        },
    }
}
