//! Transcript reduction for streamed assistant responses.
//!
//! The reducer is a pure state update: `(transcript, event) -> transcript`. It
//! owns the "open message" contract: at most one assistant message receives
//! fragments at a time, and once closed it never reopens.
//!
//! Fragments merge by role *and* agent. A fragment only extends the last message
//! when that message is the open assistant message of the same agent; anything
//! else closes the open message and starts a new one.

use chat_types::{AgentId, Message};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    UserSubmitted {
        text: String,
        agent_id: Option<AgentId>,
        at: OffsetDateTime,
    },
    FragmentReceived {
        text: String,
        agent_id: Option<AgentId>,
        at: OffsetDateTime,
    },
    StreamCompleted,
    StreamErrored {
        message: String,
        at: OffsetDateTime,
    },
    Cleared,
}

impl TranscriptEvent {
    pub fn user_submitted(text: impl Into<String>, agent_id: Option<AgentId>) -> Self {
        Self::UserSubmitted {
            text: text.into(),
            agent_id,
            at: OffsetDateTime::now_utc(),
        }
    }

    pub fn fragment(text: impl Into<String>, agent_id: Option<AgentId>) -> Self {
        Self::FragmentReceived {
            text: text.into(),
            agent_id,
            at: OffsetDateTime::now_utc(),
        }
    }

    pub fn stream_errored(message: impl Into<String>) -> Self {
        Self::StreamErrored {
            message: message.into(),
            at: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

/// Applies `event` to `transcript` and returns the updated transcript.
#[must_use]
pub fn reduce(mut transcript: Transcript, event: TranscriptEvent) -> Transcript {
    transcript.apply(event);
    transcript
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Returns the assistant message currently receiving fragments, if any.
    pub fn open_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.is_open_assistant())
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    pub fn apply(&mut self, event: TranscriptEvent) {
        match event {
            TranscriptEvent::UserSubmitted { text, agent_id, at } => {
                self.on_user_submitted(text, agent_id, at);
            }
            TranscriptEvent::FragmentReceived { text, agent_id, at } => {
                self.on_fragment(&text, agent_id, at);
            }
            TranscriptEvent::StreamCompleted => {
                self.close_open_message();
            }
            TranscriptEvent::StreamErrored { message, at } => {
                self.close_open_message();
                self.messages.push(Message::system(message, at));
            }
            TranscriptEvent::Cleared => {
                self.messages.clear();
            }
        }
    }

    fn on_user_submitted(&mut self, text: String, agent_id: Option<AgentId>, at: OffsetDateTime) {
        self.close_open_message();
        self.messages
            .push(Message::user(text, agent_id.clone(), at));
        self.messages
            .push(Message::assistant_placeholder(agent_id, at));
    }

    fn on_fragment(&mut self, text: &str, agent_id: Option<AgentId>, at: OffsetDateTime) {
        if text.is_empty() {
            return;
        }

        if let Some(last) = self.messages.last_mut() {
            if last.is_open_assistant() && last.agent_id == agent_id {
                last.content.push_str(text);
                return;
            }
        }

        self.close_open_message();
        self.messages
            .push(Message::assistant_open(text, agent_id, at));
    }

    /// Closes the open assistant message. Returns false when none was open.
    fn close_open_message(&mut self) -> bool {
        match self
            .messages
            .iter_mut()
            .rev()
            .find(|message| message.is_open_assistant())
        {
            Some(message) => {
                message.open = false;
                true
            }
            None => false,
        }
    }
}
