use chat_types::AgentId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire shape of socket frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameFormat {
    /// Outbound frames are the submitted text; inbound frames are fragments.
    #[default]
    Raw,
    /// JSON envelopes tagged by `type` (`chat`, `event`, `complete`, `error`, ...).
    Envelope,
}

impl FrameFormat {
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value.trim().to_ascii_lowercase().as_str() {
            "raw" => Self::Raw,
            "envelope" | "json" => Self::Envelope,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Envelope => "envelope",
        }
    }
}

/// Inbound frame after decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Fragment(String),
    Completed,
    Errored(String),
    SessionAssigned(String),
    /// Frames with no transcript effect (`ack`, `pong`, empty `event`, unknown types).
    Ignored { event_type: String },
}

#[derive(Debug, Serialize)]
struct ChatEnvelope<'a> {
    #[serde(rename = "type")]
    type_: &'static str,
    message: &'a str,
    agent: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

/// Per-connection frame encoder/decoder.
///
/// In envelope mode the codec remembers the server-assigned `session_id` so
/// subsequent chat frames continue the same server-side conversation.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    format: FrameFormat,
    agent_id: AgentId,
    session_id: Option<String>,
}

impl FrameCodec {
    pub fn new(format: FrameFormat, agent_id: AgentId) -> Self {
        Self {
            format,
            agent_id,
            session_id: None,
        }
    }

    pub fn format(&self) -> FrameFormat {
        self.format
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn encode(&self, text: &str) -> String {
        match self.format {
            FrameFormat::Raw => text.to_owned(),
            FrameFormat::Envelope => {
                let envelope = ChatEnvelope {
                    type_: "chat",
                    message: text,
                    agent: self.agent_id.as_str(),
                    session_id: self.session_id.as_deref(),
                };
                serde_json::to_string(&envelope).unwrap_or_else(|_| text.to_owned())
            }
        }
    }

    /// Keepalive frame, only meaningful for envelope framing.
    pub fn ping_frame(&self) -> Option<String> {
        match self.format {
            FrameFormat::Raw => None,
            FrameFormat::Envelope => Some(r#"{"type":"ping"}"#.to_owned()),
        }
    }

    pub fn decode(&mut self, frame: &str) -> InboundEvent {
        match self.format {
            FrameFormat::Raw => InboundEvent::Fragment(frame.to_owned()),
            FrameFormat::Envelope => self.decode_envelope(frame),
        }
    }

    fn decode_envelope(&mut self, frame: &str) -> InboundEvent {
        let value = match serde_json::from_str::<Value>(frame) {
            Ok(value @ Value::Object(_)) => value,
            _ => return InboundEvent::Fragment(frame.to_owned()),
        };
        let Some(event_type) = value.get("type").and_then(Value::as_str) else {
            return InboundEvent::Fragment(frame.to_owned());
        };

        match event_type {
            "event" => match string_field(&value, "content") {
                Some(content) if !content.is_empty() => InboundEvent::Fragment(content),
                _ => ignored(event_type),
            },
            "complete" => {
                if let Some(session_id) = string_field(&value, "session_id") {
                    self.session_id = Some(session_id);
                }
                InboundEvent::Completed
            }
            "error" => InboundEvent::Errored(
                string_field(&value, "message")
                    .filter(|message| !message.trim().is_empty())
                    .unwrap_or_else(|| "agent stream failed".to_owned()),
            ),
            "session" => match string_field(&value, "session_id") {
                Some(session_id) => {
                    self.session_id = Some(session_id.clone());
                    InboundEvent::SessionAssigned(session_id)
                }
                None => ignored(event_type),
            },
            other => ignored(other),
        }
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn ignored(event_type: &str) -> InboundEvent {
    InboundEvent::Ignored {
        event_type: event_type.to_owned(),
    }
}
