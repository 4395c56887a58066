//! Shared data model for the agent chat client.
//!
//! This crate intentionally defines only plain records: transcript messages,
//! agent definitions, connection status and the signed-in principal. Socket
//! transport, transcript reduction and directory I/O live in their own crates.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Identifier for one connection opened by a chat session.
///
/// Every `open` allocates a fresh id; events tagged with a superseded id are dropped.
pub type ConnectionId = u64;

/// Server-assigned agent identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AgentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

/// One transcript entry.
///
/// `open` is true only for an assistant message that is still receiving fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    #[serde(default)]
    pub open: bool,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>, agent_id: Option<AgentId>, at: OffsetDateTime) -> Self {
        Self::build(Role::User, content.into(), agent_id, at, false)
    }

    /// Empty open assistant message rendered while a response is pending.
    #[must_use]
    pub fn assistant_placeholder(agent_id: Option<AgentId>, at: OffsetDateTime) -> Self {
        Self::build(Role::Assistant, String::new(), agent_id, at, true)
    }

    #[must_use]
    pub fn assistant_open(
        content: impl Into<String>,
        agent_id: Option<AgentId>,
        at: OffsetDateTime,
    ) -> Self {
        Self::build(Role::Assistant, content.into(), agent_id, at, true)
    }

    #[must_use]
    pub fn system(content: impl Into<String>, at: OffsetDateTime) -> Self {
        Self::build(Role::System, content.into(), None, at, false)
    }

    #[must_use]
    pub fn is_open_assistant(&self) -> bool {
        self.open && self.role == Role::Assistant
    }

    fn build(
        role: Role,
        content: String,
        agent_id: Option<AgentId>,
        at: OffsetDateTime,
        open: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            created_at: at,
            agent_id,
            open,
        }
    }
}

/// Agent definition as stored by the directory server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub model: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub tools: BTreeSet<String>,
}

impl Agent {
    #[must_use]
    pub fn from_draft(id: impl Into<AgentId>, draft: AgentDraft) -> Self {
        Self {
            id: id.into(),
            name: draft.name,
            model: draft.model,
            system_prompt: draft.system_prompt,
            tools: draft.tools,
        }
    }
}

/// Client-submitted agent definition that has no server-assigned id yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDraft {
    pub name: String,
    pub model: String,
    pub system_prompt: String,
    #[serde(default)]
    pub tools: BTreeSet<String>,
}

impl AgentDraft {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            system_prompt: system_prompt.into(),
            tools: BTreeSet::new(),
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tools.insert(tool.into());
        self
    }

    pub fn with_tools(mut self, tools: impl IntoIterator<Item = String>) -> Self {
        self.tools.extend(tools);
        self
    }
}

/// Static registry entry describing a kind of agent the backend can serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentKind {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub model: String,
}

impl AgentKind {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            model: model.into(),
        }
    }

    /// Registry kinds are addressed by name on the socket endpoint.
    #[must_use]
    pub fn into_agent(self) -> Agent {
        Agent {
            id: AgentId::new(self.name.clone()),
            name: self.name,
            model: self.model,
            system_prompt: self.description,
            tools: BTreeSet::new(),
        }
    }
}

/// Authenticated user as reported by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    pub provider: String,
}

impl Principal {
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.email.as_deref().unwrap_or(&self.id)
        } else {
            &self.name
        }
    }
}

/// Lifecycle status of the session's socket connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Idle,
    Connecting,
    Connected,
    Reconnecting,
    Disconnected,
    Errored,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Disconnected => "disconnected",
            Self::Errored => "errored",
        }
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// No further automatic reconnects happen from this status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Errored)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
