//! Chat view: the consumer side of the directory and the session.
//!
//! The view owns one [`AgentDirectory`] and one [`ChatSession`] and keeps the
//! session bound to the directory's selected agent. It holds the two pieces of
//! UI-only state the core does not: the inline create-agent form error and the
//! transient banner for failed list requests.

use agent_directory::{AgentDirectory, DirectoryApi, DirectoryError};
use agent_socket::{ChatSession, SendOutcome, SessionError, SessionUpdate};
use chat_types::{Agent, AgentDraft, AgentId, ConnectionStatus, Message, Principal};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

pub struct ChatView<A> {
    directory: AgentDirectory<A>,
    session: ChatSession,
    principal: Option<Principal>,
    form_error: Option<String>,
    banner: Option<String>,
}

impl<A: DirectoryApi> ChatView<A> {
    pub fn new(directory: AgentDirectory<A>, session: ChatSession) -> Self {
        Self {
            directory,
            session,
            principal: None,
            form_error: None,
            banner: None,
        }
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn directory(&self) -> &AgentDirectory<A> {
        &self.directory
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.principal.is_some()
    }

    pub fn form_error(&self) -> Option<&str> {
        self.form_error.as_deref()
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.session.subscribe()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.session.messages()
    }

    /// Reloads the agent list. A failure keeps the old list and raises the banner.
    pub async fn refresh_agents(&mut self) -> Result<usize, DirectoryError> {
        match self.directory.refresh().await {
            Ok(agents) => {
                let count = agents.len();
                self.banner = None;
                Ok(count)
            }
            Err(error) => {
                self.banner = Some(format!("could not load agents: {}", error.user_message()));
                Err(error)
            }
        }
    }

    /// Selects a listed agent and binds the session to it.
    pub async fn select_agent(&mut self, id: &AgentId) -> Result<(), ViewError> {
        self.directory.select(id)?;
        info!(agent = %id, "agent selected");
        self.session.open(Some(id.clone())).await?;
        Ok(())
    }

    pub async fn deselect_agent(&mut self) -> Result<(), ViewError> {
        self.directory.deselect();
        self.session.open(None).await?;
        Ok(())
    }

    /// Submits the draft. On success the form error clears and the session
    /// switches to the new agent; on failure the error stays on the form.
    ///
    /// Once the server has accepted the draft the call succeeds. If the session
    /// then cannot open the new agent, that failure goes to the banner.
    pub async fn create_agent(&mut self, draft: AgentDraft) -> Result<Agent, ViewError> {
        let agent = match self.directory.create(draft).await {
            Ok(agent) => agent.clone(),
            Err(error) => {
                self.form_error = Some(error.user_message());
                return Err(error.into());
            }
        };
        self.form_error = None;
        if let Err(error) = self.session.open(Some(agent.id.clone())).await {
            warn!(agent = %agent.id, error = %error, "created agent could not be opened");
            self.banner = Some(format!("could not connect to {}: {error}", agent.id));
        }
        Ok(agent)
    }

    pub fn submit(&mut self, input: &str) -> Result<SendOutcome, SessionError> {
        self.session.send(input)
    }

    pub fn clear(&self) {
        self.session.clear_transcript();
    }

    /// Manual retry after the session parked in `errored`.
    pub async fn retry(&mut self) -> Result<(), ViewError> {
        self.session.reconnect().await?;
        Ok(())
    }

    /// One-line connection status, e.g. `reconnecting: connection refused (retry 2)`.
    pub fn status_line(&self) -> String {
        let status = self.session.status();
        let reason = self.session.status_reason();
        let attempt = self.session.attempt();
        let agent = self.session.agent_id();

        match (status, agent) {
            (ConnectionStatus::Idle, None) => "idle: no agent selected".to_string(),
            (ConnectionStatus::Connected, Some(agent)) => format!("connected to {agent}"),
            (ConnectionStatus::Idle, Some(agent)) => format!("idle: {agent} not connected"),
            (status, agent) => {
                let mut line = status.as_str().to_string();
                match (reason, agent) {
                    (Some(reason), _) => {
                        line.push_str(": ");
                        line.push_str(&reason);
                    }
                    (None, Some(agent)) => {
                        line.push_str(" to ");
                        line.push_str(agent.as_str());
                    }
                    (None, None) => {}
                }
                if attempt > 0 && !status.is_terminal() {
                    line.push_str(&format!(" (retry {attempt})"));
                }
                line
            }
        }
    }

    /// `agent-chat | <agent> | <user>` header.
    pub fn header_line(&self) -> String {
        let agent = self
            .directory
            .selected_agent()
            .map(|agent| format!("{} ({})", agent.name, agent.model))
            .unwrap_or_else(|| "no agent".to_string());
        let user = self
            .principal
            .as_ref()
            .map(|principal| principal.display_name().to_string())
            .unwrap_or_else(|| "guest".to_string());
        format!("agent-chat | {agent} | {user}")
    }

    /// Closes the connection and cancels any pending reconnect.
    pub async fn shutdown(&mut self) {
        self.session.close().await;
    }
}
