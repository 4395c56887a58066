use chat_types::{Agent, AgentDraft, AgentId, AgentKind};
use tracing::{debug, info, warn};

use crate::api::DirectoryApi;
use crate::error::DirectoryError;

/// Client-local cache of agents plus the current selection.
///
/// Single writer: only the operations below mutate it. A failed operation
/// records `last_error` and leaves `agents` and `selected` untouched.
#[derive(Debug)]
pub struct AgentDirectory<A> {
    api: A,
    agents: Vec<Agent>,
    selected: Option<AgentId>,
    last_error: Option<DirectoryError>,
}

impl<A: DirectoryApi> AgentDirectory<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            agents: Vec::new(),
            selected: None,
            last_error: None,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn selected(&self) -> Option<&AgentId> {
        self.selected.as_ref()
    }

    pub fn selected_agent(&self) -> Option<&Agent> {
        let selected = self.selected.as_ref()?;
        self.find(selected)
    }

    pub fn find(&self, id: &AgentId) -> Option<&Agent> {
        self.agents.iter().find(|agent| &agent.id == id)
    }

    pub fn last_error(&self) -> Option<&DirectoryError> {
        self.last_error.as_ref()
    }

    /// Populates the list from static agent kinds. Existing ids are kept.
    pub fn seed(&mut self, kinds: impl IntoIterator<Item = AgentKind>) {
        for agent in kinds.into_iter().map(AgentKind::into_agent) {
            if self.find(&agent.id).is_none() {
                self.agents.push(agent);
            }
        }
    }

    /// Replaces the list with the server's. On failure the previous list stays.
    ///
    /// The selection is dropped if the selected agent disappeared.
    pub async fn refresh(&mut self) -> Result<&[Agent], DirectoryError> {
        match self.api.list_agents().await {
            Ok(agents) => {
                debug!(count = agents.len(), "agent list refreshed");
                self.agents = agents;
                if let Some(selected) = self.selected.clone() {
                    if self.find(&selected).is_none() {
                        info!(agent = %selected, "selected agent no longer listed");
                        self.selected = None;
                    }
                }
                self.last_error = None;
                Ok(&self.agents)
            }
            Err(error) => Err(self.record(error)),
        }
    }

    /// Submits `draft`. On success the new agent is appended and selected.
    pub async fn create(&mut self, mut draft: AgentDraft) -> Result<&Agent, DirectoryError> {
        draft.name = draft.name.trim().to_owned();
        if draft.name.is_empty() {
            return Err(self.record(DirectoryError::validation("agent name is required")));
        }

        match self.api.create_agent(&draft).await {
            Ok(agent) => {
                info!(agent = %agent.id, name = %agent.name, "agent created");
                let id = agent.id.clone();
                self.agents.retain(|existing| existing.id != id);
                self.agents.push(agent);
                self.selected = Some(id);
                self.last_error = None;
                let index = self.agents.len() - 1;
                Ok(&self.agents[index])
            }
            Err(error) => Err(self.record(error)),
        }
    }

    /// Fetches one agent and updates (or appends) its cached entry. A response
    /// for a different id is rejected and the cache is left alone.
    pub async fn fetch(&mut self, id: &AgentId) -> Result<&Agent, DirectoryError> {
        match self.api.get_agent(id).await {
            Ok(agent) if &agent.id != id => Err(self.record(DirectoryError::request(format!(
                "server returned agent {} for {id}",
                agent.id
            )))),
            Ok(agent) => {
                self.last_error = None;
                let index = match self.agents.iter().position(|existing| &existing.id == id) {
                    Some(index) => {
                        self.agents[index] = agent;
                        index
                    }
                    None => {
                        self.agents.push(agent);
                        self.agents.len() - 1
                    }
                };
                Ok(&self.agents[index])
            }
            Err(error) => Err(self.record(error)),
        }
    }

    /// Marks a listed agent selected. Unknown ids are rejected.
    pub fn select(&mut self, id: &AgentId) -> Result<&Agent, DirectoryError> {
        match self.agents.iter().position(|agent| &agent.id == id) {
            Some(index) => {
                self.selected = Some(id.clone());
                Ok(&self.agents[index])
            }
            None => Err(DirectoryError::NotFound { id: id.clone() }),
        }
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    fn record(&mut self, error: DirectoryError) -> DirectoryError {
        warn!(error = %error, "directory operation failed");
        self.last_error = Some(error.clone());
        error
    }
}
