use async_trait::async_trait;
use chat_types::{Agent, AgentDraft, AgentId};
use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.as_str(), "ok" | "healthy")
    }
}

/// Remote agent directory.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// All agents, in server order.
    async fn list_agents(&self) -> Result<Vec<Agent>, DirectoryError>;

    async fn create_agent(&self, draft: &AgentDraft) -> Result<Agent, DirectoryError>;

    async fn get_agent(&self, id: &AgentId) -> Result<Agent, DirectoryError>;

    async fn health(&self) -> Result<HealthStatus, DirectoryError>;
}
