use async_trait::async_trait;
use chat_types::{Agent, AgentDraft, AgentId};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::api::{DirectoryApi, HealthStatus};
use crate::config::{endpoint, DirectoryConfig};
use crate::error::{parse_error_message, DirectoryError};

/// [`DirectoryApi`] over HTTP+JSON.
#[derive(Debug, Clone)]
pub struct HttpDirectoryApi {
    http: Client,
    base_url: Url,
    config: DirectoryConfig,
}

impl HttpDirectoryApi {
    pub fn new(config: DirectoryConfig) -> Result<Self, DirectoryError> {
        let base_url = config.parsed_base_url()?;
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self {
            http,
            base_url,
            config,
        })
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl DirectoryApi for HttpDirectoryApi {
    async fn list_agents(&self) -> Result<Vec<Agent>, DirectoryError> {
        let url = endpoint(&self.base_url, &["agents"])?;
        let response = self.http.get(url).send().await?;
        let response = expect_success(response).await?;
        let agents: Vec<Agent> = decode(response).await?;
        debug!(count = agents.len(), "listed agents");
        Ok(agents)
    }

    async fn create_agent(&self, draft: &AgentDraft) -> Result<Agent, DirectoryError> {
        let url = endpoint(&self.base_url, &["agents"])?;
        let response = self.http.post(url).json(draft).send().await?;
        let status = response.status();
        if status.is_client_error() {
            let detail = error_message(response).await;
            warn!(status = status.as_u16(), %detail, "agent draft rejected");
            return Err(DirectoryError::validation(detail));
        }
        let response = expect_success(response).await?;
        let agent: Agent = decode(response).await?;
        debug!(agent = %agent.id, name = %agent.name, "created agent");
        Ok(agent)
    }

    async fn get_agent(&self, id: &AgentId) -> Result<Agent, DirectoryError> {
        let url = endpoint(&self.base_url, &["agents", id.as_str()])?;
        let response = self.http.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(DirectoryError::NotFound { id: id.clone() });
        }
        let response = expect_success(response).await?;
        // The server answers a missing agent with `null` on some versions.
        let agent: Option<Agent> = decode(response).await?;
        agent.ok_or_else(|| DirectoryError::NotFound { id: id.clone() })
    }

    async fn health(&self) -> Result<HealthStatus, DirectoryError> {
        let url = endpoint(&self.base_url, &["health"])?;
        let response = self.http.get(url).send().await?;
        let response = expect_success(response).await?;
        decode(response).await
    }
}

async fn expect_success(response: Response) -> Result<Response, DirectoryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = error_message(response).await;
    warn!(status = status.as_u16(), %message, "directory request failed");
    Err(DirectoryError::request(format!("HTTP {} {message}", status.as_u16())))
}

async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    parse_error_message(status, &body)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, DirectoryError> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body)
        .map_err(|error| DirectoryError::request(format!("malformed response body: {error}")))
}
