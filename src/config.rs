//! Environment configuration.

use std::env;
use std::time::Duration;

use agent_directory::{DirectoryConfig, DEFAULT_DIRECTORY_BASE_URL};
use agent_socket::{BackoffPolicy, FrameFormat, SessionConfig};
use chat_types::AgentId;
use thiserror::Error;

use crate::logging::LogConfig;

pub const API_URL_ENV: &str = "AGENT_CHAT_API_URL";
pub const WS_URL_ENV: &str = "AGENT_CHAT_WS_URL";
pub const AGENT_ENV: &str = "AGENT_CHAT_AGENT";
pub const FRAME_FORMAT_ENV: &str = "AGENT_CHAT_FRAME_FORMAT";
pub const BACKOFF_BASE_ENV: &str = "AGENT_CHAT_BACKOFF_BASE_MS";
pub const BACKOFF_CAP_ENV: &str = "AGENT_CHAT_BACKOFF_CAP_MS";
pub const TIMEOUT_ENV: &str = "AGENT_CHAT_TIMEOUT_SEC";
pub const LOG_ENV: &str = "AGENT_CHAT_LOG";
pub const LOG_JSON_ENV: &str = "AGENT_CHAT_LOG_JSON";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("AGENT_CHAT_FRAME_FORMAT must be `raw` or `envelope`, got {value:?}")]
    InvalidFrameFormat { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub api_url: String,
    /// Socket base URL. Falls back to `api_url` with its scheme mapped to ws/wss.
    pub ws_url: Option<String>,
    /// Agent to open at startup instead of the first listed one.
    pub agent: Option<AgentId>,
    pub frame_format: FrameFormat,
    pub backoff_base: Option<Duration>,
    pub backoff_cap: Option<Duration>,
    /// HTTP request and socket handshake timeout.
    pub timeout: Option<Duration>,
    pub log_filter: Option<String>,
    pub log_json: bool,
}

impl EnvConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let frame_format = match string_opt(&lookup, FRAME_FORMAT_ENV) {
            Some(value) => {
                FrameFormat::parse(&value).ok_or(ConfigError::InvalidFrameFormat { value })?
            }
            None => FrameFormat::default(),
        };

        Ok(Self {
            api_url: string_opt(&lookup, API_URL_ENV)
                .unwrap_or_else(|| DEFAULT_DIRECTORY_BASE_URL.to_string()),
            ws_url: string_opt(&lookup, WS_URL_ENV),
            agent: string_opt(&lookup, AGENT_ENV).map(AgentId::new),
            frame_format,
            backoff_base: number_opt(&lookup, BACKOFF_BASE_ENV)?.map(Duration::from_millis),
            backoff_cap: number_opt(&lookup, BACKOFF_CAP_ENV)?.map(Duration::from_millis),
            timeout: number_opt(&lookup, TIMEOUT_ENV)?
                .filter(|seconds| *seconds > 0)
                .map(Duration::from_secs),
            log_filter: string_opt(&lookup, LOG_ENV),
            log_json: flag(&lookup, LOG_JSON_ENV),
        })
    }

    pub fn socket_base_url(&self) -> &str {
        self.ws_url.as_deref().unwrap_or(&self.api_url)
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        let defaults = BackoffPolicy::default();
        BackoffPolicy::new(
            self.backoff_base.unwrap_or(defaults.base),
            self.backoff_cap.unwrap_or(defaults.cap),
        )
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.socket_base_url())
            .with_backoff(self.backoff_policy())
            .with_frame_format(self.frame_format)
    }

    pub fn directory_config(&self) -> DirectoryConfig {
        let config = DirectoryConfig::new(self.api_url.clone());
        match self.timeout {
            Some(timeout) => config.with_timeout(timeout),
            None => config,
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            filter: self.log_filter.clone(),
            json: self.log_json,
        }
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> bool {
    lookup(key).map(|value| value == "1").unwrap_or(false)
}

fn string_opt(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn number_opt(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<u64>, ConfigError> {
    string_opt(lookup, key)
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidNumber { key, value })
        })
        .transpose()
}
