use std::time::Duration;

use url::Url;

use crate::error::DirectoryError;

/// Default base URL of the directory server.
pub const DEFAULT_DIRECTORY_BASE_URL: &str = "http://127.0.0.1:8000";

/// Transport configuration for directory requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryConfig {
    /// Base URL; `agents` and `health` are resolved beneath it.
    pub base_url: String,
    /// Optional per-request timeout.
    pub timeout: Option<Duration>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DIRECTORY_BASE_URL.to_string(),
            timeout: None,
        }
    }
}

impl DirectoryConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Parses the base URL, defaulting when blank. Only http and https are accepted.
    pub fn parsed_base_url(&self) -> Result<Url, DirectoryError> {
        let base = match self.base_url.trim() {
            "" => DEFAULT_DIRECTORY_BASE_URL,
            trimmed => trimmed,
        };
        let url = Url::parse(base)
            .map_err(|error| DirectoryError::InvalidBaseUrl(format!("{base}: {error}")))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(DirectoryError::InvalidBaseUrl(format!(
                "{base}: unsupported scheme {other}"
            ))),
        }
    }
}

/// Appends `segments` to `base`, each percent-encoded as a single path segment.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, DirectoryError> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| DirectoryError::InvalidBaseUrl(format!("{base} cannot carry a path")))?;
        path.pop_if_empty();
        path.extend(segments);
    }
    Ok(url)
}
