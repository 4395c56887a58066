use chat_types::AgentId;
use url::Url;

use crate::error::SocketError;

/// Default base URL for the chat socket server.
pub const DEFAULT_SOCKET_BASE_URL: &str = "ws://127.0.0.1:8000";

/// Build the socket endpoint for one agent.
///
/// Normalization rules:
/// 1) blank input falls back to [`DEFAULT_SOCKET_BASE_URL`]
/// 2) `http`/`https` become `ws`/`wss`
/// 3) a trailing `/ws` segment is kept, otherwise `/ws` is appended
/// 4) the agent id is appended as one percent-encoded path segment
pub fn agent_endpoint(base_url: &str, agent_id: &AgentId) -> Result<Url, SocketError> {
    let base = if base_url.trim().is_empty() {
        DEFAULT_SOCKET_BASE_URL
    } else {
        base_url.trim()
    };

    let mut url = Url::parse(base)
        .map_err(|error| SocketError::InvalidEndpoint(format!("{base}: {error}")))?;

    let scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => {
            return Err(SocketError::InvalidEndpoint(format!(
                "unsupported scheme '{other}' in {base}"
            )))
        }
    };
    if url.scheme() != scheme {
        url.set_scheme(scheme).map_err(|_| {
            SocketError::InvalidEndpoint(format!("cannot switch {base} to {scheme}"))
        })?;
    }

    if agent_id.as_str().trim().is_empty() {
        return Err(SocketError::InvalidEndpoint("agent id is blank".to_owned()));
    }

    let ends_with_ws = url
        .path_segments()
        .and_then(|segments| segments.filter(|segment| !segment.is_empty()).last())
        == Some("ws");

    {
        let mut segments = url.path_segments_mut().map_err(|_| {
            SocketError::InvalidEndpoint(format!("{base} cannot carry a path"))
        })?;
        segments.pop_if_empty();
        if !ends_with_ws {
            segments.push("ws");
        }
        segments.push(agent_id.as_str());
    }

    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(base: &str, agent: &str) -> String {
        agent_endpoint(base, &AgentId::new(agent))
            .expect("endpoint should build")
            .to_string()
    }

    #[test]
    fn appends_ws_segment_and_agent() {
        assert_eq!(endpoint("ws://localhost:8000", "A1"), "ws://localhost:8000/ws/A1");
        assert_eq!(endpoint("ws://localhost:8000/", "A1"), "ws://localhost:8000/ws/A1");
    }

    #[test]
    fn keeps_existing_ws_segment() {
        assert_eq!(endpoint("ws://host/api/ws", "A1"), "ws://host/api/ws/A1");
        assert_eq!(endpoint("ws://host/api/ws/", "A1"), "ws://host/api/ws/A1");
    }

    #[test]
    fn maps_http_schemes_to_socket_schemes() {
        assert_eq!(endpoint("http://host", "A1"), "ws://host/ws/A1");
        assert_eq!(endpoint("https://host", "A1"), "wss://host/ws/A1");
    }

    #[test]
    fn encodes_agent_id_as_single_segment() {
        assert_eq!(endpoint("ws://host", "team/bot 1"), "ws://host/ws/team%2Fbot%201");
    }

    #[test]
    fn blank_base_uses_default() {
        assert_eq!(endpoint("  ", "A1"), format!("{DEFAULT_SOCKET_BASE_URL}/ws/A1"));
    }

    #[test]
    fn rejects_unsupported_scheme_and_blank_agent() {
        assert!(agent_endpoint("ftp://host", &AgentId::new("A1")).is_err());
        assert!(agent_endpoint("ws://host", &AgentId::new(" ")).is_err());
    }
}
