//! Tracing subscriber setup for the binary.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `AGENT_CHAT_LOG` is unset or unparsable.
pub const DEFAULT_LOG_FILTER: &str = "warn,agent_socket=info,agent_directory=info";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `agent_socket=debug`.
    pub filter: Option<String>,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

pub fn env_filter(directive: Option<&str>) -> EnvFilter {
    directive
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Installs the global subscriber, writing to stderr so stdout stays the transcript.
///
/// Returns false when a subscriber was already installed.
pub fn init_logging(config: &LogConfig) -> bool {
    let filter = env_filter(config.filter.as_deref());
    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init()
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_directive_falls_back_to_default() {
        assert_eq!(
            env_filter(Some("agent_socket=loudest")).to_string(),
            EnvFilter::new(DEFAULT_LOG_FILTER).to_string()
        );
        assert_eq!(
            env_filter(Some("agent_socket=debug")).to_string(),
            EnvFilter::new("agent_socket=debug").to_string()
        );
    }

    #[test]
    fn second_init_reports_existing_subscriber() {
        let config = LogConfig::default();
        let _ = init_logging(&config);
        assert!(!init_logging(&config));
    }
}
