//! Streaming agent chat client.
//!
//! Ties the workspace crates together for a line-oriented front end:
//! - [`agent_directory`] lists and creates agents and tracks the selection.
//! - [`agent_socket`] keeps one reconnecting socket per selected agent and
//!   folds streamed fragments into the [`transcript`].
//! - [`view::ChatView`] is the consumer contract a UI renders from.
//!
//! Invariant: the session is only ever bound to the directory's selected agent;
//! all selection changes go through the view.

pub mod commands;
pub mod config;
pub mod logging;
pub mod printer;
pub mod view;

pub use agent_directory;
pub use agent_socket;
pub use chat_types;
pub use transcript;

pub use crate::commands::{parse_slash_command, SlashCommand};
pub use crate::config::{ConfigError, EnvConfig};
pub use crate::logging::{init_logging, LogConfig};
pub use crate::printer::TranscriptPrinter;
pub use crate::view::{ChatView, ViewError};

use chat_types::AgentKind;

/// Agent kinds the backend serves out of the box; used to seed the directory
/// before the first successful listing.
pub fn builtin_agent_kinds() -> Vec<AgentKind> {
    vec![
        AgentKind::new(
            "assistant",
            "Main AI assistant for general tasks",
            "gemini-2.5-flash",
        ),
        AgentKind::new("coder", "Specialized coding assistant", "gemini-2.5-pro"),
    ]
}
