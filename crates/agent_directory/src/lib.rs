//! Agent directory client: list, create and fetch agent records, plus the
//! client-local [`AgentDirectory`] cache that tracks the selected agent.

pub mod api;
pub mod config;
pub mod directory;
pub mod error;
pub mod http;

pub use api::{DirectoryApi, HealthStatus};
pub use config::{DirectoryConfig, DEFAULT_DIRECTORY_BASE_URL};
pub use directory::AgentDirectory;
pub use error::{parse_error_message, DirectoryError};
pub use http::HttpDirectoryApi;
