pub mod config;
pub mod error;
pub mod provider;
pub mod types;

pub use config::{CoachConfig, ProviderConfig, ServerConfig, SessionConfig};
pub use error::{CoachError, Result};
pub use provider::CompletionProvider;
pub use types::{ChatMessage, Role};
