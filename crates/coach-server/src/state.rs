//! Application state shared across all handlers.

use coach_core::config::CoachConfig;
use coach_core::provider::CompletionProvider;
use coach_provider::OpenAiProvider;
use coach_session::{ChatHandler, SessionLimits, SessionStore};
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub chat: ChatHandler,
}

impl AppState {
    pub fn new(chat: ChatHandler) -> Self {
        Self { chat }
    }

    /// OpenAI-backed state with a store bounded by the session config.
    pub fn from_config(cfg: &CoachConfig) -> Self {
        let provider: Arc<dyn CompletionProvider> =
            Arc::new(OpenAiProvider::new(cfg.provider.clone()));
        Self::with_provider(cfg, provider)
    }

    pub fn with_provider(cfg: &CoachConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        let store = SessionStore::new(SessionLimits::from(&cfg.session));
        Self::new(ChatHandler::from_config(cfg, store, provider))
    }

    pub fn sessions(&self) -> &SessionStore {
        self.chat.store()
    }
}
