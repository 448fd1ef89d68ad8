//! Session chat handler: transcript bookkeeping around one provider call.

use crate::session::Transcript;
use crate::store::SessionStore;
use coach_core::config::{CoachConfig, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT};
use coach_core::error::Result;
use coach_core::provider::CompletionProvider;
use coach_core::types::{ChatMessage, Role};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Forwards messages to a completion provider with per-session memory.
#[derive(Clone)]
pub struct ChatHandler {
    store: SessionStore,
    provider: Arc<dyn CompletionProvider>,
    system_prompt: Arc<str>,
    model: String,
    max_history_turns: Option<usize>,
}

impl ChatHandler {
    pub fn new(store: SessionStore, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            store,
            provider,
            system_prompt: Arc::from(DEFAULT_SYSTEM_PROMPT),
            model: DEFAULT_MODEL.to_string(),
            max_history_turns: None,
        }
    }

    pub fn from_config(
        cfg: &CoachConfig,
        store: SessionStore,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self::new(store, provider)
            .with_system_prompt(cfg.system_prompt.as_str())
            .with_model(cfg.provider.model.as_str())
            .with_max_history_turns(cfg.session.max_history_turns)
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<Arc<str>>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Cap the turns sent upstream. The window never drops the newest user turn,
    /// so `Some(0)` behaves like `Some(1)`.
    pub fn with_max_history_turns(mut self, max: Option<usize>) -> Self {
        self.max_history_turns = max.map(|n| n.max(1));
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Append the message to the session, ask the provider, append and return the reply.
    ///
    /// A missing credential fails before the session is touched. Provider
    /// failures are final; the user turn already appended stays.
    pub async fn send_message(&self, session_id: &str, message: &str) -> Result<String> {
        if let Err(e) = self.provider.ensure_configured() {
            error!(provider = self.provider.name(), error = %e, "completion provider not configured");
            return Err(e);
        }

        let slot = self.store.session(session_id);
        let mut session = slot.lock().await;
        if session.is_empty() {
            info!(session_id, "new conversation");
        }

        session.push(Role::User, message);
        let messages = self.build_request(&session);
        debug!(session_id, model = %self.model, messages = messages.len(), "requesting completion");

        let reply = match self.provider.complete(&self.model, &messages).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(session_id, provider = self.provider.name(), code = e.code(), error = %e, "completion failed");
                return Err(e);
            }
        };

        session.push(Role::Assistant, reply.as_str());
        debug!(session_id, turns = session.len(), "reply recorded");
        Ok(reply)
    }

    /// System instruction followed by the (possibly windowed) transcript.
    pub fn build_request(&self, transcript: &Transcript) -> Vec<ChatMessage> {
        let history = transcript.recent(self.max_history_turns);
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(&*self.system_prompt));
        messages.extend(history.iter().map(|t| t.to_chat_message()));
        messages
    }
}
