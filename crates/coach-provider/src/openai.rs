use crate::classify::classify_upstream;
use async_trait::async_trait;
use coach_core::config::ProviderConfig;
use coach_core::error::{CoachError, Result};
use coach_core::provider::CompletionProvider;
use coach_core::types::ChatMessage;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// OpenAI-compatible `/chat/completions` client.
pub struct OpenAiProvider {
    base_url: String,
    config: ProviderConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    pub fn with_client(config: ProviderConfig, client: Client) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config,
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn credential(&self) -> Result<String> {
        self.config
            .resolve_api_key()
            .ok_or_else(|| CoachError::Configuration(self.config.api_key_env.clone()))
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "OpenAI"
    }

    fn ensure_configured(&self) -> Result<()> {
        self.credential().map(|_| ())
    }

    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String> {
        let credential = self.credential()?;

        let request = ChatRequest {
            model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(credential)
            .json(&request)
            .send()
            .await
            .map_err(|e| CoachError::Provider(format!("request failed: {e}")))?;

        let status = response.status();
        debug!(model, status = status.as_u16(), "completion response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_upstream(Some(status.as_u16()), &body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CoachError::Provider(format!("invalid completion response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| CoachError::Provider("No response content from OpenAI".into()))
    }
}
