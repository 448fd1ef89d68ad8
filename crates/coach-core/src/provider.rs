//! Completion provider seam.

use crate::error::Result;
use crate::types::ChatMessage;
use async_trait::async_trait;

/// An external service that turns a message list into generated text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Display name used in logs and error details.
    fn name(&self) -> &str;

    /// Fails with `CoachError::Configuration` when no credential is resolvable.
    /// Checked per request, before any session state is touched.
    fn ensure_configured(&self) -> Result<()>;

    /// Submit `messages` to `model` and return the reply text.
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String>;
}
