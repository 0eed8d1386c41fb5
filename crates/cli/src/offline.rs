//! A model that needs no network, for dry runs.

use async_trait::async_trait;
use ragweave_core::error::ProviderError;
use ragweave_core::message::Role;
use ragweave_core::provider::{GenerationRequest, LanguageModel, ModelResponse};

/// Answers every request with `[echo] ` plus the last user message.
pub struct EchoModel;

#[async_trait]
impl LanguageModel for EchoModel {
    fn name(&self) -> &str {
        "echo"
    }

    fn supports_tools(&self) -> bool {
        false
    }

    async fn generate(&self, request: GenerationRequest) -> Result<ModelResponse, ProviderError> {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.text())
            .unwrap_or_default();
        Ok(ModelResponse::text(format!("[echo] {last_user}")))
    }
}
