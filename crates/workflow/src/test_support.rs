//! A reply-queue model for workflow tests.

use async_trait::async_trait;
use ragweave_core::error::ProviderError;
use ragweave_core::provider::{GenerationRequest, LanguageModel, ModelResponse};
use ragweave_tools::NoopToolExecutor;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::engine::NodeServices;

/// Answers with queued replies, then echoes the last message.
///
/// A reply of `"!fail"` makes that request fail.
pub struct ReplyModel {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ReplyModel {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ReplyModel {
    fn name(&self) -> &str {
        "reply-model"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<ModelResponse, ProviderError> {
        let echo = request.messages.last().map(|m| m.text()).unwrap_or_default();
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(reply) if reply == "!fail" => Err(ProviderError::Network("scripted failure".into())),
            Some(reply) => Ok(ModelResponse::text(reply)),
            None => Ok(ModelResponse::text(echo)),
        }
    }
}

pub fn services(model: Arc<ReplyModel>) -> NodeServices {
    NodeServices::new(model, Arc::new(NoopToolExecutor))
}
